//! Simple-RingCT signature pipeline.
//!
//! A simple RingCT signature proves three things about a transaction:
//! each output commitment hides a 64-bit amount (Bulletproofs), each input
//! is signed by some member of its ring with a pseudo-output opening to the
//! same amount (MLSAG), and the pseudo-outputs balance the outputs plus the
//! fee. Verification is split into a structural/cryptographic pass
//! ([`ver_rct_non_semantics_simple`]) and the balance check
//! ([`ver_rct_semantics_simple`]).

use std::fmt;

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use log::debug;
use rand::{CryptoRng, RngCore};

use ringct_types::varint::write_varint;
use ringct_types::{
    Ctkey, CtkeyM, DecodeError, DomainError, EcdhTuple, Key, RctError, RctSig, RctType,
};

use crate::algebra::{decode_point, h, point_key, random_scalar, scalar_key};
use crate::bulletproof::{bulletproof_verify, prove_range};
use crate::commitment::{commit, ecdh_encode};
use crate::keccak256;
use crate::mlsag::{prove_rct_mg_simple, ver_rct_mg_simple};

// ─── Message Hash ────────────────────────────────────────────────────────────

/// Serialized signature base: type, fee, encrypted amounts, output commitments.
fn serialize_base(sig: &RctSig) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + sig.ecdh_info.len() * 96);
    out.push(u8::from(sig.rct_type));
    write_varint(&mut out, sig.txn_fee);
    for tuple in &sig.ecdh_info {
        if sig.rct_type.compact_ecdh() {
            out.extend_from_slice(&tuple.amount.0[..8]);
        } else {
            out.extend_from_slice(&tuple.mask.0);
            out.extend_from_slice(&tuple.amount.0);
        }
    }
    for out_pk in &sig.out_pk {
        out.extend_from_slice(&out_pk.mask.0);
    }
    out
}

/// Range-proof keys that enter the message, in proof order. `V` is bound
/// through the output commitments instead.
fn serialize_range_proofs(sig: &RctSig) -> Vec<u8> {
    let mut out = Vec::new();
    for bp in &sig.bulletproofs {
        for k in [&bp.a, &bp.s, &bp.t1, &bp.t2, &bp.taux, &bp.mu] {
            out.extend_from_slice(&k.0);
        }
        for k in bp.l.iter().chain(&bp.r) {
            out.extend_from_slice(&k.0);
        }
        for k in [&bp.aa, &bp.b, &bp.t] {
            out.extend_from_slice(&k.0);
        }
    }
    out
}

/// Message signed by every input's MLSAG:
/// `H(message || H(base) || H(range proof keys))`.
pub fn pre_mlsag_hash(sig: &RctSig) -> Result<Key, DomainError> {
    if !sig.rct_type.is_simple_bulletproof() {
        return Err(DomainError::UnsupportedType(sig.rct_type));
    }
    if sig.mix_ring.is_empty() {
        return Err(DomainError::EmptyMixRing);
    }
    if sig.ecdh_info.len() != sig.out_pk.len() {
        return Err(DomainError::LengthMismatch {
            what: "ecdh info",
            expected: sig.out_pk.len(),
            got: sig.ecdh_info.len(),
        });
    }

    let mut combined = [0u8; 96];
    combined[..32].copy_from_slice(&sig.message.0);
    combined[32..64].copy_from_slice(&keccak256(&serialize_base(sig)));
    combined[64..].copy_from_slice(&keccak256(&serialize_range_proofs(sig)));
    Ok(Key(keccak256(&combined)))
}

// ─── Verification ───────────────────────────────────────────────────────────

/// Outcome of a full verification, naming the first stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RctStatus {
    Valid,
    UnsupportedType(RctType),
    /// Vector lengths disagree; the payload names the offending field.
    Malformed(&'static str),
    InvalidPoint,
    RangeProof,
    /// A range-proof commitment does not match its output.
    CommitmentMismatch(usize),
    /// MLSAG of the given input does not verify.
    RingSignature(usize),
    Unbalanced,
}

impl RctStatus {
    pub fn is_valid(self) -> bool {
        self == RctStatus::Valid
    }
}

impl fmt::Display for RctStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RctStatus::Valid => write!(f, "valid"),
            RctStatus::UnsupportedType(t) => write!(f, "unsupported rct type {:?}", t),
            RctStatus::Malformed(what) => write!(f, "malformed signature: {}", what),
            RctStatus::InvalidPoint => write!(f, "invalid curve point"),
            RctStatus::RangeProof => write!(f, "range proof does not verify"),
            RctStatus::CommitmentMismatch(i) => {
                write!(f, "range proof commitment {} does not match output", i)
            }
            RctStatus::RingSignature(i) => write!(f, "ring signature of input {} does not verify", i),
            RctStatus::Unbalanced => write!(f, "inputs do not balance outputs plus fee"),
        }
    }
}

fn check_shape(sig: &RctSig) -> Result<(), RctStatus> {
    let inputs = sig.mix_ring.len();
    let outputs = sig.out_pk.len();
    if inputs == 0 {
        return Err(RctStatus::Malformed("mix ring"));
    }
    if sig.pseudo_outs.len() != inputs {
        return Err(RctStatus::Malformed("pseudo outputs"));
    }
    if sig.mgs.len() != inputs {
        return Err(RctStatus::Malformed("ring signatures"));
    }
    let ring_size = sig.mix_ring[0].len();
    if sig.mix_ring.iter().any(|ring| ring.len() != ring_size) {
        return Err(RctStatus::Malformed("ring size"));
    }
    if outputs == 0 {
        return Err(RctStatus::Malformed("outputs"));
    }
    if sig.ecdh_info.len() != outputs {
        return Err(RctStatus::Malformed("ecdh info"));
    }
    if sig.bulletproofs.is_empty() || sig.proven_outputs() != outputs {
        return Err(RctStatus::Malformed("range proofs"));
    }
    Ok(())
}

fn check_points(sig: &RctSig) -> Result<(), DecodeError> {
    for out in &sig.out_pk {
        decode_point(&out.dest)?;
        decode_point(&out.mask)?;
    }
    for c in &sig.pseudo_outs {
        decode_point(c)?;
    }
    for member in sig.mix_ring.iter().flatten() {
        decode_point(&member.dest)?;
        decode_point(&member.mask)?;
    }
    Ok(())
}

fn non_semantics(sig: &RctSig) -> Result<(), RctStatus> {
    if !sig.rct_type.is_simple_bulletproof() {
        return Err(RctStatus::UnsupportedType(sig.rct_type));
    }
    check_shape(sig)?;
    if let Err(e) = check_points(sig) {
        debug!("rct point check failed: {}", e);
        return Err(RctStatus::InvalidPoint);
    }

    let proofs: Vec<_> = sig.bulletproofs.iter().collect();
    if !bulletproof_verify(&proofs) {
        return Err(RctStatus::RangeProof);
    }
    let commitments = sig.bulletproofs.iter().flat_map(|bp| &bp.v);
    for (i, (v, out)) in commitments.zip(&sig.out_pk).enumerate() {
        let bound = decode_point(v)
            .map(|p| point_key(&p.mul_by_cofactor()) == out.mask)
            .unwrap_or(false);
        if !bound {
            debug!("range proof commitment {} is not bound to its output", i);
            return Err(RctStatus::CommitmentMismatch(i));
        }
    }

    let message = pre_mlsag_hash(sig).map_err(|e| {
        debug!("pre-mlsag hash: {}", e);
        RctStatus::Malformed("message")
    })?;
    for (i, ((mg, ring), pseudo_out)) in
        sig.mgs.iter().zip(&sig.mix_ring).zip(&sig.pseudo_outs).enumerate()
    {
        if !ver_rct_mg_simple(&message, mg, ring, pseudo_out) {
            debug!("mlsag of input {} failed", i);
            return Err(RctStatus::RingSignature(i));
        }
    }
    Ok(())
}

fn sum_points<'a>(mut keys: impl Iterator<Item = &'a Key>) -> Result<EdwardsPoint, DecodeError> {
    keys.try_fold(EdwardsPoint::identity(), |acc, k| Ok(acc + decode_point(k)?))
}

fn semantics(sig: &RctSig) -> Result<(), RctStatus> {
    let inputs = sum_points(sig.pseudo_outs.iter());
    let outputs = sum_points(sig.out_pk.iter().map(|out| &out.mask));
    let (inputs, outputs) = match (inputs, outputs) {
        (Ok(i), Ok(o)) => (i, o),
        (Err(e), _) | (_, Err(e)) => {
            debug!("balance check: {}", e);
            return Err(RctStatus::InvalidPoint);
        }
    };
    if inputs != outputs + Scalar::from(sig.txn_fee) * h() {
        debug!("pseudo outputs do not balance outputs plus fee {}", sig.txn_fee);
        return Err(RctStatus::Unbalanced);
    }
    Ok(())
}

/// Everything except the balance: shapes, point validity, range proofs and
/// their binding to the outputs, and every input's ring signature.
pub fn ver_rct_non_semantics_simple(sig: &RctSig) -> bool {
    non_semantics(sig).is_ok()
}

/// `sum(pseudo_outs) == sum(out_pk.mask) + fee * H`
pub fn ver_rct_semantics_simple(sig: &RctSig) -> bool {
    semantics(sig).is_ok()
}

pub fn ver_rct_simple(sig: &RctSig) -> bool {
    ver_rct_non_semantics_simple(sig) && ver_rct_semantics_simple(sig)
}

/// Full verification reporting the first failing stage.
pub fn verify_with_reason(sig: &RctSig) -> RctStatus {
    match non_semantics(sig).and_then(|()| semantics(sig)) {
        Ok(()) => RctStatus::Valid,
        Err(status) => status,
    }
}

// ─── Signing ────────────────────────────────────────────────────────────────

/// Build a simple RingCT signature.
///
/// `in_sk[i]` is the spend secret and commitment mask of the real member
/// `mix_ring[i][indices[i]]`, which commits to `in_amounts[i]`. Output `j`
/// goes to `destinations[j]` with its amount encrypted under
/// `amount_keys[j]`. Returns the signature and the output masks.
#[allow(clippy::too_many_arguments)]
pub fn gen_rct_simple<R: RngCore + CryptoRng>(
    message: &Key,
    in_sk: &[Ctkey],
    in_amounts: &[u64],
    destinations: &[Key],
    out_amounts: &[u64],
    amount_keys: &[Key],
    fee: u64,
    mix_ring: &CtkeyM,
    indices: &[usize],
    rct_type: RctType,
    rng: &mut R,
) -> Result<(RctSig, Vec<Scalar>), RctError> {
    if !rct_type.is_simple_bulletproof() {
        return Err(DomainError::UnsupportedType(rct_type).into());
    }
    let inputs = in_sk.len();
    if inputs == 0 {
        return Err(DomainError::EmptyMixRing.into());
    }
    for (what, got) in [("input amounts", in_amounts.len()), ("mix ring", mix_ring.len()), ("indices", indices.len())] {
        if got != inputs {
            return Err(DomainError::LengthMismatch { what, expected: inputs, got }.into());
        }
    }
    for (what, got) in [("destinations", destinations.len()), ("amount keys", amount_keys.len())] {
        if got != out_amounts.len() {
            return Err(DomainError::LengthMismatch { what, expected: out_amounts.len(), got }.into());
        }
    }
    let total_in: u128 = in_amounts.iter().map(|&a| a as u128).sum();
    let total_out: u128 = out_amounts.iter().map(|&a| a as u128).sum::<u128>() + fee as u128;
    if total_in != total_out {
        return Err(DomainError::Unbalanced { inputs: total_in, outputs: total_out }.into());
    }

    let (proof, _, out_masks) = prove_range(out_amounts, amount_keys, rng)?;

    let out_pk = destinations
        .iter()
        .zip(out_amounts.iter().zip(&out_masks))
        .map(|(dest, (&amount, mask))| Ctkey { dest: *dest, mask: point_key(&commit(amount, mask)) })
        .collect();
    let ecdh_info = out_amounts
        .iter()
        .zip(&out_masks)
        .zip(amount_keys)
        .map(|((&amount, mask), key)| {
            let tuple = EcdhTuple { mask: scalar_key(mask), amount: Key::from_u64(amount) };
            ecdh_encode(&tuple, key, rct_type.compact_ecdh())
        })
        .collect();

    // pseudo-output masks sum to the output masks so the blinding cancels
    let mut pseudo_masks: Vec<Scalar> = (1..inputs).map(|_| random_scalar(rng)).collect();
    let last = out_masks.iter().sum::<Scalar>() - pseudo_masks.iter().sum::<Scalar>();
    pseudo_masks.push(last);
    let pseudo_outs = in_amounts
        .iter()
        .zip(&pseudo_masks)
        .map(|(&amount, a)| point_key(&commit(amount, a)))
        .collect();

    let mut sig = RctSig {
        rct_type,
        txn_fee: fee,
        message: *message,
        mix_ring: mix_ring.clone(),
        ecdh_info,
        out_pk,
        pseudo_outs,
        bulletproofs: vec![proof],
        mgs: Vec::with_capacity(inputs),
    };

    let prehash = pre_mlsag_hash(&sig)?;
    for i in 0..inputs {
        let mg = prove_rct_mg_simple(
            &prehash,
            &sig.mix_ring[i],
            &in_sk[i],
            &pseudo_masks[i],
            &sig.pseudo_outs[i],
            indices[i],
            rng,
        )?;
        sig.mgs.push(mg);
    }
    debug!("signed rct with {} inputs and {} outputs", inputs, out_amounts.len());
    Ok((sig, out_masks))
}
