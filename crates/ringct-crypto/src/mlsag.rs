//! MLSAG linkable ring signatures over key matrices.
//!
//! The key matrix is indexed `pk[member][layer]`. The first `ds_rows`
//! layers are linkable: the signer publishes one key image per such layer,
//! and the per-member challenge commits to `(pk, L, R)` for those layers and
//! to `(pk, L)` for the rest.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use log::debug;
use rand::{CryptoRng, RngCore};

use ringct_types::{Ctkey, DecodeError, DomainError, Key, KeyM, MgSig, RctError};

use crate::algebra::{
    decode_point, decode_point_prime_order, decode_scalar, hash_to_point, hash_to_scalar,
    multi_scalar_mult, point_key, random_scalar, reduce_scalar, scalar_key,
};

/// Decoded key matrix with the hash points of its linkable layers.
struct Ring {
    points: Vec<Vec<EdwardsPoint>>,
    hashed: Vec<Vec<EdwardsPoint>>,
}

impl Ring {
    fn decode(pk: &KeyM, ds_rows: usize) -> Result<Self, DecodeError> {
        let mut points = Vec::with_capacity(pk.len());
        let mut hashed = Vec::with_capacity(pk.len());
        for member in pk {
            points.push(member.iter().map(decode_point).collect::<Result<Vec<_>, _>>()?);
            hashed.push(member[..ds_rows].iter().map(|k| hash_to_point(&k.0)).collect());
        }
        Ok(Ring { points, hashed })
    }
}

/// Challenge over one member's layer commitments.
fn challenge(message: &Key, pk: &[Key], l: &[Key], r: &[Key]) -> Scalar {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(1 + 3 * pk.len());
    parts.push(&message.0);
    for (j, key) in pk.iter().enumerate() {
        parts.push(&key.0);
        parts.push(&l[j].0);
        if let Some(rj) = r.get(j) {
            parts.push(&rj.0);
        }
    }
    hash_to_scalar(&parts)
}

/// Member commitments `L_j = s_j G + c P_j`, `R_j = s_j Hp(P_j) + c I_j`.
fn member_commitments(
    ring: &Ring,
    member: usize,
    ss: &[Scalar],
    c: &Scalar,
    images: &[EdwardsPoint],
) -> (Vec<Key>, Vec<Key>) {
    let l = ring.points[member]
        .iter()
        .zip(ss)
        .map(|(p, s)| point_key(&EdwardsPoint::vartime_double_scalar_mul_basepoint(c, p, s)))
        .collect();
    let r = ring.hashed[member]
        .iter()
        .zip(ss)
        .zip(images)
        .map(|((hp, s), ii)| point_key(&multi_scalar_mult(&[*s, *c], &[*hp, *ii])))
        .collect();
    (l, r)
}

/// Sign `message` with the secrets of member `index`.
pub fn mlsag_gen<R: RngCore + CryptoRng>(
    message: &Key,
    pk: &KeyM,
    secrets: &[Scalar],
    index: usize,
    ds_rows: usize,
    rng: &mut R,
) -> Result<MgSig, RctError> {
    let cols = pk.len();
    if cols < 2 {
        return Err(DomainError::RingTooSmall(cols).into());
    }
    if index >= cols {
        return Err(DomainError::IndexOutOfBounds { index, size: cols }.into());
    }
    let rows = pk[0].len();
    if rows == 0 {
        return Err(DomainError::NoLayers.into());
    }
    if let Some(member) = pk.iter().find(|m| m.len() != rows) {
        return Err(DomainError::LengthMismatch { what: "key matrix row", expected: rows, got: member.len() }.into());
    }
    if secrets.len() != rows {
        return Err(DomainError::LengthMismatch { what: "secrets", expected: rows, got: secrets.len() }.into());
    }
    if ds_rows > rows {
        return Err(DomainError::LengthMismatch { what: "linkable layers", expected: rows, got: ds_rows }.into());
    }

    let ring = Ring::decode(pk, ds_rows)?;
    let images: Vec<EdwardsPoint> =
        ring.hashed[index].iter().zip(secrets).map(|(hp, x)| x * hp).collect();

    let alpha: Vec<Scalar> = (0..rows).map(|_| random_scalar(rng)).collect();
    let a_g: Vec<Key> = alpha.iter().map(|a| point_key(&EdwardsPoint::mul_base(a))).collect();
    let a_hp: Vec<Key> = ring.hashed[index]
        .iter()
        .zip(&alpha)
        .map(|(hp, a)| point_key(&(a * hp)))
        .collect();

    let mut ss: Vec<Vec<Scalar>> = vec![Vec::new(); cols];
    let mut c = challenge(message, &pk[index], &a_g, &a_hp);
    let mut cc = Scalar::ZERO;

    let mut i = (index + 1) % cols;
    if i == 0 {
        cc = c;
    }
    while i != index {
        ss[i] = (0..rows).map(|_| random_scalar(rng)).collect();
        let (l, r) = member_commitments(&ring, i, &ss[i], &c, &images);
        c = challenge(message, &pk[i], &l, &r);
        i = (i + 1) % cols;
        if i == 0 {
            cc = c;
        }
    }
    ss[index] = alpha.iter().zip(secrets).map(|(a, x)| a - c * x).collect();

    Ok(MgSig {
        ss: ss.iter().map(|row| row.iter().map(scalar_key).collect()).collect(),
        cc: scalar_key(&cc),
        ii: images.iter().map(point_key).collect(),
    })
}

/// Check an MLSAG over `pk`; malformed input verifies false.
pub fn mlsag_verify(message: &Key, pk: &KeyM, sig: &MgSig, ds_rows: usize) -> bool {
    let cols = pk.len();
    if cols < 2 {
        debug!("mlsag ring of {} members", cols);
        return false;
    }
    let rows = pk[0].len();
    if rows == 0
        || ds_rows > rows
        || pk.iter().any(|m| m.len() != rows)
        || sig.ss.len() != cols
        || sig.ss.iter().any(|m| m.len() != rows)
        || sig.ii.len() != ds_rows
    {
        debug!("mlsag shape mismatch");
        return false;
    }

    let ss: Vec<Vec<Scalar>> = match sig
        .ss
        .iter()
        .map(|row| row.iter().map(decode_scalar).collect::<Result<Vec<_>, _>>())
        .collect()
    {
        Ok(ss) => ss,
        Err(e) => {
            debug!("mlsag response: {}", e);
            return false;
        }
    };
    let cc = match decode_scalar(&sig.cc) {
        Ok(c) => c,
        Err(e) => {
            debug!("mlsag challenge: {}", e);
            return false;
        }
    };
    let images: Vec<EdwardsPoint> = match sig.ii.iter().map(decode_point_prime_order).collect() {
        Ok(ii) => ii,
        Err(e) => {
            debug!("mlsag key image: {}", e);
            return false;
        }
    };
    let ring = match Ring::decode(pk, ds_rows) {
        Ok(r) => r,
        Err(e) => {
            debug!("mlsag ring key: {}", e);
            return false;
        }
    };

    let mut c = cc;
    for (i, member_ss) in ss.iter().enumerate() {
        let (l, r) = member_commitments(&ring, i, member_ss, &c, &images);
        c = challenge(message, &pk[i], &l, &r);
        if c == Scalar::ZERO {
            debug!("mlsag zero challenge at member {}", i);
            return false;
        }
    }
    c == cc
}

/// Key matrix of a simple RingCT input: `[dest_i, C_i - C_out]` per member.
fn simple_ring(ring: &[Ctkey], c_out: &Key) -> Result<KeyM, DecodeError> {
    let out = decode_point(c_out)?;
    ring.iter()
        .map(|m| Ok(vec![m.dest, point_key(&(decode_point(&m.mask)? - out))]))
        .collect()
}

/// Sign one simple-RingCT input.
///
/// `in_sk` holds the real member's spend secret and commitment mask, `a` the
/// mask of the pseudo-output `c_out`. The second layer's secret is
/// `in_sk.mask - a`, the discrete log of `C_index - C_out`.
pub fn prove_rct_mg_simple<R: RngCore + CryptoRng>(
    message: &Key,
    ring: &[Ctkey],
    in_sk: &Ctkey,
    a: &Scalar,
    c_out: &Key,
    index: usize,
    rng: &mut R,
) -> Result<MgSig, RctError> {
    let pk = simple_ring(ring, c_out)?;
    let secrets = [reduce_scalar(&in_sk.dest), reduce_scalar(&in_sk.mask) - a];
    mlsag_gen(message, &pk, &secrets, index, 1, rng)
}

/// Verify one simple-RingCT input signature against its pseudo-output.
pub fn ver_rct_mg_simple(message: &Key, mg: &MgSig, ring: &[Ctkey], c_out: &Key) -> bool {
    match simple_ring(ring, c_out) {
        Ok(pk) => mlsag_verify(message, &pk, mg, 1),
        Err(e) => {
            debug!("mlsag simple ring: {}", e);
            false
        }
    }
}
