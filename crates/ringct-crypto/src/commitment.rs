//! Pedersen commitments and the ECDH amount codec.
//!
//! Two ECDH schemes exist. The compact one (Bulletproof2 signatures) puts
//! only an 8-byte XOR-masked amount on the wire and rederives the mask from
//! the shared secret. The full one adds hash-derived scalars to both the
//! mask and the amount.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use ringct_types::{EcdhTuple, Key};

use crate::algebra::{g, h, hash_to_scalar, point_key, reduce_scalar, scalar_key};
use crate::keccak256_parts;

/// `mask * G + amount * H`
pub fn commit(amount: u64, mask: &Scalar) -> EdwardsPoint {
    EdwardsPoint::mul_base(mask) + Scalar::from(amount) * h()
}

/// Commitment with the conventional mask of one: `G + amount * H`.
/// Used for cleartext amounts such as the fee and miner outputs.
pub fn zero_commit(amount: u64) -> Key {
    point_key(&(g() + Scalar::from(amount) * h()))
}

/// Blinding factor shared between sender and receiver of an output.
pub fn gen_commitment_mask(shared_secret: &Key) -> Scalar {
    hash_to_scalar(&[b"commitment_mask", &shared_secret.0])
}

fn amount_encoding_factor(shared_secret: &Key) -> [u8; 32] {
    keccak256_parts(&[b"amount", &shared_secret.0])
}

/// Low 8 bytes of an amount key as a `u64`.
pub fn key_to_amount(k: &Key) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&k.0[..8]);
    u64::from_le_bytes(b)
}

/// Encrypt a `(mask, amount)` tuple for the receiver.
///
/// `compact` selects the 8-byte scheme: the mask is zeroed and the amount's
/// low 8 bytes are XORed with `keccak("amount" || s)`.
pub fn ecdh_encode(tuple: &EcdhTuple, shared_secret: &Key, compact: bool) -> EcdhTuple {
    if compact {
        let factor = amount_encoding_factor(shared_secret);
        let mut amount = Key::ZERO;
        for i in 0..8 {
            amount.0[i] = tuple.amount.0[i] ^ factor[i];
        }
        EcdhTuple { mask: Key::ZERO, amount }
    } else {
        let s1 = hash_to_scalar(&[&shared_secret.0]);
        let s2 = hash_to_scalar(&[s1.as_bytes()]);
        EcdhTuple {
            mask: scalar_key(&(reduce_scalar(&tuple.mask) + s1)),
            amount: scalar_key(&(reduce_scalar(&tuple.amount) + s2)),
        }
    }
}

/// Inverse of [`ecdh_encode`]. In compact mode the mask is rederived.
pub fn ecdh_decode(tuple: &EcdhTuple, shared_secret: &Key, compact: bool) -> EcdhTuple {
    if compact {
        let factor = amount_encoding_factor(shared_secret);
        let mut amount = Key::ZERO;
        for i in 0..8 {
            amount.0[i] = tuple.amount.0[i] ^ factor[i];
        }
        EcdhTuple {
            mask: scalar_key(&gen_commitment_mask(shared_secret)),
            amount,
        }
    } else {
        let s1 = hash_to_scalar(&[&shared_secret.0]);
        let s2 = hash_to_scalar(&[s1.as_bytes()]);
        EcdhTuple {
            mask: scalar_key(&(reduce_scalar(&tuple.mask) - s1)),
            amount: scalar_key(&(reduce_scalar(&tuple.amount) - s2)),
        }
    }
}

/// XOR a 32-byte memo with `keccak(s)`. Self-inverse.
pub fn mask_remark(remark: &[u8; 32], shared_secret: &Key) -> [u8; 32] {
    let pad = keccak256_parts(&[&shared_secret.0]);
    let mut out = *remark;
    for (b, p) in out.iter_mut().zip(pad) {
        *b ^= p;
    }
    out
}
