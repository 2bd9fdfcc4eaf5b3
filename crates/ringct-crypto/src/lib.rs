//! RingCT cryptographic engine.
//!
//! Pedersen commitments with ECDH-encrypted amounts, CryptoNote key
//! derivation and key images, aggregated Bulletproof range proofs, MLSAG
//! ring signatures, and the simple-RingCT verification pipeline that ties
//! them together.
//!
//! Hashing is Keccak-256 with the original (pre-SHA3) padding throughout.

use tiny_keccak::{Hasher, Keccak};

mod elligator;

pub mod algebra;
pub mod bulletproof;
pub mod commitment;
pub mod derivation;
pub mod mlsag;
pub mod rct;

pub use ringct_types as types;

pub use algebra::{hash_to_point, hash_to_scalar, H_BYTES};
pub use bulletproof::{bulletproof_prove, bulletproof_verify, prove_range};
pub use commitment::{commit, ecdh_decode, ecdh_encode, gen_commitment_mask, zero_commit};
pub use derivation::{
    derivation_to_scalar, derive_public_key, derive_secret_key, generate_key_derivation,
    generate_key_image,
};
pub use mlsag::{mlsag_gen, mlsag_verify, prove_rct_mg_simple, ver_rct_mg_simple};
pub use rct::{
    gen_rct_simple, pre_mlsag_hash, ver_rct_non_semantics_simple, ver_rct_semantics_simple,
    ver_rct_simple, verify_with_reason, RctStatus,
};

/// Keccak-256 (CryptoNote `cn_fast_hash`, 0x01 padding, not SHA3).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

/// Keccak-256 over the concatenation of `parts`.
pub fn keccak256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    for p in parts {
        keccak.update(p);
    }
    keccak.finalize(&mut output);
    output
}
