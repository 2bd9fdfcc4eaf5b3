//! Error taxonomy shared by the codec and the crypto engine.
//!
//! Verification failures are never errors: verifiers answer `bool`.
//! These types cover malformed input ([`DecodeError`]) and caller
//! contract violations on the proving side ([`DomainError`]).

use thiserror::Error;

use crate::key::Key;
use crate::rct::RctType;

/// Input bytes or text could not be turned into a well-formed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    #[error("unexpected end of data at offset {offset} (need {need} bytes, have {have})")]
    Truncated { offset: usize, need: usize, have: usize },

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("varint incomplete or too long at offset {0}")]
    Varint(usize),

    #[error("length {len} exceeds limit {max}")]
    Oversize { len: u64, max: usize },

    #[error("ragged matrix: row {row} has {got} columns, expected {expected}")]
    Ragged { row: usize, expected: usize, got: usize },

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("{0} is not a valid curve point")]
    InvalidPoint(Key),

    #[error("{0} is not in the prime-order subgroup")]
    NotPrimeOrder(Key),

    #[error("{0} is not a canonical scalar")]
    NonCanonicalScalar(Key),

    #[error("unknown rct type {0}")]
    UnknownRctType(u8),
}

/// Arguments that violate the preconditions of a prover or builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("no amounts to prove")]
    EmptyAmounts,

    #[error("too many amounts: {got} (max {max})")]
    TooManyAmounts { got: usize, max: usize },

    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch { what: &'static str, expected: usize, got: usize },

    #[error("index {index} out of bounds for ring of {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("ring of {0} members is too small")]
    RingTooSmall(usize),

    #[error("key matrix has no layers")]
    NoLayers,

    #[error("empty mix ring")]
    EmptyMixRing,

    #[error("unsupported rct type {0:?}")]
    UnsupportedType(RctType),

    #[error("cannot invert zero")]
    ZeroInverse,

    #[error("inputs {inputs} do not cover outputs plus fee {outputs}")]
    Unbalanced { inputs: u128, outputs: u128 },

    #[error("degenerate key: {0}")]
    DegenerateKey(&'static str),
}

/// Umbrella error for callers that mix decoding with proving.
#[derive(Debug, Error)]
pub enum RctError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
}
