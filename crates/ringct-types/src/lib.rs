//! Core types for the RingCT engine.
//!
//! This crate holds the data model shared by provers and verifiers: the
//! 32-byte [`Key`], commitments and ECDH tuples, Bulletproof and MLSAG
//! signature shapes, the composite [`RctSig`], the error taxonomy, and the
//! fixed-width binary codec.

pub mod codec;
pub mod error;
pub mod key;
pub mod rct;
pub mod varint;

pub use codec::{Decode, Encode};
pub use error::{DecodeError, DomainError, RctError};
pub use key::{Key, KeyM, KeyV};
pub use rct::{Bulletproof, Ctkey, CtkeyM, CtkeyV, EcdhTuple, MgSig, RctSig, RctType};
