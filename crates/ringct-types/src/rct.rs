//! RingCT signature data model.
//!
//! All values are plain data: built once by a prover, read by verifiers.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::key::{Key, KeyM, KeyV};

/// RingCT signature type tag, CryptoNote numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum RctType {
    Null = 0,
    Full = 1,
    Simple = 2,
    Bulletproof = 3,
    Bulletproof2 = 4,
}

impl RctType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Null),
            1 => Some(Self::Full),
            2 => Some(Self::Simple),
            3 => Some(Self::Bulletproof),
            4 => Some(Self::Bulletproof2),
            _ => None,
        }
    }

    /// Whether the simple (per-input pseudo-output) pipeline handles this type.
    pub fn is_simple_bulletproof(self) -> bool {
        matches!(self, Self::Bulletproof | Self::Bulletproof2)
    }

    /// Bulletproof2 truncates the ECDH amount to 8 bytes and drops the mask.
    pub fn compact_ecdh(self) -> bool {
        self == Self::Bulletproof2
    }
}

impl TryFrom<u8> for RctType {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::from_u8(v).ok_or(DecodeError::UnknownRctType(v))
    }
}

impl From<RctType> for u8 {
    fn from(t: RctType) -> u8 {
        t as u8
    }
}

/// Output or ring member: one-time public key plus amount commitment.
/// As a secret, `dest` is the spend secret and `mask` the blinding factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ctkey {
    pub dest: Key,
    pub mask: Key,
}

pub type CtkeyV = Vec<Ctkey>;
/// `mix_ring[input][member]`
pub type CtkeyM = Vec<CtkeyV>;

/// Encrypted blinding factor and amount for one output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdhTuple {
    pub mask: Key,
    pub amount: Key,
}

/// Aggregated Bulletproof range proof over `v.len()` commitments.
///
/// Points are stored premultiplied by `8^-1`. `l` and `r` hold
/// `log2(64 * M)` entries, `M` being `v.len()` rounded up to a power of two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bulletproof {
    pub v: KeyV,
    pub a: Key,
    pub s: Key,
    pub t1: Key,
    pub t2: Key,
    pub taux: Key,
    pub mu: Key,
    pub l: KeyV,
    pub r: KeyV,
    pub aa: Key,
    pub b: Key,
    pub t: Key,
}

/// MLSAG ring signature. `ss[member][layer]`; one key image per linkable layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgSig {
    pub ss: KeyM,
    pub cc: Key,
    pub ii: KeyV,
}

/// Composite RingCT signature of a simple (per-input) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RctSig {
    #[serde(rename = "type")]
    pub rct_type: RctType,
    pub txn_fee: u64,
    pub message: Key,
    pub mix_ring: CtkeyM,
    pub ecdh_info: Vec<EcdhTuple>,
    pub out_pk: CtkeyV,
    pub pseudo_outs: KeyV,
    pub bulletproofs: Vec<Bulletproof>,
    pub mgs: Vec<MgSig>,
}

impl RctSig {
    /// Number of commitments covered by all range proofs.
    pub fn proven_outputs(&self) -> usize {
        self.bulletproofs.iter().map(|bp| bp.v.len()).sum()
    }
}
