//! The 32-byte key type and its vector/matrix aliases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeError;

/// 32 bytes holding either a reduced scalar or a compressed Edwards point.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub [u8; 32]);

pub type KeyV = Vec<Key>;
pub type KeyM = Vec<KeyV>;

impl Key {
    /// All-zero bytes: the zero scalar.
    pub const ZERO: Key = Key([0u8; 32]);

    /// `01 00 .. 00`: the scalar one, and the compressed identity point.
    pub const IDENTITY: Key = {
        let mut b = [0u8; 32];
        b[0] = 1;
        Key(b)
    };

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| DecodeError::Length {
            expected: 32,
            got: bytes.len(),
        })?;
        Ok(Key(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| DecodeError::Hex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// A key holding a little-endian `u64` in its first 8 bytes.
    pub fn from_u64(v: u64) -> Self {
        let mut b = [0u8; 32];
        b[..8].copy_from_slice(&v.to_le_bytes());
        Key(b)
    }
}

impl From<[u8; 32]> for Key {
    fn from(b: [u8; 32]) -> Self {
        Key(b)
    }
}

impl From<Key> for [u8; 32] {
    fn from(k: Key) -> Self {
        k.0
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.to_hex())
    }
}

impl FromStr for Key {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Key::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_with_prefix() {
        let hex = "8b655970153799af2aeadc9ff1add0ea6c7251d54154cfa92c173a0dd39c1f94";
        let k: Key = hex.parse().unwrap();
        assert_eq!(k.to_string(), hex);
        let k2 = Key::from_hex(&format!("0x{hex}")).unwrap();
        assert_eq!(k, k2);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            Key::from_hex("abcd"),
            Err(DecodeError::Length { expected: 32, got: 2 })
        );
        assert!(matches!(Key::from_hex("zz"), Err(DecodeError::Hex(_))));
    }

    #[test]
    fn test_identity_and_u64() {
        assert_eq!(Key::IDENTITY, Key::from_u64(1));
        assert!(Key::ZERO.is_zero());
        assert!(!Key::IDENTITY.is_zero());
        assert_eq!(&Key::from_u64(0x0102).0[..3], &[2, 1, 0]);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let k = Key::from_u64(7);
        let json = serde_json::to_string(&k).unwrap();
        assert_eq!(json, format!("\"{}\"", k.to_hex()));
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, k);
    }
}
