//! Fixed-width binary encoding of the signature data model.
//!
//! Keys are raw 32-byte strings; every vector carries a varint length
//! prefix. Matrices are validated for uniform row length on decode, so
//! downstream code never sees a ragged `KeyM` or `CtkeyM`.

use crate::error::DecodeError;
use crate::key::{Key, KeyM, KeyV};
use crate::rct::{Bulletproof, Ctkey, CtkeyM, CtkeyV, EcdhTuple, MgSig, RctSig, RctType};
use crate::varint::{decode_varint, write_varint};

/// Read cursor over an input buffer.
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                need: count,
                have: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, read) = decode_varint(self.data, self.offset)?;
        self.offset += read;
        Ok(value)
    }

    /// Read a length prefix for a sequence of items at least `min_item_size`
    /// bytes wide, refusing counts the remaining input cannot hold.
    pub fn read_len(&mut self, min_item_size: usize) -> Result<usize, DecodeError> {
        let len = self.read_varint()?;
        let max = self.remaining() / min_item_size.max(1);
        if len > max as u64 {
            return Err(DecodeError::Oversize { len, max });
        }
        Ok(len as usize)
    }

    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Binary serialization into a growable buffer.
pub trait Encode {
    fn encode_to(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

/// Binary deserialization from a cursor.
pub trait Decode: Sized {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError>;

    /// Decode a complete buffer, rejecting trailing bytes.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(data);
        let value = Self::decode_from(&mut cur)?;
        cur.finish()?;
        Ok(value)
    }
}

fn encode_seq<T: Encode>(items: &[T], out: &mut Vec<u8>) {
    write_varint(out, items.len() as u64);
    for item in items {
        item.encode_to(out);
    }
}

fn decode_seq<T: Decode>(cur: &mut Cursor<'_>, min_item_size: usize) -> Result<Vec<T>, DecodeError> {
    let len = cur.read_len(min_item_size)?;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(T::decode_from(cur)?);
    }
    Ok(items)
}

/// Rows must all match the first row's width.
pub fn check_uniform<T>(rows: &[Vec<T>]) -> Result<(), DecodeError> {
    if let Some(first) = rows.first() {
        let expected = first.len();
        for (row, r) in rows.iter().enumerate() {
            if r.len() != expected {
                return Err(DecodeError::Ragged { row, expected, got: r.len() });
            }
        }
    }
    Ok(())
}

impl Encode for Key {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl Decode for Key {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Key::from_slice(cur.read_bytes(32)?)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_seq(self, out);
    }
}

impl Decode for KeyV {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        decode_seq(cur, 32)
    }
}

impl Decode for KeyM {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let rows: KeyM = decode_seq(cur, 1)?;
        check_uniform(&rows)?;
        Ok(rows)
    }
}

impl Encode for Ctkey {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.dest.encode_to(out);
        self.mask.encode_to(out);
    }
}

impl Decode for Ctkey {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(Ctkey { dest: Key::decode_from(cur)?, mask: Key::decode_from(cur)? })
    }
}

impl Decode for CtkeyV {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        decode_seq(cur, 64)
    }
}

impl Decode for CtkeyM {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let rows: CtkeyM = decode_seq(cur, 1)?;
        check_uniform(&rows)?;
        Ok(rows)
    }
}

impl Encode for EcdhTuple {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.mask.encode_to(out);
        self.amount.encode_to(out);
    }
}

impl Decode for EcdhTuple {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(EcdhTuple { mask: Key::decode_from(cur)?, amount: Key::decode_from(cur)? })
    }
}

impl Decode for Vec<EcdhTuple> {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        decode_seq(cur, 64)
    }
}

impl Encode for Bulletproof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.v.encode_to(out);
        for k in [&self.a, &self.s, &self.t1, &self.t2, &self.taux, &self.mu] {
            k.encode_to(out);
        }
        self.l.encode_to(out);
        self.r.encode_to(out);
        for k in [&self.aa, &self.b, &self.t] {
            k.encode_to(out);
        }
    }
}

impl Decode for Bulletproof {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(Bulletproof {
            v: KeyV::decode_from(cur)?,
            a: Key::decode_from(cur)?,
            s: Key::decode_from(cur)?,
            t1: Key::decode_from(cur)?,
            t2: Key::decode_from(cur)?,
            taux: Key::decode_from(cur)?,
            mu: Key::decode_from(cur)?,
            l: KeyV::decode_from(cur)?,
            r: KeyV::decode_from(cur)?,
            aa: Key::decode_from(cur)?,
            b: Key::decode_from(cur)?,
            t: Key::decode_from(cur)?,
        })
    }
}

impl Decode for Vec<Bulletproof> {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        // 9 fixed keys plus three length prefixes
        decode_seq(cur, 9 * 32 + 3)
    }
}

impl Encode for MgSig {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.ss.encode_to(out);
        self.cc.encode_to(out);
        self.ii.encode_to(out);
    }
}

impl Decode for MgSig {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(MgSig {
            ss: KeyM::decode_from(cur)?,
            cc: Key::decode_from(cur)?,
            ii: KeyV::decode_from(cur)?,
        })
    }
}

impl Decode for Vec<MgSig> {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        decode_seq(cur, 32 + 2)
    }
}

impl Encode for RctSig {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.rct_type.into());
        write_varint(out, self.txn_fee);
        self.message.encode_to(out);
        self.mix_ring.encode_to(out);
        self.ecdh_info.encode_to(out);
        self.out_pk.encode_to(out);
        self.pseudo_outs.encode_to(out);
        self.bulletproofs.encode_to(out);
        self.mgs.encode_to(out);
    }
}

impl Decode for RctSig {
    fn decode_from(cur: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let rct_type = RctType::try_from(cur.read_byte()?)?;
        Ok(RctSig {
            rct_type,
            txn_fee: cur.read_varint()?,
            message: Key::decode_from(cur)?,
            mix_ring: CtkeyM::decode_from(cur)?,
            ecdh_info: Vec::<EcdhTuple>::decode_from(cur)?,
            out_pk: CtkeyV::decode_from(cur)?,
            pseudo_outs: KeyV::decode_from(cur)?,
            bulletproofs: Vec::<Bulletproof>::decode_from(cur)?,
            mgs: Vec::<MgSig>::decode_from(cur)?,
        })
    }
}
