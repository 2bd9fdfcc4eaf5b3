//! CryptoNote hash-to-curve map (`ge_fromfe_frombytes_vartime`).
//!
//! curve25519-dalek keeps its field arithmetic private, so this module
//! carries a small radix-2^51 field over p = 2^255 - 19. Everything here is
//! variable time; it only ever sees public hash output.
//!
//! The map takes all 256 input bits (bit 255 included) as the field element
//! and does NOT clear the cofactor; callers multiply by 8.

use std::ops::{Add, Mul, Neg, Sub};

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};

const MASK51: u64 = (1 << 51) - 1;

/// Montgomery curve coefficient A of Curve25519.
const MONT_A: u64 = 486662;

const SQRT_M1: [u8; 32] = hex32("b0a00e4a271beec478e42fad0618432fa7d7fb3d99004d2b0bdfc14f8024832b");
// sqrt(-2A(A+2))
const FFFB1: [u8; 32] = hex32("ffbde3cd8a9658dd728cd54657fb6b2e1ce604bec83a56dfe8e4292510048e01");
// sqrt(2A(A+2))
const FFFB2: [u8; 32] = hex32("0d65839f7c9b212d2008a9fbb9fc21ae41a0e93f48ae2b6e09d3a5fbf5e1f932");
// sqrt(-sqrt(-1)A(A+2))
const FFFB3: [u8; 32] = hex32("662c3017877d1b58294296a54eff2440eda20d3f404695b8ef08c2140d114a67");
// sqrt(sqrt(-1)A(A+2))
const FFFB4: [u8; 32] = hex32("676e4c49fce6c27ab6b5c05ef703b911d1bc0881770b3fd9062498effc0cbc65");

/// p - 2
const EXP_INVERT: [u8; 32] = hex32("ebffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff7f");
/// (p - 5) / 8
const EXP_P58: [u8; 32] = hex32("fdffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff0f");

const fn hex32(s: &str) -> [u8; 32] {
    const fn nibble(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => panic!("bad hex digit"),
        }
    }
    let s = s.as_bytes();
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        out[i] = (nibble(s[2 * i]) << 4) | nibble(s[2 * i + 1]);
        i += 1;
    }
    out
}

/// Field element mod 2^255 - 19, five 51-bit limbs (loosely reduced).
#[derive(Clone, Copy, Debug)]
struct Fe([u64; 5]);

impl Fe {
    const ZERO: Fe = Fe([0; 5]);
    const ONE: Fe = Fe([1, 0, 0, 0, 0]);

    fn from_u64(v: u64) -> Fe {
        Fe::carry([v & MASK51, v >> 51, 0, 0, 0])
    }

    /// Load all 256 bits; the top limb may hold 52 bits until the next op.
    fn from_bytes(b: &[u8; 32]) -> Fe {
        let load = |i: usize| {
            let mut w = [0u8; 8];
            w.copy_from_slice(&b[i..i + 8]);
            u64::from_le_bytes(w)
        };
        Fe([
            load(0) & MASK51,
            (load(6) >> 3) & MASK51,
            (load(12) >> 6) & MASK51,
            (load(19) >> 1) & MASK51,
            load(24) >> 12,
        ])
    }

    fn carry(mut l: [u64; 5]) -> Fe {
        for i in 0..4 {
            l[i + 1] += l[i] >> 51;
            l[i] &= MASK51;
        }
        let top = l[4] >> 51;
        l[4] &= MASK51;
        l[0] += top * 19;
        l[1] += l[0] >> 51;
        l[0] &= MASK51;
        Fe(l)
    }

    /// Canonical little-endian encoding, fully reduced below p.
    fn to_bytes(self) -> [u8; 32] {
        let mut l = Fe::carry(self.0).0;
        // q = 1 iff l >= p
        let mut q = (l[0] + 19) >> 51;
        for limb in &l[1..] {
            q = (limb + q) >> 51;
        }
        l[0] += 19 * q;
        for i in 0..4 {
            l[i + 1] += l[i] >> 51;
            l[i] &= MASK51;
        }
        l[4] &= MASK51;

        let mut out = [0u8; 32];
        let mut acc: u128 = 0;
        let mut bits = 0;
        let mut idx = 0;
        for limb in l {
            acc |= (limb as u128) << bits;
            bits += 51;
            while bits >= 8 {
                out[idx] = acc as u8;
                acc >>= 8;
                bits -= 8;
                idx += 1;
            }
        }
        out[idx] = acc as u8;
        out
    }

    fn is_zero(self) -> bool {
        self.to_bytes() == [0u8; 32]
    }

    fn is_negative(self) -> bool {
        self.to_bytes()[0] & 1 == 1
    }

    fn square(self) -> Fe {
        self * self
    }

    fn pow(self, exp: &[u8; 32]) -> Fe {
        let mut acc = Fe::ONE;
        for byte in exp.iter().rev() {
            for bit in (0..8).rev() {
                acc = acc.square();
                if (byte >> bit) & 1 == 1 {
                    acc = acc * self;
                }
            }
        }
        acc
    }

    fn invert(self) -> Fe {
        self.pow(&EXP_INVERT)
    }
}

impl PartialEq for Fe {
    fn eq(&self, other: &Fe) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Add for Fe {
    type Output = Fe;
    fn add(self, rhs: Fe) -> Fe {
        let mut l = self.0;
        for (x, y) in l.iter_mut().zip(rhs.0) {
            *x += y;
        }
        Fe::carry(l)
    }
}

impl Sub for Fe {
    type Output = Fe;
    fn sub(self, rhs: Fe) -> Fe {
        // add 4p first so no limb underflows
        const FOUR_P: [u64; 5] = [
            4 * ((1 << 51) - 19),
            4 * MASK51,
            4 * MASK51,
            4 * MASK51,
            4 * MASK51,
        ];
        let rhs = Fe::carry(rhs.0).0;
        let mut l = [0u64; 5];
        for i in 0..5 {
            l[i] = self.0[i] + FOUR_P[i] - rhs[i];
        }
        Fe::carry(l)
    }
}

impl Neg for Fe {
    type Output = Fe;
    fn neg(self) -> Fe {
        Fe::ZERO - self
    }
}

impl Mul for Fe {
    type Output = Fe;
    fn mul(self, rhs: Fe) -> Fe {
        let a = Fe::carry(self.0).0;
        let b = Fe::carry(rhs.0).0;
        let m = |x: u64, y: u64| (x as u128) * (y as u128);
        let b1 = b[1] * 19;
        let b2 = b[2] * 19;
        let b3 = b[3] * 19;
        let b4 = b[4] * 19;

        let mut c = [
            m(a[0], b[0]) + m(a[4], b1) + m(a[3], b2) + m(a[2], b3) + m(a[1], b4),
            m(a[1], b[0]) + m(a[0], b[1]) + m(a[4], b2) + m(a[3], b3) + m(a[2], b4),
            m(a[2], b[0]) + m(a[1], b[1]) + m(a[0], b[2]) + m(a[4], b3) + m(a[3], b4),
            m(a[3], b[0]) + m(a[2], b[1]) + m(a[1], b[2]) + m(a[0], b[3]) + m(a[4], b4),
            m(a[4], b[0]) + m(a[3], b[1]) + m(a[2], b[2]) + m(a[1], b[3]) + m(a[0], b[4]),
        ];
        for i in 0..4 {
            c[i + 1] += c[i] >> 51;
            c[i] &= MASK51 as u128;
        }
        let top = c[4] >> 51;
        c[4] &= MASK51 as u128;
        c[0] += top * 19;
        c[1] += c[0] >> 51;
        c[0] &= MASK51 as u128;

        Fe([c[0] as u64, c[1] as u64, c[2] as u64, c[3] as u64, c[4] as u64])
    }
}

/// (u / v)^((p + 3) / 8) computed as u * v^3 * (u * v^7)^((p - 5) / 8).
fn div_pow_m1(u: Fe, v: Fe) -> Fe {
    let v3 = v.square() * v;
    let v7 = v3.square() * v;
    u * v3 * (u * v7).pow(&EXP_P58)
}

/// Map a 32-byte hash to a curve point (not cofactor-cleared).
pub(crate) fn ge_fromfe_frombytes_vartime(hash: &[u8; 32]) -> EdwardsPoint {
    let u = Fe::from_bytes(hash);
    let a = Fe::from_u64(MONT_A);

    let u2 = u.square();
    let v = u2 + u2;
    let w = v + Fe::ONE;
    let two_a2 = a.square() + a.square();
    let mut x = w.square() - two_a2 * u2;
    let mut r = div_pow_m1(w, x);
    let mut y = r.square() * x;
    let mut z = -a;

    let negative = if (w - y).is_zero() {
        r = r * Fe::from_bytes(&FFFB2) * u;
        z = z * v;
        false
    } else if (w + y).is_zero() {
        r = r * Fe::from_bytes(&FFFB1) * u;
        z = z * v;
        false
    } else {
        x = x * Fe::from_bytes(&SQRT_M1);
        y = r.square() * x;
        if (w - y).is_zero() {
            r = r * Fe::from_bytes(&FFFB4);
        } else {
            r = r * Fe::from_bytes(&FFFB3);
        }
        true
    };
    if r.is_negative() != negative {
        r = -r;
    }

    let zz = z + w;
    let yy = z - w;
    let xx = r * zz;
    let zinv = zz.invert();
    let mut compressed = (yy * zinv).to_bytes();
    if (xx * zinv).is_negative() {
        compressed[31] |= 0x80;
    }
    CompressedEdwardsY(compressed)
        .decompress()
        .expect("elligator output lies on the curve")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(v: u64) -> Fe {
        Fe::from_u64(v)
    }

    #[test]
    fn test_field_identities() {
        let x = Fe::from_bytes(&[0x5au8; 32]);
        assert_eq!(x * x.invert(), Fe::ONE);
        assert_eq!(x - x, Fe::ZERO);
        assert_eq!(-(-x), x);
        assert_eq!(fe(7) * fe(6), fe(42));
        assert_eq!(fe(3) - fe(5) + fe(2), Fe::ZERO);
    }

    #[test]
    fn test_sqrt_m1_squares_to_minus_one() {
        let i = Fe::from_bytes(&SQRT_M1);
        assert_eq!(i.square(), -Fe::ONE);
    }

    #[test]
    fn test_bit_255_is_kept() {
        // 2^255 == 19 mod p
        let mut b = [0u8; 32];
        b[31] = 0x80;
        assert_eq!(Fe::from_bytes(&b), fe(19));
    }

    #[test]
    fn test_canonical_encoding_of_p() {
        // p itself encodes as zero
        let p = hex32("edffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff7f");
        assert!(Fe::from_bytes(&p).is_zero());
        assert_eq!(fe(486662).to_bytes()[..3], [0x06, 0x6d, 0x07]);
    }

    #[test]
    fn test_fffb_constants() {
        let a = fe(MONT_A);
        let a_ap2 = a * (a + fe(2));
        assert_eq!(Fe::from_bytes(&FFFB2).square(), a_ap2 + a_ap2);
        assert_eq!(Fe::from_bytes(&FFFB1).square(), -(a_ap2 + a_ap2));
        let i = Fe::from_bytes(&SQRT_M1);
        assert_eq!(Fe::from_bytes(&FFFB4).square(), i * a_ap2);
        assert_eq!(Fe::from_bytes(&FFFB3).square(), -(i * a_ap2));
    }
}
