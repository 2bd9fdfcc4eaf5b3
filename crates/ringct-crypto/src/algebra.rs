//! Scalar and point algebra over Ed25519.
//!
//! Thin layer over curve25519-dalek that fixes the CryptoNote conventions:
//! keys are 32-byte strings, hash-to-scalar is Keccak reduced mod l, and
//! hash-to-point is the Elligator-style map followed by a cofactor clear.

use std::sync::OnceLock;

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{Identity, IsIdentity, VartimeMultiscalarMul};
use rand::{CryptoRng, RngCore};

use ringct_types::{DecodeError, DomainError, Key};

use crate::{elligator, keccak256, keccak256_parts};

/// Second Pedersen generator, `8 * decompress(keccak(G))`.
pub const H_BYTES: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf, 0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0, 0xea,
    0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9, 0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c, 0x1f, 0x94,
];

/// Base point `G`.
pub fn g() -> EdwardsPoint {
    ED25519_BASEPOINT_POINT
}

/// Pedersen generator `H`; no known discrete log relative to `G`.
pub fn h() -> EdwardsPoint {
    static H: OnceLock<EdwardsPoint> = OnceLock::new();
    *H.get_or_init(|| {
        CompressedEdwardsY(H_BYTES)
            .decompress()
            .expect("H is a valid point")
    })
}

/// `8^-1 mod l`
pub fn inv_eight() -> Scalar {
    static INV_EIGHT: OnceLock<Scalar> = OnceLock::new();
    *INV_EIGHT.get_or_init(|| Scalar::from(8u64).invert())
}

pub fn mul8(p: &EdwardsPoint) -> EdwardsPoint {
    p.mul_by_cofactor()
}

// ─── Hashing ────────────────────────────────────────────────────────────────

/// `Hs`: Keccak-256 of the concatenated parts, reduced mod l.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256_parts(parts))
}

/// `Hp`: keccak, map to curve, multiply by the cofactor.
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    let hash = keccak256(data);
    elligator::ge_fromfe_frombytes_vartime(&hash).mul_by_cofactor()
}

// ─── Decoding ───────────────────────────────────────────────────────────────

/// Decompress a key into a curve point. Only the canonical encoding of a
/// point is accepted, so every point has exactly one key.
pub fn decode_point(k: &Key) -> Result<EdwardsPoint, DecodeError> {
    let p = CompressedEdwardsY(k.0)
        .decompress()
        .ok_or(DecodeError::InvalidPoint(*k))?;
    if p.compress().to_bytes() != k.0 {
        return Err(DecodeError::InvalidPoint(*k));
    }
    Ok(p)
}

/// Decompress and require a non-identity point of prime order.
pub fn decode_point_prime_order(k: &Key) -> Result<EdwardsPoint, DecodeError> {
    let p = decode_point(k)?;
    if p.is_identity() || !p.is_torsion_free() {
        return Err(DecodeError::NotPrimeOrder(*k));
    }
    Ok(p)
}

/// Parse a canonical (fully reduced) scalar.
pub fn decode_scalar(k: &Key) -> Result<Scalar, DecodeError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(k.0)).ok_or(DecodeError::NonCanonicalScalar(*k))
}

/// Interpret a key as a scalar, reducing mod l.
pub fn reduce_scalar(k: &Key) -> Scalar {
    Scalar::from_bytes_mod_order(k.0)
}

pub fn point_key(p: &EdwardsPoint) -> Key {
    Key(p.compress().to_bytes())
}

pub fn scalar_key(s: &Scalar) -> Key {
    Key(s.to_bytes())
}

pub fn is_identity(k: &Key) -> bool {
    *k == Key::IDENTITY
}

pub fn identity() -> EdwardsPoint {
    EdwardsPoint::identity()
}

// ─── Scalar operations (mod l) ──────────────────────────────────────────────

pub fn scalar_add(a: &Key, b: &Key) -> Key {
    scalar_key(&(reduce_scalar(a) + reduce_scalar(b)))
}

pub fn scalar_sub(a: &Key, b: &Key) -> Key {
    scalar_key(&(reduce_scalar(a) - reduce_scalar(b)))
}

pub fn scalar_mul(a: &Key, b: &Key) -> Key {
    scalar_key(&(reduce_scalar(a) * reduce_scalar(b)))
}

/// `a * b + c`
pub fn scalar_mul_add(a: &Key, b: &Key, c: &Key) -> Key {
    scalar_key(&(reduce_scalar(a) * reduce_scalar(b) + reduce_scalar(c)))
}

pub fn scalar_negate(a: &Key) -> Key {
    scalar_key(&-reduce_scalar(a))
}

pub fn scalar_invert(a: &Scalar) -> Result<Scalar, DomainError> {
    if *a == Scalar::ZERO {
        return Err(DomainError::ZeroInverse);
    }
    Ok(a.invert())
}

/// Invert every element in place with a single field inversion.
pub fn batch_invert(scalars: &mut [Scalar]) -> Result<(), DomainError> {
    if scalars.iter().any(|s| *s == Scalar::ZERO) {
        return Err(DomainError::ZeroInverse);
    }
    Scalar::batch_invert(scalars);
    Ok(())
}

// ─── Point operations ───────────────────────────────────────────────────────

pub fn point_add(a: &Key, b: &Key) -> Result<Key, DecodeError> {
    Ok(point_key(&(decode_point(a)? + decode_point(b)?)))
}

pub fn point_sub(a: &Key, b: &Key) -> Result<Key, DecodeError> {
    Ok(point_key(&(decode_point(a)? - decode_point(b)?)))
}

/// `s * G`
pub fn scalar_mult_base(s: &Key) -> Key {
    point_key(&EdwardsPoint::mul_base(&reduce_scalar(s)))
}

/// `s * P`
pub fn scalar_mult_point(s: &Key, p: &Key) -> Result<Key, DecodeError> {
    Ok(point_key(&(reduce_scalar(s) * decode_point(p)?)))
}

/// `sum(scalars[i] * points[i])`, variable time.
pub fn multi_scalar_mult(scalars: &[Scalar], points: &[EdwardsPoint]) -> EdwardsPoint {
    EdwardsPoint::vartime_multiscalar_mul(scalars, points)
}

// ─── Randomness ─────────────────────────────────────────────────────────────

/// Uniform scalar from 64 random bytes reduced mod l.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn k(hex: &str) -> Key {
        Key::from_hex(hex).unwrap()
    }

    #[test]
    fn test_h_is_hash_of_g() {
        let g_bytes = g().compress().to_bytes();
        let p = CompressedEdwardsY(keccak256(&g_bytes)).decompress().unwrap();
        assert_eq!(point_key(&mul8(&p)), Key(H_BYTES));
        assert!(h().is_torsion_free());
    }

    #[test]
    fn test_hash_to_point_known_vectors() {
        let g_bytes = g().compress().to_bytes();
        assert_eq!(
            point_key(&hash_to_point(&g_bytes)),
            k("d6329b5b1f7c0805b5c345f4957554002a2f557845f64d7645dae0e051a6498a")
        );
        assert_eq!(
            point_key(&hash_to_point(&H_BYTES)),
            k("b20ce49fc35c36c945143108577fa9735eaacf03924476102c59e90db3acfec3")
        );
    }

    #[test]
    fn test_hash_to_point_prime_order() {
        for i in 0u8..16 {
            let p = hash_to_point(&[i; 32]);
            assert!(p.is_torsion_free());
            assert!(!p.is_identity());
        }
    }

    #[test]
    fn test_decode_point_rejects() {
        // y = 2 has no matching x on the curve
        let mut bad = [0u8; 32];
        bad[0] = 2;
        assert_eq!(decode_point(&Key(bad)), Err(DecodeError::InvalidPoint(Key(bad))));
        assert_eq!(
            decode_point_prime_order(&Key::IDENTITY),
            Err(DecodeError::NotPrimeOrder(Key::IDENTITY))
        );
        // order-2 point (0, -1)
        let mut neg_one = [0xffu8; 32];
        neg_one[0] = 0xec;
        neg_one[31] = 0x7f;
        assert!(decode_point(&Key(neg_one)).is_ok());
        assert!(decode_point_prime_order(&Key(neg_one)).is_err());
        assert!(decode_point_prime_order(&Key(H_BYTES)).is_ok());
    }

    #[test]
    fn test_decode_point_rejects_non_canonical() {
        // y = p + 1 reduces to y = 1, the identity
        let mut y_overflow = [0xffu8; 32];
        y_overflow[0] = 0xee;
        y_overflow[31] = 0x7f;
        assert_eq!(
            decode_point(&Key(y_overflow)),
            Err(DecodeError::InvalidPoint(Key(y_overflow)))
        );

        // identity with the sign bit set (x = 0 has no negative)
        let mut signed_identity = [0u8; 32];
        signed_identity[0] = 0x01;
        signed_identity[31] = 0x80;
        assert_eq!(
            decode_point(&Key(signed_identity)),
            Err(DecodeError::InvalidPoint(Key(signed_identity)))
        );
        assert!(point_add(&Key(signed_identity), &Key::IDENTITY).is_err());

        assert_eq!(decode_point(&Key::IDENTITY).unwrap(), identity());
        let five = scalar_mult_base(&Key::from_u64(5));
        assert_eq!(point_key(&decode_point(&five).unwrap()), five);
    }

    #[test]
    fn test_decode_scalar_canonical() {
        assert!(decode_scalar(&Key::from_u64(5)).is_ok());
        assert!(decode_scalar(&Key([0xff; 32])).is_err());
        // l itself is not canonical
        let l = k("edd3f55c1a631258d69cf7a2def9de1400000000000000000000000000000010");
        assert!(decode_scalar(&l).is_err());
        assert_eq!(reduce_scalar(&l), Scalar::ZERO);
    }

    #[test]
    fn test_scalar_ops() {
        let a = Key::from_u64(10);
        let b = Key::from_u64(4);
        assert_eq!(scalar_add(&a, &b), Key::from_u64(14));
        assert_eq!(scalar_sub(&a, &b), Key::from_u64(6));
        assert_eq!(scalar_mul(&a, &b), Key::from_u64(40));
        assert_eq!(scalar_mul_add(&a, &b, &a), Key::from_u64(50));
        assert_eq!(scalar_add(&scalar_negate(&a), &a), Key::ZERO);
        assert_eq!(scalar_invert(&Scalar::ZERO), Err(DomainError::ZeroInverse));
        let inv = scalar_invert(&Scalar::from(8u64)).unwrap();
        assert_eq!(inv, inv_eight());
    }

    #[test]
    fn test_batch_invert() {
        let mut rng = StdRng::seed_from_u64(1);
        let orig: Vec<Scalar> = (0..5).map(|_| random_scalar(&mut rng)).collect();
        let mut inv = orig.clone();
        batch_invert(&mut inv).unwrap();
        for (a, b) in orig.iter().zip(&inv) {
            assert_eq!(a * b, Scalar::ONE);
        }
        let mut with_zero = vec![Scalar::ONE, Scalar::ZERO];
        assert!(batch_invert(&mut with_zero).is_err());
    }

    #[test]
    fn test_point_ops() {
        let two = scalar_mult_base(&Key::from_u64(2));
        let three = scalar_mult_base(&Key::from_u64(3));
        let five = scalar_mult_base(&Key::from_u64(5));
        assert_eq!(point_add(&two, &three).unwrap(), five);
        assert_eq!(point_sub(&five, &three).unwrap(), two);
        let g_key = point_key(&g());
        assert_eq!(scalar_mult_point(&Key::from_u64(5), &g_key).unwrap(), five);
        assert_eq!(scalar_mult_base(&Key::ZERO), Key::IDENTITY);
    }

    #[test]
    fn test_multi_scalar_mult_matches_naive() {
        let mut rng = StdRng::seed_from_u64(2);
        let scalars: Vec<Scalar> = (0..4).map(|_| random_scalar(&mut rng)).collect();
        let points: Vec<EdwardsPoint> =
            (0..4u8).map(|i| hash_to_point(&[i; 32])).collect();
        let naive = scalars
            .iter()
            .zip(&points)
            .fold(identity(), |acc, (s, p)| acc + s * p);
        assert_eq!(multi_scalar_mult(&scalars, &points), naive);
    }
}
