//! Aggregated Bulletproof range proofs (original Bulletproofs, not BP+).
//!
//! Proves that each of up to 16 Pedersen commitments opens to a 64-bit
//! amount. Every point in a proof is stored premultiplied by `8^-1` so the
//! verifier can clear torsion with a single `* 8`.
//!
//! Reference: https://eprint.iacr.org/2017/1066.pdf

use std::sync::OnceLock;

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::IsIdentity;
use log::debug;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use ringct_types::varint::encode_varint;
use ringct_types::{Bulletproof, DomainError, Key, KeyV};

use crate::algebra::{
    batch_invert, decode_point, decode_scalar, g, h, hash_to_point, hash_to_scalar, inv_eight, multi_scalar_mult,
    point_key, random_scalar, scalar_key, H_BYTES,
};
use crate::commitment::{commit, gen_commitment_mask};
use crate::keccak256_parts;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Bits per amount.
pub const N: usize = 64;
const LOG_N: usize = 6;
/// Maximum number of aggregated amounts.
pub const MAX_M: usize = 16;

// ─── Generators ─────────────────────────────────────────────────────────────

struct Generators {
    gi: Vec<EdwardsPoint>,
    hi: Vec<EdwardsPoint>,
}

/// `Hp(keccak(H || "bulletproof" || varint(idx)))`
fn generator(idx: usize) -> EdwardsPoint {
    let seed = keccak256_parts(&[&H_BYTES, b"bulletproof", &encode_varint(idx as u64)]);
    hash_to_point(&seed)
}

/// `Hi` takes the even indices, `Gi` the odd ones.
fn generators() -> &'static Generators {
    static GENS: OnceLock<Generators> = OnceLock::new();
    GENS.get_or_init(|| {
        let max_mn = N * MAX_M;
        Generators {
            gi: (0..max_mn).map(|i| generator(2 * i + 1)).collect(),
            hi: (0..max_mn).map(|i| generator(2 * i)).collect(),
        }
    })
}

// ─── Transcript and vector helpers ──────────────────────────────────────────

fn hash_keys(keys: &[Key]) -> Scalar {
    let parts: Vec<&[u8]> = keys.iter().map(|k| &k.0[..]).collect();
    hash_to_scalar(&parts)
}

/// `Hs(cache || k1 || k2 ..)`, stored back as the new cache.
fn mash(cache: &mut Scalar, keys: &[&Key]) -> Scalar {
    let cache_bytes = cache.to_bytes();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
    parts.push(&cache_bytes);
    for k in keys {
        parts.push(&k.0);
    }
    *cache = hash_to_scalar(&parts);
    *cache
}

fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn powers(base: Scalar, count: usize) -> Vec<Scalar> {
    let mut out = Vec::with_capacity(count);
    let mut acc = Scalar::ONE;
    for _ in 0..count {
        out.push(acc);
        acc *= base;
    }
    out
}

/// Smallest power of two `>= count`, with its log.
fn padded_size(count: usize) -> (usize, usize) {
    let mut m = 1;
    let mut log_m = 0;
    while m < count {
        m <<= 1;
        log_m += 1;
    }
    (m, log_m)
}

fn scaled_key(p: EdwardsPoint) -> Key {
    point_key(&(p * inv_eight()))
}

// ─── Prove ──────────────────────────────────────────────────────────────────

/// Prove that each `amounts[j]` committed under `masks[j]` is in `[0, 2^64)`.
pub fn bulletproof_prove<R: RngCore + CryptoRng>(
    amounts: &[u64],
    masks: &[Scalar],
    rng: &mut R,
) -> Result<Bulletproof, DomainError> {
    if amounts.is_empty() {
        return Err(DomainError::EmptyAmounts);
    }
    if amounts.len() != masks.len() {
        return Err(DomainError::LengthMismatch {
            what: "masks",
            expected: amounts.len(),
            got: masks.len(),
        });
    }
    if amounts.len() > MAX_M {
        return Err(DomainError::TooManyAmounts { got: amounts.len(), max: MAX_M });
    }

    loop {
        if let Some(proof) = try_prove(amounts, masks, rng) {
            return Ok(proof);
        }
        debug!("bulletproof transcript produced a zero challenge, retrying");
    }
}

/// One proving attempt; `None` if any challenge came out zero.
fn try_prove<R: RngCore + CryptoRng>(
    amounts: &[u64],
    masks: &[Scalar],
    rng: &mut R,
) -> Option<Bulletproof> {
    let (m, _) = padded_size(amounts.len());
    let mn = m * N;
    let gens = generators();
    let (gi, hi) = (&gens.gi[..mn], &gens.hi[..mn]);
    let h_pt = h();
    let g_pt = g();
    let inv8 = inv_eight();

    let v: KeyV = amounts
        .iter()
        .zip(masks)
        .map(|(&amount, mask)| scaled_key(commit(amount, mask)))
        .collect();
    let mut cache = hash_keys(&v);

    // bit decomposition; padded slots commit to zero
    let mut a_l = vec![Scalar::ZERO; mn];
    let mut a_r = vec![-Scalar::ONE; mn];
    for (j, &amount) in amounts.iter().enumerate() {
        for i in 0..N {
            if (amount >> i) & 1 == 1 {
                a_l[j * N + i] = Scalar::ONE;
                a_r[j * N + i] = Scalar::ZERO;
            }
        }
    }

    let alpha = random_scalar(rng);
    let a_pt = EdwardsPoint::mul_base(&alpha)
        + multi_scalar_mult(&[a_l.as_slice(), a_r.as_slice()].concat(), &[gi, hi].concat());
    let a = scaled_key(a_pt);

    let s_l: Vec<Scalar> = (0..mn).map(|_| random_scalar(rng)).collect();
    let s_r: Vec<Scalar> = (0..mn).map(|_| random_scalar(rng)).collect();
    let rho = random_scalar(rng);
    let s_pt = EdwardsPoint::mul_base(&rho)
        + multi_scalar_mult(&[s_l.as_slice(), s_r.as_slice()].concat(), &[gi, hi].concat());
    let s = scaled_key(s_pt);

    let y = mash(&mut cache, &[&a, &s]);
    if y == Scalar::ZERO {
        return None;
    }
    let z = hash_to_scalar(&[y.as_bytes()]);
    cache = z;
    if z == Scalar::ZERO {
        return None;
    }

    let y_pow = powers(y, mn);
    let z_pow = powers(z, m + 2);
    let two_pow = powers(Scalar::from(2u64), N);

    // l(X) = l0 + l1 X, r(X) = r0 + r1 X
    let l0: Vec<Scalar> = a_l.iter().map(|b| b - z).collect();
    let l1 = s_l;
    let r0: Vec<Scalar> = (0..mn)
        .map(|i| (a_r[i] + z) * y_pow[i] + z_pow[2 + i / N] * two_pow[i % N])
        .collect();
    let r1: Vec<Scalar> = (0..mn).map(|i| s_r[i] * y_pow[i]).collect();

    let t1 = inner_product(&l0, &r1) + inner_product(&l1, &r0);
    let t2 = inner_product(&l1, &r1);

    let tau1 = random_scalar(rng);
    let tau2 = random_scalar(rng);
    let big_t1 = point_key(&(t1 * inv8 * h_pt + tau1 * inv8 * g_pt));
    let big_t2 = point_key(&(t2 * inv8 * h_pt + tau2 * inv8 * g_pt));

    let x = mash(&mut cache, &[&scalar_key(&z), &big_t1, &big_t2]);
    if x == Scalar::ZERO {
        return None;
    }

    let mut taux = tau1 * x + tau2 * x * x;
    for (j, mask) in masks.iter().enumerate() {
        taux += z_pow[j + 2] * mask;
    }
    let mu = x * rho + alpha;

    let l: Vec<Scalar> = l0.iter().zip(&l1).map(|(a, b)| a + b * x).collect();
    let r: Vec<Scalar> = r0.iter().zip(&r1).map(|(a, b)| a + b * x).collect();
    let t = inner_product(&l, &r);

    let x_ip = mash(
        &mut cache,
        &[&scalar_key(&x), &scalar_key(&taux), &scalar_key(&mu), &scalar_key(&t)],
    );
    if x_ip == Scalar::ZERO {
        return None;
    }

    // inner-product argument over G' = Gi, H' = y^-i Hi
    let y_inv = y.invert();
    let y_inv_pow = powers(y_inv, mn);
    let mut g_prime: Vec<EdwardsPoint> = gi.to_vec();
    let mut h_prime: Vec<EdwardsPoint> = hi.iter().zip(&y_inv_pow).map(|(p, s)| s * p).collect();
    let mut a_prime = l;
    let mut b_prime = r;
    let mut l_vec = KeyV::new();
    let mut r_vec = KeyV::new();

    let mut n_prime = mn;
    while n_prime > 1 {
        n_prime /= 2;
        let (a_lo, a_hi) = a_prime.split_at(n_prime);
        let (b_lo, b_hi) = b_prime.split_at(n_prime);
        let (g_lo, g_hi) = g_prime.split_at(n_prime);
        let (h_lo, h_hi) = h_prime.split_at(n_prime);

        let c_l = inner_product(a_lo, b_hi);
        let c_r = inner_product(a_hi, b_lo);

        let l_pt = multi_scalar_mult(&[a_lo, b_hi].concat(), &[g_hi, h_lo].concat())
            + c_l * x_ip * h_pt;
        let r_pt = multi_scalar_mult(&[a_hi, b_lo].concat(), &[g_lo, h_hi].concat())
            + c_r * x_ip * h_pt;
        let l_key = scaled_key(l_pt);
        let r_key = scaled_key(r_pt);

        let w = mash(&mut cache, &[&l_key, &r_key]);
        if w == Scalar::ZERO {
            return None;
        }
        let w_inv = w.invert();
        l_vec.push(l_key);
        r_vec.push(r_key);

        let next_g: Vec<EdwardsPoint> =
            g_lo.iter().zip(g_hi).map(|(lo, hi)| w_inv * lo + w * hi).collect();
        let next_h: Vec<EdwardsPoint> =
            h_lo.iter().zip(h_hi).map(|(lo, hi)| w * lo + w_inv * hi).collect();
        let next_a: Vec<Scalar> = a_lo.iter().zip(a_hi).map(|(lo, hi)| w * lo + w_inv * hi).collect();
        let next_b: Vec<Scalar> = b_lo.iter().zip(b_hi).map(|(lo, hi)| w_inv * lo + w * hi).collect();
        g_prime = next_g;
        h_prime = next_h;
        a_prime = next_a;
        b_prime = next_b;
    }

    Some(Bulletproof {
        v,
        a,
        s,
        t1: big_t1,
        t2: big_t2,
        taux: scalar_key(&taux),
        mu: scalar_key(&mu),
        l: l_vec,
        r: r_vec,
        aa: scalar_key(&a_prime[0]),
        b: scalar_key(&b_prime[0]),
        t: scalar_key(&t),
    })
}

/// Range-prove amounts whose masks derive from per-output shared secrets.
///
/// Returns the proof, the commitments it binds (`proof.v`, scaled by
/// `8^-1`), and the masks `Hs("commitment_mask" || secret)`.
pub fn prove_range<R: RngCore + CryptoRng>(
    amounts: &[u64],
    secrets: &[Key],
    rng: &mut R,
) -> Result<(Bulletproof, KeyV, Vec<Scalar>), DomainError> {
    if amounts.len() != secrets.len() {
        return Err(DomainError::LengthMismatch {
            what: "secrets",
            expected: amounts.len(),
            got: secrets.len(),
        });
    }
    let masks: Vec<Scalar> = secrets.iter().map(gen_commitment_mask).collect();
    let proof = bulletproof_prove(amounts, &masks, rng)?;
    let commitments = proof.v.clone();
    Ok((proof, commitments, masks))
}

// ─── Verify ─────────────────────────────────────────────────────────────────

/// A proof with points decoded (and multiplied by 8) and challenges replayed.
struct Prepared {
    v: Vec<EdwardsPoint>,
    a: EdwardsPoint,
    s: EdwardsPoint,
    t1: EdwardsPoint,
    t2: EdwardsPoint,
    l: Vec<EdwardsPoint>,
    r: Vec<EdwardsPoint>,
    taux: Scalar,
    mu: Scalar,
    aa: Scalar,
    b: Scalar,
    t: Scalar,
    m: usize,
    y: Scalar,
    z: Scalar,
    x: Scalar,
    x_ip: Scalar,
    w: Vec<Scalar>,
}

impl Prepared {
    fn new(proof: &Bulletproof) -> Option<Self> {
        if proof.v.is_empty() || proof.v.len() > MAX_M {
            return None;
        }
        let (m, log_m) = padded_size(proof.v.len());
        let rounds = LOG_N + log_m;
        if proof.l.len() != rounds || proof.r.len() != rounds {
            return None;
        }

        let pt = |k: &Key| decode_point(k).ok().map(|p| p.mul_by_cofactor());
        let sc = |k: &Key| decode_scalar(k).ok();

        let mut cache = hash_keys(&proof.v);
        let y = mash(&mut cache, &[&proof.a, &proof.s]);
        let z = hash_to_scalar(&[y.as_bytes()]);
        cache = z;
        let x = mash(&mut cache, &[&scalar_key(&z), &proof.t1, &proof.t2]);
        let x_ip = mash(&mut cache, &[&scalar_key(&x), &proof.taux, &proof.mu, &proof.t]);
        let mut w = Vec::with_capacity(rounds);
        for (l, r) in proof.l.iter().zip(&proof.r) {
            w.push(mash(&mut cache, &[l, r]));
        }
        if y == Scalar::ZERO
            || z == Scalar::ZERO
            || x == Scalar::ZERO
            || x_ip == Scalar::ZERO
            || w.iter().any(|c| *c == Scalar::ZERO)
        {
            return None;
        }

        Some(Prepared {
            v: proof.v.iter().map(pt).collect::<Option<_>>()?,
            a: pt(&proof.a)?,
            s: pt(&proof.s)?,
            t1: pt(&proof.t1)?,
            t2: pt(&proof.t2)?,
            l: proof.l.iter().map(pt).collect::<Option<_>>()?,
            r: proof.r.iter().map(pt).collect::<Option<_>>()?,
            taux: sc(&proof.taux)?,
            mu: sc(&proof.mu)?,
            aa: sc(&proof.aa)?,
            b: sc(&proof.b)?,
            t: sc(&proof.t)?,
            m,
            y,
            z,
            x,
            x_ip,
            w,
        })
    }
}

/// Verify a batch of proofs with OS-random weights.
pub fn bulletproof_verify(proofs: &[&Bulletproof]) -> bool {
    bulletproof_verify_with_rng(proofs, &mut OsRng)
}

/// Verify a batch of proofs; all checks fold into one multiexp.
///
/// The two verification equations of every proof are scaled by independent
/// random weights and summed, so the batch passes iff each proof does
/// (except with negligible probability).
pub fn bulletproof_verify_with_rng<R: RngCore + CryptoRng>(
    proofs: &[&Bulletproof],
    rng: &mut R,
) -> bool {
    let mut prepared = Vec::with_capacity(proofs.len());
    for (idx, proof) in proofs.iter().enumerate() {
        match Prepared::new(proof) {
            Some(p) => prepared.push(p),
            None => {
                debug!("bulletproof {} is malformed", idx);
                return false;
            }
        }
    }
    let max_mn = prepared.iter().map(|p| p.m * N).max().unwrap_or(0);
    let gens = generators();

    let two_pow = powers(Scalar::from(2u64), N);
    let ip12 = Scalar::from(u64::MAX);

    let mut g_coeff = Scalar::ZERO;
    let mut h_coeff = Scalar::ZERO;
    let mut gi_coeff = vec![Scalar::ZERO; max_mn];
    let mut hi_coeff = vec![Scalar::ZERO; max_mn];
    let mut scalars: Vec<Scalar> = Vec::new();
    let mut points: Vec<EdwardsPoint> = Vec::new();

    for p in &prepared {
        let mn = p.m * N;
        let rounds = p.w.len();
        let weight_y = random_scalar(rng);
        let weight_z = random_scalar(rng);

        let z_pow = powers(p.z, p.m + 3);
        let y_pow_sum: Scalar = powers(p.y, mn).iter().sum();
        let x2 = p.x * p.x;

        // t H + taux G == sum z^(j+2) V_j + delta H + x T1 + x^2 T2
        let mut delta = (p.z - z_pow[2]) * y_pow_sum;
        for j in 0..p.m {
            delta -= z_pow[j + 3] * ip12;
        }
        g_coeff += weight_y * p.taux;
        h_coeff += weight_y * (p.t - delta);
        for (j, v) in p.v.iter().enumerate() {
            scalars.push(-weight_y * z_pow[j + 2]);
            points.push(*v);
        }
        scalars.push(-weight_y * p.x);
        points.push(p.t1);
        scalars.push(-weight_y * x2);
        points.push(p.t2);

        // A + x S - mu G + sum(w^2 L + w^-2 R) + (t - a b) x_ip H
        //   == sum g_i Gi + sum h_i Hi
        let mut w_inv = p.w.clone();
        if batch_invert(&mut w_inv).is_err() {
            return false;
        }
        scalars.push(weight_z);
        points.push(p.a);
        scalars.push(weight_z * p.x);
        points.push(p.s);
        g_coeff -= weight_z * p.mu;
        for j in 0..rounds {
            scalars.push(weight_z * p.w[j] * p.w[j]);
            points.push(p.l[j]);
            scalars.push(weight_z * w_inv[j] * w_inv[j]);
            points.push(p.r[j]);
        }
        h_coeff += weight_z * (p.t - p.aa * p.b) * p.x_ip;

        // s_i = prod_j (w_j if bit (rounds-1-j) of i else w_j^-1)
        let s: Vec<Scalar> = (0..mn)
            .map(|i| {
                (0..rounds)
                    .map(|j| {
                        if (i >> (rounds - 1 - j)) & 1 == 1 {
                            p.w[j]
                        } else {
                            w_inv[j]
                        }
                    })
                    .product()
            })
            .collect();

        let y_inv = p.y.invert();
        let mut y_inv_i = Scalar::ONE;
        for i in 0..mn {
            let g_i = p.aa * s[i] + p.z;
            let h_i = p.b * y_inv_i * s[mn - 1 - i] - p.z - z_pow[2 + i / N] * two_pow[i % N] * y_inv_i;
            gi_coeff[i] -= weight_z * g_i;
            hi_coeff[i] -= weight_z * h_i;
            y_inv_i *= y_inv;
        }
    }

    scalars.push(g_coeff);
    points.push(g());
    scalars.push(h_coeff);
    points.push(h());
    scalars.extend(gi_coeff);
    points.extend_from_slice(&gens.gi[..max_mn]);
    scalars.extend(hi_coeff);
    points.extend_from_slice(&gens.hi[..max_mn]);

    let ok = multi_scalar_mult(&scalars, &points).is_identity();
    if !ok {
        debug!("bulletproof batch of {} failed the multiexp check", prepared.len());
    }
    ok
}
