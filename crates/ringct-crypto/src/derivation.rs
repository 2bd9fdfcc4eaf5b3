//! CryptoNote key derivation, subaddresses, key images and output
//! ownership.
//!
//! A sender with tx secret `r` and a receiver with view secret `a` share the
//! derivation `D = 8 r A = 8 a R`. Output `i` pays the one-time key
//! `P = Hs(D || i) G + B`; only the holder of `b` can compute `x = Hs(D || i) + b`
//! and hence the key image `x Hp(P)`.

use std::collections::HashMap;

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use log::debug;

use ringct_types::varint::write_varint;
use ringct_types::{DecodeError, DomainError, EcdhTuple, Key, RctError};

use crate::algebra::{decode_point, hash_to_point, hash_to_scalar, point_key, reduce_scalar, scalar_key};
use crate::commitment::{ecdh_decode, key_to_amount};
use crate::keccak256;

/// `D = 8 * sec * pub`
pub fn generate_key_derivation(public: &Key, secret: &Key) -> Result<Key, DecodeError> {
    let p = decode_point(public)?;
    Ok(point_key(&(reduce_scalar(secret) * p).mul_by_cofactor()))
}

/// `Hs(D || varint(index))`
pub fn derivation_to_scalar(derivation: &Key, index: u64) -> Scalar {
    let mut buf = Vec::with_capacity(42);
    buf.extend_from_slice(&derivation.0);
    write_varint(&mut buf, index);
    hash_to_scalar(&[&buf])
}

/// One-time output key `base + Hs(D || i) G`.
pub fn derive_public_key(derivation: &Key, index: u64, base: &Key) -> Result<Key, DecodeError> {
    let b = decode_point(base)?;
    let s = derivation_to_scalar(derivation, index);
    Ok(point_key(&(EdwardsPoint::mul_base(&s) + b)))
}

/// One-time secret `base + Hs(D || i)`.
pub fn derive_secret_key(derivation: &Key, index: u64, base: &Key) -> Key {
    scalar_key(&(reduce_scalar(base) + derivation_to_scalar(derivation, index)))
}

/// Undo [`derive_public_key`]: recover the spend key an output pays to.
pub fn derive_subaddress_public_key(
    output_key: &Key,
    derivation: &Key,
    index: u64,
) -> Result<Key, DecodeError> {
    let p = decode_point(output_key)?;
    let s = derivation_to_scalar(derivation, index);
    Ok(point_key(&(p - EdwardsPoint::mul_base(&s))))
}

/// `I = x * Hp(P)`. Fails when `x` is zero, since that image would be the
/// identity and link every such spend together.
pub fn generate_key_image(public: &Key, secret: &Key) -> Result<Key, DomainError> {
    let x = reduce_scalar(secret);
    if x == Scalar::ZERO {
        return Err(DomainError::DegenerateKey("zero secret yields identity key image"));
    }
    Ok(point_key(&(x * hash_to_point(&public.0))))
}

// ─── Accounts and subaddresses ──────────────────────────────────────────────

/// Wallet key pair set: spend and view keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeys {
    pub spend_secret: Key,
    pub view_secret: Key,
    pub spend_public: Key,
    pub view_public: Key,
}

impl AccountKeys {
    /// Deterministic account from a recovery seed: the spend secret is the
    /// seed reduced mod l, the view secret is `keccak(spend secret)` reduced.
    pub fn from_recovery_key(seed: &Key) -> Self {
        let spend = reduce_scalar(seed);
        let view = Scalar::from_bytes_mod_order(keccak256(spend.as_bytes()));
        AccountKeys {
            spend_secret: scalar_key(&spend),
            view_secret: scalar_key(&view),
            spend_public: point_key(&EdwardsPoint::mul_base(&spend)),
            view_public: point_key(&EdwardsPoint::mul_base(&view)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubaddressIndex {
    pub major: u32,
    pub minor: u32,
}

impl SubaddressIndex {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// `(0, 0)` is the primary address.
    pub fn is_primary(&self) -> bool {
        self.major == 0 && self.minor == 0
    }
}

/// `m = Hs("SubAddr\0" || a || major_le || minor_le)`
pub fn subaddress_secret_key(view_secret: &Key, index: SubaddressIndex) -> Scalar {
    hash_to_scalar(&[
        b"SubAddr\0",
        &view_secret.0,
        &index.major.to_le_bytes(),
        &index.minor.to_le_bytes(),
    ])
}

/// Subaddress spend key `D = B + m G`; the primary address returns `B`.
pub fn subaddress_spend_public_key(
    keys: &AccountKeys,
    index: SubaddressIndex,
) -> Result<Key, DecodeError> {
    if index.is_primary() {
        return Ok(keys.spend_public);
    }
    let b = decode_point(&keys.spend_public)?;
    let m = subaddress_secret_key(&keys.view_secret, index);
    Ok(point_key(&(b + EdwardsPoint::mul_base(&m))))
}

/// Subaddress public pair `(D, C = a D)`.
pub fn subaddress_keys(keys: &AccountKeys, index: SubaddressIndex) -> Result<(Key, Key), DecodeError> {
    if index.is_primary() {
        return Ok((keys.spend_public, keys.view_public));
    }
    let d = subaddress_spend_public_key(keys, index)?;
    let c = reduce_scalar(&keys.view_secret) * decode_point(&d)?;
    Ok((d, point_key(&c)))
}

/// Spend public key -> subaddress index lookup.
pub type SubaddressTable = HashMap<Key, SubaddressIndex>;

/// Table of all subaddresses with `major < majors` and `minor < minors`.
pub fn build_subaddress_table(
    keys: &AccountKeys,
    majors: u32,
    minors: u32,
) -> Result<SubaddressTable, DecodeError> {
    let mut table = HashMap::with_capacity((majors as usize) * (minors as usize));
    for major in 0..majors {
        for minor in 0..minors {
            let index = SubaddressIndex::new(major, minor);
            table.insert(subaddress_spend_public_key(keys, index)?, index);
        }
    }
    Ok(table)
}

// ─── Output scanning ────────────────────────────────────────────────────────

/// Which derivation matched an owned output, and for which subaddress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOwner {
    pub derivation: Key,
    /// Position in the candidate list (0 = main tx key, then additional keys).
    pub derivation_index: usize,
    pub subaddress: SubaddressIndex,
}

/// Try each candidate derivation against an output key.
///
/// `derivations` holds the derivation of the main tx public key followed by
/// those of any additional per-output keys.
pub fn find_output_owner(
    table: &SubaddressTable,
    output_key: &Key,
    derivations: &[Key],
    output_index: u64,
) -> Option<OutputOwner> {
    for (derivation_index, derivation) in derivations.iter().enumerate() {
        let spend = match derive_subaddress_public_key(output_key, derivation, output_index) {
            Ok(k) => k,
            Err(e) => {
                debug!("output {} not decodable: {}", output_index, e);
                return None;
            }
        };
        if let Some(&subaddress) = table.get(&spend) {
            debug!(
                "output {} owned by subaddress ({}, {}) via derivation {}",
                output_index, subaddress.major, subaddress.minor, derivation_index
            );
            return Some(OutputOwner { derivation: *derivation, derivation_index, subaddress });
        }
    }
    None
}

/// How an output's amount is carried.
#[derive(Debug, Clone, Copy)]
pub enum OutputAmount<'a> {
    /// Transparent amount committed with mask one (miner outputs).
    Cleartext(u64),
    Encrypted { ecdh: &'a EcdhTuple, compact: bool },
}

/// Everything a wallet needs to later spend an owned output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredOutput {
    pub secret_key: Key,
    pub key_image: Key,
    pub amount: u64,
    pub mask: Key,
    pub subaddress: SubaddressIndex,
}

/// Derive the one-time secret and key image of an owned output and open
/// its amount.
pub fn recover_output(
    keys: &AccountKeys,
    output_key: &Key,
    owner: &OutputOwner,
    output_index: u64,
    amount: OutputAmount<'_>,
) -> Result<RecoveredOutput, RctError> {
    let mut x = reduce_scalar(&derive_secret_key(&owner.derivation, output_index, &keys.spend_secret));
    if !owner.subaddress.is_primary() {
        x += subaddress_secret_key(&keys.view_secret, owner.subaddress);
    }
    let secret_key = scalar_key(&x);
    if point_key(&EdwardsPoint::mul_base(&x)) != *output_key {
        return Err(DomainError::DegenerateKey("derived secret does not open output key").into());
    }
    let key_image = generate_key_image(output_key, &secret_key)?;

    let (amount, mask) = match amount {
        OutputAmount::Cleartext(v) => (v, Key::IDENTITY),
        OutputAmount::Encrypted { ecdh, compact } => {
            let shared = scalar_key(&derivation_to_scalar(&owner.derivation, output_index));
            let opened = ecdh_decode(ecdh, &shared, compact);
            (key_to_amount(&opened.amount), opened.mask)
        }
    };

    Ok(RecoveredOutput { secret_key, key_image, amount, mask, subaddress: owner.subaddress })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{random_scalar, scalar_mult_base, scalar_mult_point};
    use crate::commitment::ecdh_encode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_derivation_known_vectors() {
        // sec 7, pub 9G -> 8 * 63 G
        let d = generate_key_derivation(&scalar_mult_base(&Key::from_u64(9)), &Key::from_u64(7)).unwrap();
        assert_eq!(d.to_hex(), "13a84511980e3c621bbb79bd0797bd12c047fdb549ca726c6d6e59b6a8f54070");
        assert_eq!(
            scalar_key(&derivation_to_scalar(&Key([0x11; 32]), 0)).to_hex(),
            "d306ee2392eeaf7147fb6cd1329f0a615a189eb5a3fea39c58052a20d05d7e04"
        );
    }

    #[test]
    fn test_derivation_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(21);
        let r = scalar_key(&random_scalar(&mut rng));
        let a = scalar_key(&random_scalar(&mut rng));
        let d1 = generate_key_derivation(&scalar_mult_base(&a), &r).unwrap();
        let d2 = generate_key_derivation(&scalar_mult_base(&r), &a).unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_derived_keys_match() {
        let mut rng = StdRng::seed_from_u64(22);
        let b = scalar_key(&random_scalar(&mut rng));
        let d = Key([0x42; 32]);
        for i in [0u64, 1, 200] {
            let p = derive_public_key(&d, i, &scalar_mult_base(&b)).unwrap();
            let x = derive_secret_key(&d, i, &b);
            assert_eq!(scalar_mult_base(&x), p);
            assert_eq!(derive_subaddress_public_key(&p, &d, i).unwrap(), scalar_mult_base(&b));
        }
    }

    #[test]
    fn test_key_image_vector_and_properties() {
        let x = Key::from_u64(5);
        let p = scalar_mult_base(&x);
        let ki = generate_key_image(&p, &x).unwrap();
        assert_eq!(ki.to_hex(), "59b0c0bfcc7f2667238acb990ebbfd6fe48595099c6d100277228cc984c96edf");
        assert_eq!(generate_key_image(&p, &x).unwrap(), ki);

        let y = Key::from_u64(6);
        assert_ne!(generate_key_image(&scalar_mult_base(&y), &y).unwrap(), ki);
        assert!(generate_key_image(&p, &Key::ZERO).is_err());
    }

    #[test]
    fn test_subaddress_primary_is_main_address() {
        let keys = AccountKeys::from_recovery_key(&Key([7; 32]));
        let primary = SubaddressIndex::default();
        assert_eq!(subaddress_spend_public_key(&keys, primary).unwrap(), keys.spend_public);
        let (d, c) = subaddress_keys(&keys, SubaddressIndex::new(0, 3)).unwrap();
        assert_ne!(d, keys.spend_public);
        // C = a D
        assert_eq!(scalar_mult_point(&keys.view_secret, &d).unwrap(), c);
    }

    #[test]
    fn test_recovery_key_account() {
        let keys = AccountKeys::from_recovery_key(&Key([0xff; 32]));
        assert_eq!(scalar_mult_base(&keys.spend_secret), keys.spend_public);
        assert_eq!(scalar_mult_base(&keys.view_secret), keys.view_public);
        let view = Scalar::from_bytes_mod_order(keccak256(&keys.spend_secret.0));
        assert_eq!(keys.view_secret, scalar_key(&view));
    }

    /// Sender side of a subaddress payment: tx key `r`, output key
    /// `Hs(8 r C || i) G + D` with the tx public key `r D`.
    fn pay_to_subaddress(
        keys: &AccountKeys,
        index: SubaddressIndex,
        r: &Key,
        i: u64,
    ) -> (Key, Key, Key) {
        let (d, c) = subaddress_keys(keys, index).unwrap();
        let tx_pub = if index.is_primary() {
            scalar_mult_base(r)
        } else {
            scalar_mult_point(r, &d).unwrap()
        };
        let derivation = generate_key_derivation(&c, r).unwrap();
        let out = derive_public_key(&derivation, i, &d).unwrap();
        (tx_pub, out, derivation)
    }

    #[test]
    fn test_scan_finds_subaddress_output_and_opens_amount() {
        let mut rng = StdRng::seed_from_u64(23);
        let keys = AccountKeys::from_recovery_key(&scalar_key(&random_scalar(&mut rng)));
        let table = build_subaddress_table(&keys, 2, 4).unwrap();
        assert_eq!(table.len(), 8);

        let index = SubaddressIndex::new(1, 2);
        let r = scalar_key(&random_scalar(&mut rng));
        let (tx_pub, out, sender_derivation) = pay_to_subaddress(&keys, index, &r, 1);

        let shared = scalar_key(&derivation_to_scalar(&sender_derivation, 1));
        let ecdh = ecdh_encode(
            &EcdhTuple { mask: Key::ZERO, amount: Key::from_u64(4_200_000) },
            &shared,
            true,
        );

        // receiver: the main tx key is unrelated, the additional key matches
        let unrelated = scalar_mult_base(&Key::from_u64(99));
        let derivations = [
            generate_key_derivation(&unrelated, &keys.view_secret).unwrap(),
            generate_key_derivation(&tx_pub, &keys.view_secret).unwrap(),
        ];
        let owner = find_output_owner(&table, &out, &derivations, 1).unwrap();
        assert_eq!(owner.subaddress, index);
        assert_eq!(owner.derivation_index, 1);
        assert_eq!(owner.derivation, sender_derivation);

        let rec = recover_output(
            &keys,
            &out,
            &owner,
            1,
            OutputAmount::Encrypted { ecdh: &ecdh, compact: true },
        )
        .unwrap();
        assert_eq!(rec.amount, 4_200_000);
        assert_eq!(scalar_mult_base(&rec.secret_key), out);
        assert_eq!(rec.key_image, generate_key_image(&out, &rec.secret_key).unwrap());
        assert_eq!(rec.mask, scalar_key(&crate::commitment::gen_commitment_mask(&shared)));
    }

    #[test]
    fn test_scan_miner_output_and_foreign_output() {
        let keys = AccountKeys::from_recovery_key(&Key([3; 32]));
        let table = build_subaddress_table(&keys, 1, 1).unwrap();
        let r = Key::from_u64(1234);
        let (tx_pub, out, _) = pay_to_subaddress(&keys, SubaddressIndex::default(), &r, 0);
        let derivation = generate_key_derivation(&tx_pub, &keys.view_secret).unwrap();

        let owner = find_output_owner(&table, &out, &[derivation], 0).unwrap();
        let rec = recover_output(&keys, &out, &owner, 0, OutputAmount::Cleartext(600)).unwrap();
        assert_eq!(rec.amount, 600);
        assert_eq!(rec.mask, Key::IDENTITY);

        // same output seen under the wrong index does not match
        assert!(find_output_owner(&table, &out, &[derivation], 1).is_none());
    }
}
