//! End-to-end flow: pay a wallet, let it find and open the output, then
//! spend that output inside a ring and verify the resulting signature.

use curve25519_dalek::edwards::EdwardsPoint;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use ringct_crypto::algebra::{
    point_key, random_scalar, reduce_scalar, scalar_key, scalar_mult_base, scalar_mult_point,
};
use ringct_crypto::commitment::key_to_amount;
use ringct_crypto::derivation::{
    build_subaddress_table, find_output_owner, recover_output, subaddress_keys, AccountKeys,
    OutputAmount, RecoveredOutput, SubaddressIndex,
};
use ringct_crypto::rct::{verify_with_reason, RctStatus};
use ringct_crypto::types::{Ctkey, CtkeyM, Decode, EcdhTuple, Encode, Key, RctSig, RctType};
use ringct_crypto::{
    commit, derivation_to_scalar, derive_public_key, ecdh_decode, ecdh_encode,
    gen_commitment_mask, gen_rct_simple, generate_key_derivation, ver_rct_simple,
};

const RING_SIZE: usize = 11;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A single output paid to `(spend, view)` under a fresh tx secret `r`.
/// Subaddress recipients get `R = r D` instead of `r G`.
struct Payment {
    tx_public: Key,
    output: Ctkey,
    ecdh: EcdhTuple,
}

fn pay(rng: &mut StdRng, spend: &Key, view: &Key, subaddress: bool, amount: u64) -> Payment {
    let r = scalar_key(&random_scalar(rng));
    let derivation = generate_key_derivation(view, &r).unwrap();
    let dest = derive_public_key(&derivation, 0, spend).unwrap();
    let shared = scalar_key(&derivation_to_scalar(&derivation, 0));
    let mask = gen_commitment_mask(&shared);
    let tuple = EcdhTuple { mask: scalar_key(&mask), amount: Key::from_u64(amount) };
    Payment {
        tx_public: if subaddress { scalar_mult_point(&r, spend).unwrap() } else { scalar_mult_base(&r) },
        output: Ctkey { dest, mask: point_key(&commit(amount, &mask)) },
        ecdh: ecdh_encode(&tuple, &shared, true),
    }
}

fn scan(keys: &AccountKeys, payment: &Payment) -> Option<RecoveredOutput> {
    let table = build_subaddress_table(keys, 2, 4).unwrap();
    let derivation = generate_key_derivation(&payment.tx_public, &keys.view_secret).unwrap();
    let owner = find_output_owner(&table, &payment.output.dest, &[derivation], 0)?;
    let amount = OutputAmount::Encrypted { ecdh: &payment.ecdh, compact: true };
    Some(recover_output(keys, &payment.output.dest, &owner, 0, amount).unwrap())
}

fn decoy(rng: &mut StdRng) -> Ctkey {
    Ctkey {
        dest: point_key(&EdwardsPoint::mul_base(&random_scalar(rng))),
        mask: point_key(&commit(rng.next_u32() as u64, &random_scalar(rng))),
    }
}

fn ring_with(rng: &mut StdRng, real: Ctkey, index: usize) -> Vec<Ctkey> {
    (0..RING_SIZE).map(|i| if i == index { real } else { decoy(rng) }).collect()
}

#[test]
fn receive_then_spend() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(7001);
    let alice = AccountKeys::from_recovery_key(&Key([0x0a; 32]));
    let bob = AccountKeys::from_recovery_key(&Key([0x0b; 32]));

    let incoming = pay(&mut rng, &alice.spend_public, &alice.view_public, false, 5_000_000);
    assert!(scan(&bob, &incoming).is_none());
    let owned = scan(&alice, &incoming).unwrap();
    assert_eq!(owned.amount, 5_000_000);
    assert!(owned.subaddress.is_primary());

    // Spend to Bob with change back to Alice.
    let fee = 30_000;
    let r = scalar_key(&random_scalar(&mut rng));
    let mut destinations = Vec::new();
    let mut amount_keys = Vec::new();
    for (i, (spend, view)) in [(&bob.spend_public, &bob.view_public), (&alice.spend_public, &alice.view_public)]
        .into_iter()
        .enumerate()
    {
        let derivation = generate_key_derivation(view, &r).unwrap();
        destinations.push(derive_public_key(&derivation, i as u64, spend).unwrap());
        amount_keys.push(scalar_key(&derivation_to_scalar(&derivation, i as u64)));
    }
    let index = 6;
    let mix_ring: CtkeyM = vec![ring_with(&mut rng, incoming.output, index)];
    let in_sk = Ctkey { dest: owned.secret_key, mask: owned.mask };

    let (sig, out_masks) = gen_rct_simple(
        &Key([0x5e; 32]),
        &[in_sk],
        &[owned.amount],
        &destinations,
        &[3_000_000, 1_970_000],
        &amount_keys,
        fee,
        &mix_ring,
        &[index],
        RctType::Bulletproof2,
        &mut rng,
    )
    .unwrap();

    assert!(ver_rct_simple(&sig));
    assert_eq!(sig.mgs[0].ii, vec![owned.key_image]);
    assert_eq!(out_masks.len(), 2);

    // Bob opens his output with his own view of the derivation.
    let tx_public = scalar_mult_base(&r);
    let derivation = generate_key_derivation(&tx_public, &bob.view_secret).unwrap();
    let shared = scalar_key(&derivation_to_scalar(&derivation, 0));
    let opened = ecdh_decode(&sig.ecdh_info[0], &shared, true);
    assert_eq!(key_to_amount(&opened.amount), 3_000_000);
    assert_eq!(reduce_scalar(&opened.mask), out_masks[0]);
    assert_eq!(point_key(&commit(3_000_000, &out_masks[0])), sig.out_pk[0].mask);

    // Survives the wire.
    let decoded = RctSig::from_bytes(&sig.to_bytes()).unwrap();
    assert_eq!(decoded, sig);
    assert!(ver_rct_simple(&decoded));
}

#[test]
fn subaddress_output_is_spendable() {
    let mut rng = StdRng::seed_from_u64(7002);
    let carol = AccountKeys::from_recovery_key(&Key([0x0c; 32]));
    let sub = SubaddressIndex::new(1, 3);
    let (spend, view) = subaddress_keys(&carol, sub).unwrap();

    let incoming = pay(&mut rng, &spend, &view, true, 42_000);
    let owned = scan(&carol, &incoming).unwrap();
    assert_eq!(owned.subaddress, sub);
    assert_eq!(owned.amount, 42_000);

    let mix_ring: CtkeyM = vec![ring_with(&mut rng, incoming.output, 0)];
    let (sig, _) = gen_rct_simple(
        &Key([0x11; 32]),
        &[Ctkey { dest: owned.secret_key, mask: owned.mask }],
        &[42_000],
        &[carol.spend_public],
        &[41_000],
        &[Key([0x22; 32])],
        1_000,
        &mix_ring,
        &[0],
        RctType::Bulletproof2,
        &mut rng,
    )
    .unwrap();
    assert!(ver_rct_simple(&sig));
}

#[test]
fn many_inputs_many_outputs() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(7003);
    let in_amounts = [1_000u64, 25_000, 400_000];
    let out_amounts = [100_000u64, 200_000, 120_000, 5_000];
    let fee = 1_000;

    let mut in_sk = Vec::new();
    let mut mix_ring = CtkeyM::new();
    let mut indices = Vec::new();
    for (i, &amount) in in_amounts.iter().enumerate() {
        let x = random_scalar(&mut rng);
        let mask = random_scalar(&mut rng);
        let real = Ctkey {
            dest: point_key(&EdwardsPoint::mul_base(&x)),
            mask: point_key(&commit(amount, &mask)),
        };
        let index = (3 * i + 1) % RING_SIZE;
        mix_ring.push(ring_with(&mut rng, real, index));
        in_sk.push(Ctkey { dest: scalar_key(&x), mask: scalar_key(&mask) });
        indices.push(index);
    }
    let destinations: Vec<Key> = (0..out_amounts.len())
        .map(|_| point_key(&EdwardsPoint::mul_base(&random_scalar(&mut rng))))
        .collect();
    let amount_keys: Vec<Key> =
        (0..out_amounts.len()).map(|_| scalar_key(&random_scalar(&mut rng))).collect();

    for rct_type in [RctType::Bulletproof, RctType::Bulletproof2] {
        let (sig, _) = gen_rct_simple(
            &Key([0x33; 32]),
            &in_sk,
            &in_amounts,
            &destinations,
            &out_amounts,
            &amount_keys,
            fee,
            &mix_ring,
            &indices,
            rct_type,
            &mut rng,
        )
        .unwrap();
        assert_eq!(sig.mgs.len(), 3);
        assert_eq!(sig.bulletproofs[0].v.len(), 4);
        assert_eq!(verify_with_reason(&sig), RctStatus::Valid);

        // a different real index invalidates the ring signature
        let mut moved = sig.clone();
        moved.mix_ring[2].swap(indices[2], (indices[2] + 1) % RING_SIZE);
        assert_eq!(verify_with_reason(&moved), RctStatus::RingSignature(2));
    }
}
