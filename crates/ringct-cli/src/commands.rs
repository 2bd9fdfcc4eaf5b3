//! CLI command implementations.

use crate::{AppContext, InputFormat};
use log::{debug, info};
use rand::rngs::OsRng;
use rand::Rng;
use ringct_crypto::algebra::{point_key, random_scalar, scalar_key, scalar_mult_base};
use ringct_crypto::bulletproof::MAX_M;
use ringct_crypto::derivation::{subaddress_keys, AccountKeys, SubaddressIndex};
use ringct_crypto::rct::verify_with_reason;
use ringct_crypto::{
    commit, derivation_to_scalar, derive_public_key, gen_rct_simple, generate_key_derivation,
    generate_key_image, pre_mlsag_hash,
};
use ringct_types::{Ctkey, CtkeyM, Decode, Encode, Key, RctSig, RctType};
use serde_json::json;
use std::io::Read;
use std::path::Path;

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

const SAMPLE_FEE: u64 = 10_000;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_key(what: &str, s: &str) -> std::result::Result<Key, Box<dyn std::error::Error>> {
    Key::from_hex(s.trim()).map_err(|e| format!("invalid {}: {}", what, e).into())
}

fn read_input(path: &Path) -> std::io::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path)
    }
}

/// Guess the encoding from the first meaningful byte.
fn detect_format(data: &[u8]) -> InputFormat {
    let text = match std::str::from_utf8(data) {
        Ok(t) => t.trim(),
        Err(_) => return InputFormat::Binary,
    };
    if text.starts_with('{') {
        InputFormat::Json
    } else if !text.is_empty() && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        InputFormat::Hex
    } else {
        InputFormat::Binary
    }
}

fn load_signature(ctx: &AppContext, path: &Path) -> std::result::Result<RctSig, Box<dyn std::error::Error>> {
    let data = read_input(path)?;
    let format = match ctx.format {
        InputFormat::Auto => detect_format(&data),
        f => f,
    };
    debug!("reading {} as {}", path.display(), format);
    let sig = match format {
        InputFormat::Json => serde_json::from_slice(&data)?,
        InputFormat::Hex => {
            let text = std::str::from_utf8(&data)?;
            RctSig::from_bytes(&hex::decode(text.trim())?)?
        }
        InputFormat::Binary | InputFormat::Auto => RctSig::from_bytes(&data)?,
    };
    Ok(sig)
}

fn print_json(value: &serde_json::Value) -> Result {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── Signature commands ─────────────────────────────────────────────────────

pub fn verify(ctx: &AppContext, path: &Path) -> Result {
    let sig = load_signature(ctx, path)?;
    let status = verify_with_reason(&sig);
    let prehash = pre_mlsag_hash(&sig).ok();

    if ctx.json {
        print_json(&json!({
            "valid": status.is_valid(),
            "status": status.to_string(),
            "type": u8::from(sig.rct_type),
            "inputs": sig.mix_ring.len(),
            "outputs": sig.out_pk.len(),
            "fee": sig.txn_fee,
            "pre_mlsag_hash": prehash.map(|h| h.to_hex()),
        }))?;
    } else {
        println!("Type:      {:?}", sig.rct_type);
        println!("Inputs:    {}", sig.mix_ring.len());
        println!("Ring size: {}", sig.mix_ring.first().map_or(0, |r| r.len()));
        println!("Outputs:   {}", sig.out_pk.len());
        println!("Fee:       {}", sig.txn_fee);
        if let Some(h) = prehash {
            println!("Prehash:   {}", h);
        }
        println!("Status:    {}", status);
    }

    if !status.is_valid() {
        return Err(format!("signature rejected: {}", status).into());
    }
    Ok(())
}

pub fn prehash(ctx: &AppContext, path: &Path) -> Result {
    let sig = load_signature(ctx, path)?;
    let hash = pre_mlsag_hash(&sig)?;
    if ctx.json {
        print_json(&json!({ "pre_mlsag_hash": hash.to_hex() }))
    } else {
        println!("{}", hash);
        Ok(())
    }
}

pub fn convert(ctx: &AppContext, path: &Path, to: InputFormat) -> Result {
    let sig = load_signature(ctx, path)?;
    match to {
        InputFormat::Json => println!("{}", serde_json::to_string_pretty(&sig)?),
        InputFormat::Hex => println!("{}", hex::encode(sig.to_bytes())),
        other => return Err(format!("cannot convert to {}", other).into()),
    }
    Ok(())
}

// ─── Key commands ───────────────────────────────────────────────────────────

pub fn key_image(ctx: &AppContext, public: &str, secret: &str) -> Result {
    let public = parse_key("public key", public)?;
    let secret = parse_key("secret key", secret)?;
    if scalar_mult_base(&secret) != public {
        return Err("secret key does not match public key".into());
    }
    let image = generate_key_image(&public, &secret)?;
    if ctx.json {
        print_json(&json!({ "key_image": image.to_hex() }))
    } else {
        println!("{}", image);
        Ok(())
    }
}

pub fn derive(ctx: &AppContext, public: &str, secret: &str, index: u64, spend: Option<&str>) -> Result {
    let public = parse_key("public key", public)?;
    let secret = parse_key("secret key", secret)?;
    let derivation = generate_key_derivation(&public, &secret)?;
    let shared = scalar_key(&derivation_to_scalar(&derivation, index));
    let output_key = match spend {
        Some(s) => Some(derive_public_key(&derivation, index, &parse_key("spend key", s)?)?),
        None => None,
    };

    if ctx.json {
        print_json(&json!({
            "derivation": derivation.to_hex(),
            "index": index,
            "shared_scalar": shared.to_hex(),
            "output_key": output_key.map(|k| k.to_hex()),
        }))
    } else {
        println!("Derivation:    {}", derivation);
        println!("Shared scalar: {}", shared);
        if let Some(k) = output_key {
            println!("Output key:    {}", k);
        }
        Ok(())
    }
}

pub fn keys(ctx: &AppContext, seed: &str, major: u32, minor: u32) -> Result {
    let account = AccountKeys::from_recovery_key(&parse_key("recovery key", seed)?);
    let index = SubaddressIndex::new(major, minor);
    let (sub_spend, sub_view) = subaddress_keys(&account, index)?;

    if ctx.json {
        print_json(&json!({
            "spend_secret": account.spend_secret.to_hex(),
            "spend_public": account.spend_public.to_hex(),
            "view_secret": account.view_secret.to_hex(),
            "view_public": account.view_public.to_hex(),
            "subaddress": {
                "major": major,
                "minor": minor,
                "spend_public": sub_spend.to_hex(),
                "view_public": sub_view.to_hex(),
            },
        }))
    } else {
        println!("Spend secret: {}", account.spend_secret);
        println!("Spend public: {}", account.spend_public);
        println!("View secret:  {}", account.view_secret);
        println!("View public:  {}", account.view_public);
        println!("Subaddress ({}, {}):", major, minor);
        println!("  Spend:      {}", sub_spend);
        println!("  View:       {}", sub_view);
        Ok(())
    }
}

// ─── Sample generation ──────────────────────────────────────────────────────

pub fn sample(inputs: usize, outputs: usize, ring_size: usize, out: Option<&Path>) -> Result {
    if inputs == 0 {
        return Err("need at least one input".into());
    }
    if outputs == 0 || outputs > MAX_M {
        return Err(format!("outputs must be between 1 and {}", MAX_M).into());
    }
    if ring_size < 2 {
        return Err("ring size must be at least 2".into());
    }

    let mut rng = OsRng;
    let mut in_sk = Vec::with_capacity(inputs);
    let mut in_amounts = Vec::with_capacity(inputs);
    let mut mix_ring = CtkeyM::with_capacity(inputs);
    let mut indices = Vec::with_capacity(inputs);
    for _ in 0..inputs {
        let amount: u64 = rng.gen_range(1_000_000..1_000_000_000);
        let x = random_scalar(&mut rng);
        let mask = random_scalar(&mut rng);
        let index = rng.gen_range(0..ring_size);
        let ring = (0..ring_size)
            .map(|i| {
                if i == index {
                    Ctkey { dest: scalar_mult_base(&scalar_key(&x)), mask: point_key(&commit(amount, &mask)) }
                } else {
                    let decoy_amount: u64 = rng.gen_range(1_000_000..1_000_000_000);
                    Ctkey {
                        dest: scalar_mult_base(&scalar_key(&random_scalar(&mut rng))),
                        mask: point_key(&commit(decoy_amount, &random_scalar(&mut rng))),
                    }
                }
            })
            .collect();
        in_sk.push(Ctkey { dest: scalar_key(&x), mask: scalar_key(&mask) });
        in_amounts.push(amount);
        mix_ring.push(ring);
        indices.push(index);
    }

    let spendable = in_amounts.iter().sum::<u64>() - SAMPLE_FEE;
    let share = spendable / outputs as u64;
    let mut out_amounts = vec![share; outputs];
    out_amounts[outputs - 1] += spendable - share * outputs as u64;

    let destinations: Vec<Key> =
        (0..outputs).map(|_| scalar_mult_base(&scalar_key(&random_scalar(&mut rng)))).collect();
    let amount_keys: Vec<Key> = (0..outputs).map(|_| scalar_key(&random_scalar(&mut rng))).collect();
    let message = scalar_key(&random_scalar(&mut rng));

    let (sig, _) = gen_rct_simple(
        &message,
        &in_sk,
        &in_amounts,
        &destinations,
        &out_amounts,
        &amount_keys,
        SAMPLE_FEE,
        &mix_ring,
        &indices,
        RctType::Bulletproof2,
        &mut rng,
    )?;
    info!("generated signature with {} inputs, {} outputs", inputs, outputs);

    let text = serde_json::to_string_pretty(&sig)?;
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"  {\"type\": 4}"), InputFormat::Json);
        assert_eq!(detect_format(b"04a0c21e\n"), InputFormat::Hex);
        assert_eq!(detect_format(&[4, 0x90, 0xea, 0xfe, 0x42]), InputFormat::Binary);
        assert_eq!(detect_format(b""), InputFormat::Binary);
    }

    #[test]
    fn test_sample_verifies() {
        let path = std::env::temp_dir().join(format!("ringct-sample-{}.json", std::process::id()));
        let ctx = AppContext { format: InputFormat::Auto, json: false };

        sample(2, 2, 4, Some(&path)).unwrap();
        let result = verify(&ctx, &path);

        let mut sig: RctSig = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        sig.txn_fee += 1;
        std::fs::write(&path, serde_json::to_string(&sig).unwrap()).unwrap();
        let tampered = verify(&ctx, &path);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_ok());
        assert!(tampered.is_err());
    }

    #[test]
    fn test_sample_rejects_bad_shapes() {
        assert!(sample(0, 2, 4, None).is_err());
        assert!(sample(1, MAX_M + 1, 4, None).is_err());
        assert!(sample(1, 2, 1, None).is_err());
    }

    #[test]
    fn test_parse_key() {
        let k = parse_key("key", " 0x0100000000000000000000000000000000000000000000000000000000000000\n").unwrap();
        assert_eq!(k, Key::IDENTITY);
        assert!(parse_key("key", "abcd").is_err());
    }
}
