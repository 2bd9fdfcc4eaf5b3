use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// RingCT signature inspection and verification.
#[derive(Parser)]
#[command(name = "ringct")]
#[command(about = "Inspect, verify and generate simple RingCT signatures")]
#[command(version)]
struct Cli {
    /// Input encoding of signature files.
    #[arg(long, default_value = "auto")]
    format: InputFormat,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputFormat {
    Auto,
    Json,
    Hex,
    Binary,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Json => write!(f, "json"),
            Self::Hex => write!(f, "hex"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "hex" => Ok(Self::Hex),
            "binary" | "bin" => Ok(Self::Binary),
            _ => Err(format!("unknown format: {} (use auto, json, hex, or binary)", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a signature and report the first failing check.
    Verify {
        /// Signature file (`-` for stdin).
        file: PathBuf,
    },

    /// Print the message hash signed by every input.
    Prehash {
        /// Signature file (`-` for stdin).
        file: PathBuf,
    },

    /// Re-encode a signature as JSON or hex.
    Convert {
        /// Signature file (`-` for stdin).
        file: PathBuf,

        /// Output encoding (json or hex).
        #[arg(long, default_value = "json")]
        to: InputFormat,
    },

    /// Compute the key image of a one-time key pair.
    KeyImage {
        /// One-time public key (hex).
        #[arg(long)]
        public: String,

        /// One-time secret key (hex).
        #[arg(long)]
        secret: String,
    },

    /// Compute a key derivation and the one-time keys it yields.
    Derive {
        /// Counterparty public key: tx public key or recipient view key (hex).
        #[arg(long)]
        public: String,

        /// Own secret key: view secret or tx secret (hex).
        #[arg(long)]
        secret: String,

        /// Output index.
        #[arg(long, default_value = "0")]
        index: u64,

        /// Recipient spend public key; prints the one-time output key.
        #[arg(long)]
        spend: Option<String>,
    },

    /// Show the account keys and a subaddress for a recovery key.
    Keys {
        /// 32-byte recovery key (hex).
        #[arg(long)]
        seed: String,

        /// Subaddress account.
        #[arg(long, default_value = "0")]
        major: u32,

        /// Subaddress index within the account.
        #[arg(long, default_value = "0")]
        minor: u32,
    },

    /// Generate a random valid signature.
    Sample {
        /// Number of inputs.
        #[arg(long, default_value = "2")]
        inputs: usize,

        /// Number of outputs.
        #[arg(long, default_value = "2")]
        outputs: usize,

        /// Ring size per input.
        #[arg(long, default_value = "11")]
        ring_size: usize,

        /// Write the signature here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Options shared by every command.
struct AppContext {
    format: InputFormat,
    json: bool,
}

impl AppContext {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            json: cli.json,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let ctx = AppContext::from_cli(&cli);

    let result = match cli.command {
        Commands::Verify { file } => commands::verify(&ctx, &file),
        Commands::Prehash { file } => commands::prehash(&ctx, &file),
        Commands::Convert { file, to } => commands::convert(&ctx, &file, to),
        Commands::KeyImage { public, secret } => commands::key_image(&ctx, &public, &secret),
        Commands::Derive {
            public,
            secret,
            index,
            spend,
        } => commands::derive(&ctx, &public, &secret, index, spend.as_deref()),
        Commands::Keys { seed, major, minor } => commands::keys(&ctx, &seed, major, minor),
        Commands::Sample {
            inputs,
            outputs,
            ring_size,
            out,
        } => commands::sample(inputs, outputs, ring_size, out.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
