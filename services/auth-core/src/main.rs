//! Auth Core - operator CLI.
//!
//! Hashes and verifies credentials and issues or inspects tokens using the
//! same configuration the services boot with.

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;

use auth_core::{
    AuthConfig, CredentialHasher, HashingPool, SecretKeyStore, TokenIssuer, TokenType,
    TokenValidator,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "auth-core")]
#[command(about = "Credential hashing and token tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a password read from stdin
    Hash,

    /// Verify a password read from stdin against a stored record
    Verify {
        /// Encoded credential record
        record: String,
    },

    /// Issue a token
    Issue {
        /// Subject identifier
        #[arg(long)]
        subject: String,

        /// Token type
        #[arg(long = "type", value_enum, default_value_t = Kind::Access)]
        kind: Kind,

        /// Set the remember-me claim
        #[arg(long)]
        remember_me: bool,
    },

    /// Validate a token and print its claims
    Inspect {
        /// Compact token
        token: String,

        /// Fail unless the token has this type
        #[arg(long, value_enum)]
        expect: Option<Kind>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Access,
    Refresh,
    SettingsAccess,
}

impl From<Kind> for TokenType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Access => Self::Access,
            Kind::Refresh => Self::Refresh,
            Kind::SettingsAccess => Self::SettingsAccess,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = AuthConfig::from_env()?;
    rust_common::init_tracing(&config.tracing())?;

    match cli.command {
        Commands::Hash => {
            let pool = hashing_pool(&config)?;
            let password = read_password()?;
            println!("{}", pool.hash(password.as_bytes()).await?);
        }
        Commands::Verify { record } => {
            let pool = hashing_pool(&config)?;
            let password = read_password()?;
            if !pool.verify(&record, password.as_bytes()).await? {
                println!("mismatch");
                return Ok(ExitCode::FAILURE);
            }
            println!("match");
            if pool.hasher().needs_rehash(&record)? {
                info!("record uses an outdated profile and should be rehashed");
            }
        }
        Commands::Issue {
            subject,
            kind,
            remember_me,
        } => {
            let keys = Arc::new(SecretKeyStore::from_config(&config)?);
            let token = TokenIssuer::new(keys).issue(&subject, kind.into(), remember_me)?;
            println!("{token}");
        }
        Commands::Inspect { token, expect } => {
            let keys = Arc::new(SecretKeyStore::from_config(&config)?);
            let claims = TokenValidator::new(keys).validate_token_at(&token, Utc::now())?;

            if let Some(expected) = expect.map(TokenType::from) {
                if claims.token_type != expected {
                    eprintln!("expected {expected}, got {}", claims.token_type);
                    return Ok(ExitCode::FAILURE);
                }
            }
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn hashing_pool(config: &AuthConfig) -> Result<HashingPool, Box<dyn std::error::Error>> {
    let hasher = CredentialHasher::new(config.hasher)?;
    Ok(HashingPool::new(hasher, config.hash_max_concurrency)?)
}

fn read_password() -> io::Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}
