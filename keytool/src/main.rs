//! AnyTrust Key Tool CLI

use clap::{Arg, ArgAction, Command};
use rand::rngs::OsRng;
use std::path::PathBuf;
use tracing::{error, info};

mod keys;

/// Returns the version of the crate.
pub const fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Flag for verbose output
const VERBOSE_FLAG: &str = "verbose";

/// Subcommand that writes a new member key pair.
const GENERATE_CMD: &str = "generate";

/// Subcommand that rewrites a member's public key file from its private key.
const EXPORT_CMD: &str = "export";

/// Subcommand that assembles a keyset from public key files.
const KEYSET_CMD: &str = "keyset";

/// Entrypoint for the AnyTrust Key Tool CLI
#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Define application
    let matches = Command::new("keytool")
        .version(crate_version())
        .about("Generate committee member keys and assemble keysets for registration.")
        .arg(
            Arg::new(VERBOSE_FLAG)
                .short('v')
                .long(VERBOSE_FLAG)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new(GENERATE_CMD)
                .about("Write a BLS private key (das_bls) and its public key with a proof of possession (das_bls.pub).")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .required(true)
                        .help("Directory to write key files to")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new(EXPORT_CMD)
                .about("Rewrite das_bls.pub (public key and proof of possession) from an existing das_bls.")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .required(true)
                        .help("Directory holding the private key file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new(KEYSET_CMD)
                .about("Verify public key files and print the keyset (and its hash) to register.")
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .required(true)
                        .help("Number of members assumed to be honest (must be >= 1)")
                        .value_parser(clap::builder::RangedU64ValueParser::<u64>::new().range(1..)),
                )
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .help("Public key files, in member order")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag(VERBOSE_FLAG) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Parse subcommands
    match matches.subcommand() {
        Some((GENERATE_CMD, matches)) => {
            let dir = matches.get_one::<PathBuf>("dir").unwrap();
            match keys::generate(&mut OsRng, dir).await {
                Ok(public) => {
                    info!(?dir, %public, "generated key");
                    return std::process::ExitCode::SUCCESS;
                }
                Err(e) => {
                    error!(error=?e, "failed to generate key");
                }
            }
        }
        Some((EXPORT_CMD, matches)) => {
            let dir = matches.get_one::<PathBuf>("dir").unwrap();
            match keys::export(dir).await {
                Ok(public) => {
                    info!(?dir, %public, "exported public key");
                    return std::process::ExitCode::SUCCESS;
                }
                Err(e) => {
                    error!(error=?e, "failed to export public key");
                }
            }
        }
        Some((KEYSET_CMD, matches)) => {
            let threshold = *matches.get_one::<u64>("threshold").unwrap();
            let files: Vec<PathBuf> = matches
                .get_many::<PathBuf>("files")
                .unwrap()
                .cloned()
                .collect();
            match keys::keyset(&files, threshold).await {
                Ok(keyset) => {
                    info!(members = keyset.len(), threshold, "assembled keyset");
                    println!("hash: {}", keyset.hash());
                    println!("keyset: {}", hex::encode(keyset.serialize()));
                    return std::process::ExitCode::SUCCESS;
                }
                Err(e) => {
                    error!(error=?e, "failed to assemble keyset");
                }
            }
        }
        Some((cmd, _)) => {
            error!(cmd, "invalid subcommand");
        }
        None => {
            error!("no subcommand provided");
        }
    }
    std::process::ExitCode::FAILURE
}
