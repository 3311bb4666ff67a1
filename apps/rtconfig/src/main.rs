//! `rtconfig` command-line tool.
//!
//! Validates, decrypts and generates types for environment-scoped config
//! files managed by the `runtime-config` crate.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rtconfig")]
#[command(about = "Validate and decrypt environment-scoped config files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file against <config-root>/schema.json
    Validate(commands::validate::ValidateArgs),

    /// Decrypt a SOPS-encrypted config file
    Decrypt(commands::decrypt::DecryptArgs),

    /// Generate Rust types from <config-root>/schema.json
    GenerateTypes(commands::generate_types::GenerateTypesArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match cli.command {
        Commands::Validate(args) => commands::validate::execute(&args),
        Commands::Decrypt(args) => commands::decrypt::execute(&args),
        Commands::GenerateTypes(args) => commands::generate_types::execute(&args),
    }
}
