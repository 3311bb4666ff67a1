//! `rtconfig decrypt`
//!
//! Decrypts in place, or into OUTPUT when given, then validates the
//! decrypted file if the config root has a schema.

use super::RootArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use runtime_config::resolver::{
    has_config_extension, read_config_file, resolve_config_file, schema_path,
};
use runtime_config::secrets::has_encryption_metadata;
use runtime_config::{SecretDecryptor, SopsCli, validate_file};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Path to an encrypted config file, e.g. `config/production.yaml`
    pub file: String,

    /// Where to write the decrypted config; defaults to overwriting FILE
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub root: RootArgs,
}

pub fn execute(args: &DecryptArgs) -> Result<()> {
    let root = &args.root.config_root;
    let path = resolve_config_file(root, &args.file)?;

    let raw = read_config_file(&path)?;
    if !has_encryption_metadata(&raw.contents) {
        anyhow::bail!("It looks like {} is already decrypted", args.file);
    }

    let written = match SopsCli::default().decrypt_file(&path, args.output.as_deref()) {
        Ok(written) => written,
        Err(e) if e.is_not_encrypted() => {
            anyhow::bail!("It looks like {} is already decrypted", args.file)
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to decrypt {}", path.display()));
        }
    };

    println!(
        "{} Decrypted {} to {}",
        "OK".green(),
        path.display(),
        written.display().to_string().cyan()
    );

    if !schema_path(root).is_file() {
        return Ok(());
    }

    let written_name = written.to_string_lossy();
    if !has_config_extension(&written_name) {
        warn!(path = %written.display(), "output has no config extension, skipping validation");
        return Ok(());
    }

    validate_file(&written_name, root, &SecretDecryptor::default())?;
    println!("{} {} is valid", "OK".green(), written_name.cyan());
    Ok(())
}
