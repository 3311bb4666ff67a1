//! `rtconfig validate`

use super::RootArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use runtime_config::{SecretDecryptor, validate_file};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Environment name (`production`) or path to a config file
    /// (`config/production.yaml`)
    pub file: String,

    #[command(flatten)]
    pub root: RootArgs,
}

pub fn execute(args: &ValidateArgs) -> Result<()> {
    validate_file(&args.file, &args.root.config_root, &SecretDecryptor::default())?;
    println!("{} {} is valid", "OK".green(), args.file.cyan());
    Ok(())
}
