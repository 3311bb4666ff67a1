//! `rtconfig generate-types`

use super::RootArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use runtime_config::TypeOptions;
use runtime_config::options::{DEFAULT_ROOT_TYPE_NAME, DEFAULT_TYPES_FILE_NAME};
use runtime_config::typegen::generate_types;

#[derive(Args, Debug)]
pub struct GenerateTypesArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Name of the generated root struct
    #[arg(long, default_value = DEFAULT_ROOT_TYPE_NAME)]
    pub root_type_name: String,

    /// File written into the config root
    #[arg(long, default_value = DEFAULT_TYPES_FILE_NAME)]
    pub file_name: String,
}

pub fn execute(args: &GenerateTypesArgs) -> Result<()> {
    let options = TypeOptions {
        root_type_name: args.root_type_name.clone(),
        file_name: args.file_name.clone(),
    };

    let path = generate_types(&args.root.config_root, &options)?;
    println!(
        "{} Wrote {}",
        "OK".green(),
        path.display().to_string().cyan()
    );
    Ok(())
}
