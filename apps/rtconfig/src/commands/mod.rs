pub mod decrypt;
pub mod generate_types;
pub mod validate;

use clap::Args;
use runtime_config::options::DEFAULT_CONFIG_ROOT;
use std::path::PathBuf;

/// Location of the config files, shared by every subcommand.
#[derive(Args, Debug)]
pub struct RootArgs {
    /// Config folder containing your config files and optional schema.json
    #[arg(
        short = 'c',
        long,
        env = "RTCONFIG_CONFIG_ROOT",
        default_value = DEFAULT_CONFIG_ROOT
    )]
    pub config_root: PathBuf,
}
