//! Environment-scoped configuration loading.
//!
//! This crate provides:
//! - [`ConfigLoader`]: loads `<config_root>/<env>.{json,yaml,yml}` for the
//!   active runtime environment and caches the result
//! - [`secrets`]: SOPS decryption of encrypted values
//! - [`hydrate`]: `${VAR}` substitution from the process environment
//! - [`schema`] / [`validation`]: optional JSON Schema validation against
//!   `<config_root>/schema.json`
//! - [`typegen`]: Rust type declarations generated from the schema
//!
//! # Pipeline
//! 1. Resolve the config file for the runtime environment
//! 2. Decrypt it if it carries a `sops` metadata block
//! 3. Replace placeholders with environment values, inject `runtimeEnv`
//! 4. Validate against the augmented schema, if one exists
//!
//! # Example
//! ```no_run
//! use runtime_config::{ConfigLoader, Options};
//!
//! let mut loader = ConfigLoader::new(Options::default()).unwrap();
//! let config = loader.load().unwrap();
//! println!("Running in {}", config["runtimeEnv"]);
//! ```
//!
//! # Environment Variables
//! - `RUNTIME_ENV` (configurable via [`Options::runtime_env_name`]): selects
//!   the config file
//! - any variable referenced by a placeholder in a config file

pub mod error;
pub mod hydrate;
pub mod loader;
pub mod options;
pub mod resolver;
pub mod schema;
pub mod secrets;
pub mod typegen;
pub mod validation;

// Re-exports for convenient access
pub use error::{ConfigError, DecryptionError, Result, Violation, Violations};
pub use loader::{ConfigLoader, LoadStatus, validate_file};
pub use options::{Options, TypeOptions};
pub use schema::{Schema, augment};
pub use secrets::{DecryptionBackend, SecretDecryptor, SopsCli};
