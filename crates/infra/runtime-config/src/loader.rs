//! The load pipeline and its per-instance cache.
//!
//! The loading process:
//! 1. Determine the runtime environment (explicit override or env var)
//! 2. Resolve and read `<root>/<env>.{json,yaml,yml}`
//! 3. Decrypt SOPS-encrypted values
//! 4. Substitute environment placeholders and inject `runtimeEnv`
//! 5. If `<root>/schema.json` exists: augment it and validate
//!
//! The result is cached on the loader until [`ConfigLoader::reset`].

use crate::error::{ConfigError, Result};
use crate::hydrate::Hydrator;
use crate::options::Options;
use crate::resolver::{find_and_read, read_schema_file, schema_path};
use crate::schema::augment;
use crate::secrets::{DecryptionBackend, SecretDecryptor};
use crate::typegen::spawn_type_generation;
use crate::validation::validate;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where a loader is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Uninitialized,
    Loaded,
    Failed,
}

/// Loads, decrypts, hydrates and validates the config for one environment.
pub struct ConfigLoader {
    options: Options,
    pattern: Regex,
    runtime_env: Option<String>,
    decryptor: SecretDecryptor,
    cache: Option<Value>,
    failed: bool,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("options", &self.options)
            .field("runtime_env", &self.runtime_env)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Create a loader, rejecting invalid options up front.
    pub fn new(options: Options) -> Result<Self> {
        let pattern = options.validate()?;
        Ok(Self {
            options,
            pattern,
            runtime_env: None,
            decryptor: SecretDecryptor::default(),
            cache: None,
            failed: false,
        })
    }

    /// Use `env` instead of reading the runtime-environment variable.
    pub fn with_runtime_env(mut self, env: impl Into<String>) -> Self {
        self.runtime_env = Some(env.into());
        self
    }

    pub fn with_backend(mut self, backend: Box<dyn DecryptionBackend>) -> Self {
        self.decryptor = SecretDecryptor::new(backend);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn status(&self) -> LoadStatus {
        if self.cache.is_some() {
            LoadStatus::Loaded
        } else if self.failed {
            LoadStatus::Failed
        } else {
            LoadStatus::Uninitialized
        }
    }

    /// Drop the cached config so the next [`load`](Self::load) reads from disk.
    pub fn reset(&mut self) {
        self.cache = None;
        self.failed = false;
    }

    /// The active runtime environment name.
    pub fn runtime_env(&self) -> Result<String> {
        if let Some(env) = &self.runtime_env {
            return Ok(env.clone());
        }

        std::env::var(&self.options.runtime_env_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::RuntimeEnvUndetermined {
                variable: self.options.runtime_env_name.clone(),
            })
    }

    /// Load the config, or return the cached one from an earlier call.
    ///
    /// Errors are returned as produced by the failing stage and are not
    /// cached; a later call runs the pipeline again.
    pub fn load(&mut self) -> Result<&Value> {
        let config = match self.cache.take() {
            Some(config) => config,
            None => match self.run_pipeline() {
                Ok(config) => config,
                Err(e) => {
                    self.failed = true;
                    return Err(e);
                }
            },
        };

        self.failed = false;
        Ok(self.cache.insert(config))
    }

    /// Validate the active environment's file against the root's schema.
    ///
    /// Unlike [`load`](Self::load), a missing schema is an error here.
    pub fn validate(&self) -> Result<()> {
        let env = self.runtime_env()?;
        validate_file(&env, &self.options.config_root, &self.decryptor)
    }

    fn run_pipeline(&self) -> Result<Value> {
        let env = self.runtime_env()?;
        let root = self.options.config_root.as_path();

        let file = find_and_read(root, &env)?;
        debug!(env = %env, path = %file.file_path.display(), "resolved config file");

        let decrypted = self.decryptor.decrypt(&file.file_path, file.contents)?;
        let mut config = Hydrator::new(&env, &self.pattern).hydrate(decrypted)?;

        match read_schema_file(root)? {
            Some(schema) => {
                validate(&mut config, &augment(&schema), &schema_path(root))?;
                info!(env = %env, "config is valid");

                if let Some(types) = &self.options.types {
                    // Detached; never joined.
                    let _ = spawn_type_generation(schema, root.to_path_buf(), types.clone());
                }
            }
            None => {
                warn!(
                    path = %schema_path(root).display(),
                    "no schema file found, skipping validation"
                );
            }
        }

        Ok(config)
    }
}

/// Validate one config file against `<config_root>/schema.json`.
///
/// `file` is an environment name or a path with a config extension. The
/// file is decrypted but placeholders are left as they are.
pub fn validate_file(file: &str, config_root: &Path, decryptor: &SecretDecryptor) -> Result<()> {
    let raw = find_and_read(config_root, file)?;
    let mut config = decryptor.decrypt(&raw.file_path, raw.contents)?;

    let path = schema_path(config_root);
    let schema = read_schema_file(config_root)?
        .ok_or_else(|| ConfigError::SchemaNotFound { path: path.clone() })?;

    validate(&mut config, &augment(&schema), &path)?;
    info!(path = %raw.file_path.display(), "config is valid");
    Ok(())
}
