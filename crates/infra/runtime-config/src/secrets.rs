//! Decryption of SOPS-encrypted config files.
//!
//! A file is encrypted iff its top-level object carries a `sops` metadata
//! block. Plain files pass through untouched; encrypted ones are handed to
//! a [`DecryptionBackend`], by default the `sops` executable.

use crate::error::{DecryptionError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Top-level key holding encryption metadata.
pub const METADATA_KEY: &str = "sops";

/// Exit code the backend uses for "file is not encrypted".
pub const NOT_ENCRYPTED_EXIT_CODE: i32 = 1;

/// Whether `tree` carries an encryption metadata block.
pub fn has_encryption_metadata(tree: &Value) -> bool {
    tree.as_object()
        .is_some_and(|map| map.contains_key(METADATA_KEY))
}

/// Turns an encrypted file on disk into its decrypted tree.
pub trait DecryptionBackend: Send + Sync {
    fn decrypt(&self, path: &Path) -> std::result::Result<Value, DecryptionError>;
}

/// Replaces encrypted leaves with plaintext using a [`DecryptionBackend`].
pub struct SecretDecryptor {
    backend: Box<dyn DecryptionBackend>,
}

impl Default for SecretDecryptor {
    fn default() -> Self {
        Self::new(Box::new(SopsCli::default()))
    }
}

impl SecretDecryptor {
    pub fn new(backend: Box<dyn DecryptionBackend>) -> Self {
        Self { backend }
    }

    /// Decrypt `contents` read from `file_path`.
    ///
    /// Returns `contents` unchanged when there is no metadata block;
    /// otherwise the backend output with the metadata block removed.
    pub fn decrypt(&self, file_path: &Path, contents: Value) -> Result<Value> {
        if !has_encryption_metadata(&contents) {
            debug!(path = %file_path.display(), "no encryption metadata, skipping decryption");
            return Ok(contents);
        }

        debug!(path = %file_path.display(), "decrypting config file");
        let mut decrypted = self.backend.decrypt(file_path)?;
        if let Value::Object(map) = &mut decrypted {
            map.shift_remove(METADATA_KEY);
        }
        Ok(decrypted)
    }
}

/// The `sops` command-line tool.
#[derive(Debug, Clone)]
pub struct SopsCli {
    program: String,
}

impl Default for SopsCli {
    fn default() -> Self {
        Self {
            program: "sops".to_string(),
        }
    }
}

impl SopsCli {
    /// Use a different executable name or path.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `sops --decrypt --output-type json <path>`
    pub fn build_decrypt_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--decrypt")
            .arg("--output-type")
            .arg("json")
            .arg(path);
        cmd
    }

    /// `sops --decrypt --output <output> <path>`, or `--in-place` without an output.
    pub fn build_decrypt_file_command(&self, path: &Path, output: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--decrypt");
        match output {
            Some(output) => cmd.arg("--output").arg(output),
            None => cmd.arg("--in-place"),
        };
        cmd.arg(path);
        cmd
    }

    /// Decrypt a file on disk, writing to `output` or back to `path`.
    pub fn decrypt_file(
        &self,
        path: &Path,
        output: Option<&Path>,
    ) -> std::result::Result<PathBuf, DecryptionError> {
        let cmd = self.build_decrypt_file_command(path, output);
        self.run(cmd, path)?;
        Ok(output.unwrap_or(path).to_path_buf())
    }

    fn run(&self, mut cmd: Command, path: &Path) -> std::result::Result<Output, DecryptionError> {
        which::which(&self.program).map_err(|_| DecryptionError::BackendMissing {
            program: self.program.clone(),
        })?;

        let out = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DecryptionError::BackendMissing {
                    program: self.program.clone(),
                }
            } else {
                DecryptionError::Spawn(e)
            }
        })?;

        check_status(path, out)
    }
}

impl DecryptionBackend for SopsCli {
    fn decrypt(&self, path: &Path) -> std::result::Result<Value, DecryptionError> {
        let out = self.run(self.build_decrypt_command(path), path)?;
        serde_json::from_slice(&out.stdout).map_err(|e| DecryptionError::InvalidOutput {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Map the backend's exit status onto [`DecryptionError`].
fn check_status(path: &Path, out: Output) -> std::result::Result<Output, DecryptionError> {
    if out.status.success() {
        return Ok(out);
    }

    match out.status.code() {
        Some(NOT_ENCRYPTED_EXIT_CODE) => Err(DecryptionError::NotEncrypted {
            path: path.to_path_buf(),
        }),
        code => Err(DecryptionError::Failed {
            path: path.to_path_buf(),
            code,
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        }),
    }
}
