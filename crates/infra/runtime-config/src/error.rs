//! Error kinds for the load/validate pipeline.
//!
//! Every stage returns [`ConfigError`] directly; stages never wrap or
//! rewrite each other's errors, so callers can match on the variant that
//! actually failed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file found for '{name}' in {root}")]
    ConfigNotFound { root: PathBuf, name: String },

    #[error("Ambiguous config file for '{name}': {}", display_paths(.candidates))]
    AmbiguousFile {
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("Environment variable '{variable}' referenced at '{path}' is not set")]
    MissingEnvVar { variable: String, path: String },

    #[error("No schema file found at {path}. Cannot validate without a schema.")]
    SchemaNotFound { path: PathBuf },

    #[error("Config failed schema validation:\n{violations}")]
    Validation { violations: Violations },

    #[error("Invalid loader options:\n{violations}")]
    InvalidOptions { violations: Violations },

    #[error("Runtime environment is not set: define ${variable} or pass an explicit environment")]
    RuntimeEnvUndetermined { variable: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Config root must be an object: {path}")]
    InvalidRoot { path: PathBuf },

    #[error("Schema {path} could not be compiled: {message}")]
    InvalidSchema { path: PathBuf, message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failures reported by the secret-decryption backend.
#[derive(Error, Debug)]
pub enum DecryptionError {
    /// The backend signalled (exit code 1) that the file holds no ciphertext.
    #[error("{path} is not encrypted (it may already have been decrypted)")]
    NotEncrypted { path: PathBuf },

    #[error("Decryption backend '{program}' not found in PATH")]
    BackendMissing { program: String },

    #[error("Decrypting {path} failed (exit code {}): {stderr}", display_code(.code))]
    Failed {
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Decryption of {path} produced unreadable output: {message}")]
    InvalidOutput { path: PathBuf, message: String },

    #[error("Failed to run decryption backend: {0}")]
    Spawn(#[source] std::io::Error),
}

impl DecryptionError {
    pub fn is_not_encrypted(&self) -> bool {
        matches!(self, Self::NotEncrypted { .. })
    }
}

/// A single schema constraint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending value; empty for the document root.
    pub path: String,

    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// All violations found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {v}")?;
        }
        Ok(())
    }
}

impl From<Vec<Violation>> for Violations {
    fn from(v: Vec<Violation>) -> Self {
        Self(v)
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}
