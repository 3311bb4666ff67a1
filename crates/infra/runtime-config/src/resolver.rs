//! Locating and reading config and schema files under a config root.
//!
//! Layout:
//! - `<root>/<env>.json`, `<root>/<env>.yaml`, `<root>/<env>.yml`
//! - `<root>/schema.json` (optional)

use crate::error::{ConfigError, Result};
use crate::schema::Schema;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported config file extensions, in preference order.
pub const CONFIG_FILE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// File name of the optional schema inside a config root.
pub const SCHEMA_FILE: &str = "schema.json";

/// A parsed config file. Immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfigFile {
    pub file_path: PathBuf,
    pub contents: Value,
}

/// Whether `name` already carries a supported extension.
pub fn has_config_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CONFIG_FILE_EXTENSIONS.contains(&ext))
}

/// Resolve the single config file for `name` under `config_root`.
///
/// A bare environment name (`production`) is tried against every supported
/// extension; more than one hit is an [`ConfigError::AmbiguousFile`].
/// A qualified file name (`config/production.yaml`) is used as given.
pub fn resolve_config_file(config_root: &Path, name: &str) -> Result<PathBuf> {
    if has_config_extension(name) {
        let path = PathBuf::from(name);
        if path.is_file() {
            return Ok(path);
        }
        return Err(ConfigError::ConfigNotFound {
            root: config_root.to_path_buf(),
            name: name.to_string(),
        });
    }

    let mut candidates: Vec<PathBuf> = CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|ext| config_root.join(format!("{name}.{ext}")))
        .filter(|p| p.is_file())
        .collect();

    if candidates.len() > 1 {
        return Err(ConfigError::AmbiguousFile {
            name: name.to_string(),
            candidates,
        });
    }

    candidates.pop().ok_or_else(|| ConfigError::ConfigNotFound {
        root: config_root.to_path_buf(),
        name: name.to_string(),
    })
}

/// Path of the schema file for a config root, whether or not it exists.
pub fn schema_path(config_root: &Path) -> PathBuf {
    config_root.join(SCHEMA_FILE)
}

/// Read and parse a config file; the format follows the extension.
pub fn read_config_file(path: &Path) -> Result<RawConfigFile> {
    let raw = read_to_string(path)?;
    let contents = parse_tree(path, &raw)?;

    if !contents.is_object() {
        return Err(ConfigError::InvalidRoot {
            path: path.to_path_buf(),
        });
    }

    debug!(path = %path.display(), "read config file");
    Ok(RawConfigFile {
        file_path: path.to_path_buf(),
        contents,
    })
}

/// Resolve and read the config file for `name` in one step.
pub fn find_and_read(config_root: &Path, name: &str) -> Result<RawConfigFile> {
    let path = resolve_config_file(config_root, name)?;
    read_config_file(&path)
}

/// Read `<root>/schema.json`; `Ok(None)` when the root has no schema.
pub fn read_schema_file(config_root: &Path) -> Result<Option<Schema>> {
    let path = schema_path(config_root);
    if !path.is_file() {
        debug!(path = %path.display(), "no schema file");
        return Ok(None);
    }

    let raw = read_to_string(&path)?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(Some(Schema::new(value)))
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse file contents as JSON or YAML depending on the extension.
pub fn parse_tree(path: &Path, raw: &str) -> Result<Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let parsed = match ext {
        "yaml" | "yml" => serde_yaml::from_str::<Value>(raw).map_err(|e| e.to_string()),
        _ => serde_json::from_str::<Value>(raw).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
