//! Options controlling a [`ConfigLoader`](crate::loader::ConfigLoader).
//!
//! Options are checked eagerly when a loader is constructed: they are
//! serialized to JSON and validated against [`options_schema`], and the
//! substitution pattern is compiled.

use crate::error::{ConfigError, Result, Violation};
use crate::schema::{OPTIONS_SCHEMA_TITLE, Schema, augment};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_ROOT: &str = "config";

/// Environment variable selecting the active runtime environment.
pub const DEFAULT_RUNTIME_ENV_NAME: &str = "RUNTIME_ENV";

/// Matches `${NAME}`.
pub const DEFAULT_SUBSTITUTION_PATTERN: &str = r"\$\{(\w+)\}";

pub const DEFAULT_ROOT_TYPE_NAME: &str = "Config";

pub const DEFAULT_TYPES_FILE_NAME: &str = "config_types.rs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Directory holding the config files and optional `schema.json`.
    pub config_root: PathBuf,

    /// Name of the environment variable whose value selects the config file.
    pub runtime_env_name: String,

    /// Type generation settings; `None` (serialized as `false`) disables it.
    #[serde(with = "types_or_false")]
    pub types: Option<TypeOptions>,

    /// Regex with one capture group yielding the variable name.
    pub substitution_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeOptions {
    pub root_type_name: String,
    pub file_name: String,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            root_type_name: DEFAULT_ROOT_TYPE_NAME.into(),
            file_name: DEFAULT_TYPES_FILE_NAME.into(),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config_root: PathBuf::from(DEFAULT_CONFIG_ROOT),
            runtime_env_name: DEFAULT_RUNTIME_ENV_NAME.into(),
            types: Some(TypeOptions::default()),
            substitution_pattern: DEFAULT_SUBSTITUTION_PATTERN.into(),
        }
    }
}

impl Options {
    pub fn with_config_root(mut self, root: impl AsRef<Path>) -> Self {
        self.config_root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_runtime_env_name(mut self, name: impl Into<String>) -> Self {
        self.runtime_env_name = name.into();
        self
    }

    pub fn with_types(mut self, types: Option<TypeOptions>) -> Self {
        self.types = types;
        self
    }

    pub fn with_substitution_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.substitution_pattern = pattern.into();
        self
    }

    /// Check the options and compile the substitution pattern.
    pub fn validate(&self) -> Result<Regex> {
        let value = serde_json::to_value(self).map_err(invalid)?;

        // No-op: the options schema carries the reserved title.
        let schema = augment(&options_schema());
        let mut violations = crate::validation::collect_violations(
            &value,
            &schema,
            Path::new("<options schema>"),
        )?;

        let pattern = match Regex::new(&self.substitution_pattern) {
            Ok(re) if re.captures_len() == 2 => Some(re),
            Ok(re) => {
                violations.push(Violation {
                    path: "/substitutionPattern".into(),
                    message: format!(
                        "pattern must have exactly one capture group, found {}",
                        re.captures_len() - 1
                    ),
                });
                None
            }
            Err(e) => {
                violations.push(Violation {
                    path: "/substitutionPattern".into(),
                    message: e.to_string(),
                });
                None
            }
        };

        match pattern {
            Some(pattern) if violations.is_empty() => Ok(pattern),
            _ => Err(ConfigError::InvalidOptions {
                violations: violations.into(),
            }),
        }
    }
}

fn invalid(e: serde_json::Error) -> ConfigError {
    ConfigError::InvalidOptions {
        violations: vec![Violation {
            path: String::new(),
            message: e.to_string(),
        }]
        .into(),
    }
}

/// JSON Schema for [`Options`] in their serialized form.
pub fn options_schema() -> Schema {
    Schema::new(json!({
        "type": "object",
        "title": OPTIONS_SCHEMA_TITLE,
        "required": ["configRoot", "runtimeEnvName", "types", "substitutionPattern"],
        "additionalProperties": false,
        "properties": {
            "configRoot": {
                "title": "Config root path",
                "description": "A path to a directory that contains all config files",
                "examples": ["config", "../config", "app/config/"],
                "type": "string",
                "minLength": 1
            },
            "runtimeEnvName": {
                "title": "Runtime environment variable name",
                "description": "The value of this variable determines which config is loaded",
                "examples": ["RUNTIME_ENV", "APP_ENV"],
                "type": "string",
                "pattern": "^[a-zA-Z]\\w*$"
            },
            "types": {
                "title": "Type generation options",
                "description": "Controls generation of Rust type declarations for the config, or false to disable it",
                "oneOf": [
                    { "const": false },
                    {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["rootTypeName", "fileName"],
                        "properties": {
                            "rootTypeName": {
                                "title": "Root type name",
                                "examples": ["Config", "AppConfig"],
                                "type": "string",
                                "pattern": "^[A-Z]\\w*$"
                            },
                            "fileName": {
                                "title": "File name for generated types",
                                "examples": ["config_types.rs"],
                                "type": "string",
                                "minLength": 1
                            }
                        }
                    }
                ]
            },
            "substitutionPattern": {
                "title": "Substitution pattern",
                "description": "Regular expression matching placeholders to be replaced by environment variable values",
                "examples": ["\\$\\{(\\w+)\\}", "\\$(\\w+)"],
                "type": "string",
                "format": "regex"
            }
        }
    }))
}

mod types_or_false {
    use super::{Deserialize, Deserializer, Serialize, Serializer, TypeOptions, Value};

    pub fn serialize<S: Serializer>(
        types: &Option<TypeOptions>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match types {
            Some(t) => t.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TypeOptions>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(false) | Value::Null => Ok(None),
            other => serde_json::from_value(other)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
