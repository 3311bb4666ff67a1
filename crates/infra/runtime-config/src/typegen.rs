//! Rust type declarations generated from a user schema.
//!
//! This is a development aid. [`generate_types`] runs synchronously and is
//! what build pipelines should call. [`spawn_type_generation`] is the
//! best-effort variant used by the loader: it runs on a detached thread,
//! logs failures and is never joined, so it may not finish before the
//! process exits.

use crate::error::ConfigError;
use crate::options::TypeOptions;
use crate::resolver::{SCHEMA_FILE, read_schema_file};
use crate::schema::{RUNTIME_ENV_FIELD, Schema};
use atomicwrites::{AllowOverwrite, AtomicFile};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TypeGenError {
    #[error("Expected top-level attribute 'title' in schema definition")]
    MissingTitle,

    #[error("'title' attribute in schema definition must be a string, found {found}")]
    TitleNotString { found: &'static str },

    #[error("Schema title '{title}' collides with the root type name '{root}'")]
    TitleCollision { title: String, root: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write generated types to {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Read `<root>/schema.json` and write the generated types next to it.
pub fn generate_types(config_root: &Path, options: &TypeOptions) -> Result<PathBuf, TypeGenError> {
    let schema = read_schema_file(config_root)?.ok_or_else(|| ConfigError::SchemaNotFound {
        path: config_root.join(SCHEMA_FILE),
    })?;
    write_types(&schema, config_root, options)
}

/// Render `schema` and write it atomically to `<root>/<file_name>`.
pub fn write_types(
    schema: &Schema,
    config_root: &Path,
    options: &TypeOptions,
) -> Result<PathBuf, TypeGenError> {
    let source = render_types(schema, options)?;
    let path = config_root.join(&options.file_name);

    AtomicFile::new(&path, AllowOverwrite)
        .write(|f| f.write_all(source.as_bytes()))
        .map_err(|e| TypeGenError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;

    debug!(path = %path.display(), "wrote generated types");
    Ok(path)
}

/// Run [`write_types`] on a detached thread. Errors are logged, not returned.
pub fn spawn_type_generation(
    schema: Schema,
    config_root: PathBuf,
    options: TypeOptions,
) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("rtconfig-typegen".into())
        .spawn(move || {
            if let Err(e) = write_types(&schema, &config_root, &options) {
                warn!(error = %e, root = %config_root.display(), "type generation failed");
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "could not start type generation");
            None
        }
    }
}

/// Render Rust declarations for `schema`.
pub fn render_types(schema: &Schema, options: &TypeOptions) -> Result<String, TypeGenError> {
    let title = match schema.as_value().get("title") {
        None => return Err(TypeGenError::MissingTitle),
        Some(Value::String(title)) => title,
        Some(other) => {
            return Err(TypeGenError::TitleNotString {
                found: json_type_name(other),
            });
        }
    };

    let title_type = pascal_case(title);
    if title_type == options.root_type_name {
        return Err(TypeGenError::TitleCollision {
            title: title.clone(),
            root: options.root_type_name.clone(),
        });
    }

    let mut renderer = Renderer::default();
    renderer.names.insert(options.root_type_name.clone());
    let inner = renderer.struct_for(&title_type, schema.as_value());

    let mut out = String::from(
        "// @generated by rtconfig from schema.json. Do not edit by hand.\n\n\
         use serde::{Deserialize, Serialize};\n",
    );
    for decl in &renderer.decls {
        out.push('\n');
        out.push_str(decl);
    }

    let _ = write!(
        out,
        "\n#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n\
         pub struct {root} {{\n    \
         #[serde(flatten)]\n    \
         pub {field}: {inner},\n    \
         #[serde(rename = \"{RUNTIME_ENV_FIELD}\")]\n    \
         pub runtime_env: String,\n\
         }}\n",
        root = options.root_type_name,
        field = field_ident(&snake_case(&inner)),
    );

    Ok(out)
}

#[derive(Default)]
struct Renderer {
    decls: Vec<String>,
    names: HashSet<String>,
}

impl Renderer {
    /// Emit a struct for an object schema and return the name it was given.
    fn struct_for(&mut self, hint: &str, schema: &Value) -> String {
        let name = self.unique_name(hint);
        let slot = self.decls.len();
        self.decls.push(String::new());

        let required: HashSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut body = String::new();
        let mut idents = HashSet::new();
        if let Some(Value::Object(properties)) = schema.get("properties") {
            for (key, sub) in properties {
                let mut ty = self.type_for(key, sub);
                let optional = !required.contains(key.as_str());
                if optional && !ty.starts_with("Option<") {
                    ty = format!("Option<{ty}>");
                }

                let ident = unique_ident(&mut idents, field_ident(&snake_case(key)));
                if let Some(description) = sub.get("description").and_then(Value::as_str) {
                    for line in description.lines() {
                        let _ = writeln!(body, "    /// {line}");
                    }
                }
                if ident.trim_start_matches("r#") != key {
                    let _ = writeln!(body, "    #[serde(rename = {key:?})]");
                }
                if optional {
                    body.push_str(
                        "    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n",
                    );
                }
                let _ = writeln!(body, "    pub {ident}: {ty},");
            }
        }

        self.decls[slot] = format!(
            "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\npub struct {name} {{\n{body}}}\n"
        );
        name
    }

    fn type_for(&mut self, key: &str, schema: &Value) -> String {
        let (ty, nullable) = match schema.get("type") {
            Some(Value::String(t)) => (Some(t.as_str()), false),
            Some(Value::Array(types)) => {
                let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
                match non_null.as_slice() {
                    [single] => (Some(*single), names.len() > 1),
                    _ => (None, false),
                }
            }
            _ => (None, false),
        };

        let rust = match ty {
            Some("string") => "String".to_string(),
            Some("integer") => "i64".to_string(),
            Some("number") => "f64".to_string(),
            Some("boolean") => "bool".to_string(),
            Some("array") => {
                let item = schema
                    .get("items")
                    .filter(|i| i.is_object())
                    .map_or_else(
                        || "serde_json::Value".to_string(),
                        |items| self.type_for(&format!("{key}_item"), items),
                    );
                format!("Vec<{item}>")
            }
            Some("object") | None if schema.get("properties").is_some_and(Value::is_object) => {
                let hint = schema
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(key);
                self.struct_for(&pascal_case(hint), schema)
            }
            Some("object") => "serde_json::Map<String, serde_json::Value>".to_string(),
            None if is_string_enum(schema) => "String".to_string(),
            _ => "serde_json::Value".to_string(),
        };

        if nullable {
            format!("Option<{rust}>")
        } else {
            rust
        }
    }

    fn unique_name(&mut self, hint: &str) -> String {
        let base = if hint.is_empty() { "Unnamed" } else { hint };
        let mut name = base.to_string();
        let mut n = 2;
        while !self.names.insert(name.clone()) {
            name = format!("{base}{n}");
            n += 1;
        }
        name
    }
}

fn is_string_enum(schema: &Value) -> bool {
    schema
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|values| !values.is_empty() && values.iter().all(Value::is_string))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `"app settings"` / `"app-settings"` / `"appSettings"` → `AppSettings`.
pub fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `"maxConnections"` / `"max-connections"` → `max_connections`.
pub fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() {
                if prev_lower && !out.ends_with('_') {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
                prev_lower = false;
            } else {
                out.push(c);
                prev_lower = c.is_lowercase() || c.is_ascii_digit();
            }
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where",
    "while", "yield",
];

/// Keywords that cannot be raw identifiers.
const RESERVED_PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

fn field_ident(snake: &str) -> String {
    if snake.is_empty()
        || snake.starts_with(|c: char| c.is_ascii_digit())
        || RESERVED_PATH_KEYWORDS.contains(&snake)
    {
        format!("field_{snake}")
    } else if KEYWORDS.contains(&snake) {
        format!("r#{snake}")
    } else {
        snake.to_string()
    }
}

/// `ident`, or `ident_2`, `ident_3`, ... if an earlier field took it.
fn unique_ident(taken: &mut HashSet<String>, ident: String) -> String {
    let mut candidate = ident.clone();
    let mut n = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{ident}_{n}");
        n += 1;
    }
    candidate
}
