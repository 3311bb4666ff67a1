//! JSON Schema validation of a config tree.
//!
//! Defaults declared in the schema are written into the instance before
//! validation, and every violation is collected rather than stopping at
//! the first one.

use crate::error::{ConfigError, Result, Violation};
use crate::schema::Schema;
use serde_json::Value;
use std::path::Path;

/// Validate `config` against `schema`, filling in schema defaults first.
///
/// `schema_path` only labels compilation errors.
pub fn validate(config: &mut Value, schema: &Schema, schema_path: &Path) -> Result<()> {
    apply_defaults(config, schema.as_value());

    let violations = collect_violations(config, schema, schema_path)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            violations: violations.into(),
        })
    }
}

/// Compile `schema` and return every violation `instance` has against it.
pub fn collect_violations(
    instance: &Value,
    schema: &Schema,
    schema_path: &Path,
) -> Result<Vec<Violation>> {
    let validator = jsonschema::options()
        .should_validate_formats(true)
        .build(schema.as_value())
        .map_err(|e| ConfigError::InvalidSchema {
            path: schema_path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(validator
        .iter_errors(instance)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect())
}

/// Deepest instance nesting filled; recursive schemas with object
/// defaults would otherwise grow the instance forever.
const MAX_DEFAULTS_DEPTH: usize = 32;

/// Write `default` values from `properties` subschemas into `instance`
/// wherever the property is missing, recursing into objects and `items`.
///
/// Local `$ref` pointers (`#/definitions/...`) are resolved against
/// `schema` and every `allOf` member is applied. `anyOf`/`oneOf` branches
/// are not, since which branch applies is unknown before validation.
pub fn apply_defaults(instance: &mut Value, schema: &Value) {
    fill_defaults(instance, schema, schema, &mut Vec::new(), 0);
}

/// `applied` holds the schemas already applied to this instance node.
fn fill_defaults<'s>(
    instance: &mut Value,
    schema: &'s Value,
    root: &'s Value,
    applied: &mut Vec<&'s Value>,
    depth: usize,
) {
    if depth > MAX_DEFAULTS_DEPTH || applied.iter().any(|s| std::ptr::eq(*s, schema)) {
        return;
    }
    applied.push(schema);

    if let Some(target) = resolve_local_ref(schema, root) {
        fill_defaults(instance, target, root, applied, depth);
    }
    if let Some(Value::Array(members)) = schema.get("allOf") {
        for member in members {
            fill_defaults(instance, member, root, applied, depth);
        }
    }

    match instance {
        Value::Object(map) => {
            let Some(Value::Object(properties)) = schema.get("properties") else {
                return;
            };
            for (key, subschema) in properties {
                if !map.contains_key(key)
                    && let Some(default) = subschema.get("default")
                {
                    map.insert(key.clone(), default.clone());
                }
                if let Some(child) = map.get_mut(key) {
                    fill_defaults(child, subschema, root, &mut Vec::new(), depth + 1);
                }
            }
        }
        Value::Array(items) => {
            let Some(item_schema) = schema.get("items").filter(|s| s.is_object()) else {
                return;
            };
            for item in items {
                fill_defaults(item, item_schema, root, &mut Vec::new(), depth + 1);
            }
        }
        _ => {}
    }
}

/// Follow a `$ref` of the form `#` or `#/json/pointer` within `root`.
fn resolve_local_ref<'a>(schema: &Value, root: &'a Value) -> Option<&'a Value> {
    let reference = schema.get("$ref")?.as_str()?;
    root.pointer(reference.strip_prefix('#')?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::augment;
    use serde_json::json;

    fn strict_schema() -> Schema {
        Schema::new(json!({
            "title": "App",
            "type": "object",
            "additionalProperties": false,
            "required": ["db"],
            "properties": {
                "db": {"type": "object", "required": ["host"]}
            }
        }))
    }

    #[test]
    fn augmented_schema_accepts_runtime_env() {
        let mut config = json!({"db": {"host": "localhost"}, "runtimeEnv": "development"});
        let schema = augment(&strict_schema());
        validate(&mut config, &schema, Path::new("schema.json")).unwrap();
    }

    #[test]
    fn unaugmented_schema_rejects_runtime_env() {
        let mut config = json!({"db": {"host": "localhost"}, "runtimeEnv": "development"});
        let err = validate(&mut config, &strict_schema(), Path::new("schema.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn collects_every_violation() {
        let schema = Schema::new(json!({
            "type": "object",
            "required": ["name", "port"],
            "properties": {
                "name": {"type": "string"},
                "port": {"type": "integer"},
                "debug": {"type": "boolean"}
            }
        }));
        let mut config = json!({"port": "eighty", "debug": "yes"});

        let err = validate(&mut config, &schema, Path::new("schema.json")).unwrap_err();
        let ConfigError::Validation { violations } = err else {
            panic!("expected Validation error");
        };
        assert_eq!(violations.len(), 3);
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&""));
        assert!(paths.contains(&"/port"));
        assert!(paths.contains(&"/debug"));
    }

    #[test]
    fn defaults_are_filled_before_required_check() {
        let schema = Schema::new(json!({
            "type": "object",
            "required": ["log"],
            "properties": {
                "log": {
                    "type": "object",
                    "default": {},
                    "required": ["level"],
                    "properties": {"level": {"type": "string", "default": "info"}}
                }
            }
        }));
        let mut config = json!({});

        validate(&mut config, &schema, Path::new("schema.json")).unwrap();
        assert_eq!(config, json!({"log": {"level": "info"}}));
    }

    #[test]
    fn defaults_do_not_override_present_values() {
        let schema = json!({"properties": {"level": {"default": "info"}}});
        let mut config = json!({"level": "debug"});
        apply_defaults(&mut config, &schema);
        assert_eq!(config, json!({"level": "debug"}));
    }

    #[test]
    fn defaults_reach_array_items() {
        let schema = json!({
            "properties": {
                "servers": {
                    "type": "array",
                    "items": {"properties": {"port": {"default": 80}}}
                }
            }
        });
        let mut config = json!({"servers": [{"host": "a"}, {"host": "b", "port": 8080}]});
        apply_defaults(&mut config, &schema);
        assert_eq!(
            config,
            json!({"servers": [{"host": "a", "port": 80}, {"host": "b", "port": 8080}]})
        );
    }

    #[test]
    fn defaults_follow_local_refs() {
        let schema = Schema::new(json!({
            "type": "object",
            "required": ["db"],
            "properties": {
                "db": {"$ref": "#/definitions/db", "default": {}}
            },
            "definitions": {
                "db": {
                    "type": "object",
                    "required": ["pool"],
                    "properties": {"pool": {"type": "integer", "default": 5}}
                }
            }
        }));
        let mut config = json!({});

        validate(&mut config, &schema, Path::new("schema.json")).unwrap();
        assert_eq!(config, json!({"db": {"pool": 5}}));
    }

    #[test]
    fn defaults_follow_all_of_members() {
        let schema = Schema::new(json!({
            "type": "object",
            "allOf": [
                {"required": ["level"], "properties": {"level": {"default": "info"}}},
                {"properties": {"format": {"default": "json"}}}
            ]
        }));
        let mut config = json!({});

        validate(&mut config, &schema, Path::new("schema.json")).unwrap();
        assert_eq!(config, json!({"level": "info", "format": "json"}));
    }

    #[test]
    fn defaults_skip_one_of_branches() {
        let schema = json!({
            "oneOf": [
                {"properties": {"a": {"default": 1}}},
                {"properties": {"b": {"default": 2}}}
            ]
        });
        let mut config = json!({});
        apply_defaults(&mut config, &schema);
        assert_eq!(config, json!({}));
    }

    #[test]
    fn self_referencing_schema_terminates() {
        let schema = json!({
            "$ref": "#",
            "properties": {"child": {"$ref": "#", "default": {}}}
        });
        let mut config = json!({});
        apply_defaults(&mut config, &schema);
        assert!(config["child"]["child"].is_object());
    }

    #[test]
    fn uncompilable_schema_is_reported() {
        let schema = Schema::new(json!({"type": "no-such-type"}));
        let err = validate(&mut json!({}), &schema, Path::new("config/schema.json")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSchema { .. }));
    }
}
