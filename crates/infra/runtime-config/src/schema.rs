//! JSON Schema documents and the `runtimeEnv` augmentation rule.
//!
//! Every loaded config carries an injected `runtimeEnv` string. A user
//! schema declaring `additionalProperties: false` would reject it, so user
//! schemas are augmented to declare the field before validation. The
//! internal options schema is recognised by its reserved title and left
//! alone.

use serde_json::{Map, Value, json};

/// Name of the field injected into every hydrated config.
pub const RUNTIME_ENV_FIELD: &str = "runtimeEnv";

/// Title reserved for the loader's own options schema.
pub const OPTIONS_SCHEMA_TITLE: &str = "Schema for runtime-config options";

/// A JSON Schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema(Value);

/// Shape of a schema's top-level `properties` keyword.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Properties<'a> {
    Declared(&'a Map<String, Value>),
    Absent,
}

impl Schema {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    /// Whether this is the loader's own options schema.
    pub fn is_options_schema(&self) -> bool {
        self.title() == Some(OPTIONS_SCHEMA_TITLE)
    }

    /// A `properties` value that is not an object counts as absent.
    pub fn properties(&self) -> Properties<'_> {
        match self.0.get("properties") {
            Some(Value::Object(map)) => Properties::Declared(map),
            _ => Properties::Absent,
        }
    }
}

impl From<Value> for Schema {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Return a schema that also accepts a string `runtimeEnv` property.
///
/// The options schema and boolean schemas are returned unchanged. Every
/// other top-level keyword is kept; an existing `runtimeEnv` declaration is
/// overwritten.
pub fn augment(schema: &Schema) -> Schema {
    let Value::Object(root) = &schema.0 else {
        // `true` already accepts `runtimeEnv`; `false` must keep rejecting.
        return schema.clone();
    };
    if schema.is_options_schema() {
        return schema.clone();
    }

    let runtime_env = json!({ "type": "string" });

    let properties = match schema.properties() {
        Properties::Declared(map) => {
            let mut map = map.clone();
            map.insert(RUNTIME_ENV_FIELD.to_string(), runtime_env);
            map
        }
        Properties::Absent => {
            let mut map = Map::new();
            map.insert(RUNTIME_ENV_FIELD.to_string(), runtime_env);
            map
        }
    };

    let mut out = root.clone();
    out.insert("properties".to_string(), Value::Object(properties));

    Schema(Value::Object(out))
}
