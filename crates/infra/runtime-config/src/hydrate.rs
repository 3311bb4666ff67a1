//! Environment-variable substitution over a decrypted config tree.

use crate::error::{ConfigError, Result};
use crate::schema::RUNTIME_ENV_FIELD;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Looks up a variable by name. The default reads the process environment.
pub type EnvLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Replaces placeholders in every string leaf and injects `runtimeEnv`.
pub struct Hydrator<'a> {
    runtime_env: &'a str,
    pattern: &'a Regex,
    lookup: Box<EnvLookup<'a>>,
}

impl<'a> Hydrator<'a> {
    /// `pattern` must have exactly one capture group yielding the variable name.
    pub fn new(runtime_env: &'a str, pattern: &'a Regex) -> Self {
        Self {
            runtime_env,
            pattern,
            lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    /// Hydrate `tree`, failing on the first unresolved placeholder.
    pub fn hydrate(&self, tree: Value) -> Result<Value> {
        let mut path = TreePath::default();
        let hydrated = self.visit(tree, &mut path)?;

        let Value::Object(mut root) = hydrated else {
            return Err(ConfigError::InvalidRoot {
                path: PathBuf::new(),
            });
        };
        root.insert(
            RUNTIME_ENV_FIELD.to_string(),
            Value::String(self.runtime_env.to_string()),
        );
        Ok(Value::Object(root))
    }

    fn visit(&self, node: Value, path: &mut TreePath) -> Result<Value> {
        match node {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    path.push(Segment::Key(key.clone()));
                    let child = self.visit(child, path)?;
                    path.pop();
                    out.insert(key, child);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, child) in items.into_iter().enumerate() {
                    path.push(Segment::Index(index));
                    out.push(self.visit(child, path)?);
                    path.pop();
                }
                Ok(Value::Array(out))
            }
            Value::String(s) => self.substitute(s, path).map(Value::String),
            Value::Null | Value::Bool(_) | Value::Number(_) => Ok(node),
        }
    }

    fn substitute(&self, s: String, path: &TreePath) -> Result<String> {
        if !self.pattern.is_match(&s) {
            return Ok(s);
        }

        let mut missing = None;
        let replaced = self.pattern.replace_all(&s, |caps: &Captures<'_>| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            match (self.lookup)(name) {
                Some(value) => value,
                None => {
                    if missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    String::new()
                }
            }
        });

        if let Some(variable) = missing {
            return Err(ConfigError::MissingEnvVar {
                variable,
                path: path.to_string(),
            });
        }

        Ok(replaced.into_owned())
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a node, rendered as `db.hosts[0].name`.
#[derive(Debug, Default)]
struct TreePath(Vec<Segment>);

impl TreePath {
    fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

impl std::fmt::Display for TreePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
