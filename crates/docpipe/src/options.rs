//! Per-call operation options.
//!
//! Options arrive as a loosely typed JSON object (the shape an HTTP form or
//! a CLI produces). Unknown keys are ignored. Accessors either return a
//! documented default or fail with [`DocError::MissingOption`] /
//! [`DocError::InvalidOption`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::{CompressionLevel, Metadata};
use crate::error::{DocError, Result};

/// Options for one operation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use docpipe::Options;
    ///
    /// let options = Options::new().with("pages", "1-3").with("key_length", 256);
    /// assert_eq!(options.string("pages").as_deref(), Some("1-3"));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value of an option.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string option. Numbers are accepted and stringified.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Integer option, accepting numeric strings.
    pub fn integer(&self, key: &str) -> Result<Option<i64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| DocError::invalid_option(key, format!("{n} is not an integer"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| DocError::invalid_option(key, format!("'{s}' is not an integer"))),
            Some(other) => Err(DocError::invalid_option(
                key,
                format!("expected an integer, got {other}"),
            )),
        }
    }

    /// Tokens of an option given either as a comma-separated string or a
    /// list. List items may themselves contain commas.
    pub fn tokens(&self, key: &str) -> Vec<String> {
        let split = |s: &str| {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        match self.0.get(key) {
            Some(Value::String(s)) => split(s),
            Some(Value::Number(n)) => vec![n.to_string()],
            Some(Value::Array(items)) => items
                .iter()
                .flat_map(|item| match item {
                    Value::String(s) => split(s),
                    Value::Number(n) => vec![n.to_string()],
                    _ => Vec::new(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Like [`Options::tokens`], collapsed into a sorted set.
    pub fn token_set(&self, key: &str) -> BTreeSet<String> {
        self.tokens(key).into_iter().collect()
    }

    /// Ordered list of paths, e.g. the `files` option.
    ///
    /// Blank entries are dropped; order and duplicates are kept.
    pub fn paths(&self, key: &str) -> Vec<PathBuf> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![PathBuf::from(s)],
            _ => Vec::new(),
        }
    }

    /// The optional `metadata` map (`title`, `author`, `subject`, `keywords`).
    pub fn metadata(&self) -> Metadata {
        let Some(Value::Object(map)) = self.0.get("metadata") else {
            return Metadata::default();
        };
        let field = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_string);

        Metadata::new(
            field("title"),
            field("author"),
            field("subject"),
            field("keywords"),
        )
    }

    /// The `quality` option, defaulting to [`CompressionLevel::Standard`].
    pub fn compression(&self) -> Result<CompressionLevel> {
        match self.string("quality") {
            Some(quality) => quality.parse(),
            None => Ok(CompressionLevel::default()),
        }
    }

    /// Option keys that are set.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Options {
    type Error = DocError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(DocError::invalid_option(
                "options",
                format!("expected an object, got {other}"),
            )),
        }
    }
}
