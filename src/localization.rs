//! Localized strings looked up by dotted path
//!
//! A dictionary is a nested JSON object:
//!
//! ```json
//! { "core": { "pageLabel": "Page {pageIndex}" } }
//! ```

use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use crate::error::Result;

/// Built-in English strings
const DEFAULT_DICTIONARY: &str = r#"{
    "core": {
        "viewer": { "label": "Document viewer" },
        "pageLabel": "Page {pageIndex}",
        "pageLoading": "Loading page {pageIndex}",
        "pageFailed": "Page {pageIndex} could not be rendered"
    }
}"#;

#[derive(Clone, Debug)]
pub struct Localization {
    dictionary: Value,
}

impl Default for Localization {
    fn default() -> Self {
        let dictionary = serde_json::from_str(DEFAULT_DICTIONARY)
            .unwrap_or_else(|_| Value::Object(Map::new()));
        Self { dictionary }
    }
}

impl Localization {
    /// A dictionary without built-in strings
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dictionary: Value::Object(Map::new()),
        }
    }

    /// Built-in strings overridden by the dictionary in `json`
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(json)?;
        let mut localization = Self::default();
        localization.merge(overrides);
        Ok(localization)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded localization from {path:?}");
        Self::from_json(&content)
    }

    /// Deep-merge `overrides` into the dictionary
    pub fn merge(&mut self, overrides: Value) {
        merge_values(&mut self.dictionary, overrides);
    }

    /// Look up a string, e.g. `core.viewer.label`
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&str> {
        path.split('.')
            .try_fold(&self.dictionary, |node, key| node.get(key))?
            .as_str()
    }

    #[must_use]
    pub fn text<'a>(&'a self, path: &str, fallback: &'a str) -> &'a str {
        self.lookup(path).unwrap_or(fallback)
    }

    /// Look up a string and replace `{name}` placeholders with `args`
    #[must_use]
    pub fn format(&self, path: &str, fallback: &str, args: &[(&str, String)]) -> String {
        let mut text = self.text(path, fallback).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

fn merge_values(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}
