//! Attribute maps attached to the viewer and to page slots
//!
//! A UI turns these into element attributes. `class` and `style` are
//! composed, everything else is a plain key/value pair.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

const CLASS: &str = "class";
const STYLE: &str = "style";

/// Ordered key/value attributes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Add a class unless it is already present
    pub fn add_class(&mut self, class: &str) -> &mut Self {
        let class = class.trim();
        if class.is_empty() {
            return self;
        }
        let classes = self.0.entry(CLASS.to_string()).or_default();
        if !classes.split_whitespace().any(|c| c == class) {
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(class);
        }
        self
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.get(CLASS)
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Append a `name: value` declaration to the style
    pub fn add_style(&mut self, name: &str, value: &str) -> &mut Self {
        let style = self.0.entry(STYLE.to_string()).or_default();
        append_style(style, &format!("{name}: {value}"));
        self
    }

    /// Set `data-{key}`
    pub fn data(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.set(format!("data-{key}"), value.to_string())
    }

    /// Set `aria-{key}`
    pub fn aria(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.set(format!("aria-{key}"), value)
    }

    /// Fold `other` into `self`: classes and styles accumulate, any other
    /// key takes the value from `other`.
    pub fn merge(&mut self, other: &Attributes) -> &mut Self {
        for (key, value) in &other.0 {
            match key.as_str() {
                CLASS => {
                    for class in value.split_whitespace() {
                        self.add_class(class);
                    }
                }
                STYLE => {
                    let style = self.0.entry(STYLE.to_string()).or_default();
                    append_style(style, value);
                }
                _ => {
                    self.0.insert(key.clone(), value.clone());
                }
            }
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn append_style(style: &mut String, declarations: &str) {
    let declarations = declarations.trim().trim_end_matches(';');
    if declarations.is_empty() {
        return;
    }
    if !style.is_empty() {
        style.push_str("; ");
    }
    style.push_str(declarations);
}

impl fmt::Display for Attributes {
    /// `key="value"` pairs, HTML style
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{key}=\"{}\"", value.replace('"', "&quot;"))?;
        }
        Ok(())
    }
}
