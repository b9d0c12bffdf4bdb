//! Named value filters.
//!
//! Filters rewrite field values before validation, for example trimming
//! whitespace or turning a title into a slug. Names are resolved when a
//! model definition is built, so a typo fails early.

use crate::error::{CoreError, CoreResult};
use deltadoc_codec::Value;
use std::collections::HashMap;
use std::fmt;

/// A filter function. Non-text values are usually returned unchanged.
pub type FilterFn = fn(&Value) -> Value;

/// Registry of filters by name.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("trim", trim);
        registry.register("lowercase", lowercase);
        registry.register("uppercase", uppercase);
        registry.register("underscore", underscore);
        registry.register("slug", slug);
        registry
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

impl FilterRegistry {
    /// Registry with the built-in filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no filters at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Adds a filter, returning the registry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, filter: FilterFn) -> Self {
        self.register(name, filter);
        self
    }

    /// Adds or replaces a filter.
    pub fn register(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into(), filter);
    }

    /// Looks up a filter by name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownFilter`] if no filter has that name.
    pub fn resolve(&self, name: &str) -> CoreResult<FilterFn> {
        self.filters
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::UnknownFilter {
                name: name.to_string(),
            })
    }
}

fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Text(text) => Value::Text(f(text)),
        other => other.clone(),
    }
}

fn trim(value: &Value) -> Value {
    map_text(value, |s| s.trim().to_string())
}

fn lowercase(value: &Value) -> Value {
    map_text(value, str::to_lowercase)
}

fn uppercase(value: &Value) -> Value {
    map_text(value, str::to_uppercase)
}

fn underscore(value: &Value) -> Value {
    map_text(value, |s| s.split_whitespace().collect::<Vec<_>>().join("_"))
}

fn slug(value: &Value) -> Value {
    map_text(value, |s| {
        let mut out = String::with_capacity(s.len());
        for c in s.chars().flat_map(char::to_lowercase) {
            if c.is_alphanumeric() {
                out.push(c);
            } else if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.trim_end_matches('-').to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, input: &str) -> Value {
        let filter = FilterRegistry::new().resolve(name).unwrap();
        filter(&Value::from(input))
    }

    #[test]
    fn builtins() {
        assert_eq!(run("trim", "  a b "), Value::from("a b"));
        assert_eq!(run("lowercase", "MiXeD"), Value::from("mixed"));
        assert_eq!(run("uppercase", "MiXeD"), Value::from("MIXED"));
        assert_eq!(run("underscore", " my  post title "), Value::from("my_post_title"));
        assert_eq!(run("slug", "Hello, World!  Again"), Value::from("hello-world-again"));
    }

    #[test]
    fn non_text_passes_through() {
        let filter = FilterRegistry::new().resolve("trim").unwrap();
        assert_eq!(filter(&Value::Int(3)), Value::Int(3));
    }

    #[test]
    fn unknown_filter() {
        assert!(matches!(
            FilterRegistry::new().resolve("nope"),
            Err(CoreError::UnknownFilter { .. })
        ));
        assert!(FilterRegistry::empty().resolve("trim").is_err());
    }

    #[test]
    fn custom_filters() {
        let registry = FilterRegistry::new().with("double", |v| match v {
            Value::Int(n) => Value::Int(n * 2),
            other => other.clone(),
        });
        assert_eq!(registry.resolve("double").unwrap()(&Value::Int(4)), Value::Int(8));
    }
}
