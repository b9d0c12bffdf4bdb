//! The built-in rule engine.

use super::{FlatRules, Rule, RuleEngine, ValidationReport};
use deltadoc_codec::{flat_get, FlatMap, Value};
use std::collections::HashMap;
use std::fmt;

/// A named custom rule.
pub type Predicate = fn(&Value) -> bool;

/// Default [`RuleEngine`].
///
/// Rules for a path run in declaration order and the first failure is
/// reported. An absent or null value skips every rule except
/// [`Rule::Required`] and [`Rule::NotEmpty`].
#[derive(Clone, Default)]
pub struct StandardRules {
    predicates: HashMap<String, Predicate>,
}

impl fmt::Debug for StandardRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("StandardRules")
            .field("predicates", &names)
            .finish()
    }
}

impl StandardRules {
    /// Creates an engine with no custom predicates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predicate for [`Rule::Custom`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.register(name, predicate);
        self
    }

    /// Registers a predicate for [`Rule::Custom`], replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, predicate: Predicate) {
        self.predicates.insert(name.into(), predicate);
    }

    fn apply(&self, rule: &Rule, field: &str, value: Option<&Value>) -> Option<String> {
        let Some(value) = value else {
            return match rule {
                Rule::Required => Some(format!("{field} is required")),
                Rule::NotEmpty => Some(format!("{field} must not be empty")),
                _ => None,
            };
        };
        let ok = match rule {
            Rule::Required => true,
            Rule::NotEmpty => !is_empty(value),
            Rule::Kind(kind) => value.kind() == Some(*kind),
            Rule::MinLength(min) => length(value).map_or(true, |len| len >= *min),
            Rule::MaxLength(max) => length(value).map_or(true, |len| len <= *max),
            Rule::Alpha => value
                .as_str()
                .is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphabetic)),
            Rule::AlphaDash => value.as_str().is_some_and(|s| {
                !s.is_empty()
                    && s.chars()
                        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            }),
            Rule::Email => value.as_str().is_some_and(is_email),
            Rule::Custom(name) => match self.predicates.get(name) {
                Some(predicate) => predicate(value),
                None => return Some(format!("{field} uses unknown rule '{name}'")),
            },
        };
        if ok {
            return None;
        }
        Some(match rule {
            Rule::Required | Rule::NotEmpty => format!("{field} must not be empty"),
            Rule::Kind(kind) => format!("{field} must be a {kind}"),
            Rule::MinLength(min) => format!("{field} must be at least {min} characters long"),
            Rule::MaxLength(max) => format!("{field} must not exceed {max} characters long"),
            Rule::Alpha => format!("{field} must contain only letters"),
            Rule::AlphaDash => {
                format!("{field} must contain only numbers, letters and dashes")
            }
            Rule::Email => format!("{field} must be an email address"),
            Rule::Custom(name) => format!("{field} failed rule '{name}'"),
        })
    }
}

impl RuleEngine for StandardRules {
    fn check(&self, values: &FlatMap, rules: &FlatRules) -> ValidationReport {
        let mut report = ValidationReport::new();
        for (field, field_rules) in rules {
            let value = flat_get(values, field).filter(|v| !v.is_null());
            if let Some(message) = field_rules
                .iter()
                .find_map(|rule| self.apply(rule, field, value.as_ref()))
            {
                report.fail(field.clone(), message);
            }
        }
        report
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Map(fields) => fields.is_empty(),
        _ => false,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::Text(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !text.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
