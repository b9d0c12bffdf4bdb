//! Validation bridge.
//!
//! Rules are declared per schema path. Before a check, [`RuleTable::expand`]
//! turns every `$` into the positions actually present in the document, and
//! the concrete table is handed to a [`RuleEngine`] together with the
//! flattened document.

mod rules;

pub use rules::{Predicate, StandardRules};

use deltadoc_codec::{FlatMap, Path, ScalarKind, Segment, Value};
use indexmap::IndexMap;

/// A single validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// The field must be present and not null.
    Required,
    /// The field must be present and not empty.
    NotEmpty,
    /// The value must be of the given scalar kind.
    Kind(ScalarKind),
    /// Minimum length in characters (or elements, for arrays).
    MinLength(usize),
    /// Maximum length in characters (or elements, for arrays).
    MaxLength(usize),
    /// Letters only.
    Alpha,
    /// Letters, digits, dashes and underscores only.
    AlphaDash,
    /// A plausible email address.
    Email,
    /// A named predicate registered with the engine.
    Custom(String),
}

impl Rule {
    /// True for rules that also look at absent values.
    #[must_use]
    pub fn checks_presence(&self) -> bool {
        matches!(self, Rule::Required | Rule::NotEmpty)
    }
}

/// Concrete path to rule list mapping.
pub type FlatRules = IndexMap<String, Vec<Rule>>;

/// Rules keyed by schema path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    entries: IndexMap<Path, Vec<Rule>>,
}

impl RuleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule` to the rules of `path`.
    pub fn add(&mut self, path: Path, rule: Rule) {
        self.entries.entry(path).or_default().push(rule);
    }

    /// True if no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rules declared for a schema path.
    #[must_use]
    pub fn rules(&self, path: &Path) -> Option<&[Rule]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Substitutes positions for `$` against `document`.
    ///
    /// A `$` over an array of `n` elements yields `n` entries; over a
    /// missing or empty array it yields none.
    #[must_use]
    pub fn expand(&self, document: &Value) -> FlatRules {
        let mut out = FlatRules::new();
        for (path, rules) in &self.entries {
            for concrete in expand_path(path, document) {
                out.entry(concrete.to_string())
                    .or_default()
                    .extend(rules.iter().cloned());
            }
        }
        out
    }
}

/// Concrete paths for a schema path against `document`.
#[must_use]
pub fn expand_path(schema_path: &Path, document: &Value) -> Vec<Path> {
    let mut out = Vec::new();
    expand_into(schema_path.segments(), Path::root(), Some(document), &mut out);
    out
}

fn expand_into(segments: &[Segment], at: Path, value: Option<&Value>, out: &mut Vec<Path>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(at);
        return;
    };
    match head {
        Segment::Wildcard => {
            let Some(Value::Array(items)) = value else {
                return;
            };
            for (index, item) in items.iter().enumerate() {
                expand_into(rest, at.index(index), Some(item), out);
            }
        }
        Segment::Key(key) => {
            let child = value.and_then(|v| v.get(key));
            expand_into(rest, at.key(key.clone()), child, out);
        }
        Segment::Index(index) => {
            let child = value.and_then(Value::as_array).and_then(|a| a.get(*index));
            expand_into(rest, at.index(*index), child, out);
        }
    }
}

/// Outcome of a rule check: per-path error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: IndexMap<String, String>,
}

impl ValidationReport {
    /// A passing report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure. The first message per path is kept.
    pub fn fail(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(path.into()).or_insert_with(|| message.into());
    }

    /// True if no path failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error messages keyed by path.
    #[must_use]
    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    /// Consumes the report, returning the errors.
    #[must_use]
    pub fn into_errors(self) -> IndexMap<String, String> {
        self.errors
    }
}

/// The rule checker behind `validate`.
///
/// # Invariants
///
/// - `check` does not mutate anything and returns the same report for the
///   same input.
/// - Paths in the report are keys of `rules`.
///
/// # Implementors
///
/// - [`StandardRules`]: the built-in rule set
pub trait RuleEngine: Send + Sync {
    /// Checks `values` (flattened, without nulls) against `rules`.
    fn check(&self, values: &FlatMap, rules: &FlatRules) -> ValidationReport;
}
