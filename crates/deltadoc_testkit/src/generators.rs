//! Property-based test generators using proptest.
//!
//! Documents generated here avoid shapes with no defined round trip: keys
//! are never numeric and floats are left out so equality is exact.

use deltadoc_codec::{Map, Path, Value};
use proptest::prelude::*;

/// Strategy for field names: short, lowercase, never numeric.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z_]{0,5}").expect("Invalid regex")
}

/// Strategy for scalar values, null included.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        prop::string::string_regex("[a-zA-Z0-9 ]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for nested values up to three levels deep. Maps and arrays may
/// be empty.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((field_name_strategy(), inner), 0..4)
                .prop_map(|pairs| Value::Map(pairs.into_iter().collect::<Map>())),
        ]
    })
}

/// Strategy for documents: a map at the root.
pub fn document_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec((field_name_strategy(), value_strategy()), 0..6)
        .prop_map(|pairs| Value::Map(pairs.into_iter().collect::<Map>()))
}

/// Strategy for scalars a store keeps as written: no nulls, and integers
/// small enough that differences never overflow.
pub fn stored_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (-10_000i64..10_000).prop_map(Value::Int),
        prop::string::string_regex("[a-z]{0,8}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for documents built from [`stored_scalar_strategy`] leaves.
pub fn stored_document_strategy() -> impl Strategy<Value = Value> {
    let value = stored_scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((field_name_strategy(), inner), 0..4)
                .prop_map(|pairs| Value::Map(pairs.into_iter().collect::<Map>())),
        ]
    });
    prop::collection::vec((field_name_strategy(), value), 0..6)
        .prop_map(|pairs| Value::Map(pairs.into_iter().collect::<Map>()))
}

/// Strategy for dotted field paths of one to four key segments.
pub fn path_strategy() -> impl Strategy<Value = Path> {
    prop::collection::vec(field_name_strategy(), 1..5)
        .prop_map(|keys| keys.into_iter().fold(Path::root(), |path, key| path.key(key)))
}

/// Strategy for lists of text tags.
pub fn tags_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        0..8,
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
