//! # deltadoc Codec
//!
//! Document value model and the dotted-path codec for deltadoc.
//!
//! A document is an ordered tree of maps and arrays with scalar leaves.
//! This crate converts between that tree and a flat mapping from dotted
//! path to leaf value:
//!
//! - [`flatten`] walks a document depth first and records every scalar or
//!   empty container under its path
//! - [`inflate`] rebuilds the tree, turning integer segments into arrays
//! - [`get_path`], [`set_path`] and [`remove_path`] edit a tree in place
//!
//! ## Usage
//!
//! ```
//! use deltadoc_codec::{flatten, inflate, Value};
//!
//! let doc = Value::map([
//!     ("title", Value::from("A")),
//!     ("tags", Value::Array(vec![Value::from("x"), Value::from("y")])),
//! ]);
//! let flat = flatten(&doc);
//! assert_eq!(flat["tags.1"], Value::from("y"));
//! assert_eq!(inflate(&flat), doc);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod flatten;
mod id;
mod inflate;
mod path;
mod value;

pub use error::{CodecError, CodecResult};
pub use flatten::{flat_get, flatten, flatten_at, strip_nulls, FlatMap};
pub use id::{DocumentId, DocumentRef, Timestamp};
pub use inflate::{get_path, get_path_mut, inflate, remove_path, set_path};
pub use path::{covers, join, overlaps, Path, Segment, WILDCARD};
pub use value::{Map, ScalarKind, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-z ]{0,8}".prop_map(Value::Text),
        ]
    }

    fn document() -> impl Strategy<Value = Value> {
        let node = leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,5}", inner), 0..4).prop_map(Value::map),
            ]
        });
        prop::collection::vec(("[a-z]{1,5}", node), 0..5).prop_map(Value::map)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn flatten_then_inflate_is_identity(doc in document()) {
            prop_assert_eq!(inflate(&flatten(&doc)), doc);
        }

        #[test]
        fn flattened_leaves_are_scalars_or_empty(doc in document()) {
            for value in flatten(&doc).values() {
                prop_assert!(!value.is_container() || value.is_empty_container());
            }
        }
    }
}
