//! # deltadoc Testkit
//!
//! Test utilities for deltadoc.
//!
//! This crate provides:
//! - Fixture models and in-memory database helpers
//! - Store doubles that fail or record their calls
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use deltadoc_testkit::prelude::*;
//!
//! with_memory_db(|db| {
//!     let mut post = db.document::<BlogPost>().unwrap();
//!     post.set("title", "Hello").unwrap();
//!     post.create().unwrap();
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod stores;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::stores::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use stores::*;
