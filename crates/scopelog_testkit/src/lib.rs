//! # scopelog Testkit
//!
//! Test utilities for scopelog.
//!
//! This crate provides:
//! - Test fixtures: initialized scopes in temporary directories
//! - Property-based test generators using proptest
//! - Concurrent producer/consumer stress utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scopelog_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_scope() {
//!     with_temp_scope(|scope| {
//!         scope.try_write(b"record").unwrap();
//!         assert_eq!(scope.try_read().unwrap().as_deref(), Some(&b"record"[..]));
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
