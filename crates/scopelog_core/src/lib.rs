//! # scopelog Core
//!
//! Segmented append-log storage for backup scopes.
//!
//! A scope durably persists a stream of variable-length byte records to a
//! rotating sequence of fixed-capacity segment files. It tracks a write
//! cursor and a pair of read cursors so a producer and a consumer can work
//! on the same stream at the same time, and across process restarts.
//!
//! This crate provides:
//! - Segment files with length-prefixed record framing
//! - Persistent, crash-safe cursor state
//! - Byte-range file locks separating readers from writers
//! - A read-only key to location index
//! - An optional background writer per scope
//!
//! ## Example
//!
//! ```rust,no_run
//! use scopelog_core::{BackupContext, ScopeBuilder};
//!
//! let ctx = BackupContext::new("events").unwrap();
//! let scope = ScopeBuilder::with_id("/tmp/scopes", "events")
//!     .unwrap()
//!     .context(&ctx)
//!     .unwrap()
//!     .build();
//!
//! scope.init().unwrap();
//! scope.try_write(b"hello").unwrap();
//! assert_eq!(scope.try_read().unwrap().as_deref(), Some(&b"hello"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod context;
mod dir;
mod error;
mod index;
mod location;
mod lock;
mod meta;
mod scope;
mod segment;
mod stats;
mod worker;

pub use builder::ScopeBuilder;
pub use config::ScopeConfig;
pub use context::{BackupContext, ScopeKey};
pub use dir::{generate_scope_id, validate_scope_id, ScopeDir};
pub use error::{CoreError, CoreResult};
pub use index::{IndexEntry, ScopeIndex};
pub use location::Location;
pub use lock::{LockMode, LockRange, RangeLock};
pub use meta::{MetaInfo, ScopeMeta};
pub use scope::{BackupScope, ScopeState};
pub use segment::{encode_frame, FrameInfo, SegmentFile, HEADER_BYTES, ITEM_HEADER_BYTES};
pub use stats::{ScopeStats, StatsSnapshot};
pub use worker::PendingWrite;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
