//! Filesystem rule loader with hot-reload via `notify` watcher.
//!
//! One YAML [`RuleDocument`](crate::schema::RuleDocument) per file. The
//! loader keeps every parsed document, enabled or not, and serves the
//! enabled ones to the engine through [`RuleStore`](crate::store::RuleStore).

mod core;
mod error;
mod watcher;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
