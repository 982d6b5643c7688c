//! Rule schema types with serde deserialization.
//!
//! Defines the rule model the evaluators consume and the YAML document
//! that wraps it on disk:
//! - `Rule` / `RuleType` / `RuleConditions`: one predicate plus the achievement it governs
//! - `RuleDocument`: `apiVersion` + `kind` + `metadata` header around a flattened `Rule`
//!
//! Condition fields are parsed leniently: a malformed value becomes absent and
//! the rule simply fails to match instead of rejecting the whole document.

mod document;
mod lenient;
mod metadata;
mod rule;

pub use document::*;
pub use metadata::*;
pub use rule::*;
