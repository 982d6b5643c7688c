//! Descriptive metadata carried by every rule document.

use serde::{Deserialize, Serialize};

/// Header metadata for a rule document.
///
/// None of it takes part in evaluation; `enabled: false` keeps a rule on
/// disk while removing it from the active rule set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

pub(crate) fn default_true() -> bool {
    true
}
