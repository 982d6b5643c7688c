//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

use crate::schema::RuleId;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Document parsed but is not a usable rule (wrong kind, bad id, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { rule_id: RuleId, enabled: bool },
    /// Dotfile or not YAML.
    Skipped { reason: String },
    Failed { error: String },
}
