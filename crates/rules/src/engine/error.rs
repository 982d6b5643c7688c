use kindle_core::StoreError;
use thiserror::Error;

/// Failure of an engine call. Rule data problems never end up here; they
/// make the rule unsatisfied instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
