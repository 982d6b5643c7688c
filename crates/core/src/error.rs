use thiserror::Error;

/// Failure reported by an external store (event log, rules, achievements, profiles).
///
/// The engine never retries or swallows these; they surface to the caller of
/// `process` so a partially applied call can be recovered at the application layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}
