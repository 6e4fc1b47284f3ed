use thiserror::Error;

/// Failures surfaced by the task registry and the keepalive orchestrator.
///
/// Adapter-level failures never appear here: adapters fold them into a
/// failed [`ExecutionLog`](crate::core::store::types::ExecutionLog).
#[derive(Debug, Error)]
pub enum KeepaliveError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid task code '{0}': expected <platform>_<suffix>")]
    InvalidTaskCode(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already exists: {0}")]
    TaskAlreadyExists(String),

    #[error("task {0} is disabled")]
    TaskDisabled(String),

    #[error("no API keys configured for platform {0}")]
    NoCredentials(String),

    #[error("credential pool is empty")]
    EmptyPool,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl KeepaliveError {
    #[cfg(test)]
    pub fn is_not_found(&self) -> bool {
        matches!(self, KeepaliveError::TaskNotFound(_))
    }
}

pub type KeepaliveResult<T> = std::result::Result<T, KeepaliveError>;
