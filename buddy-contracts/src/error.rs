use thiserror::Error;

/// Failure reported by a remote collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request timed out")]
    Timeout,

    #[error("request rejected: {0}")]
    Rejected(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
