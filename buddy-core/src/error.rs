use std::fmt;

use buddy_contracts::ProviderError;
use buddy_model::NodeId;
use thiserror::Error;

use crate::catalog::SnapshotError;

/// Kind of scope reference a rule can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Library,
    Show,
    Season,
    Collection,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeKind::Library => "library",
            ScopeKind::Show => "show",
            ScopeKind::Season => "season",
            ScopeKind::Collection => "collection",
        })
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    /// The rule names a scope id the catalog snapshot does not contain.
    #[error("{scope} '{id}' is not in the catalog")]
    ScopeNotFound { scope: ScopeKind, id: String },

    #[error("{operation} failed for '{target}': {source}")]
    ProviderUnavailable {
        operation: &'static str,
        target: String,
        #[source]
        source: ProviderError,
    },

    /// The remote playlist was left between its old and desired contents.
    /// `confirmed` is what the server reported afterwards.
    #[error(
        "playlist '{playlist}' only partially synced ({} items confirmed): {source}",
        .confirmed.len()
    )]
    SyncPartialFailure {
        playlist: String,
        confirmed: Vec<NodeId>,
        #[source]
        source: ProviderError,
    },

    #[error("request for '{target}' was superseded by a newer one")]
    Superseded { target: String },

    #[error("request for '{target}' was cancelled")]
    Cancelled { target: String },

    #[error("{operation} for '{target}' timed out")]
    Timeout {
        operation: &'static str,
        target: String,
    },

    #[error("catalog refresh rejected: {0}")]
    InvalidCatalog(#[from] SnapshotError),

    #[error("invalid playlist operation: {0}")]
    InvalidPlaylistEdit(#[from] buddy_model::ModelError),
}

impl CoreError {
    pub fn provider(
        operation: &'static str,
        target: impl fmt::Display,
        source: ProviderError,
    ) -> Self {
        CoreError::ProviderUnavailable {
            operation,
            target: target.to_string(),
            source,
        }
    }

    /// Whether re-issuing the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::ProviderUnavailable { .. }
                | CoreError::SyncPartialFailure { .. }
                | CoreError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
