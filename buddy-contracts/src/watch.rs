use async_trait::async_trait;
use buddy_model::{NodeId, UserId, WatchRecord};

use crate::error::ProviderResult;

/// Per-user watch history.
#[async_trait]
pub trait WatchStateProvider: Send + Sync {
    /// `Ok(None)` means the service has no history for this episode, which
    /// is a valid answer and not an error.
    async fn watch_state(
        &self,
        episode_id: &NodeId,
        user_id: UserId,
    ) -> ProviderResult<Option<WatchRecord>>;
}
