use std::collections::HashMap;

use buddy_contracts::WatchStateProvider;
use buddy_model::{MediaNode, NodeId, UserId, WatchRecord};
use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Watch history for one user, captured before a resolution.
///
/// Episodes without an entry have never been watched as far as the rule
/// engine is concerned.
#[derive(Debug, Clone, Default)]
pub struct WatchSnapshot {
    records: HashMap<NodeId, WatchRecord>,
}

impl WatchSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, episode: NodeId, record: WatchRecord) {
        self.records.insert(episode, record);
    }

    pub fn get(&self, episode: &NodeId) -> Option<&WatchRecord> {
        self.records.get(episode)
    }

    /// The record for `episode`, or an unwatched one.
    pub fn record_or_default(&self, episode: &NodeId) -> WatchRecord {
        self.records.get(episode).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Query `provider` for every episode, `concurrency` requests at a time.
    pub async fn collect<P>(
        provider: &P,
        user: UserId,
        episodes: &[&MediaNode],
        concurrency: usize,
    ) -> Result<Self>
    where
        P: WatchStateProvider + ?Sized,
    {
        // Futures are built up front (still lazy) so no closure types are
        // held across the await; works around rust-lang/rust#102211.
        let requests: Vec<_> = episodes
            .iter()
            .map(|node| {
                let id = &node.id;
                async move {
                    provider
                        .watch_state(id, user)
                        .await
                        .map(|record| (id.clone(), record))
                        .map_err(|source| {
                            CoreError::provider("watch_state", id, source)
                        })
                }
            })
            .collect();
        let fetched: Vec<(NodeId, Option<WatchRecord>)> =
            stream::iter(requests)
                .buffer_unordered(concurrency.max(1))
                .try_collect()
                .await?;

        let records: HashMap<NodeId, WatchRecord> = fetched
            .into_iter()
            .filter_map(|(id, record)| record.map(|record| (id, record)))
            .collect();
        debug!(
            user = user.0,
            queried = episodes.len(),
            known = records.len(),
            "watch snapshot collected"
        );
        Ok(Self { records })
    }
}

impl FromIterator<(NodeId, WatchRecord)> for WatchSnapshot {
    fn from_iter<I: IntoIterator<Item = (NodeId, WatchRecord)>>(
        iter: I,
    ) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
