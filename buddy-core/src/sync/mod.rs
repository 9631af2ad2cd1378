//! Remote playlist reconciliation.
//!
//! The remote playlist is always rewritten wholesale: every item removed,
//! then the desired sequence added in order. That write is not atomic, so a
//! failed replace is followed by a re-read and the caller learns exactly
//! what the server holds afterwards.

pub mod builder;
pub mod smart;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use buddy_contracts::{
    PlaylistServer, ProviderError, ProviderResult, RemotePlaylist,
};
use buddy_model::{NodeId, PlaylistId};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncSettings;
use crate::error::{CoreError, Result};
use crate::request_gate::RequestGate;

/// Which remote playlist to write. With an `id` the name lookup is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub name: String,
    pub id: Option<PlaylistId>,
}

impl PlaylistRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: PlaylistId) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// No remote playlist existed; one was created with the items.
    Created,
    /// The remote items were replaced.
    Replaced,
    /// The remote playlist already held the items; nothing was written.
    Unchanged,
    /// Same items as the last successful sync; the server was not called.
    Skipped,
}

impl SyncAction {
    pub fn wrote_remote(self) -> bool {
        matches!(self, SyncAction::Created | SyncAction::Replaced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub playlist_id: PlaylistId,
    pub action: SyncAction,
    pub items: Vec<NodeId>,
}

/// What [`PlaylistSynchronizer::sync`] would do, computed without writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    Create {
        items: Vec<NodeId>,
    },
    /// Both lists empty means only the order differs.
    Replace {
        playlist_id: PlaylistId,
        removed: Vec<NodeId>,
        added: Vec<NodeId>,
    },
    Unchanged {
        playlist_id: PlaylistId,
    },
}

#[derive(Debug, Clone)]
struct SyncedState {
    playlist_id: PlaylistId,
    items: Vec<NodeId>,
}

/// Writes ordered episode sequences to remote playlists.
///
/// Keeps the last successfully synced sequence per playlist name so an
/// identical follow-up sync never touches the server. Syncs of the same
/// playlist follow last-request-wins; different playlists proceed
/// independently.
pub struct PlaylistSynchronizer<S: ?Sized> {
    server: Arc<S>,
    settings: SyncSettings,
    last_synced: Mutex<HashMap<String, SyncedState>>,
    gate: RequestGate<String>,
}

impl<S: ?Sized> fmt::Debug for PlaylistSynchronizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaylistSynchronizer")
            .field("settings", &self.settings)
            .finish()
    }
}

impl<S> PlaylistSynchronizer<S>
where
    S: PlaylistServer + ?Sized,
{
    pub fn new(server: Arc<S>, settings: SyncSettings) -> Self {
        Self {
            server,
            settings,
            last_synced: Mutex::new(HashMap::new()),
            gate: RequestGate::new(),
        }
    }

    /// Make the remote playlist hold exactly `desired`, in order.
    pub async fn sync(
        &self,
        playlist: &PlaylistRef,
        desired: &[NodeId],
    ) -> Result<SyncOutcome> {
        self.sync_with(playlist, desired, None).await
    }

    /// [`Self::sync`], abandoned with [`CoreError::Cancelled`] once
    /// `cancel` fires.
    pub async fn sync_with(
        &self,
        playlist: &PlaylistRef,
        desired: &[NodeId],
        cancel: Option<&CancellationToken>,
    ) -> Result<SyncOutcome> {
        // Checked under the gate: an in-flight write for this playlist is
        // superseded before the cache can answer.
        let work = async {
            if let Some(outcome) = self.cached(playlist, desired).await {
                return Ok(outcome);
            }
            self.reconcile(playlist, desired).await
        };
        self.gate
            .run(playlist.name.clone(), cancel, work)
            .await
            .inspect_err(|err| {
                if let CoreError::Superseded { .. } = err {
                    warn!(playlist = %playlist.name, "sync superseded");
                }
            })
    }

    /// Dry run of [`Self::sync`]: reads the remote playlist, writes nothing.
    pub async fn plan(
        &self,
        playlist: &PlaylistRef,
        desired: &[NodeId],
    ) -> Result<SyncPlan> {
        let Some(remote) = self.locate(playlist).await? else {
            return Ok(SyncPlan::Create {
                items: desired.to_vec(),
            });
        };
        let current = self.fetch_items(&playlist.name, &remote.id).await?;
        if current == desired {
            return Ok(SyncPlan::Unchanged {
                playlist_id: remote.id,
            });
        }

        let wanted: HashSet<&NodeId> = desired.iter().collect();
        let present: HashSet<&NodeId> = current.iter().collect();
        Ok(SyncPlan::Replace {
            playlist_id: remote.id,
            removed: current
                .iter()
                .filter(|id| !wanted.contains(id))
                .cloned()
                .collect(),
            added: desired
                .iter()
                .filter(|id| !present.contains(id))
                .cloned()
                .collect(),
        })
    }

    /// Forget the cached sequence, forcing the next sync to read the server.
    pub async fn invalidate(&self, name: &str) {
        self.last_synced.lock().await.remove(name);
    }

    pub async fn last_synced(&self, name: &str) -> Option<Vec<NodeId>> {
        self.last_synced
            .lock()
            .await
            .get(name)
            .map(|state| state.items.clone())
    }

    /// The last synced outcome when it already covers this request: same
    /// items, and either no explicit id or the id that was written.
    async fn cached(
        &self,
        playlist: &PlaylistRef,
        desired: &[NodeId],
    ) -> Option<SyncOutcome> {
        let last_synced = self.last_synced.lock().await;
        let state = last_synced.get(&playlist.name)?;
        let same_target = playlist
            .id
            .as_ref()
            .is_none_or(|id| *id == state.playlist_id);
        if !same_target || state.items != desired {
            return None;
        }
        debug!(playlist = %playlist.name, "sync skipped, unchanged");
        Some(SyncOutcome {
            playlist_id: state.playlist_id.clone(),
            action: SyncAction::Skipped,
            items: desired.to_vec(),
        })
    }

    async fn reconcile(
        &self,
        playlist: &PlaylistRef,
        desired: &[NodeId],
    ) -> Result<SyncOutcome> {
        // Anything from here on may change the remote playlist.
        self.invalidate(&playlist.name).await;

        let outcome = match self.locate(playlist).await? {
            None => {
                let request =
                    self.server.create_playlist(&playlist.name, desired);
                let created = self
                    .bounded(request)
                    .await
                    .map_err(|source| {
                        failure("create_playlist", &playlist.name, source)
                    })?;
                info!(
                    playlist = %playlist.name,
                    id = %created.id,
                    items = desired.len(),
                    "remote playlist created"
                );
                SyncOutcome {
                    playlist_id: created.id,
                    action: SyncAction::Created,
                    items: desired.to_vec(),
                }
            }
            Some(remote) => self.replace(playlist, remote, desired).await?,
        };

        self.last_synced.lock().await.insert(
            playlist.name.clone(),
            SyncedState {
                playlist_id: outcome.playlist_id.clone(),
                items: outcome.items.clone(),
            },
        );
        Ok(outcome)
    }

    async fn replace(
        &self,
        playlist: &PlaylistRef,
        remote: RemotePlaylist,
        desired: &[NodeId],
    ) -> Result<SyncOutcome> {
        let current = self.fetch_items(&playlist.name, &remote.id).await?;
        if current == desired {
            debug!(playlist = %playlist.name, "remote playlist is current");
            return Ok(SyncOutcome {
                playlist_id: remote.id,
                action: SyncAction::Unchanged,
                items: current,
            });
        }

        let Err(source) = self
            .bounded(self.server.replace_items(&remote.id, desired))
            .await
        else {
            info!(
                playlist = %playlist.name,
                id = %remote.id,
                removed = current.len(),
                added = desired.len(),
                "remote playlist replaced"
            );
            return Ok(SyncOutcome {
                playlist_id: remote.id,
                action: SyncAction::Replaced,
                items: desired.to_vec(),
            });
        };

        // The write is not atomic: find out what actually landed.
        let confirmed = self
            .bounded(self.server.playlist_items(&remote.id))
            .await
            .map_err(|_| {
                failure("replace_items", &playlist.name, source.clone())
            })?;

        if confirmed == desired {
            warn!(
                playlist = %playlist.name,
                error = %source,
                "replace reported failure but the playlist converged"
            );
            Ok(SyncOutcome {
                playlist_id: remote.id,
                action: SyncAction::Replaced,
                items: confirmed,
            })
        } else if confirmed == current {
            Err(failure("replace_items", &playlist.name, source))
        } else {
            warn!(
                playlist = %playlist.name,
                confirmed = confirmed.len(),
                desired = desired.len(),
                error = %source,
                "playlist left partially synced"
            );
            Err(CoreError::SyncPartialFailure {
                playlist: playlist.name.clone(),
                confirmed,
                source,
            })
        }
    }

    async fn locate(
        &self,
        playlist: &PlaylistRef,
    ) -> Result<Option<RemotePlaylist>> {
        if let Some(id) = &playlist.id {
            return Ok(Some(RemotePlaylist {
                id: id.clone(),
                name: playlist.name.clone(),
            }));
        }
        self.bounded(self.server.find_playlist(&playlist.name))
            .await
            .map_err(|source| failure("find_playlist", &playlist.name, source))
    }

    async fn fetch_items(
        &self,
        name: &str,
        id: &PlaylistId,
    ) -> Result<Vec<NodeId>> {
        self.bounded(self.server.playlist_items(id))
            .await
            .map_err(|source| failure("playlist_items", name, source))
    }

    /// Apply the request timeout, reporting expiry as a provider timeout.
    async fn bounded<T>(
        &self,
        request: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        tokio::time::timeout(self.settings.request_timeout(), request)
            .await
            .unwrap_or(Err(ProviderError::Timeout))
    }
}

fn failure(
    operation: &'static str,
    target: &str,
    source: ProviderError,
) -> CoreError {
    match source {
        ProviderError::Timeout => CoreError::Timeout {
            operation,
            target: target.to_string(),
        },
        source => CoreError::provider(operation, target, source),
    }
}
