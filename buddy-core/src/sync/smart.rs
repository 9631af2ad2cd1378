//! Smart playlist refresh: fresh snapshot, watch state, resolve, sync.
//!
//! The stages commit one after another with no transaction across them.
//! A refresh is bounded by the resolve timeout and can be cancelled through
//! its token; neither affects refreshes of other playlists.

use std::fmt;
use std::sync::Arc;

use buddy_contracts::{CatalogProvider, PlaylistServer, WatchStateProvider};
use buddy_model::{LibraryId, ModelError, Playlist, SmartRule};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::{PlaylistRef, PlaylistSynchronizer, SyncOutcome};
use crate::catalog::CatalogLoader;
use crate::config::ResolverSettings;
use crate::error::{CoreError, Result};
use crate::resolver::{self, Resolution, WatchSnapshot};

/// Result of one smart refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartRefresh {
    pub resolution: Resolution,
    pub sync: SyncOutcome,
}

pub struct SmartPlaylistRunner<C: ?Sized, W: ?Sized, S: ?Sized> {
    catalog: Arc<CatalogLoader<C>>,
    watch: Arc<W>,
    synchronizer: Arc<PlaylistSynchronizer<S>>,
    settings: ResolverSettings,
}

impl<C: ?Sized, W: ?Sized, S: ?Sized> fmt::Debug
    for SmartPlaylistRunner<C, W, S>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartPlaylistRunner")
            .field("settings", &self.settings)
            .finish()
    }
}

impl<C, W, S> SmartPlaylistRunner<C, W, S>
where
    C: CatalogProvider + ?Sized,
    W: WatchStateProvider + ?Sized,
    S: PlaylistServer + ?Sized,
{
    pub fn new(
        catalog: Arc<CatalogLoader<C>>,
        watch: Arc<W>,
        synchronizer: Arc<PlaylistSynchronizer<S>>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            catalog,
            watch,
            synchronizer,
            settings,
        }
    }

    /// Re-resolve `playlist` from a fresh catalog and push the result.
    ///
    /// The playlist's items are replaced as soon as resolution succeeds,
    /// before the remote write, and its id is filled in once the sync
    /// lands.
    #[instrument(skip_all, fields(playlist = %playlist.name))]
    pub async fn refresh(
        &self,
        playlist: &mut Playlist,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Result<SmartRefresh> {
        let rule = playlist
            .smart_rule
            .clone()
            .filter(|_| playlist.is_smart())
            .ok_or_else(|| ModelError::MissingRule(playlist.name.clone()))?;

        let resolution =
            self.resolve_bounded(&playlist.name, &rule, cancel).await?;
        playlist.apply_resolution(resolution.episodes.clone(), now);

        let target = PlaylistRef {
            name: playlist.name.clone(),
            id: playlist.id.clone(),
        };
        let sync = self
            .synchronizer
            .sync_with(&target, &resolution.episodes, Some(cancel))
            .await?;
        playlist.id = Some(sync.playlist_id.clone());

        info!(
            items = resolution.len(),
            runtime_ms = resolution.total_runtime_ms,
            action = ?sync.action,
            "smart playlist refreshed"
        );
        Ok(SmartRefresh { resolution, sync })
    }

    /// [`Self::refresh`] when the rule's cadence says the playlist is due.
    /// A playlist that was never synced counts as never refreshed.
    pub async fn refresh_if_due(
        &self,
        playlist: &mut Playlist,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Result<Option<SmartRefresh>> {
        let last_refreshed = playlist.id.as_ref().map(|_| playlist.updated_at);
        let due = playlist
            .smart_rule
            .as_ref()
            .is_some_and(|rule| rule.refresh.is_due(last_refreshed, now));
        if !due {
            return Ok(None);
        }
        self.refresh(playlist, cancel, now).await.map(Some)
    }

    /// Resolve without syncing, e.g. to preview a rule being edited.
    pub async fn preview(
        &self,
        name: &str,
        rule: &SmartRule,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        self.resolve_bounded(name, rule, cancel).await
    }

    async fn resolve_bounded(
        &self,
        name: &str,
        rule: &SmartRule,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let work = tokio::time::timeout(
            self.settings.resolve_timeout(),
            self.resolve_fresh(rule, cancel),
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CoreError::Cancelled {
                target: name.to_string(),
            }),
            result = work => result.unwrap_or_else(|_| {
                Err(CoreError::Timeout {
                    operation: "smart refresh",
                    target: name.to_string(),
                })
            }),
        }
    }

    async fn resolve_fresh(
        &self,
        rule: &SmartRule,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        // Explicit shows, seasons and collection members may live outside
        // the listed libraries, so those rules walk the whole catalog.
        let scope = &rule.scope;
        let libraries: &[LibraryId] =
            if scope.has_explicit_nodes() || !scope.collections.is_empty() {
                &[]
            } else {
                &scope.libraries
            };
        let snapshot =
            self.catalog.load_library_snapshot(libraries, cancel).await?;

        let watch = match rule.user_id {
            Some(user) => {
                let candidates = resolver::candidate_episodes(&snapshot, rule)?;
                WatchSnapshot::collect(
                    self.watch.as_ref(),
                    user,
                    &candidates,
                    self.catalog.settings().concurrency(),
                )
                .await?
            }
            None => WatchSnapshot::new(),
        };

        resolver::resolve(&snapshot, &watch, rule)
    }
}
