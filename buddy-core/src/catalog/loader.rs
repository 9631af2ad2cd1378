use std::fmt;
use std::future::Future;
use std::sync::Arc;

use buddy_contracts::{CatalogProvider, ProviderResult};
use buddy_model::{Library, LibraryId, MediaKind, MediaNode, NodeId};
use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::snapshot::CatalogSnapshot;
use crate::config::CatalogSettings;
use crate::error::{CoreError, Result, ScopeKind};
use crate::request_gate::RequestGate;

/// What a lazy load is fetching. Loads for the same target replace each
/// other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoadTarget {
    Libraries,
    Library(LibraryId),
    Node(NodeId),
}

impl fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadTarget::Libraries => f.write_str("libraries"),
            LoadTarget::Library(id) => write!(f, "library:{id}"),
            LoadTarget::Node(id) => write!(f, "node:{id}"),
        }
    }
}

/// Children fetched for one parent, not yet attached to a snapshot.
#[derive(Debug, Clone)]
pub struct SubtreeLoad {
    pub parent: NodeId,
    pub children: Vec<MediaNode>,
}

impl SubtreeLoad {
    /// Attach the children, replacing whatever the parent held before.
    pub fn apply_to(
        self,
        snapshot: &mut CatalogSnapshot,
    ) -> Result<Vec<NodeId>> {
        Ok(snapshot.attach_children(&self.parent, self.children)?)
    }
}

/// Fetches the catalog tree level by level from a [`CatalogProvider`].
///
/// Every provider call is bounded by the configured request timeout. The
/// lazy entry points (`load_libraries`, `load_shows`, `expand`) follow
/// last-request-wins per target: re-issuing a load cancels the in-flight
/// one, which then reports [`CoreError::Superseded`].
pub struct CatalogLoader<P: ?Sized> {
    provider: Arc<P>,
    settings: CatalogSettings,
    gate: RequestGate<LoadTarget>,
}

impl<P: ?Sized> fmt::Debug for CatalogLoader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogLoader")
            .field("settings", &self.settings)
            .finish()
    }
}

impl<P> CatalogLoader<P>
where
    P: CatalogProvider + ?Sized,
{
    pub fn new(provider: Arc<P>, settings: CatalogSettings) -> Self {
        Self {
            provider,
            settings,
            gate: RequestGate::new(),
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub async fn load_libraries(&self) -> Result<Vec<Library>> {
        self.gate
            .run(LoadTarget::Libraries, None, self.fetch_libraries())
            .await
            .inspect_err(log_superseded)
    }

    pub async fn load_shows(
        &self,
        library_id: &LibraryId,
    ) -> Result<Vec<MediaNode>> {
        self.gate
            .run(
                LoadTarget::Library(library_id.clone()),
                None,
                self.fetch_shows(library_id),
            )
            .await
            .inspect_err(log_superseded)
    }

    /// Fetch the children of a show (its seasons) or a season (its
    /// episodes). Episodes have no children and expand to nothing.
    pub async fn expand(&self, node: &MediaNode) -> Result<SubtreeLoad> {
        self.gate
            .run(
                LoadTarget::Node(node.id.clone()),
                None,
                self.fetch_children(node.id.clone(), node.kind),
            )
            .await
            .inspect_err(log_superseded)
    }

    /// Eagerly walk the given libraries (every library when empty) down to
    /// episodes. Used by smart refreshes, which need the whole scope.
    pub async fn load_library_snapshot(
        &self,
        libraries: &[LibraryId],
        cancel: &CancellationToken,
    ) -> Result<CatalogSnapshot> {
        let walk = self.walk_libraries(libraries);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CoreError::Cancelled {
                target: "catalog snapshot".to_string(),
            }),
            result = walk => result,
        }
    }

    async fn walk_libraries(
        &self,
        requested: &[LibraryId],
    ) -> Result<CatalogSnapshot> {
        let available = self.fetch_libraries().await?;
        if let Some(missing) = requested
            .iter()
            .find(|id| !available.iter().any(|lib| &lib.id == *id))
        {
            return Err(CoreError::ScopeNotFound {
                scope: ScopeKind::Library,
                id: missing.to_string(),
            });
        }

        let mut snapshot = CatalogSnapshot::new();
        for library in available {
            if requested.is_empty() || requested.contains(&library.id) {
                snapshot.insert_library(library);
            }
        }

        let library_ids: Vec<LibraryId> = snapshot
            .libraries()
            .iter()
            .map(|lib| lib.id.clone())
            .collect();
        for library_id in &library_ids {
            let shows = self.fetch_shows(library_id).await?;
            snapshot.set_library_shows(library_id, shows)?;

            let collections = self
                .call("list_collections", library_id, |provider| {
                    provider.list_collections(library_id)
                })
                .await?;
            for collection in collections {
                snapshot.insert_collection(collection);
            }
        }

        let shows: Vec<MediaNode> = snapshot
            .roots()
            .filter_map(|id| snapshot.get(id).cloned())
            .collect();
        let seasons = self.expand_all(shows, &mut snapshot).await?;
        self.expand_all(seasons, &mut snapshot).await?;

        info!(
            libraries = library_ids.len(),
            nodes = snapshot.len(),
            "catalog snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Expand every parent with bounded concurrency and return the newly
    /// attached children.
    async fn expand_all(
        &self,
        parents: Vec<MediaNode>,
        snapshot: &mut CatalogSnapshot,
    ) -> Result<Vec<MediaNode>> {
        let loads: Vec<SubtreeLoad> = stream::iter(parents)
            .map(|parent| self.fetch_children(parent.id, parent.kind))
            .buffer_unordered(self.settings.concurrency())
            .try_collect()
            .await?;

        let mut attached = Vec::new();
        for load in loads {
            for id in load.apply_to(snapshot)? {
                if let Some(node) = snapshot.get(&id) {
                    attached.push(node.clone());
                }
            }
        }
        Ok(attached)
    }

    async fn fetch_libraries(&self) -> Result<Vec<Library>> {
        self.call("list_libraries", "catalog", |provider| {
            provider.list_libraries()
        })
        .await
    }

    async fn fetch_shows(
        &self,
        library_id: &LibraryId,
    ) -> Result<Vec<MediaNode>> {
        let shows = self
            .call("list_shows", library_id, |provider| {
                provider.list_shows(library_id)
            })
            .await?;
        debug!(library = %library_id, count = shows.len(), "shows loaded");
        Ok(shows)
    }

    async fn fetch_children(
        &self,
        parent: NodeId,
        kind: MediaKind,
    ) -> Result<SubtreeLoad> {
        let children = match kind {
            MediaKind::Show => {
                self.call("list_seasons", &parent, |provider| {
                    provider.list_seasons(&parent)
                })
                .await?
            }
            MediaKind::Season => {
                self.call("list_episodes", &parent, |provider| {
                    provider.list_episodes(&parent)
                })
                .await?
            }
            MediaKind::Episode => Vec::new(),
        };
        debug!(parent = %parent, count = children.len(), "children loaded");
        Ok(SubtreeLoad { parent, children })
    }

    async fn call<'a, T, F, Fut>(
        &'a self,
        operation: &'static str,
        target: impl fmt::Display,
        request: F,
    ) -> Result<T>
    where
        F: FnOnce(&'a P) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(
            self.settings.request_timeout(),
            request(self.provider.as_ref()),
        )
        .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                Err(CoreError::provider(operation, target, source))
            }
            Err(_) => Err(CoreError::Timeout {
                operation,
                target: target.to_string(),
            }),
        }
    }
}

fn log_superseded(err: &CoreError) {
    if let CoreError::Superseded { target } = err {
        warn!(target_key = %target, "stale catalog load discarded");
    }
}
