//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buddy_contracts::{
    CatalogProvider, PlaylistServer, ProviderError, ProviderResult,
    RemotePlaylist, WatchStateProvider,
};
use buddy_core::catalog::CatalogSnapshot;
use buddy_model::{
    Collection, CollectionId, Library, LibraryId, MediaNode, NodeId,
    PlaylistId, UserId, WatchRecord,
};
use tokio::sync::Mutex;

pub const MINUTE: u64 = 60_000;

pub fn id(raw: &str) -> NodeId {
    NodeId::from(raw)
}

pub fn ids(raw: &[&str]) -> Vec<NodeId> {
    raw.iter().copied().map(NodeId::from).collect()
}

/// Catalog content plus the knobs tests use to slow it down or break it.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    libraries: Vec<Library>,
    shows: HashMap<LibraryId, Vec<MediaNode>>,
    seasons: HashMap<NodeId, Vec<MediaNode>>,
    episodes: HashMap<NodeId, Vec<MediaNode>>,
    collections: HashMap<LibraryId, Vec<Collection>>,
    delays: Mutex<HashMap<NodeId, Duration>>,
    unavailable: Mutex<bool>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn library(mut self, library: &str) -> Self {
        self.libraries.push(Library {
            id: LibraryId::from(library),
            title: library.to_uppercase(),
        });
        self
    }

    pub fn show(mut self, library: &str, show: &str, genres: &[&str]) -> Self {
        let node = MediaNode::show(show, library, show.to_uppercase())
            .with_genres(genres.iter().copied());
        self.shows
            .entry(LibraryId::from(library))
            .or_default()
            .push(node);
        self
    }

    pub fn season(mut self, show: &str, season: &str, number: u32) -> Self {
        self.seasons
            .entry(id(show))
            .or_default()
            .push(MediaNode::season(season, show, number));
        self
    }

    /// Add an episode with a runtime in minutes.
    pub fn episode(
        mut self,
        season: &str,
        episode: &str,
        numbers: (u32, u32),
        minutes: u64,
    ) -> Self {
        self.episodes.entry(id(season)).or_default().push(
            MediaNode::episode(episode, season, numbers.0, numbers.1)
                .with_runtime_ms(minutes * MINUTE),
        );
        self
    }

    /// Add a fully described episode.
    pub fn episode_node(mut self, season: &str, node: MediaNode) -> Self {
        self.episodes.entry(id(season)).or_default().push(node);
        self
    }

    pub fn collection(
        mut self,
        library: &str,
        collection: &str,
        members: &[&str],
    ) -> Self {
        self.collections
            .entry(LibraryId::from(library))
            .or_default()
            .push(Collection {
                id: CollectionId::from(collection),
                library_id: LibraryId::from(library),
                title: collection.to_string(),
                members: ids(members),
            });
        self
    }

    pub async fn delay_children(&self, parent: &str, delay: Duration) {
        self.delays.lock().await.insert(id(parent), delay);
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().await = unavailable;
    }

    /// Build the fully expanded snapshot without going through a loader.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let mut snapshot = CatalogSnapshot::new();
        for library in &self.libraries {
            snapshot.insert_library(library.clone());
            let shows =
                self.shows.get(&library.id).cloned().unwrap_or_default();
            snapshot.set_library_shows(&library.id, shows).unwrap();
            for collection in
                self.collections.get(&library.id).into_iter().flatten()
            {
                snapshot.insert_collection(collection.clone());
            }
        }
        let show_ids: Vec<NodeId> = snapshot.roots().cloned().collect();
        for show in show_ids {
            let seasons = self.seasons.get(&show).cloned().unwrap_or_default();
            let season_ids = snapshot.attach_children(&show, seasons).unwrap();
            for season in season_ids {
                let episodes =
                    self.episodes.get(&season).cloned().unwrap_or_default();
                snapshot.attach_children(&season, episodes).unwrap();
            }
        }
        snapshot
    }

    async fn gate(&self, parent: &NodeId) -> ProviderResult<()> {
        if *self.unavailable.lock().await {
            return Err(ProviderError::Unavailable("catalog offline".into()));
        }
        let delay = self.delays.lock().await.get(parent).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn list_libraries(&self) -> ProviderResult<Vec<Library>> {
        if *self.unavailable.lock().await {
            return Err(ProviderError::Unavailable("catalog offline".into()));
        }
        Ok(self.libraries.clone())
    }

    async fn list_shows(
        &self,
        library_id: &LibraryId,
    ) -> ProviderResult<Vec<MediaNode>> {
        if *self.unavailable.lock().await {
            return Err(ProviderError::Unavailable("catalog offline".into()));
        }
        Ok(self.shows.get(library_id).cloned().unwrap_or_default())
    }

    async fn list_seasons(
        &self,
        show_id: &NodeId,
    ) -> ProviderResult<Vec<MediaNode>> {
        self.gate(show_id).await?;
        Ok(self.seasons.get(show_id).cloned().unwrap_or_default())
    }

    async fn list_episodes(
        &self,
        season_id: &NodeId,
    ) -> ProviderResult<Vec<MediaNode>> {
        self.gate(season_id).await?;
        Ok(self.episodes.get(season_id).cloned().unwrap_or_default())
    }

    async fn list_collections(
        &self,
        library_id: &LibraryId,
    ) -> ProviderResult<Vec<Collection>> {
        Ok(self.collections.get(library_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWatch {
    records: Mutex<HashMap<(NodeId, UserId), WatchRecord>>,
    queries: Mutex<usize>,
}

impl InMemoryWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(
        &self,
        episode: &str,
        user: UserId,
        record: WatchRecord,
    ) {
        self.records.lock().await.insert((id(episode), user), record);
    }

    pub async fn queries(&self) -> usize {
        *self.queries.lock().await
    }
}

#[async_trait]
impl WatchStateProvider for InMemoryWatch {
    async fn watch_state(
        &self,
        episode_id: &NodeId,
        user_id: UserId,
    ) -> ProviderResult<Option<WatchRecord>> {
        *self.queries.lock().await += 1;
        Ok(self
            .records
            .lock()
            .await
            .get(&(episode_id.clone(), user_id))
            .cloned())
    }
}

/// How the next `replace_items` call misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceFailure {
    /// Fails before touching anything.
    BeforeWrite,
    /// Clears the playlist, writes the first `n` items, then fails.
    AfterPartialWrite(usize),
    /// Writes everything, then reports an error anyway.
    AfterFullWrite,
    /// Never answers.
    Hang,
}

#[derive(Debug, Default)]
struct ServerState {
    playlists: HashMap<PlaylistId, (String, Vec<NodeId>)>,
    next_id: u32,
    creates: usize,
    replaces: usize,
    reads: usize,
    replace_failure: Option<ReplaceFailure>,
    replace_delay: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct InMemoryPlaylistServer {
    state: Mutex<ServerState>,
}

impl InMemoryPlaylistServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed an existing playlist and return its id.
    pub async fn seed(&self, name: &str, items: &[&str]) -> PlaylistId {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let playlist_id = PlaylistId::from(format!("pl-{}", state.next_id));
        state
            .playlists
            .insert(playlist_id.clone(), (name.to_string(), ids(items)));
        playlist_id
    }

    pub async fn fail_next_replace(&self, failure: ReplaceFailure) {
        self.state.lock().await.replace_failure = Some(failure);
    }

    pub async fn delay_replaces(&self, delay: Duration) {
        self.state.lock().await.replace_delay = Some(delay);
    }

    pub async fn items_of(&self, name: &str) -> Option<Vec<NodeId>> {
        self.state
            .lock()
            .await
            .playlists
            .values()
            .find(|(playlist, _)| playlist == name)
            .map(|(_, items)| items.clone())
    }

    /// Creates plus replaces.
    pub async fn writes(&self) -> usize {
        let state = self.state.lock().await;
        state.creates + state.replaces
    }

    pub async fn reads(&self) -> usize {
        self.state.lock().await.reads
    }
}

#[async_trait]
impl PlaylistServer for InMemoryPlaylistServer {
    async fn find_playlist(
        &self,
        name: &str,
    ) -> ProviderResult<Option<RemotePlaylist>> {
        Ok(self
            .state
            .lock()
            .await
            .playlists
            .iter()
            .find(|(_, (playlist, _))| playlist == name)
            .map(|(id, (playlist, _))| RemotePlaylist {
                id: id.clone(),
                name: playlist.clone(),
            }))
    }

    async fn create_playlist(
        &self,
        name: &str,
        items: &[NodeId],
    ) -> ProviderResult<RemotePlaylist> {
        let mut state = self.state.lock().await;
        state.creates += 1;
        state.next_id += 1;
        let playlist_id = PlaylistId::from(format!("pl-{}", state.next_id));
        state
            .playlists
            .insert(playlist_id.clone(), (name.to_string(), items.to_vec()));
        Ok(RemotePlaylist {
            id: playlist_id,
            name: name.to_string(),
        })
    }

    async fn playlist_items(
        &self,
        playlist_id: &PlaylistId,
    ) -> ProviderResult<Vec<NodeId>> {
        let mut state = self.state.lock().await;
        state.reads += 1;
        state
            .playlists
            .get(playlist_id)
            .map(|(_, items)| items.clone())
            .ok_or_else(|| ProviderError::NotFound(playlist_id.to_string()))
    }

    async fn replace_items(
        &self,
        playlist_id: &PlaylistId,
        items: &[NodeId],
    ) -> ProviderResult<()> {
        let (failure, delay) = {
            let mut state = self.state.lock().await;
            state.replaces += 1;
            (state.replace_failure.take(), state.replace_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failure == Some(ReplaceFailure::Hang) {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().await;
        let Some((_, current)) = state.playlists.get_mut(playlist_id) else {
            return Err(ProviderError::NotFound(playlist_id.to_string()));
        };
        match failure {
            Some(ReplaceFailure::BeforeWrite) => {
                Err(ProviderError::Unavailable("server busy".into()))
            }
            Some(ReplaceFailure::AfterPartialWrite(written)) => {
                *current = items.iter().take(written).cloned().collect();
                Err(ProviderError::Unavailable("connection reset".into()))
            }
            Some(ReplaceFailure::AfterFullWrite) => {
                *current = items.to_vec();
                Err(ProviderError::Rejected("late 500".into()))
            }
            Some(ReplaceFailure::Hang) | None => {
                *current = items.to_vec();
                Ok(())
            }
        }
    }
}
