use async_trait::async_trait;
use buddy_model::{NodeId, PlaylistId};

use crate::error::ProviderResult;

/// Playlist as it exists on the remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlaylist {
    pub id: PlaylistId,
    pub name: String,
}

/// Remote playlist storage.
#[async_trait]
pub trait PlaylistServer: Send + Sync {
    async fn find_playlist(
        &self,
        name: &str,
    ) -> ProviderResult<Option<RemotePlaylist>>;

    async fn create_playlist(
        &self,
        name: &str,
        items: &[NodeId],
    ) -> ProviderResult<RemotePlaylist>;

    async fn playlist_items(
        &self,
        playlist_id: &PlaylistId,
    ) -> ProviderResult<Vec<NodeId>>;

    /// Remove every current item, then add `items` in order. Not atomic: a
    /// failure can leave the playlist partially written.
    async fn replace_items(
        &self,
        playlist_id: &PlaylistId,
        items: &[NodeId],
    ) -> ProviderResult<()>;
}
