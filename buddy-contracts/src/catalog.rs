use async_trait::async_trait;
use buddy_model::{Collection, Library, LibraryId, MediaNode, NodeId};

use crate::error::ProviderResult;

/// Browsable show → season → episode catalog.
///
/// Every listing returns one level of the tree. Returned nodes may report a
/// non-zero `child_count` whose children have not been fetched yet; callers
/// expand them lazily.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn list_libraries(&self) -> ProviderResult<Vec<Library>>;

    async fn list_shows(
        &self,
        library_id: &LibraryId,
    ) -> ProviderResult<Vec<MediaNode>>;

    async fn list_seasons(
        &self,
        show_id: &NodeId,
    ) -> ProviderResult<Vec<MediaNode>>;

    async fn list_episodes(
        &self,
        season_id: &NodeId,
    ) -> ProviderResult<Vec<MediaNode>>;

    /// Collections defined in a library. Servers without collections return
    /// an empty list.
    async fn list_collections(
        &self,
        _library_id: &LibraryId,
    ) -> ProviderResult<Vec<Collection>> {
        Ok(Vec::new())
    }
}
