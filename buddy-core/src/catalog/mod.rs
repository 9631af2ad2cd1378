//! Catalog tree: the in-memory snapshot and the lazy loader that fills it.

mod loader;
mod snapshot;

pub use loader::{CatalogLoader, LoadTarget, SubtreeLoad};
pub use snapshot::{CatalogSnapshot, SnapshotError};
