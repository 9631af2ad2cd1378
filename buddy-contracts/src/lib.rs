//! Trait surfaces for the remote services the playlist engine talks to.
//!
//! The engine never talks HTTP itself. A presentation layer wires concrete
//! clients (media server, watch-history service) behind these traits.

pub mod catalog;
pub mod error;
pub mod playlist;
pub mod watch;

pub use catalog::CatalogProvider;
pub use error::{ProviderError, ProviderResult};
pub use playlist::{PlaylistServer, RemotePlaylist};
pub use watch::WatchStateProvider;

/// Frequently used imports for crates implementing or consuming the traits.
pub mod prelude {
    pub use super::catalog::CatalogProvider;
    pub use super::error::{ProviderError, ProviderResult};
    pub use super::playlist::{PlaylistServer, RemotePlaylist};
    pub use super::watch::WatchStateProvider;
}
