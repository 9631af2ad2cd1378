//! # Playlist Buddy Core
//!
//! Selection and smart-playlist resolution engine. It turns a browsable
//! show → season → episode catalog into ordered episode playlists on a
//! remote media server.
//!
//! ## Overview
//!
//! - **Catalog**: [`catalog::CatalogSnapshot`] is an id-keyed arena for one
//!   refresh of the tree; [`catalog::CatalogLoader`] fills it lazily or
//!   eagerly from a [`buddy_contracts::CatalogProvider`].
//! - **Selection**: [`selection::SelectionModel`] keeps tri-state checkbox
//!   state consistent across the tree and publishes the checked episodes.
//! - **Resolution**: [`resolver::resolve`] turns a
//!   [`buddy_model::SmartRule`] into a deterministic, capped episode
//!   sequence.
//! - **Sync**: [`sync::PlaylistSynchronizer`] rewrites a remote playlist
//!   idempotently and reports partial writes;
//!   [`sync::smart::SmartPlaylistRunner`] chains fetch, resolve and sync.
//!
//! Network-facing operations are async, bounded by timeouts from
//! [`config::BuddyConfig`], and follow last-request-wins per target.
//!
//! ## Example
//!
//! ```
//! use buddy_core::catalog::CatalogSnapshot;
//! use buddy_core::resolver::{WatchSnapshot, resolve};
//! use buddy_model::{Library, LibraryId, MediaNode, NodeId, SmartRule};
//!
//! let lib = LibraryId::from("tv");
//! let mut snapshot = CatalogSnapshot::new();
//! snapshot.insert_library(Library { id: lib.clone(), title: "TV".into() });
//!
//! let show = MediaNode::show("show", lib.clone(), "S");
//! snapshot.set_library_shows(&lib, vec![show]).unwrap();
//! let season = MediaNode::season("s1", "show", 1);
//! snapshot
//!     .attach_children(&NodeId::from("show"), vec![season])
//!     .unwrap();
//! let episode = MediaNode::episode("e1", "s1", 1, 1);
//! snapshot
//!     .attach_children(&NodeId::from("s1"), vec![episode])
//!     .unwrap();
//!
//! let mut rule = SmartRule::default();
//! rule.scope.libraries.push(lib);
//! let watch = WatchSnapshot::new();
//! let resolution = resolve(&snapshot, &watch, &rule).unwrap();
//! assert_eq!(resolution.episodes, vec![NodeId::from("e1")]);
//! ```
#![allow(missing_docs)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod request_gate;
pub mod resolver;
pub mod selection;
pub mod sync;
pub mod telemetry;

pub use config::{BuddyConfig, ConfigSource};
pub use error::{CoreError, Result, ScopeKind};

/// Frequently used engine types.
pub mod prelude {
    pub use crate::catalog::{CatalogLoader, CatalogSnapshot};
    pub use crate::config::BuddyConfig;
    pub use crate::error::{CoreError, Result};
    pub use crate::resolver::{Resolution, WatchSnapshot, resolve};
    pub use crate::selection::{ManualSelections, SelectionModel};
    pub use crate::sync::builder::ManualPlaylistDraft;
    pub use crate::sync::smart::SmartPlaylistRunner;
    pub use crate::sync::{PlaylistRef, PlaylistSynchronizer, SyncOutcome};
}
