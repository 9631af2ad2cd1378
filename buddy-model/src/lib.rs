//! Core data model definitions shared across Playlist Buddy crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod ids;
pub mod media;
pub mod playlist;
pub mod rule;
pub mod selection;
pub mod watch;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use ids::{CollectionId, LibraryId, NodeId, PlaylistId, UserId};
pub use media::{Collection, Library, MediaKind, MediaNode};
pub use playlist::{Playlist, PlaylistMode};
pub use rule::{
    DateRange, Interleave, OrderingKey, RangeFilter, RefreshCadence,
    RuleFilters, RuleLimits, RuleOrdering, RuleScope, SmartRule,
    SortDirection,
};
pub use selection::{CheckState, Selection, SelectionSource};
pub use watch::{WatchRecord, WatchState};
