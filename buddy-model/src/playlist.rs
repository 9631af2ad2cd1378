use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{NodeId, PlaylistId, UserId};
use crate::rule::SmartRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlaylistMode {
    Static,
    Smart,
}

/// A named, ordered list of episodes.
///
/// `items` is the authoritative playback order. For smart playlists it is
/// always the latest resolver output and is never edited by hand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Playlist {
    /// Remote id, known once the playlist exists on the server.
    pub id: Option<PlaylistId>,
    pub name: String,
    pub mode: PlaylistMode,
    pub owner_user: Option<UserId>,
    pub items: Vec<NodeId>,
    pub smart_rule: Option<SmartRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new_static(name: impl Into<String>, items: Vec<NodeId>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            mode: PlaylistMode::Static,
            owner_user: None,
            items,
            smart_rule: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_smart(name: impl Into<String>, rule: SmartRule) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            mode: PlaylistMode::Smart,
            owner_user: rule.user_id,
            items: Vec::new(),
            smart_rule: Some(rule),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_smart(&self) -> bool {
        self.mode == PlaylistMode::Smart
    }

    /// Hand-edit the item order. Smart playlists refuse.
    pub fn set_items(&mut self, items: Vec<NodeId>) -> Result<(), ModelError> {
        if self.is_smart() {
            return Err(ModelError::SmartPlaylistEdit(self.name.clone()));
        }
        self.items = items;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Store the latest resolver output for a smart playlist.
    pub fn apply_resolution(&mut self, items: Vec<NodeId>, at: DateTime<Utc>) {
        self.items = items;
        self.updated_at = at;
    }
}
