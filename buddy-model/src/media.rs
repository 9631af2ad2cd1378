use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{CollectionId, LibraryId, NodeId};

/// Level of a node in the show → season → episode hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
    Show,
    Season,
    Episode,
}

impl MediaKind {
    /// The kind a direct child of this kind must have.
    pub fn child_kind(self) -> Option<MediaKind> {
        match self {
            MediaKind::Show => Some(MediaKind::Season),
            MediaKind::Season => Some(MediaKind::Episode),
            MediaKind::Episode => None,
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, MediaKind::Episode)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Show => "show",
            MediaKind::Season => "season",
            MediaKind::Episode => "episode",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "show" => Ok(MediaKind::Show),
            "season" => Ok(MediaKind::Season),
            "episode" => Ok(MediaKind::Episode),
            other => Err(ModelError::UnknownVariant {
                kind: "media kind",
                value: other.to_string(),
            }),
        }
    }
}

/// A show, season or episode as reported by the catalog provider.
///
/// Season and episode numbers are only meaningful on seasons and episodes;
/// `season_number` on an episode is the number of its parent season, with
/// `0` marking specials.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaNode {
    pub id: NodeId,
    pub kind: MediaKind,
    pub title: String,
    /// `None` only for shows.
    pub parent_id: Option<NodeId>,
    /// Library section the show lives in. Seasons and episodes inherit it.
    pub library_id: Option<LibraryId>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub air_date: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    pub runtime_ms: Option<u64>,
    pub rating: Option<f32>,
    pub genres: Vec<String>,
    pub networks: Vec<String>,
    pub quality_flags: Vec<String>,
    pub audio_langs: Vec<String>,
    pub subtitle_langs: Vec<String>,
    /// Number of children the server reports, whether or not they have
    /// been fetched yet.
    pub child_count: Option<u32>,
}

impl MediaNode {
    fn bare(id: NodeId, kind: MediaKind, title: String) -> Self {
        Self {
            id,
            kind,
            title,
            parent_id: None,
            library_id: None,
            season_number: None,
            episode_number: None,
            air_date: None,
            added_at: None,
            runtime_ms: None,
            rating: None,
            genres: Vec::new(),
            networks: Vec::new(),
            quality_flags: Vec::new(),
            audio_langs: Vec::new(),
            subtitle_langs: Vec::new(),
            child_count: None,
        }
    }

    pub fn show(
        id: impl Into<NodeId>,
        library_id: impl Into<LibraryId>,
        title: impl Into<String>,
    ) -> Self {
        let mut node = Self::bare(id.into(), MediaKind::Show, title.into());
        node.library_id = Some(library_id.into());
        node
    }

    pub fn season(
        id: impl Into<NodeId>,
        show_id: impl Into<NodeId>,
        season_number: u32,
    ) -> Self {
        let mut node = Self::bare(
            id.into(),
            MediaKind::Season,
            format!("Season {season_number}"),
        );
        node.parent_id = Some(show_id.into());
        node.season_number = Some(season_number);
        node
    }

    pub fn episode(
        id: impl Into<NodeId>,
        season_id: impl Into<NodeId>,
        season_number: u32,
        episode_number: u32,
    ) -> Self {
        let mut node = Self::bare(
            id.into(),
            MediaKind::Episode,
            format!("Episode {episode_number}"),
        );
        node.parent_id = Some(season_id.into());
        node.season_number = Some(season_number);
        node.episode_number = Some(episode_number);
        node
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_runtime_ms(mut self, runtime_ms: u64) -> Self {
        self.runtime_ms = Some(runtime_ms);
        self
    }

    pub fn with_air_date(mut self, air_date: DateTime<Utc>) -> Self {
        self.air_date = Some(air_date);
        self
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_networks<I, S>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.networks = networks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_quality_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quality_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audio_langs<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audio_langs = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_child_count(mut self, child_count: u32) -> Self {
        self.child_count = Some(child_count);
        self
    }

    /// Season 0 holds specials.
    pub fn is_special(&self) -> bool {
        self.season_number == Some(0)
    }

    /// `(season, episode)` with missing numbers sorting first.
    pub fn season_episode(&self) -> (u32, u32) {
        (
            self.season_number.unwrap_or(0),
            self.episode_number.unwrap_or(0),
        )
    }

    /// Whether the server reports children that may still need fetching.
    pub fn has_children(&self) -> bool {
        !self.kind.is_leaf() && self.child_count.is_none_or(|count| count > 0)
    }
}

/// A library section that holds shows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub title: String,
}

/// A curated set of shows or seasons inside a library.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collection {
    pub id: CollectionId,
    pub library_id: LibraryId,
    pub title: String,
    pub members: Vec<NodeId>,
}
