//! Declarative smart-playlist rules.
//!
//! A [`SmartRule`] is plain data: scope, conjunctive filters, caps, ordering
//! and interleave policy. Resolution lives in `buddy-core`.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::error::ModelError;
use crate::ids::{CollectionId, LibraryId, NodeId, UserId};
use crate::watch::WatchState;

/// Inclusive range where `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeFilter<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for RangeFilter<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd> RangeFilter<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: T) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: T) -> Self {
        Self::new(None, Some(max))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Inclusive check. A missing value only passes an unbounded range.
    pub fn admits(&self, value: Option<&T>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.min.as_ref().is_none_or(|min| value >= min)
            && self.max.as_ref().is_none_or(|max| value <= max)
    }
}

pub type DateRange = RangeFilter<DateTime<Utc>>;

/// Which parts of the catalog feed the candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuleScope {
    pub libraries: Vec<LibraryId>,
    pub shows: Vec<NodeId>,
    pub seasons: Vec<NodeId>,
    pub collections: Vec<CollectionId>,
}

impl RuleScope {
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
            && self.shows.is_empty()
            && self.seasons.is_empty()
            && self.collections.is_empty()
    }

    /// Explicit show or season scoping disables library-wide expansion.
    pub fn has_explicit_nodes(&self) -> bool {
        !self.shows.is_empty() || !self.seasons.is_empty()
    }
}

/// Conjunctive episode predicates. Default values filter nothing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuleFilters {
    pub watch_state: Option<WatchState>,
    pub play_count: RangeFilter<u32>,
    pub air_date: DateRange,
    pub runtime_ms: RangeFilter<u64>,
    pub genres: Vec<String>,
    pub networks: Vec<String>,
    pub quality: Vec<String>,
    pub audio_langs: Vec<String>,
    pub min_rating: Option<f32>,
    pub last_watched: DateRange,
    pub include_specials: bool,
}

impl Default for RuleFilters {
    fn default() -> Self {
        Self {
            watch_state: None,
            play_count: RangeFilter::default(),
            air_date: DateRange::default(),
            runtime_ms: RangeFilter::default(),
            genres: Vec::new(),
            networks: Vec::new(),
            quality: Vec::new(),
            audio_langs: Vec::new(),
            min_rating: None,
            last_watched: DateRange::default(),
            include_specials: true,
        }
    }
}

/// Output caps, applied after ordering and interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuleLimits {
    pub max_items: Option<usize>,
    pub runtime_cap_ms: Option<u64>,
    pub per_show_cap: Option<usize>,
}

/// Sort key for resolved episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum OrderingKey {
    AirDate,
    #[default]
    SeasonEpisode,
    RecentActivity,
    AddedDate,
    Random,
}

impl FromStr for OrderingKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airDate" => Ok(OrderingKey::AirDate),
            "seasonEpisode" => Ok(OrderingKey::SeasonEpisode),
            "recentActivity" => Ok(OrderingKey::RecentActivity),
            "addedDate" => Ok(OrderingKey::AddedDate),
            "random" => Ok(OrderingKey::Random),
            other => Err(ModelError::UnknownVariant {
                kind: "ordering",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortDirection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(ModelError::UnknownVariant {
                kind: "sort direction",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuleOrdering {
    pub key: OrderingKey,
    /// Ignored for [`OrderingKey::Random`].
    pub direction: SortDirection,
    /// Pins the shuffle for [`OrderingKey::Random`].
    pub shuffle_seed: Option<u64>,
}

impl RuleOrdering {
    pub fn new(key: OrderingKey, direction: SortDirection) -> Self {
        Self {
            key,
            direction,
            shuffle_seed: None,
        }
    }

    pub fn seeded_random(seed: u64) -> Self {
        Self {
            key: OrderingKey::Random,
            direction: SortDirection::Ascending,
            shuffle_seed: Some(seed),
        }
    }
}

/// How episodes from different shows are mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "mode", rename_all = "camelCase")
)]
pub enum Interleave {
    #[default]
    None,
    RoundRobin,
    Chunk { size: usize },
}

/// Scheduling hint for re-resolving a smart playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RefreshCadence {
    #[default]
    Manual,
    Daily,
    Weekly,
}

impl RefreshCadence {
    pub fn interval(self) -> Option<Duration> {
        match self {
            RefreshCadence::Manual => None,
            RefreshCadence::Daily => Some(Duration::days(1)),
            RefreshCadence::Weekly => Some(Duration::weeks(1)),
        }
    }

    /// Whether a playlist last refreshed at `last_refreshed` should be
    /// re-resolved at `now`. Never-refreshed playlists on a cadence are due.
    pub fn is_due(
        self,
        last_refreshed: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match (self.interval(), last_refreshed) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => now - last >= interval,
        }
    }
}

/// Declarative description of a generated playlist.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SmartRule {
    pub scope: RuleScope,
    /// Whose watch history the watch filters consult.
    pub user_id: Option<UserId>,
    pub filters: RuleFilters,
    pub limits: RuleLimits,
    pub ordering: RuleOrdering,
    pub interleave: Interleave,
    pub refresh: RefreshCadence,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn range_filter_is_inclusive_and_open_ended() {
        let range = RangeFilter::new(Some(2u32), Some(4));
        assert!(!range.admits(Some(&1)));
        assert!(range.admits(Some(&2)));
        assert!(range.admits(Some(&4)));
        assert!(!range.admits(Some(&5)));
        assert!(!range.admits(None));

        assert!(RangeFilter::at_least(3u32).admits(Some(&u32::MAX)));
        assert!(RangeFilter::<u32>::default().admits(None));
    }

    #[test]
    fn explicit_nodes_override_libraries() {
        let mut scope = RuleScope {
            libraries: vec!["1".into()],
            ..RuleScope::default()
        };
        assert!(!scope.has_explicit_nodes());
        scope.seasons.push("s1".into());
        assert!(scope.has_explicit_nodes());
        assert!(RuleScope::default().is_empty());
    }

    #[test]
    fn ordering_keys_parse_from_rule_strings() {
        assert_eq!(
            "seasonEpisode".parse::<OrderingKey>().unwrap(),
            OrderingKey::SeasonEpisode
        );
        assert_eq!(
            "desc".parse::<SortDirection>().unwrap(),
            SortDirection::Descending
        );
        assert!("alphabetical".parse::<OrderingKey>().is_err());
    }

    #[test]
    fn refresh_cadence_due_dates() {
        let last = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let now = last + Duration::hours(25);
        assert!(RefreshCadence::Daily.is_due(Some(last), now));
        assert!(!RefreshCadence::Weekly.is_due(Some(last), now));
        assert!(RefreshCadence::Weekly.is_due(None, now));
        assert!(!RefreshCadence::Manual.is_due(None, now));
    }

    #[test]
    fn default_filters_keep_specials() {
        assert!(RuleFilters::default().include_specials);
    }
}
