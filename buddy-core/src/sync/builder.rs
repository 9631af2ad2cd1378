//! Manual playlist drafting: order the checked episodes and measure them
//! against a runtime budget before anything is written remotely.

use std::collections::HashSet;

use buddy_model::{
    MediaNode, NodeId, OrderingKey, Playlist, RuleOrdering, SortDirection,
};

use crate::catalog::CatalogSnapshot;
use crate::resolver::{WatchSnapshot, capping, ordering};

/// Ordering choices offered for a hand-picked playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftOrder {
    AirDate,
    #[default]
    SeasonEpisode,
    AddedDate,
    Random {
        seed: Option<u64>,
    },
    /// Keep the order the episodes were selected in.
    Manual,
}

impl DraftOrder {
    fn rule_ordering(self) -> Option<RuleOrdering> {
        let key = match self {
            DraftOrder::AirDate => OrderingKey::AirDate,
            DraftOrder::SeasonEpisode => OrderingKey::SeasonEpisode,
            DraftOrder::AddedDate => OrderingKey::AddedDate,
            DraftOrder::Random { seed } => {
                return Some(RuleOrdering {
                    shuffle_seed: seed,
                    ..RuleOrdering::new(
                        OrderingKey::Random,
                        SortDirection::Ascending,
                    )
                });
            }
            DraftOrder::Manual => return None,
        };
        Some(RuleOrdering::new(key, SortDirection::Ascending))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeLevel {
    WithinCap,
    NearCap,
    OverCap,
}

/// Total runtime relative to a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeGauge {
    pub total_ms: u64,
    pub cap_ms: u64,
    /// Uncapped; 150 means half again over the cap.
    pub percent: u64,
}

impl RuntimeGauge {
    /// `None` for a zero cap, which means no budget.
    pub fn new(total_ms: u64, cap_ms: u64) -> Option<Self> {
        if cap_ms == 0 {
            return None;
        }
        let percent =
            (u128::from(total_ms) * 100 / u128::from(cap_ms)) as u64;
        Some(Self {
            total_ms,
            cap_ms,
            percent,
        })
    }

    pub fn level(&self) -> GaugeLevel {
        match self.percent {
            0..=90 => GaugeLevel::WithinCap,
            91..=100 => GaugeLevel::NearCap,
            _ => GaugeLevel::OverCap,
        }
    }

    /// Percentage clamped for a progress bar.
    pub fn fill_percent(&self) -> u8 {
        self.percent.min(100) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPreview {
    pub episodes: Vec<NodeId>,
    pub total_runtime_ms: u64,
    pub gauge: Option<RuntimeGauge>,
    pub seed_used: Option<u64>,
}

/// A static playlist being assembled from checked episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualPlaylistDraft {
    pub name: String,
    pub order: DraftOrder,
    pub runtime_cap_ms: Option<u64>,
}

impl ManualPlaylistDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: DraftOrder::default(),
            runtime_cap_ms: None,
        }
    }

    pub fn with_order(mut self, order: DraftOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_runtime_cap_minutes(mut self, minutes: u64) -> Self {
        self.runtime_cap_ms = Some(minutes.saturating_mul(60_000));
        self
    }

    /// Order `selected` and total its runtime. Ids that are not episodes of
    /// `snapshot` are ignored; the cap is reported, never enforced.
    pub fn preview(
        &self,
        snapshot: &CatalogSnapshot,
        selected: &[NodeId],
    ) -> DraftPreview {
        let mut seen = HashSet::new();
        let mut episodes: Vec<&MediaNode> = selected
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| snapshot.get(id))
            .filter(|node| node.kind.is_leaf())
            .collect();

        let seed_used = self.order.rule_ordering().and_then(|rule| {
            ordering::apply(&mut episodes, &rule, &WatchSnapshot::new())
        });
        let total_runtime_ms = capping::total_runtime_ms(&episodes);

        DraftPreview {
            episodes: episodes.iter().map(|node| node.id.clone()).collect(),
            total_runtime_ms,
            gauge: self
                .runtime_cap_ms
                .and_then(|cap| RuntimeGauge::new(total_runtime_ms, cap)),
            seed_used,
        }
    }

    /// Static playlist holding the previewed order.
    pub fn to_playlist(&self, preview: &DraftPreview) -> Playlist {
        Playlist::new_static(self.name.clone(), preview.episodes.clone())
    }
}
