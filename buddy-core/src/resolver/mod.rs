//! Smart rule resolution.
//!
//! [`resolve`] is a pure function of a catalog snapshot, a watch snapshot
//! and a rule. It runs a fixed pipeline: scope expansion, filtering,
//! deduplication, ordering, interleave, caps. Nothing is shared between
//! calls, so resolutions of different rules can run concurrently.

pub(crate) mod capping;
mod filter;
mod interleave;
pub(crate) mod ordering;
mod scope;
mod watch;

use std::collections::HashSet;

use buddy_model::{MediaNode, NodeId, SmartRule};
use tracing::debug;

use crate::catalog::CatalogSnapshot;
use crate::error::Result;

pub use watch::WatchSnapshot;

/// Output of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Episode ids in playback order.
    pub episodes: Vec<NodeId>,
    pub total_runtime_ms: u64,
    /// Seed behind a random ordering, so the result can be reproduced.
    pub seed_used: Option<u64>,
}

impl Resolution {
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

/// Turn `rule` into an ordered, capped, duplicate-free episode sequence.
///
/// Fails only with [`crate::CoreError::ScopeNotFound`] when the rule names a
/// library, show, season or collection that `snapshot` does not hold. No
/// matches is an empty resolution, not an error. Episodes missing from
/// `watch` count as unwatched.
pub fn resolve(
    snapshot: &CatalogSnapshot,
    watch: &WatchSnapshot,
    rule: &SmartRule,
) -> Result<Resolution> {
    let candidates =
        scope::expand(snapshot, &rule.scope, rule.filters.include_specials)?;
    let scoped = candidates.len();

    let filtered: Vec<&MediaNode> = candidates
        .into_iter()
        .filter(|episode| {
            filter::admits(
                snapshot,
                &rule.filters,
                episode,
                &watch.record_or_default(&episode.id),
            )
        })
        .collect();
    let after_filter = filtered.len();

    let mut unique = dedup(filtered);
    let seed_used = ordering::apply(&mut unique, &rule.ordering, watch);

    let show_of = |node: &MediaNode| snapshot.show_of(&node.id).cloned();
    let mixed = interleave::apply(unique, rule.interleave, show_of);
    let capped = capping::apply(mixed, &rule.limits, show_of);

    debug!(
        scoped,
        after_filter,
        resolved = capped.len(),
        ordering = ?rule.ordering.key,
        "smart rule resolved"
    );

    Ok(Resolution {
        total_runtime_ms: capping::total_runtime_ms(&capped),
        episodes: capped.into_iter().map(|node| node.id.clone()).collect(),
        seed_used,
    })
}

/// Scope candidates before filtering, without repeats. Smart refreshes
/// fetch watch state for exactly these.
pub fn candidate_episodes<'a>(
    snapshot: &'a CatalogSnapshot,
    rule: &SmartRule,
) -> Result<Vec<&'a MediaNode>> {
    let candidates =
        scope::expand(snapshot, &rule.scope, rule.filters.include_specials)?;
    Ok(dedup(candidates))
}

/// Keep the first occurrence of every id.
fn dedup<'a>(episodes: Vec<&'a MediaNode>) -> Vec<&'a MediaNode> {
    let mut seen: HashSet<&'a NodeId> = HashSet::with_capacity(episodes.len());
    let mut unique = Vec::with_capacity(episodes.len());
    for episode in episodes {
        if seen.insert(&episode.id) {
            unique.push(episode);
        }
    }
    unique
}
