use std::collections::HashMap;

use buddy_model::{MediaNode, NodeId, RuleLimits};

/// Apply the caps in order: per show, running runtime, item count.
///
/// The runtime cap is a ceiling over the sequence as ordered. The first
/// episode that would push the total past it ends the output, even when a
/// later, shorter one would still fit. Unknown runtimes count as zero.
pub(crate) fn apply<'a, F>(
    mut episodes: Vec<&'a MediaNode>,
    limits: &RuleLimits,
    show_of: F,
) -> Vec<&'a MediaNode>
where
    F: Fn(&MediaNode) -> Option<NodeId>,
{
    if let Some(cap) = limits.per_show_cap {
        let mut taken: HashMap<Option<NodeId>, usize> = HashMap::new();
        episodes.retain(|episode| {
            let count = taken.entry(show_of(*episode)).or_default();
            *count += 1;
            *count <= cap
        });
    }

    if let Some(cap) = limits.runtime_cap_ms {
        let mut total: u64 = 0;
        let fits = episodes
            .iter()
            .take_while(|episode| {
                total = total.saturating_add(episode.runtime_ms.unwrap_or(0));
                total <= cap
            })
            .count();
        episodes.truncate(fits);
    }

    if let Some(max) = limits.max_items {
        episodes.truncate(max);
    }
    episodes
}

/// Sum of known runtimes.
pub(crate) fn total_runtime_ms(episodes: &[&MediaNode]) -> u64 {
    episodes
        .iter()
        .map(|episode| episode.runtime_ms.unwrap_or(0))
        .fold(0u64, u64::saturating_add)
}
