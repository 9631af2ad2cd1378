use std::collections::HashMap;
use std::collections::VecDeque;

use buddy_model::{Interleave, MediaNode, NodeId};

/// Split `episodes` into per-show queues, shows in first-seen order.
pub(crate) fn group_by_show<'a, F>(
    episodes: Vec<&'a MediaNode>,
    show_of: F,
) -> Vec<VecDeque<&'a MediaNode>>
where
    F: Fn(&MediaNode) -> Option<NodeId>,
{
    let mut slots: HashMap<Option<NodeId>, usize> = HashMap::new();
    let mut groups: Vec<VecDeque<&'a MediaNode>> = Vec::new();
    for episode in episodes {
        let key = show_of(episode);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(VecDeque::new());
            groups.len() - 1
        });
        groups[slot].push_back(episode);
    }
    groups
}

/// Mix shows according to `mode`. Each show keeps its internal order; the
/// rotation visits shows in the order their first episode appears. A show
/// that runs out drops out of the rotation.
pub(crate) fn apply<'a, F>(
    episodes: Vec<&'a MediaNode>,
    mode: Interleave,
    show_of: F,
) -> Vec<&'a MediaNode>
where
    F: Fn(&MediaNode) -> Option<NodeId>,
{
    let run = match mode {
        Interleave::None => return episodes,
        Interleave::RoundRobin => 1,
        Interleave::Chunk { size } => size.max(1),
    };

    let total = episodes.len();
    let mut rotation = group_by_show(episodes, show_of);
    let mut out = Vec::with_capacity(total);
    while !rotation.is_empty() {
        for queue in &mut rotation {
            for _ in 0..run {
                match queue.pop_front() {
                    Some(episode) => out.push(episode),
                    None => break,
                }
            }
        }
        rotation.retain(|queue| !queue.is_empty());
    }
    out
}
