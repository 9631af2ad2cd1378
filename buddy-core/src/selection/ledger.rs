use std::collections::HashSet;

use buddy_model::{MediaKind, NodeId, Selection, SelectionSource};
use chrono::{DateTime, Utc};

/// What a [`ManualSelections::reconcile`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDelta {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl LedgerDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Audit trail of how each episode entered a manual playlist, in insertion
/// order. Entries are keyed by node id alone: recording a node twice keeps
/// the first entry.
#[derive(Debug, Clone, Default)]
pub struct ManualSelections {
    entries: Vec<Selection>,
    index: HashSet<NodeId>,
}

impl ManualSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the node was already recorded.
    pub fn record(&mut self, selection: Selection) -> bool {
        if !self.index.insert(selection.node_id.clone()) {
            return false;
        }
        self.entries.push(selection);
        true
    }

    pub fn remove(&mut self, node_id: &NodeId) -> Option<Selection> {
        if !self.index.remove(node_id) {
            return None;
        }
        let position = self
            .entries
            .iter()
            .position(|entry| &entry.node_id == node_id)?;
        Some(self.entries.remove(position))
    }

    /// Follow the selected-episode set: record ids that appeared under
    /// `source`, drop ids that are no longer selected.
    pub fn reconcile(
        &mut self,
        selected: &[NodeId],
        source: SelectionSource,
        now: DateTime<Utc>,
    ) -> LedgerDelta {
        let wanted: HashSet<&NodeId> = selected.iter().collect();
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            let keep = wanted.contains(&entry.node_id);
            if !keep {
                removed.push(entry.node_id.clone());
            }
            keep
        });
        for id in &removed {
            self.index.remove(id);
        }

        let mut added = Vec::new();
        for id in selected {
            let entry =
                Selection::new(id.clone(), MediaKind::Episode, source, now);
            if self.record(entry) {
                added.push(id.clone());
            }
        }
        LedgerDelta { added, removed }
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.index.contains(node_id)
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&Selection> {
        self.entries.iter().find(|entry| &entry.node_id == node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> + '_ {
        self.entries.iter()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.entries.iter().map(|e| e.node_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn duplicate_node_is_recorded_once() {
        let mut ledger = ManualSelections::new();
        let node = NodeId::from("e1");
        assert!(ledger.record(Selection::new(
            node.clone(),
            MediaKind::Episode,
            SelectionSource::Manual,
            at(1),
        )));
        assert!(!ledger.record(Selection::new(
            node.clone(),
            MediaKind::Episode,
            SelectionSource::Rule,
            at(2),
        )));

        assert_eq!(ledger.len(), 1);
        let kept = ledger.get(&node).unwrap();
        assert_eq!(kept.source, SelectionSource::Manual);
        assert_eq!(kept.added_at, at(1));
    }

    #[test]
    fn reconcile_tracks_the_selected_set() {
        let mut ledger = ManualSelections::new();
        let ids: Vec<NodeId> =
            ["e1", "e2", "e3"].into_iter().map(NodeId::from).collect();

        let first = ledger.reconcile(&ids[..2], SelectionSource::Manual, at(1));
        assert_eq!(first.added, ids[..2].to_vec());
        assert!(first.removed.is_empty());

        let second =
            ledger.reconcile(&ids[1..], SelectionSource::Template, at(2));
        assert_eq!(second.added, vec![ids[2].clone()]);
        assert_eq!(second.removed, vec![ids[0].clone()]);
        assert_eq!(ledger.node_ids(), ids[1..].to_vec());
        assert_eq!(
            ledger.get(&ids[1]).unwrap().source,
            SelectionSource::Manual
        );

        assert!(
            ledger
                .reconcile(&ids[1..], SelectionSource::Manual, at(3))
                .is_empty()
        );
    }

    #[test]
    fn reconcile_drops_a_large_deselection_in_order() {
        let mut ledger = ManualSelections::new();
        let ids: Vec<NodeId> = (0..2_000)
            .map(|n| NodeId::from(format!("e{n}")))
            .collect();
        ledger.reconcile(&ids, SelectionSource::Manual, at(1));

        let kept: Vec<NodeId> = ids.iter().step_by(2).cloned().collect();
        let delta = ledger.reconcile(&kept, SelectionSource::Manual, at(2));

        assert!(delta.added.is_empty());
        assert_eq!(delta.removed.len(), 1_000);
        assert_eq!(delta.removed[0], ids[1]);
        assert_eq!(ledger.node_ids(), kept);
        assert!(!ledger.contains(&ids[1]));
        assert!(ledger.contains(&ids[2]));

        // Dropped ids can be recorded again.
        let back = ledger.reconcile(&ids[..2], SelectionSource::Rule, at(3));
        assert_eq!(back.added, vec![ids[1].clone()]);
    }
}
