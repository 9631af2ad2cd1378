use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::ids::NodeId;
use crate::media::MediaKind;

/// Tri-state checkbox value for a catalog node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CheckState {
    #[default]
    Unchecked,
    PartiallyChecked,
    Checked,
}

impl CheckState {
    /// Aggregate the states of a node's direct children.
    ///
    /// Returns `None` for an empty child list: a node without children has
    /// nothing to derive its state from and keeps whatever it has.
    pub fn aggregate<I>(children: I) -> Option<CheckState>
    where
        I: IntoIterator<Item = CheckState>,
    {
        let mut any = false;
        let mut all_checked = true;
        let mut all_unchecked = true;
        for state in children {
            any = true;
            all_checked &= state == CheckState::Checked;
            all_unchecked &= state == CheckState::Unchecked;
            if !all_checked && !all_unchecked {
                return Some(CheckState::PartiallyChecked);
            }
        }
        if !any {
            None
        } else if all_checked {
            Some(CheckState::Checked)
        } else if all_unchecked {
            Some(CheckState::Unchecked)
        } else {
            Some(CheckState::PartiallyChecked)
        }
    }

    pub fn is_selected(self) -> bool {
        self != CheckState::Unchecked
    }
}

/// How an item entered a manual playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SelectionSource {
    Manual,
    Template,
    Rule,
}

/// Audit entry for a manually selected node.
///
/// Identity is the node id alone: two selections of the same node are the
/// same entry whatever their source or timestamp.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    pub node_id: NodeId,
    pub kind: MediaKind,
    pub source: SelectionSource,
    pub added_at: DateTime<Utc>,
}

impl Selection {
    pub fn new(
        node_id: impl Into<NodeId>,
        kind: MediaKind,
        source: SelectionSource,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            kind,
            source,
            added_at,
        }
    }
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.node_id == other.node_id
    }
}

impl Eq for Selection {}

impl Hash for Selection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use CheckState::*;

    #[test]
    fn aggregate_follows_children() {
        assert_eq!(CheckState::aggregate([Checked, Checked]), Some(Checked));
        assert_eq!(
            CheckState::aggregate([Unchecked, Unchecked]),
            Some(Unchecked)
        );
        assert_eq!(
            CheckState::aggregate([Checked, Unchecked]),
            Some(PartiallyChecked)
        );
        assert_eq!(
            CheckState::aggregate([PartiallyChecked]),
            Some(PartiallyChecked)
        );
        assert_eq!(CheckState::aggregate([]), None);
    }

    #[test]
    fn selections_hash_by_node_id() {
        let now = Utc::now();
        let mut set = HashSet::new();
        assert!(set.insert(Selection::new(
            "ep-1",
            MediaKind::Episode,
            SelectionSource::Manual,
            now,
        )));
        assert!(!set.insert(Selection::new(
            "ep-1",
            MediaKind::Episode,
            SelectionSource::Rule,
            now + chrono::Duration::seconds(5),
        )));
        assert_eq!(set.len(), 1);
    }
}
