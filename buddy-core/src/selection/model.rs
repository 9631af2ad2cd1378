use std::collections::{HashMap, HashSet};

use buddy_model::{CheckState, MediaKind, NodeId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::catalog::CatalogSnapshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("node '{0}' is not in the selection tree")]
    UnknownNode(NodeId),
}

#[derive(Debug, Clone)]
struct TreeEntry {
    kind: MediaKind,
    parent: Option<NodeId>,
    /// `None` while the node is unexpanded.
    children: Option<Vec<NodeId>>,
}

/// Tri-state checkbox state over the materialized catalog tree.
///
/// Only `Checked` and `Unchecked` can be requested, and only on the node
/// the user touched. Everything else is derived: the request flows down to
/// every materialized descendant, then each ancestor is recomputed from its
/// direct children. Unexpanded nodes are opaque and keep their own state
/// until [`SelectionModel::reconcile_subtree`] materializes them.
///
/// After every change the checked episodes are published on a
/// [`watch`] channel.
#[derive(Debug)]
pub struct SelectionModel {
    nodes: HashMap<NodeId, TreeEntry>,
    roots: Vec<NodeId>,
    states: HashMap<NodeId, CheckState>,
    selected: watch::Sender<Vec<NodeId>>,
}

impl Default for SelectionModel {
    fn default() -> Self {
        let (selected, _) = watch::channel(Vec::new());
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            states: HashMap::new(),
            selected,
        }
    }
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every materialized node of `snapshot`, all unchecked.
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        let mut model = Self::new();
        model.reconcile_roots(snapshot);
        model
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn state(&self, id: &NodeId) -> Option<CheckState> {
        self.states.get(id).copied()
    }

    /// Apply a user toggle.
    ///
    /// # Panics
    ///
    /// Panics when `desired` is [`CheckState::PartiallyChecked`]; partial
    /// state is only ever derived from children.
    pub fn set_state(
        &mut self,
        id: &NodeId,
        desired: CheckState,
    ) -> Result<(), SelectionError> {
        assert!(
            desired != CheckState::PartiallyChecked,
            "PartiallyChecked is derived from children and cannot be set on '{id}'"
        );
        if !self.nodes.contains_key(id) {
            return Err(SelectionError::UnknownNode(id.clone()));
        }

        for node in self.subtree(id) {
            self.states.insert(node, desired);
        }
        self.propagate_up(id);
        self.publish();
        Ok(())
    }

    pub fn check(&mut self, id: &NodeId) -> Result<(), SelectionError> {
        self.set_state(id, CheckState::Checked)
    }

    pub fn uncheck(&mut self, id: &NodeId) -> Result<(), SelectionError> {
        self.set_state(id, CheckState::Unchecked)
    }

    /// Uncheck everything.
    pub fn clear(&mut self) {
        for state in self.states.values_mut() {
            *state = CheckState::Unchecked;
        }
        self.publish();
    }

    /// Checked episodes in tree order.
    pub fn selected_episodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for root in &self.roots {
            for id in self.subtree(root) {
                let is_episode = self
                    .nodes
                    .get(&id)
                    .is_some_and(|entry| entry.kind == MediaKind::Episode);
                let checked =
                    self.state(&id).is_some_and(CheckState::is_selected);
                if is_episode && checked {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Receiver of the selected-episode list, updated after every change
    /// that alters it.
    pub fn subscribe(&self) -> watch::Receiver<Vec<NodeId>> {
        self.selected.subscribe()
    }

    /// First non-leaf node whose state disagrees with its children, if any.
    pub fn find_inconsistency(&self) -> Option<NodeId> {
        self.nodes.iter().find_map(|(id, entry)| {
            let derived = self.derived_state(entry)?;
            (self.state(id) != Some(derived)).then(|| id.clone())
        })
    }

    /// Bring the root level in line with `snapshot`: shows that vanished are
    /// dropped with their subtrees, new shows arrive unchecked with whatever
    /// of their subtree is already materialized, and kept shows are rebuilt
    /// from the snapshot the way [`Self::reconcile_subtree`] does.
    pub fn reconcile_roots(&mut self, snapshot: &CatalogSnapshot) {
        let roots: Vec<NodeId> = snapshot.roots().cloned().collect();
        let keep: HashSet<&NodeId> = roots.iter().collect();

        let dropped: Vec<NodeId> = self
            .roots
            .iter()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for id in dropped {
            self.forget_subtree(&id);
        }

        for root in &roots {
            if self.nodes.contains_key(root) {
                self.rebuild(snapshot, root);
            } else {
                self.import(snapshot, root, None, CheckState::Unchecked);
            }
        }
        self.roots = roots;
        self.publish();
    }

    /// Re-read the subtree under `parent` after it was expanded or
    /// refreshed in `snapshot`.
    ///
    /// Ids that survive keep their state. New nodes take the state of their
    /// parent when it is `Checked` or `Unchecked` and start unchecked under
    /// a partial parent. The subtree and then its ancestors are recomputed.
    /// A node the snapshot no longer has expanded collapses back to an
    /// opaque node and its descendants are dropped.
    pub fn reconcile_subtree(
        &mut self,
        snapshot: &CatalogSnapshot,
        parent: &NodeId,
    ) -> Result<(), SelectionError> {
        let Some(entry) = self.nodes.get(parent) else {
            return Err(SelectionError::UnknownNode(parent.clone()));
        };
        let ancestor = entry.parent.clone();

        self.rebuild(snapshot, parent);
        self.propagate_up(parent);
        self.publish();

        debug!(
            parent = %parent,
            ancestor = ?ancestor,
            nodes = self.len(),
            "selection subtree reconciled"
        );
        Ok(())
    }

    /// Replace everything below `parent` with what `snapshot` holds,
    /// carrying surviving states over. Ancestors are left untouched.
    fn rebuild(&mut self, snapshot: &CatalogSnapshot, parent: &NodeId) {
        let previous: HashMap<NodeId, CheckState> = self
            .subtree(parent)
            .into_iter()
            .filter(|id| id != parent)
            .filter_map(|id| self.states.get(&id).map(|state| (id, *state)))
            .collect();
        for id in previous.keys() {
            self.nodes.remove(id);
            self.states.remove(id);
        }

        let children = snapshot.children(parent).map(<[NodeId]>::to_vec);
        let parent_state =
            self.state(parent).unwrap_or(CheckState::Unchecked);
        for child in children.iter().flatten() {
            self.import_with(snapshot, child, parent, parent_state, &previous);
        }
        let collapsed = children.is_none();
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children = children;
        }
        if collapsed && parent_state == CheckState::PartiallyChecked {
            // Opaque nodes only hold what was set on them.
            self.states.insert(parent.clone(), CheckState::Unchecked);
        }

        for id in self.post_order(parent) {
            if let Some(derived) =
                self.nodes.get(&id).and_then(|e| self.derived_state(e))
            {
                self.states.insert(id, derived);
            }
        }
    }

    fn import(
        &mut self,
        snapshot: &CatalogSnapshot,
        id: &NodeId,
        parent: Option<&NodeId>,
        state: CheckState,
    ) {
        let Some(node) = snapshot.get(id) else {
            return;
        };
        let children = snapshot.children(id).map(<[NodeId]>::to_vec);
        self.nodes.insert(
            id.clone(),
            TreeEntry {
                kind: node.kind,
                parent: parent.cloned(),
                children: children.clone(),
            },
        );
        self.states.insert(id.clone(), state);
        for child in children.iter().flatten() {
            self.import(snapshot, child, Some(id), state);
        }
    }

    fn import_with(
        &mut self,
        snapshot: &CatalogSnapshot,
        id: &NodeId,
        parent: &NodeId,
        parent_state: CheckState,
        previous: &HashMap<NodeId, CheckState>,
    ) {
        let Some(node) = snapshot.get(id) else {
            return;
        };
        let state = previous.get(id).copied().unwrap_or(match parent_state {
            CheckState::PartiallyChecked => CheckState::Unchecked,
            inherited => inherited,
        });
        let children = snapshot.children(id).map(<[NodeId]>::to_vec);
        self.nodes.insert(
            id.clone(),
            TreeEntry {
                kind: node.kind,
                parent: Some(parent.clone()),
                children: children.clone(),
            },
        );
        self.states.insert(id.clone(), state);
        for child in children.iter().flatten() {
            self.import_with(snapshot, child, id, state, previous);
        }
    }

    fn forget_subtree(&mut self, id: &NodeId) {
        for node in self.subtree(id) {
            self.nodes.remove(&node);
            self.states.remove(&node);
        }
    }

    /// Recompute ancestors of `id` from their children, stopping at the
    /// first one that does not change.
    fn propagate_up(&mut self, id: &NodeId) {
        let mut next = self.nodes.get(id).and_then(|e| e.parent.clone());
        while let Some(current) = next {
            let Some(entry) = self.nodes.get(&current) else {
                break;
            };
            let Some(derived) = self.derived_state(entry) else {
                break;
            };
            if self.state(&current) == Some(derived) {
                break;
            }
            next = entry.parent.clone();
            self.states.insert(current, derived);
        }
    }

    /// `None` for unexpanded or childless nodes, which keep their state.
    fn derived_state(&self, entry: &TreeEntry) -> Option<CheckState> {
        let children = entry.children.as_ref()?;
        CheckState::aggregate(children.iter().map(|child| {
            self.state(child).unwrap_or(CheckState::Unchecked)
        }))
    }

    /// `id` and every materialized descendant, parents before children.
    fn subtree(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(children) =
                self.nodes.get(&current).and_then(|e| e.children.as_ref())
            {
                stack.extend(children.iter().rev().cloned());
            }
            out.push(current);
        }
        out
    }

    fn post_order(&self, id: &NodeId) -> Vec<NodeId> {
        let mut order = self.subtree(id);
        order.reverse();
        order
    }

    fn publish(&self) {
        let next = self.selected_episodes();
        self.selected.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
