//! Flat, id-keyed arena holding one refresh of the catalog tree.
//!
//! Parent and child links are ids, never references, so the selection model
//! can walk up and down without ownership cycles. A node whose children have
//! not been fetched has no entry in `children` and is treated as opaque.

use std::collections::{HashMap, HashSet};

use buddy_model::{
    Collection, CollectionId, Library, LibraryId, MediaKind, MediaNode, NodeId,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("library '{0}' is not in the snapshot")]
    UnknownLibrary(LibraryId),

    #[error("parent node '{0}' is not in the snapshot")]
    UnknownParent(NodeId),

    #[error(
        "node '{child}' is a {found} but children of '{parent}' must be {expected}"
    )]
    KindMismatch {
        parent: NodeId,
        child: NodeId,
        expected: &'static str,
        found: MediaKind,
    },

    #[error("node '{0}' already belongs to another parent")]
    DuplicateNode(NodeId),
}

#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    libraries: Vec<Library>,
    library_shows: HashMap<LibraryId, Vec<NodeId>>,
    nodes: HashMap<NodeId, MediaNode>,
    children: HashMap<NodeId, Vec<NodeId>>,
    collections: HashMap<CollectionId, Collection>,
    collection_order: Vec<CollectionId>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_library(&mut self, library: Library) {
        if let Some(existing) =
            self.libraries.iter_mut().find(|lib| lib.id == library.id)
        {
            *existing = library;
        } else {
            self.libraries.push(library);
        }
    }

    /// Replace every show of a library, dropping the previous subtrees.
    pub fn set_library_shows(
        &mut self,
        library_id: &LibraryId,
        shows: Vec<MediaNode>,
    ) -> Result<Vec<NodeId>, SnapshotError> {
        if !self.libraries.iter().any(|lib| &lib.id == library_id) {
            return Err(SnapshotError::UnknownLibrary(library_id.clone()));
        }

        let previous = self
            .library_shows
            .get(library_id)
            .cloned()
            .unwrap_or_default();
        let replaced: HashSet<NodeId> = previous
            .iter()
            .flat_map(|id| self.subtree_ids(id))
            .collect();

        let mut incoming = HashSet::with_capacity(shows.len());
        for show in &shows {
            if !incoming.insert(&show.id) {
                return Err(SnapshotError::DuplicateNode(show.id.clone()));
            }
            if show.kind != MediaKind::Show {
                return Err(SnapshotError::KindMismatch {
                    parent: NodeId(library_id.0.clone()),
                    child: show.id.clone(),
                    expected: "shows",
                    found: show.kind,
                });
            }
            if self.nodes.contains_key(&show.id)
                && !replaced.contains(&show.id)
            {
                return Err(SnapshotError::DuplicateNode(show.id.clone()));
            }
        }

        for id in &replaced {
            self.nodes.remove(id);
            self.children.remove(id);
        }

        let ids: Vec<NodeId> =
            shows.iter().map(|show| show.id.clone()).collect();
        for mut show in shows {
            show.parent_id = None;
            show.library_id = Some(library_id.clone());
            self.nodes.insert(show.id.clone(), show);
        }
        self.library_shows.insert(library_id.clone(), ids.clone());
        Ok(ids)
    }

    /// Materialize the children of `parent`, replacing any previous ones
    /// wholesale. The parent becomes expanded even when `children` is empty.
    pub fn attach_children(
        &mut self,
        parent: &NodeId,
        children: Vec<MediaNode>,
    ) -> Result<Vec<NodeId>, SnapshotError> {
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or_else(|| SnapshotError::UnknownParent(parent.clone()))?;
        let parent_kind = parent_node.kind;
        let library_id = parent_node.library_id.clone();
        let parent_season = parent_node.season_number;

        let Some(expected) = parent_kind.child_kind() else {
            return Err(SnapshotError::KindMismatch {
                parent: parent.clone(),
                child: children
                    .first()
                    .map(|child| child.id.clone())
                    .unwrap_or_else(|| parent.clone()),
                expected: "nothing",
                found: children
                    .first()
                    .map(|child| child.kind)
                    .unwrap_or(MediaKind::Episode),
            });
        };

        let replaced: HashSet<NodeId> = self
            .children
            .get(parent)
            .into_iter()
            .flatten()
            .flat_map(|id| self.subtree_ids(id))
            .collect();

        let mut incoming = HashSet::with_capacity(children.len());
        for child in &children {
            if !incoming.insert(&child.id) {
                return Err(SnapshotError::DuplicateNode(child.id.clone()));
            }
            if child.kind != expected {
                return Err(SnapshotError::KindMismatch {
                    parent: parent.clone(),
                    child: child.id.clone(),
                    expected: expected.as_str(),
                    found: child.kind,
                });
            }
            if self.nodes.contains_key(&child.id)
                && !replaced.contains(&child.id)
            {
                return Err(SnapshotError::DuplicateNode(child.id.clone()));
            }
        }

        for id in &replaced {
            self.nodes.remove(id);
            self.children.remove(id);
        }

        let ids: Vec<NodeId> =
            children.iter().map(|child| child.id.clone()).collect();
        for mut child in children {
            child.parent_id = Some(parent.clone());
            child.library_id = library_id.clone();
            if child.kind == MediaKind::Episode
                && child.season_number.is_none()
            {
                child.season_number = parent_season;
            }
            self.nodes.insert(child.id.clone(), child);
        }
        self.children.insert(parent.clone(), ids.clone());
        Ok(ids)
    }

    pub fn insert_collection(&mut self, collection: Collection) {
        if !self.collections.contains_key(&collection.id) {
            self.collection_order.push(collection.id.clone());
        }
        self.collections.insert(collection.id.clone(), collection);
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn has_library(&self, id: &LibraryId) -> bool {
        self.libraries.iter().any(|lib| &lib.id == id)
    }

    pub fn shows_in(&self, library_id: &LibraryId) -> &[NodeId] {
        self.library_shows
            .get(library_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every show, library by library, in load order.
    pub fn roots(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.libraries
            .iter()
            .flat_map(move |lib| self.shows_in(&lib.id).iter())
    }

    pub fn collection(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.get(id)
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> + '_ {
        self.collection_order
            .iter()
            .filter_map(move |id| self.collections.get(id))
    }

    pub fn get(&self, id: &NodeId) -> Option<&MediaNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `None` until the node has been expanded.
    pub fn children(&self, id: &NodeId) -> Option<&[NodeId]> {
        self.children.get(id).map(Vec::as_slice)
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.children.contains_key(id)
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id).and_then(|node| node.parent_id.as_ref())
    }

    /// The node itself followed by its ancestors up to the show.
    pub fn lineage<'a>(
        &'a self,
        id: &NodeId,
    ) -> impl Iterator<Item = &'a MediaNode> + use<'a> {
        let mut next = self.nodes.get(id);
        std::iter::from_fn(move || {
            let node = next?;
            next = node
                .parent_id
                .as_ref()
                .and_then(|pid| self.nodes.get(pid));
            Some(node)
        })
    }

    /// Owning show of any node (a show is its own show).
    pub fn show_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.lineage(id)
            .find(|node| node.kind == MediaKind::Show)
            .map(|node| &node.id)
    }

    /// Materialized episodes beneath `id` in tree order. An episode id
    /// yields itself.
    pub fn episodes_under(&self, id: &NodeId) -> Vec<&MediaNode> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if node.kind == MediaKind::Episode {
                out.push(node);
                continue;
            }
            if let Some(children) = self.children.get(current) {
                stack.extend(children.iter().rev());
            }
        }
        out
    }

    /// Every materialized episode, library by library in tree order.
    pub fn episodes(&self) -> Vec<&MediaNode> {
        self.roots()
            .flat_map(|show| self.episodes_under(show))
            .collect()
    }

    fn subtree_ids(&self, root: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(current) = stack.pop() {
            if let Some(children) = self.children.get(&current) {
                stack.extend(children.iter().cloned());
            }
            out.push(current);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Library {
        Library {
            id: "lib".into(),
            title: "TV".into(),
        }
    }

    fn snapshot_with_show() -> CatalogSnapshot {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert_library(library());
        snapshot
            .set_library_shows(
                &"lib".into(),
                vec![MediaNode::show("sh", "lib", "Show")],
            )
            .unwrap();
        snapshot
            .attach_children(
                &"sh".into(),
                vec![
                    MediaNode::season("s1", "sh", 1),
                    MediaNode::season("s2", "sh", 2),
                ],
            )
            .unwrap();
        snapshot
            .attach_children(
                &"s1".into(),
                vec![
                    MediaNode::episode("e1", "s1", 1, 1),
                    MediaNode::episode("e2", "s1", 1, 2),
                ],
            )
            .unwrap();
        snapshot
    }

    #[test]
    fn episodes_under_follow_tree_order() {
        let snapshot = snapshot_with_show();
        let ids: Vec<&str> = snapshot
            .episodes_under(&"sh".into())
            .iter()
            .map(|node| node.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e1", "e2"]);
        assert!(!snapshot.is_expanded(&"s2".into()));
        assert_eq!(
            snapshot.show_of(&"e2".into()),
            Some(&NodeId::from("sh"))
        );
    }

    #[test]
    fn reattaching_children_replaces_subtree() {
        let mut snapshot = snapshot_with_show();
        snapshot
            .attach_children(
                &"sh".into(),
                vec![MediaNode::season("s1", "sh", 1)],
            )
            .unwrap();

        assert!(!snapshot.contains(&"s2".into()));
        assert!(!snapshot.contains(&"e1".into()));
        assert!(!snapshot.is_expanded(&"s1".into()));
    }

    #[test]
    fn children_must_be_one_level_down() {
        let mut snapshot = snapshot_with_show();
        let err = snapshot
            .attach_children(
                &"sh".into(),
                vec![MediaNode::episode("x", "sh", 1, 1)],
            )
            .unwrap_err();
        assert!(matches!(err, SnapshotError::KindMismatch { .. }));

        let err = snapshot
            .attach_children(
                &"e1".into(),
                vec![MediaNode::episode("y", "e1", 1, 1)],
            )
            .unwrap_err();
        assert!(matches!(err, SnapshotError::KindMismatch { .. }));
    }

    #[test]
    fn a_node_cannot_have_two_parents() {
        let mut snapshot = snapshot_with_show();
        let err = snapshot
            .attach_children(
                &"s2".into(),
                vec![MediaNode::episode("e1", "s2", 2, 1)],
            )
            .unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateNode("e1".into()));
    }

    #[test]
    fn repeated_child_in_one_listing_is_rejected() {
        let mut snapshot = snapshot_with_show();
        let err = snapshot
            .attach_children(
                &"s2".into(),
                vec![
                    MediaNode::episode("e5", "s2", 2, 1),
                    MediaNode::episode("e5", "s2", 2, 1),
                ],
            )
            .unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateNode("e5".into()));
        assert!(!snapshot.is_expanded(&"s2".into()));
        assert!(!snapshot.contains(&"e5".into()));

        let err = snapshot
            .set_library_shows(
                &"lib".into(),
                vec![
                    MediaNode::show("dup", "lib", "Dup"),
                    MediaNode::show("dup", "lib", "Dup"),
                ],
            )
            .unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateNode("dup".into()));
        assert!(snapshot.contains(&"e1".into()));
    }

    #[test]
    fn episodes_inherit_library_and_season_number() {
        let mut snapshot = snapshot_with_show();
        let mut bare = MediaNode::episode("e3", "s2", 0, 1);
        bare.season_number = None;
        snapshot.attach_children(&"s2".into(), vec![bare]).unwrap();

        let node = snapshot.get(&"e3".into()).unwrap();
        assert_eq!(node.season_number, Some(2));
        assert_eq!(node.library_id, Some("lib".into()));
    }
}
