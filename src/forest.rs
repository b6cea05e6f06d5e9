//! The forest store: a multi-tenant table of rooted ordered trees.
//!
//! The table is the source of record. The materialized path index mirrors it
//! and the garbage queue hints the orphan sweep; both are derived state and
//! both are maintained inside the mutation operations, never by callers.

use {
    crate::{
        error::{Error, Result},
        msg::{LevelEntry, TreeNode},
        sort,
        types::{Node, NodeId, NodeKind, PathIndex, SegmentId, TreeId},
    },
    serde_json::Value,
    std::collections::BTreeMap,
};

/// A single rooted ordered tree of nodes.
pub type Segment = BTreeMap<NodeId, Node>;

/// A tenant's namespace of independent segments.
pub type Tree = BTreeMap<SegmentId, Segment>;

#[derive(Debug, Default)]
pub struct Forest {
    trees: BTreeMap<TreeId, Tree>,
    paths: PathIndex,
    garbage: Vec<(TreeId, SegmentId, NodeId)>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a bare node table, e.g. one decoded from a
    /// snapshot. The path index is reconstructed entry by entry; the garbage
    /// queue starts empty.
    pub fn from_table(trees: BTreeMap<TreeId, Tree>) -> Self {
        let mut forest = Self {
            trees,
            paths: PathIndex::default(),
            garbage: Vec::new(),
        };
        forest.rebuild_paths();
        forest
    }

    /// The raw `tree -> segment -> node` table, read by the snapshot codec.
    pub fn table(&self) -> &BTreeMap<TreeId, Tree> {
        &self.trees
    }

    pub fn paths(&self) -> &PathIndex {
        &self.paths
    }

    // ------------------------------- trees -------------------------------

    pub fn add_tree(&mut self, tree_id: TreeId) -> Result<()> {
        if self.trees.contains_key(&tree_id) {
            return Err(Error::TreeExists { tree_id });
        }
        self.trees.insert(tree_id, Tree::new());
        Ok(())
    }

    /// Drop a whole tenant. Nothing sits above a tree, so no sort
    /// maintenance is needed; the path index just loses every entry below it.
    pub fn remove_tree(&mut self, tree_id: TreeId) -> Result<()> {
        if self.trees.remove(&tree_id).is_none() {
            return Err(Error::TreeNotFound { tree_id });
        }
        self.paths.purge_prefix(&format!("{tree_id}/"));
        Ok(())
    }

    pub fn trees(&self) -> Vec<TreeId> {
        self.trees.keys().copied().collect()
    }

    // ------------------------------ segments -----------------------------

    pub fn segments(&self, tree_id: TreeId) -> Result<Vec<SegmentId>> {
        Ok(self.tree(tree_id)?.keys().copied().collect())
    }

    pub fn add_segment(
        &mut self,
        tree_id: TreeId,
        segment_id: SegmentId,
        root_node_id: NodeId,
    ) -> Result<()> {
        let tree = self.tree_mut(tree_id)?;
        if tree.contains_key(&segment_id) {
            return Err(Error::SegmentExists { tree_id, segment_id });
        }
        let mut segment = Segment::new();
        segment.insert(root_node_id, Node::root());
        tree.insert(segment_id, segment);
        self.paths.push(PathIndex::segment_path(tree_id, segment_id));
        self.paths.push(PathIndex::node_path(tree_id, segment_id, &[root_node_id]));
        Ok(())
    }

    /// Drop a segment wholesale. The removed subtree is recorded on the
    /// garbage queue from its root.
    pub fn remove_segment(&mut self, tree_id: TreeId, segment_id: SegmentId) -> Result<()> {
        let root_node_id = self.segment_root(tree_id, segment_id)?;
        self.tree_mut(tree_id)?.remove(&segment_id);
        self.garbage.push((tree_id, segment_id, root_node_id));

        let base = PathIndex::segment_path(tree_id, segment_id);
        self.paths.remove_exact(&base);
        self.paths.purge_prefix(&format!("{base}/"));
        self.gc();
        Ok(())
    }

    /// Scan for the unique node of kind `root`. Exactly one exists in any
    /// well-formed segment.
    pub fn segment_root(&self, tree_id: TreeId, segment_id: SegmentId) -> Result<NodeId> {
        self.segment(tree_id, segment_id)?
            .iter()
            .find(|(_, node)| node.kind == NodeKind::Root)
            .map(|(id, _)| *id)
            .ok_or(Error::RootMissing { segment_id })
    }

    // ----------------------------- retrieval -----------------------------

    /// The children of `parent_node_id`, in the order the parent keeps them.
    pub fn level(
        &self,
        tree_id: TreeId,
        segment_id: SegmentId,
        parent_node_id: NodeId,
    ) -> Result<Vec<LevelEntry>> {
        let segment = self.segment(tree_id, segment_id)?;
        let parent = segment
            .get(&parent_node_id)
            .ok_or(Error::NodeNotFound { node_id: parent_node_id })?;
        parent
            .children
            .iter()
            .map(|child_id| {
                let child = segment
                    .get(child_id)
                    .ok_or(Error::NodeNotFound { node_id: *child_id })?;
                Ok(LevelEntry {
                    id: *child_id,
                    kind: child.kind.to_string(),
                    data: child.payload.clone(),
                    sort: child.sort,
                })
            })
            .collect()
    }

    /// Ancestor ids from the segment root down to and including `node_id`.
    pub fn breadcrumbs(
        &self,
        tree_id: TreeId,
        segment_id: SegmentId,
        node_id: NodeId,
    ) -> Result<Vec<NodeId>> {
        let segment = self.segment(tree_id, segment_id)?;
        trail(segment, node_id).ok_or(Error::NodeNotFound { node_id })
    }

    /// Every live segment of every tree as a sorted depth-first traversal.
    pub fn everything(&self) -> Result<BTreeMap<TreeId, BTreeMap<SegmentId, TreeNode>>> {
        self.trees
            .keys()
            .map(|tree_id| Ok((*tree_id, self.tree_dump(*tree_id)?)))
            .collect()
    }

    pub fn tree_dump(&self, tree_id: TreeId) -> Result<BTreeMap<SegmentId, TreeNode>> {
        self.tree(tree_id)?
            .keys()
            .map(|segment_id| Ok((*segment_id, self.segment_dump(tree_id, *segment_id)?)))
            .collect()
    }

    pub fn segment_dump(&self, tree_id: TreeId, segment_id: SegmentId) -> Result<TreeNode> {
        let root_node_id = self.segment_root(tree_id, segment_id)?;
        let segment = self.segment(tree_id, segment_id)?;
        subtree(segment, root_node_id).ok_or(Error::NodeNotFound { node_id: root_node_id })
    }

    // ----------------------------- insertion -----------------------------

    /// A directory is a node of kind `dir` with no payload.
    pub fn add_directory(
        &mut self,
        tree_id: TreeId,
        segment_id: SegmentId,
        parent_node_id: NodeId,
        node_id: NodeId,
        requested_sort: Option<i64>,
    ) -> Result<()> {
        self.add_node(
            tree_id,
            segment_id,
            parent_node_id,
            node_id,
            requested_sort,
            Vec::new(),
            NodeKind::Dir,
            None,
        )
    }

    /// Insert a node under a container parent.
    ///
    /// Rank placement, with `M` the current maximum rank at the level:
    /// - no rank requested: append at `max(M, 0) + 1`, nobody moves;
    /// - requested into an empty level: clamped to 1;
    /// - requested into a one-child level: clamped to 2;
    /// - requested into a larger level: clamped to `M + 1` when past `M + 1`
    ///   or exactly `M` (the `== M` clamp is long-standing behavior that
    ///   callers rely on); otherwise honored, shifting every sibling at or
    ///   past the requested rank one to the right.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node(
        &mut self,
        tree_id: TreeId,
        segment_id: SegmentId,
        parent_node_id: NodeId,
        node_id: NodeId,
        requested_sort: Option<i64>,
        children: Vec<NodeId>,
        kind: NodeKind,
        payload: Option<Value>,
    ) -> Result<()> {
        if kind == NodeKind::Root {
            return Err(Error::ExplicitRoot);
        }

        let segment = self.segment_mut(tree_id, segment_id)?;
        let parent = segment
            .get(&parent_node_id)
            .ok_or(Error::NodeNotFound { node_id: parent_node_id })?;
        if !parent.kind.is_container() {
            return Err(Error::NotAContainer { node_id: parent_node_id });
        }
        if segment.contains_key(&node_id) {
            return Err(Error::NodeExists { node_id });
        }

        let level = parent.children.clone();
        let max_sort = level
            .iter()
            .filter_map(|id| segment.get(id))
            .map(|node| node.sort)
            .max();
        let (sort, re_sort) = place(requested_sort, level.len(), max_sort);

        segment.insert(node_id, Node::new(parent_node_id, kind, payload, sort, children));
        if re_sort {
            sort::shift_from(segment, &level, sort, node_id);
        }
        if let Some(parent) = segment.get_mut(&parent_node_id) {
            parent.children.push(node_id);
        }

        let crumbs = self.breadcrumbs(tree_id, segment_id, node_id)?;
        self.paths.push(PathIndex::node_path(tree_id, segment_id, &crumbs));
        Ok(())
    }

    // ------------------------------ removal ------------------------------

    pub fn remove_directory(
        &mut self,
        tree_id: TreeId,
        segment_id: SegmentId,
        node_id: NodeId,
    ) -> Result<()> {
        self.remove_node(tree_id, segment_id, node_id)
    }

    /// Remove a node and repair its level.
    ///
    /// Unlike insertion, removal always re-normalizes the whole sibling set,
    /// so it also repairs any disorder it happens to find. Removing a
    /// directory queues its subtree for the orphan sweep and purges every
    /// path entry beneath it.
    pub fn remove_node(
        &mut self,
        tree_id: TreeId,
        segment_id: SegmentId,
        node_id: NodeId,
    ) -> Result<()> {
        let crumbs = self.breadcrumbs(tree_id, segment_id, node_id)?;
        let was_dir;
        {
            let segment = self.segment_mut(tree_id, segment_id)?;
            let node = segment.get(&node_id).ok_or(Error::NodeNotFound { node_id })?;
            if node.kind == NodeKind::Root {
                return Err(Error::RootRemoval);
            }
            was_dir = node.kind == NodeKind::Dir;
            let parent_node_id = node.parent;

            if let Some(parent_id) = parent_node_id {
                if let Some(parent) = segment.get_mut(&parent_id) {
                    parent.children.retain(|id| *id != node_id);
                }
                let level = segment
                    .get(&parent_id)
                    .map(|parent| parent.children.clone())
                    .unwrap_or_default();
                sort::normalize(segment, &level);
            }

            segment.remove(&node_id);
        }

        let path = PathIndex::node_path(tree_id, segment_id, &crumbs);
        self.paths.remove_exact(&path);
        if was_dir {
            self.paths.purge_prefix(&format!("{path}/"));
            self.garbage.push((tree_id, segment_id, node_id));
            self.gc();
        }
        Ok(())
    }

    // ------------------------- generic and cleanup ------------------------

    /// Wipe the whole forest: table, path index, garbage queue.
    pub fn clear(&mut self) {
        self.trees.clear();
        self.paths.clear();
        self.garbage.clear();
    }

    /// Drain the garbage queue. For each recorded subtree root, sweep its
    /// segment and delete records whose parent no longer resolves, repeating
    /// until the segment is stable. Entries pointing at segments that were
    /// dropped wholesale need no work.
    pub fn gc(&mut self) {
        for (tree_id, segment_id, _) in std::mem::take(&mut self.garbage) {
            let Some(segment) = self
                .trees
                .get_mut(&tree_id)
                .and_then(|tree| tree.get_mut(&segment_id))
            else {
                continue;
            };
            loop {
                let orphans: Vec<NodeId> = segment
                    .iter()
                    .filter(|(_, node)| {
                        node.parent
                            .map_or(false, |parent_id| !segment.contains_key(&parent_id))
                    })
                    .map(|(id, _)| *id)
                    .collect();
                if orphans.is_empty() {
                    break;
                }
                for id in &orphans {
                    segment.remove(id);
                }
            }
        }
    }

    // ------------------------------ internal ------------------------------

    fn tree(&self, tree_id: TreeId) -> Result<&Tree> {
        self.trees.get(&tree_id).ok_or(Error::TreeNotFound { tree_id })
    }

    fn tree_mut(&mut self, tree_id: TreeId) -> Result<&mut Tree> {
        self.trees.get_mut(&tree_id).ok_or(Error::TreeNotFound { tree_id })
    }

    fn segment(&self, tree_id: TreeId, segment_id: SegmentId) -> Result<&Segment> {
        self.tree(tree_id)?
            .get(&segment_id)
            .ok_or(Error::SegmentNotFound { segment_id })
    }

    fn segment_mut(&mut self, tree_id: TreeId, segment_id: SegmentId) -> Result<&mut Segment> {
        self.tree_mut(tree_id)?
            .get_mut(&segment_id)
            .ok_or(Error::SegmentNotFound { segment_id })
    }

    fn rebuild_paths(&mut self) {
        let mut paths = PathIndex::default();
        for (tree_id, tree) in &self.trees {
            for (segment_id, segment) in tree {
                paths.push(PathIndex::segment_path(*tree_id, *segment_id));
                for node_id in segment.keys() {
                    if let Some(crumbs) = trail(segment, *node_id) {
                        paths.push(PathIndex::node_path(*tree_id, *segment_id, &crumbs));
                    }
                }
            }
        }
        self.paths = paths;
    }
}

/// Resolve the rank for a new child and whether siblings must shift.
/// `level_len` and `max_sort` describe the level before the insertion.
fn place(requested: Option<i64>, level_len: usize, max_sort: Option<i64>) -> (i64, bool) {
    match requested {
        None => (max_sort.unwrap_or(0).max(0) + 1, false),
        Some(_) if level_len == 0 => (1, false),
        Some(_) if level_len == 1 => (2, false),
        Some(requested) => {
            let max = max_sort.unwrap_or(0);
            if requested > max + 1 || requested == max {
                (max + 1, false)
            } else {
                (requested, true)
            }
        }
    }
}

/// Walk from `node_id` up to the segment root, returning ids root-first.
/// `None` when the node is missing or the parent chain is broken. Iterative
/// on purpose: recursion depth would equal the depth of the tree.
fn trail(segment: &Segment, node_id: NodeId) -> Option<Vec<NodeId>> {
    let mut path = vec![node_id];
    let mut current = segment.get(&node_id)?;
    while let Some(parent_id) = current.parent {
        current = segment.get(&parent_id)?;
        path.push(parent_id);
        if path.len() > segment.len() {
            // parent chain loops; the table is corrupted
            return None;
        }
    }
    path.reverse();
    Some(path)
}

/// Sorted depth-first traversal of the subtree under `node_id`.
fn subtree(segment: &Segment, node_id: NodeId) -> Option<TreeNode> {
    let node = segment.get(&node_id)?;
    let mut children: Vec<TreeNode> = node
        .children
        .iter()
        .filter_map(|child_id| subtree(segment, *child_id))
        .collect();
    children.sort_by_key(|child| child.sort);
    Some(TreeNode {
        id: node_id,
        kind: node.kind.to_string(),
        data: node.payload.clone(),
        sort: node.sort,
        children,
    })
}
