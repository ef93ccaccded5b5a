//! Dynamic maintenance of the active boundary.
//!
//! Unfolded nodes are `Active` and folded nodes `Inactive`; folded nodes
//! with an unfolded parent form the active boundary and are labeled
//! `Boundary`. The boundary determines which vertices of the original mesh
//! are currently merged, and thus the current simplification.
//!
//! Only a `Boundary` node can be unfolded, and only an `Active` node whose
//! children are all `Boundary` can be folded. [`VertexTree::fold_subtree`]
//! and [`VertexTree::unfold_ancestors`] lift those restrictions by folding
//! or unfolding the nodes in between first.
//!
//! The boundary is threaded into a circular list that starts at the root,
//! runs through the `Boundary` nodes from left to right and returns to the
//! root. Fold and unfold splice nodes in and out of this list in constant
//! time per child, and move the node's subtriangles in or out of their
//! containers' visible lists.
//!
//! Two strategies apply a [`FoldCriterion`] to the whole tree:
//! [`VertexTree::adjust_top_down`] visits every node above the boundary and
//! [`VertexTree::adjust_boundary`] walks only the boundary itself, doing work
//! proportional to the number of boundary changes.

use tracing::trace;

use crate::TriIndex;

use super::criterion::FoldCriterion;
use super::node::{NodeIndex, NodeStatus};
use super::tree::VertexTree;

/// Work done by one adjustment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjustStats {
    /// Nodes folded.
    pub folds: usize,
    /// Nodes unfolded.
    pub unfolds: usize,
    /// Calls to the fold criterion.
    pub evaluations: usize,
}

impl AdjustStats {
    /// Returns `true` if the pass changed the boundary.
    pub fn changed(&self) -> bool {
        self.folds + self.unfolds > 0
    }
}

impl VertexTree {
    /// Unfolds a `Boundary` node: its children join the boundary in its
    /// place, in sibling order, and its subtriangles become visible.
    ///
    /// Returns `false` without changing anything if the node is a leaf;
    /// leaves stay on the boundary.
    ///
    /// # Panics
    /// Panics if the node is not `Boundary` or one of its children is not
    /// `Inactive`.
    pub fn unfold(&mut self, node: NodeIndex) -> bool {
        let n = &self.nodes[node.index()];
        assert!(
            n.status == NodeStatus::Boundary,
            "cannot unfold {node:?}: status is {:?}, expected Boundary",
            n.status
        );
        let Some(first) = n.first_child else {
            return false;
        };
        for c in self.children(node) {
            let status = self.nodes[c.index()].status;
            assert!(
                status == NodeStatus::Inactive,
                "cannot unfold {node:?}: child {c:?} is {status:?}, expected Inactive"
            );
        }
        let (mut prev, next) = self.frontier_links(node);

        let mut child = Some(first);
        while let Some(c) = child {
            self.nodes[prev.index()].next = Some(c);
            let cn = &mut self.nodes[c.index()];
            cn.status = NodeStatus::Boundary;
            cn.prev = Some(prev);
            prev = c;
            child = cn.sibling;
        }
        self.nodes[prev.index()].next = Some(next);
        self.nodes[next.index()].prev = Some(prev);

        let root = self.root();
        let n = &mut self.nodes[node.index()];
        n.status = NodeStatus::Active;
        if node != root {
            n.next = None;
            n.prev = None;
        }

        for i in 0..self.nodes[node.index()].subtris.len() {
            let t = self.nodes[node.index()].subtris[i];
            self.add_visible(t);
        }
        true
    }

    /// Folds an `Active` node whose children are all `Boundary`: the node
    /// replaces its children on the boundary and its subtriangles vanish.
    ///
    /// # Panics
    /// Panics if the node is not `Active` or a child is not `Boundary`. Use
    /// [`fold_subtree`](Self::fold_subtree) to fold deeper cuts.
    pub fn fold(&mut self, node: NodeIndex) {
        let n = &self.nodes[node.index()];
        assert!(
            n.status == NodeStatus::Active,
            "cannot fold {node:?}: status is {:?}, expected Active",
            n.status
        );
        let first = n.first_child.expect("active nodes have children");
        for c in self.children(node) {
            let status = self.nodes[c.index()].status;
            assert!(
                status == NodeStatus::Boundary,
                "cannot fold {node:?}: child {c:?} is {status:?}, expected Boundary"
            );
        }
        let (prev, _) = self.frontier_links(first);

        let mut last_next = None;
        let mut child = Some(first);
        while let Some(c) = child {
            let cn = &mut self.nodes[c.index()];
            cn.status = NodeStatus::Inactive;
            last_next = cn.next.take();
            cn.prev = None;
            child = cn.sibling;
        }
        let next = last_next.expect("boundary nodes are linked into the frontier");

        let n = &mut self.nodes[node.index()];
        n.status = NodeStatus::Boundary;
        n.prev = Some(prev);
        n.next = Some(next);
        self.nodes[prev.index()].next = Some(node);
        self.nodes[next.index()].prev = Some(node);

        for i in 0..self.nodes[node.index()].subtris.len() {
            let t = self.nodes[node.index()].subtris[i];
            self.remove_visible(t);
        }
    }

    /// Folds every `Active` node in the subtree below `node`, then `node`
    /// itself. Returns the number of nodes folded.
    ///
    /// # Panics
    /// Panics if the node is not `Active`.
    pub fn fold_subtree(&mut self, node: NodeIndex) -> usize {
        let mut stats = AdjustStats::default();
        self.fold_subtree_counted(node, &mut stats);
        stats.folds
    }

    /// Unfolds every ancestor of an `Inactive` node that lies below the
    /// boundary, then the node itself. Returns the number of nodes unfolded.
    ///
    /// # Panics
    /// Panics if the node is not `Inactive`.
    pub fn unfold_ancestors(&mut self, node: NodeIndex) -> usize {
        let n = &self.nodes[node.index()];
        assert!(
            n.status == NodeStatus::Inactive,
            "cannot unfold ancestors of {node:?}: status is {:?}, expected Inactive",
            n.status
        );
        let parent = n.parent.expect("inactive nodes have a parent");

        let parent_status = self.nodes[parent.index()].status;
        let mut unfolds = match parent_status {
            NodeStatus::Boundary => usize::from(self.unfold(parent)),
            _ => self.unfold_ancestors(parent),
        };
        if self.unfold(node) {
            unfolds += 1;
        }
        unfolds
    }

    /// Adjusts the boundary below `node` by visiting the tree depth-first.
    ///
    /// An `Active` node that should fold is folded with its whole subtree;
    /// a `Boundary` node that should not fold is unfolded and its children
    /// are visited in turn. Every node above the resulting boundary is
    /// evaluated, so the cost grows with the size of the unfolded tree.
    ///
    /// # Panics
    /// Panics if `node` is `Inactive`.
    pub fn adjust_top_down<C>(&mut self, node: NodeIndex, criterion: &C) -> AdjustStats
    where
        C: FoldCriterion + ?Sized,
    {
        let mut stats = AdjustStats::default();
        self.adjust_top_down_from(node, criterion, &mut stats);
        trace!(
            folds = stats.folds,
            unfolds = stats.unfolds,
            evaluations = stats.evaluations,
            "top-down adjustment complete"
        );
        stats
    }

    /// Adjusts the whole tree by walking the active boundary.
    ///
    /// For every boundary node the parent is considered first, once per run
    /// of siblings: if it should fold, it is folded with its subtree and the
    /// walk resumes at the parent. Otherwise an internal boundary node that
    /// should not fold is unfolded and the walk resumes at its first child.
    /// The walk ends when it returns to the root.
    ///
    /// Reaches the same boundary as [`adjust_top_down`](Self::adjust_top_down)
    /// for criteria under which a folded node's descendants also fold. When
    /// called once per frame, work is proportional to the number of boundary
    /// changes plus the boundary length.
    pub fn adjust_boundary<C>(&mut self, criterion: &C) -> AdjustStats
    where
        C: FoldCriterion + ?Sized,
    {
        let mut stats = AdjustStats::default();
        let root = self.root();

        if self.nodes[root.index()].status == NodeStatus::Boundary {
            if self.nodes[root.index()].is_leaf() {
                return stats;
            }
            stats.evaluations += 1;
            if criterion.should_fold(&self.nodes[root.index()]) {
                return stats;
            }
            self.unfold(root);
            stats.unfolds += 1;
        }

        let mut last_parent = None;
        let mut current = self.frontier_links(root).1;
        while current != root {
            let parent = self.nodes[current.index()]
                .parent
                .expect("boundary nodes below the root have a parent");

            if last_parent != Some(parent) {
                last_parent = Some(parent);
                stats.evaluations += 1;
                if criterion.should_fold(&self.nodes[parent.index()]) {
                    self.fold_subtree_counted(parent, &mut stats);
                    current = parent;
                    continue;
                }
            }

            let node = &self.nodes[current.index()];
            if let Some(first) = node.first_child {
                stats.evaluations += 1;
                if !criterion.should_fold(node) {
                    self.unfold(current);
                    stats.unfolds += 1;
                    current = first;
                    continue;
                }
            }
            current = self.frontier_links(current).1;
        }

        trace!(
            folds = stats.folds,
            unfolds = stats.unfolds,
            evaluations = stats.evaluations,
            "boundary adjustment complete"
        );
        stats
    }

    fn adjust_top_down_from<C>(&mut self, node: NodeIndex, criterion: &C, stats: &mut AdjustStats)
    where
        C: FoldCriterion + ?Sized,
    {
        let n = &self.nodes[node.index()];
        stats.evaluations += 1;
        let fold = criterion.should_fold(n);
        let status = n.status;

        match status {
            NodeStatus::Active if fold => {
                self.fold_subtree_counted(node, stats);
                return;
            }
            NodeStatus::Active => {}
            NodeStatus::Boundary if fold => return,
            NodeStatus::Boundary => {
                if self.unfold(node) {
                    stats.unfolds += 1;
                }
            }
            NodeStatus::Inactive => {
                panic!("cannot adjust below the boundary: {node:?} is Inactive")
            }
        }

        let mut child = self.nodes[node.index()].first_child;
        while let Some(c) = child {
            if !self.nodes[c.index()].is_leaf() {
                self.adjust_top_down_from(c, criterion, stats);
            }
            child = self.nodes[c.index()].sibling;
        }
    }

    fn fold_subtree_counted(&mut self, node: NodeIndex, stats: &mut AdjustStats) {
        let n = &self.nodes[node.index()];
        assert!(
            n.status == NodeStatus::Active,
            "cannot fold subtree of {node:?}: status is {:?}, expected Active",
            n.status
        );
        let mut child = n.first_child;
        while let Some(c) = child {
            if self.nodes[c.index()].status == NodeStatus::Active {
                self.fold_subtree_counted(c, stats);
            }
            child = self.nodes[c.index()].sibling;
        }
        self.fold(node);
        stats.folds += 1;
    }

    /// Frontier neighbors `(prev, next)` of a node on the boundary list.
    fn frontier_links(&self, node: NodeIndex) -> (NodeIndex, NodeIndex) {
        let n = &self.nodes[node.index()];
        match (n.prev, n.next) {
            (Some(prev), Some(next)) => (prev, next),
            _ => panic!("{node:?} is not linked into the active boundary"),
        }
    }

    /// Pushes a triangle onto the head of its container's visible list.
    fn add_visible(&mut self, t: TriIndex) {
        let container = self.tris[t.index()].container;
        let head = self.nodes[container.index()].vistris;
        if let Some(h) = head {
            self.tris[h.index()].prev = Some(t);
        }
        let tri = &mut self.tris[t.index()];
        tri.prev = None;
        tri.next = head;
        self.nodes[container.index()].vistris = Some(t);
    }

    /// Unlinks a triangle from its container's visible list.
    fn remove_visible(&mut self, t: TriIndex) {
        let tri = &mut self.tris[t.index()];
        let (prev, next) = (tri.prev.take(), tri.next.take());
        let container = tri.container;

        if self.nodes[container.index()].vistris == Some(t) {
            self.nodes[container.index()].vistris = next;
        }
        if let Some(p) = prev {
            self.tris[p.index()].next = next;
        }
        if let Some(nx) = next {
            self.tris[nx.index()].prev = prev;
        }
    }
}
