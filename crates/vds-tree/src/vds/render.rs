//! Rendering the current simplification.
//!
//! Visible triangles are kept in per-node lists, one list per container
//! node at or above the cull depth. The traversal walks those nodes from the
//! top, skipping any subtree whose bound the [`VisibilityTest`] rejects, and
//! hands each list to a [`RenderVisitor`].
//!
//! Triangle corners name leaves, not the nodes currently drawn for them.
//! Each triangle caches the last `Boundary` node found for each corner; when
//! that node has since folded or unfolded, the search resumes from it,
//! upward or downward along the corner's identity. Coherent frames touch
//! only the few corners whose proxies changed.

use crate::{NodeId, TriIndex};

use super::criterion::{Visibility, VisibilityTest};
use super::node::{Children, Node, NodeIndex, NodeStatus};
use super::tree::VertexTree;
use super::visitor::{RenderVisitor, ResolvedTri};

impl VertexTree {
    /// Renders every visible triangle below `node` without culling.
    /// Returns the number of triangles passed to the visitor.
    pub fn render_tree<V>(&mut self, node: NodeIndex, visitor: &mut V) -> usize
    where
        V: RenderVisitor + ?Sized,
    {
        let mut buffer = Vec::new();
        self.render_from(node, visitor, None, &mut buffer)
    }

    /// Renders every visible triangle below `node`, skipping subtrees that
    /// `visibility` classifies as [`Visibility::Invisible`].
    ///
    /// A [`Visibility::Full`] node disables testing for its whole subtree.
    /// Returns the number of triangles passed to the visitor.
    pub fn render_tree_culled<V, T>(&mut self, node: NodeIndex, visitor: &mut V, visibility: &T) -> usize
    where
        V: RenderVisitor + ?Sized,
        T: VisibilityTest + ?Sized,
    {
        let mut buffer = Vec::new();
        self.render_from(node, visitor, Some(&|n: &Node| visibility.classify(n)), &mut buffer)
    }

    /// Refreshes the cached proxies of a triangle's corners so they name the
    /// `Boundary` nodes currently representing them.
    ///
    /// The render traversal does this for every triangle it emits; call it
    /// directly when reading [`Tri::proxies`](crate::Tri::proxies) outside
    /// of rendering.
    pub fn update_tri_proxies(&mut self, tri: TriIndex) {
        let bits = self.config().branch_bits();
        let t = &self.tris[tri.index()];
        let mut proxies = t.proxies;
        for (proxy, corner) in proxies.iter_mut().zip(&t.corners) {
            if self.nodes[proxy.index()].status != NodeStatus::Boundary {
                *proxy = first_active_ancestor(&self.nodes, *corner, *proxy, bits);
            }
        }
        self.tris[tri.index()].proxies = proxies;
    }

    /// Resolves a triangle against the current boundary.
    pub fn resolve_tri(&mut self, tri: TriIndex) -> ResolvedTri {
        self.update_tri_proxies(tri);
        let t = &self.tris[tri.index()];
        ResolvedTri {
            index: tri,
            positions: t.proxies.map(|p| self.nodes[p.index()].coord),
            normals: t.normals,
            colors: t.colors,
            proxies: t.proxies,
        }
    }

    fn render_from<V>(
        &mut self,
        node: NodeIndex,
        visitor: &mut V,
        mut visibility: Option<&dyn Fn(&Node) -> Visibility>,
        buffer: &mut Vec<ResolvedTri>,
    ) -> usize
    where
        V: RenderVisitor + ?Sized,
    {
        // Only containers above the boundary hold visible triangles.
        if self.nodes[node.index()].status != NodeStatus::Active {
            return 0;
        }
        if let Some(test) = visibility {
            match test(&self.nodes[node.index()]) {
                Visibility::Invisible => return 0,
                Visibility::Full => visibility = None,
                Visibility::Partial => {}
            }
        }

        buffer.clear();
        let mut current = self.nodes[node.index()].vistris;
        while let Some(t) = current {
            buffer.push(self.resolve_tri(t));
            current = self.tris[t.index()].next;
        }
        visitor.visit(node, buffer);
        let mut rendered = buffer.len();

        if self.nodes[node.index()].depth >= self.config().cull_depth() {
            return rendered;
        }
        let mut child = self.nodes[node.index()].first_child;
        while let Some(c) = child {
            rendered += self.render_from(c, visitor, visibility, buffer);
            child = self.nodes[c.index()].sibling;
        }
        rendered
    }
}

/// Finds the `Boundary` node currently representing the leaf `id`, starting
/// from `proxy`, a node on the leaf's root path that represented it
/// recently.
///
/// Walks up while the node is `Inactive` and down along `id` while it is
/// `Active`. A node may be its own first active ancestor.
pub(crate) fn first_active_ancestor(nodes: &[Node], id: NodeId, proxy: NodeIndex, bits: u32) -> NodeIndex {
    let mut current = proxy;
    match nodes[current.index()].status {
        NodeStatus::Inactive => {
            while nodes[current.index()].status == NodeStatus::Inactive {
                current = nodes[current.index()]
                    .parent
                    .expect("inactive nodes have a parent");
            }
        }
        _ => {
            while nodes[current.index()].status == NodeStatus::Active {
                let branch = id.branch(nodes[current.index()].depth, bits);
                current = Children::new(nodes, current)
                    .nth(branch)
                    .expect("identity path leads to an existing child");
            }
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vds::criterion::MaxDepth;
    use crate::vds::testing::{make_strip_tree, n};
    use crate::vds::visitor::{CollectingVisitor, FnVisitor};
    use nalgebra::Point3;

    #[test]
    fn folded_tree_renders_nothing() {
        let mut tree = make_strip_tree();
        let mut visitor = CollectingVisitor::new();
        assert_eq!(tree.render_tree(tree.root(), &mut visitor), 0);
        assert!(visitor.visited().is_empty());
    }

    #[test]
    fn full_unfold_renders_original_mesh() {
        let mut tree = make_strip_tree();
        tree.adjust_top_down(tree.root(), &|_: &Node| false);

        let mut visitor = CollectingVisitor::new();
        let rendered = tree.render_tree(tree.root(), &mut visitor);
        assert_eq!(rendered, tree.tri_count());

        for tri in visitor.tris() {
            assert!(!tri.is_degenerate());
            for (k, proxy) in tri.proxies.iter().enumerate() {
                let leaf = tree.node(*proxy);
                assert!(leaf.is_leaf());
                assert_eq!(leaf.id(), tree.tri(tri.index).corners()[k]);
                assert_eq!(tri.positions[k], leaf.coord());
            }
        }
    }

    #[test]
    fn corners_resolve_to_boundary() {
        let mut tree = make_strip_tree();
        tree.adjust_top_down(tree.root(), &MaxDepth(2));

        let mut visitor = CollectingVisitor::new();
        tree.render_tree(tree.root(), &mut visitor);
        // Node 12 is the only unfolded owner; it owns (1, 2, 5).
        let tris = visitor.into_tris();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].proxies, [n(8), n(9), n(10)]);
        assert_eq!(tris[0].positions[0], Point3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn proxies_follow_later_folds_and_unfolds() {
        let mut tree = make_strip_tree();
        tree.adjust_top_down(tree.root(), &|_: &Node| false);
        let t = tree.subtris(n(12)).next().unwrap();
        tree.update_tri_proxies(t);
        assert_eq!(tree.tri(t).proxies(), &[n(1), n(2), n(5)]);

        // Fold the right half: corner 5 moves up to node 13.
        tree.fold_subtree(n(13));
        tree.update_tri_proxies(t);
        assert_eq!(tree.tri(t).proxies(), &[n(1), n(2), n(13)]);

        // Unfold again partially: corner 5 moves down to node 10.
        tree.unfold(n(13));
        tree.update_tri_proxies(t);
        assert_eq!(tree.tri(t).proxies(), &[n(1), n(2), n(10)]);
    }

    #[test]
    fn invisible_subtrees_are_skipped() {
        let mut tree = make_strip_tree();
        tree.adjust_top_down(tree.root(), &|_: &Node| false);

        let left_only = |node: &Node| {
            if node.bound().center().x > 4.0 {
                Visibility::Invisible
            } else {
                Visibility::Partial
            }
        };
        let mut visitor = CollectingVisitor::new();
        tree.render_tree_culled(tree.root(), &mut visitor, &left_only);
        assert!(!visitor.visited().contains(&n(13)));
        assert!(visitor.visited().contains(&n(12)));
        for tri in visitor.tris() {
            let container = tree.tri(tri.index).container();
            assert!(tree.node(container).bound().center().x <= 4.0);
        }
    }

    #[test]
    fn fully_visible_stops_testing() {
        let mut tree = make_strip_tree();
        tree.adjust_top_down(tree.root(), &|_: &Node| false);

        let tests = std::cell::Cell::new(0);
        let counting = |_: &Node| {
            tests.set(tests.get() + 1);
            Visibility::Full
        };
        let mut count = 0;
        let mut visitor = FnVisitor::new(|_, tris: &[ResolvedTri]| count += tris.len());
        tree.render_tree_culled(tree.root(), &mut visitor, &counting);
        assert_eq!(tests.get(), 1);
        assert_eq!(count, tree.tri_count());
    }

    #[test]
    fn traversal_stops_at_cull_depth() {
        let mut tree = make_strip_tree();
        tree.adjust_top_down(tree.root(), &|_: &Node| false);
        let mut visitor = CollectingVisitor::new();
        tree.render_tree(tree.root(), &mut visitor);
        let cull_depth = tree.config().cull_depth();
        for node in visitor.visited() {
            assert!(tree.node(*node).depth() <= cull_depth);
            assert_eq!(tree.node(*node).status(), NodeStatus::Active);
        }
    }
}
