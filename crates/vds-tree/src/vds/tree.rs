//! Vertex tree container and finalization.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::{Aabb, BoundingSphere, NodeId, Result, Rgb, Tri, TriIndex, VdsConfig, VdsError};

use super::node::{Children, Node, NodeIndex, NodeStatus};

/// Slack allowed when checking that parent spheres enclose their children.
const BOUND_EPSILON: f32 = 1e-4;

/// A finished vertex tree.
///
/// The tree owns every node and triangle in two arenas. Its shape never
/// changes after construction; only the fold state does, through the
/// operations in the `dynamic` module:
///
/// ```ignore
/// let mut tree = builder.end_tree()?;
/// tree.adjust_boundary(&view);
/// tree.render_tree_culled(tree.root(), &mut visitor, &view);
/// ```
///
/// A new tree starts fully folded: the root is the only `Boundary` node and
/// no triangle is visible.
#[derive(Debug, Clone)]
pub struct VertexTree {
    config: VdsConfig,
    pub(crate) nodes: Vec<Node>,
    pub(crate) tris: Vec<Tri>,
    root: NodeIndex,
}

/// Size summary of a vertex tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of nodes, leaves included.
    pub nodes: usize,
    /// Number of leaves (vertices of the original mesh).
    pub leaves: usize,
    /// Number of triangles.
    pub tris: usize,
}

/// A triangle whose corners have been resolved to leaf identities but which
/// has not yet been assigned to an owning node.
#[derive(Debug, Clone)]
pub(crate) struct PendingTri {
    pub(crate) corners: [NodeId; 3],
    pub(crate) normals: [Vector3<f32>; 3],
    pub(crate) colors: [Rgb; 3],
}

impl VertexTree {
    /// Turns a linked node arena and its triangles into a finished tree.
    ///
    /// Node identities must already be assigned (see [`assign_ids`]).
    /// Computes triangle ownership, lists each node's subtriangles, assigns
    /// container nodes and labels the root `Boundary`. Triangles keep the
    /// order of `pending`, so a [`TriIndex`] handed out while building stays
    /// valid. Bounds are left as they are.
    pub(crate) fn assemble(
        config: VdsConfig,
        mut nodes: Vec<Node>,
        root: NodeIndex,
        pending: Vec<PendingTri>,
    ) -> Result<Self> {
        let bits = config.branch_bits();

        debug!(tris = pending.len(), "computing subtriangle owners");
        let mut tris = Vec::with_capacity(pending.len());
        for t in pending {
            for corner in &t.corners {
                match find_node(&nodes, root, *corner, bits) {
                    Some(n) if nodes[n.index()].is_leaf() => {}
                    _ => {
                        return Err(VdsError::Invariant(format!(
                            "triangle corner {corner:?} does not name a leaf"
                        )));
                    }
                }
            }

            let owner_id = Tri::owner_id(&t.corners, config.max_depth(), bits);
            let owner = find_node(&nodes, root, owner_id, bits).ok_or_else(|| {
                VdsError::Invariant(format!("no node with id {owner_id:?}"))
            })?;
            let container_depth = Tri::container_id(&t.corners, config.cull_depth(), bits).depth();

            let mut tri = Tri::new(t.corners, t.normals, t.colors, root);
            tri.owner = owner;
            tri.container = ancestor_at(&nodes, owner, container_depth);
            tris.push(tri);
        }

        debug!("collecting node subtriangle lists");
        let mut owned: Vec<Vec<TriIndex>> = vec![Vec::new(); nodes.len()];
        for (i, t) in tris.iter().enumerate() {
            owned[t.owner.index()].push(TriIndex::new(i));
        }
        for (node, subtris) in nodes.iter_mut().zip(owned) {
            node.subtris = subtris.into_boxed_slice();
            node.vistris = None;
            node.status = NodeStatus::Inactive;
            node.next = None;
            node.prev = None;
        }

        let r = &mut nodes[root.index()];
        r.status = NodeStatus::Boundary;
        r.next = Some(root);
        r.prev = Some(root);

        Ok(Self {
            config,
            nodes,
            tris,
            root,
        })
    }

    /// Computes every node's bounding sphere, bottom-up.
    ///
    /// A leaf's sphere is its coordinate. An internal node's sphere is
    /// centered on the box around its children's spheres and the corners of
    /// its own subtriangles, with a radius reaching the farthest of them.
    pub(crate) fn compute_bounds(&mut self) {
        let order = self.nodes_depth_first();
        let bits = self.config.branch_bits();

        for &n in order.iter().rev() {
            let node = &self.nodes[n.index()];

            let mut spheres: Vec<BoundingSphere> = Children::new(&self.nodes, n)
                .map(|c| self.nodes[c.index()].bound)
                .collect();
            if node.is_leaf() {
                spheres.push(BoundingSphere::point(node.coord));
            }
            for t in node.subtris() {
                for corner in &self.tris[t.index()].corners {
                    if let Some(coord) = leaf_coord(&self.nodes, self.root, *corner, bits) {
                        spheres.push(BoundingSphere::point(coord));
                    }
                }
            }

            let mut aabb = Aabb::from_point(spheres[0].center());
            for s in &spheres {
                aabb.add_sphere(s);
            }
            let center = aabb.center();
            let radius = spheres
                .iter()
                .map(|s| (s.center() - center).norm() + s.radius())
                .fold(0.0f32, f32::max);

            self.nodes[n.index()].bound = BoundingSphere::new(center, radius);
        }
    }

    #[inline]
    pub fn config(&self) -> &VdsConfig {
        &self.config
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Returns a node.
    ///
    /// # Panics
    /// Panics if `index` does not belong to this tree.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Returns a node, or `None` if `index` does not belong to this tree.
    #[inline]
    pub fn get_node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index())
    }

    /// Returns a triangle.
    ///
    /// # Panics
    /// Panics if `index` does not belong to this tree.
    #[inline]
    pub fn tri(&self, index: TriIndex) -> &Tri {
        &self.tris[index.index()]
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn tri_count(&self) -> usize {
        self.tris.len()
    }

    /// Iterates over the children of `node` in branch order.
    pub fn children(&self, node: NodeIndex) -> Children<'_> {
        Children::new(&self.nodes, node)
    }

    /// Iterates over the triangles owned by `node`.
    pub fn subtris(&self, node: NodeIndex) -> impl Iterator<Item = TriIndex> + '_ {
        self.nodes[node.index()].subtris().iter().copied()
    }

    /// Iterates over the visible triangles held in `node`'s list.
    pub fn visible_tris(&self, node: NodeIndex) -> VisibleTris<'_> {
        VisibleTris {
            tris: &self.tris,
            next: self.nodes[node.index()].vistris,
        }
    }

    /// Iterates over the active boundary, left to right.
    pub fn boundary(&self) -> BoundaryIter<'_> {
        let root = &self.nodes[self.root.index()];
        let next = match root.status {
            NodeStatus::Boundary => Some(self.root),
            _ => root.next.filter(|&n| n != self.root),
        };
        BoundaryIter {
            nodes: &self.nodes,
            root: self.root,
            next,
        }
    }

    /// Finds the node with the given identity.
    pub fn find_node(&self, id: NodeId) -> Option<NodeIndex> {
        find_node(&self.nodes, self.root, id, self.config.branch_bits())
    }

    /// Returns all nodes in depth-first (pre-)order.
    pub fn nodes_depth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            order.push(n);
            let first = stack.len();
            stack.extend(self.children(n));
            stack[first..].reverse();
        }
        order
    }

    /// Counts nodes, leaves and triangles.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes: self.nodes.len(),
            leaves: self.nodes.iter().filter(|n| n.is_leaf()).count(),
            tris: self.tris.len(),
        }
    }

    /// Returns the depth of the deepest node.
    pub fn depth(&self) -> u8 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Attaches application bytes to a node. They are kept by persistence.
    pub fn set_node_data(&mut self, node: NodeIndex, data: Vec<u8>) {
        self.nodes[node.index()].data = data;
    }

    /// Checks every structural and fold-state invariant of the tree.
    ///
    /// Intended for tests and debugging; walks the whole tree.
    pub fn validate(&self) -> Result<()> {
        fn fail(msg: String) -> Result<()> {
            Err(VdsError::Invariant(msg))
        }

        let root = &self.nodes[self.root.index()];
        if root.parent.is_some() {
            return fail("root has a parent".into());
        }
        if root.status == NodeStatus::Inactive {
            return fail("root is inactive".into());
        }

        let order = self.nodes_depth_first();
        if order.len() != self.nodes.len() {
            return fail(format!(
                "{} nodes reachable from the root, {} in the tree",
                order.len(),
                self.nodes.len()
            ));
        }

        for &n in &order {
            let node = &self.nodes[n.index()];
            for c in self.children(n) {
                let child = &self.nodes[c.index()];
                if child.parent != Some(n) {
                    return fail(format!("{c:?} is listed under {n:?} but has parent {:?}", child.parent));
                }
                if child.depth != node.depth + 1 {
                    return fail(format!("{c:?} has depth {}, parent {}", child.depth, node.depth));
                }
                if !node.bound.contains_sphere(&child.bound, BOUND_EPSILON * (1.0 + node.bound.radius())) {
                    return fail(format!("bound of {n:?} does not contain {c:?}"));
                }
            }

            let parent_status = node.parent.map(|p| self.nodes[p.index()].status);
            let ok = match node.status {
                NodeStatus::Active => {
                    !node.is_leaf()
                        && self
                            .children(n)
                            .all(|c| self.nodes[c.index()].status != NodeStatus::Inactive)
                }
                NodeStatus::Boundary => {
                    matches!(parent_status, None | Some(NodeStatus::Active))
                        && self
                            .children(n)
                            .all(|c| self.nodes[c.index()].status == NodeStatus::Inactive)
                }
                NodeStatus::Inactive => {
                    matches!(parent_status, Some(NodeStatus::Boundary | NodeStatus::Inactive))
                }
            };
            if !ok {
                return fail(format!("{n:?} is {:?} with parent {parent_status:?}", node.status));
            }
        }

        // The frontier list must match the boundary nodes in depth-first order.
        let expected: Vec<NodeIndex> = order
            .iter()
            .copied()
            .filter(|&n| self.nodes[n.index()].status == NodeStatus::Boundary)
            .collect();
        let mut walked = Vec::with_capacity(expected.len());
        let mut current = self.root;
        loop {
            let Some(next) = self.nodes[current.index()].next else {
                return fail(format!("{current:?} on the boundary has no next link"));
            };
            if self.nodes[next.index()].prev != Some(current) {
                return fail(format!("{next:?} prev link does not point back to {current:?}"));
            }
            if next == self.root {
                break;
            }
            if walked.len() > self.nodes.len() {
                return fail("boundary list does not return to the root".into());
            }
            walked.push(next);
            current = next;
        }
        if root.status == NodeStatus::Boundary {
            walked.insert(0, self.root);
        }
        if walked != expected {
            return fail(format!("boundary list {walked:?}, expected {expected:?}"));
        }

        // Visible lists must hold exactly the triangles of active owners.
        let mut listed = 0;
        for &n in &order {
            for t in self.visible_tris(n) {
                let tri = &self.tris[t.index()];
                if tri.container != n {
                    return fail(format!("{t:?} listed under {n:?}, container {:?}", tri.container));
                }
                if self.nodes[tri.owner.index()].status != NodeStatus::Active {
                    return fail(format!("{t:?} visible but owner {:?} is folded", tri.owner));
                }
                listed += 1;
            }
        }
        let expected_visible = self
            .tris
            .iter()
            .filter(|t| self.nodes[t.owner.index()].status == NodeStatus::Active)
            .count();
        if listed != expected_visible {
            return fail(format!("{listed} triangles listed, {expected_visible} visible"));
        }

        Ok(())
    }
}

/// Iterator over a node's visible triangle list.
pub struct VisibleTris<'a> {
    tris: &'a [Tri],
    next: Option<TriIndex>,
}

impl Iterator for VisibleTris<'_> {
    type Item = TriIndex;

    fn next(&mut self) -> Option<TriIndex> {
        let current = self.next?;
        self.next = self.tris[current.index()].next;
        Some(current)
    }
}

/// Iterator over the `Boundary` nodes, following the frontier list.
pub struct BoundaryIter<'a> {
    nodes: &'a [Node],
    root: NodeIndex,
    next: Option<NodeIndex>,
}

impl Iterator for BoundaryIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        self.next = self.nodes[current.index()]
            .next
            .filter(|&n| n != self.root);
        Some(current)
    }
}

/// Assigns identities and depths to every node below `root`, depth-first.
///
/// Fails if a node would lie deeper than the configured maximum or has more
/// children than the configured maximum degree.
pub(crate) fn assign_ids(nodes: &mut [Node], root: NodeIndex, config: &VdsConfig) -> Result<u8> {
    let bits = config.branch_bits();
    let mut max_depth = 0;
    let mut stack = vec![(root, NodeId::ROOT)];

    while let Some((n, id)) = stack.pop() {
        let node = &mut nodes[n.index()];
        node.id = id;
        node.depth = id.depth();
        max_depth = max_depth.max(id.depth());

        let mut child = node.first_child;
        let mut branch = 0;
        while let Some(c) = child {
            if id.depth() >= config.max_depth() {
                return Err(VdsError::DepthExceeded {
                    depth: usize::from(id.depth()) + 1,
                    max: config.max_depth(),
                });
            }
            if branch >= config.max_degree() {
                return Err(VdsError::InvalidClusterSize {
                    count: branch + 1,
                    max: config.max_degree(),
                });
            }
            stack.push((c, id.child(branch, bits)));
            child = nodes[c.index()].sibling;
            branch += 1;
        }
    }
    Ok(max_depth)
}

/// Verifies that every node was reached by [`assign_ids`] from `root`.
pub(crate) fn verify_rooted_tree(nodes: &[Node], root: NodeIndex) -> Result<()> {
    match nodes
        .iter()
        .enumerate()
        .find(|&(i, node)| node.depth == 0 && i != root.index())
    {
        Some((i, _)) => Err(VdsError::Forest(NodeIndex::new(i))),
        None => Ok(()),
    }
}

/// Walks an identity down from `root`.
pub(crate) fn find_node(nodes: &[Node], root: NodeIndex, id: NodeId, bits: u32) -> Option<NodeIndex> {
    let mut node = root;
    for depth in 0..id.depth() {
        node = Children::new(nodes, node).nth(id.branch(depth, bits))?;
    }
    Some(node)
}

/// Returns the ancestor of `node` at `depth` (or `node` if it is not deeper).
fn ancestor_at(nodes: &[Node], mut node: NodeIndex, depth: u8) -> NodeIndex {
    while nodes[node.index()].depth > depth {
        match nodes[node.index()].parent {
            Some(parent) => node = parent,
            None => break,
        }
    }
    node
}

/// Coordinate of the leaf with the given identity, if any.
fn leaf_coord(nodes: &[Node], root: NodeIndex, id: NodeId, bits: u32) -> Option<Point3<f32>> {
    find_node(nodes, root, id, bits).map(|n| nodes[n.index()].coord)
}
