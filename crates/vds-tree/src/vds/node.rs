//! Vertex tree node implementation.

use nalgebra::Point3;

use crate::{BoundingSphere, NodeId, TriIndex};

/// Handle of a node inside a [`VertexTree`](crate::VertexTree) or
/// [`TreeBuilder`](crate::TreeBuilder) arena.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeIndex(pub(crate) u32);

impl NodeIndex {
    pub(crate) fn new(i: usize) -> Self {
        Self(u32::try_from(i).expect("node arena exceeds u32::MAX entries"))
    }

    /// Position of the node in its arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fold state of a node relative to the current cut of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeStatus {
    /// Unfolded: the node lies above the active boundary.
    Active,
    /// Folded, with an unfolded parent: the node's proxy is rendered.
    Boundary,
    /// Folded away below the boundary.
    #[default]
    Inactive,
}

/// A node in the vertex tree.
///
/// Leaves stand for vertices of the original mesh; internal nodes stand for
/// clusters of vertices, approximated by a single proxy coordinate.
///
/// # Links
///
/// Nodes reference each other by [`NodeIndex`]:
/// - `parent`, `first_child` and `sibling` describe the tree itself. Children
///   are kept in the order they were clustered; that order defines the
///   branch numbers in [`NodeId`].
/// - `next` and `prev` thread the root and every `Boundary` node into a
///   circular list, the active boundary, in left-to-right order.
///
/// # Triangles
///
/// `subtris` lists the triangles that exist only while this node is
/// unfolded. It is fixed when the tree is finalized. `vistris` heads the list
/// of currently visible triangles whose container is this node.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) coord: Point3<f32>,
    pub(crate) bound: BoundingSphere,
    pub(crate) status: NodeStatus,
    pub(crate) depth: u8,
    pub(crate) id: NodeId,

    pub(crate) parent: Option<NodeIndex>,
    pub(crate) first_child: Option<NodeIndex>,
    pub(crate) sibling: Option<NodeIndex>,

    pub(crate) next: Option<NodeIndex>,
    pub(crate) prev: Option<NodeIndex>,

    pub(crate) subtris: Box<[TriIndex]>,
    pub(crate) vistris: Option<TriIndex>,

    pub(crate) data: Vec<u8>,
}

impl Node {
    /// Creates an unlinked node with the given proxy coordinate.
    pub(crate) fn new(coord: Point3<f32>) -> Self {
        Self {
            coord,
            bound: BoundingSphere::point(coord),
            status: NodeStatus::Inactive,
            depth: 0,
            id: NodeId::ROOT,
            parent: None,
            first_child: None,
            sibling: None,
            next: None,
            prev: None,
            subtris: Box::default(),
            vistris: None,
            data: Vec::new(),
        }
    }

    /// The proxy coordinate representing every vertex in this subtree.
    #[inline]
    pub fn coord(&self) -> Point3<f32> {
        self.coord
    }

    #[inline]
    pub fn bound(&self) -> &BoundingSphere {
        &self.bound
    }

    #[inline]
    pub fn status(&self) -> NodeStatus {
        self.status
    }

    /// Depth in the tree; the root is at depth 0.
    #[inline]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    #[inline]
    pub fn first_child(&self) -> Option<NodeIndex> {
        self.first_child
    }

    #[inline]
    pub fn sibling(&self) -> Option<NodeIndex> {
        self.sibling
    }

    /// Next node along the active boundary.
    #[inline]
    pub fn next(&self) -> Option<NodeIndex> {
        self.next
    }

    /// Previous node along the active boundary.
    #[inline]
    pub fn prev(&self) -> Option<NodeIndex> {
        self.prev
    }

    /// Checks if this node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Triangles owned by this node.
    #[inline]
    pub fn subtris(&self) -> &[TriIndex] {
        &self.subtris
    }

    #[inline]
    pub fn subtri_count(&self) -> usize {
        self.subtris.len()
    }

    /// Head of this node's visible triangle list.
    #[inline]
    pub fn vistris(&self) -> Option<TriIndex> {
        self.vistris
    }

    /// Application bytes attached to this node.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Iterator over the children of a node, in branch order.
pub struct Children<'a> {
    nodes: &'a [Node],
    next: Option<NodeIndex>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(nodes: &'a [Node], parent: NodeIndex) -> Self {
        Self {
            nodes,
            next: nodes[parent.index()].first_child,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        self.next = self.nodes[current.index()].sibling;
        Some(current)
    }
}
