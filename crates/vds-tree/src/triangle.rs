//! Triangle representation for vertex trees.

use nalgebra::Vector3;

use crate::{NodeId, NodeIndex};

/// An 8-bit RGB color.
pub type Rgb = [u8; 3];

/// Handle of a triangle inside a [`VertexTree`](crate::VertexTree) or
/// [`TreeBuilder`](crate::TreeBuilder).
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TriIndex(pub(crate) u32);

impl TriIndex {
    pub(crate) fn new(i: usize) -> Self {
        Self(u32::try_from(i).expect("triangle arena exceeds u32::MAX entries"))
    }

    /// Position of the triangle in its arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A triangle of the original mesh.
///
/// Corners name leaf nodes by [`NodeId`], so they stay valid whatever the
/// fold state of the tree. The node currently standing in for each corner
/// is cached in `proxies` and refreshed lazily by the render traversal.
#[derive(Debug, Clone)]
pub struct Tri {
    pub(crate) corners: [NodeId; 3],
    pub(crate) proxies: [NodeIndex; 3],
    pub(crate) normals: [Vector3<f32>; 3],
    pub(crate) colors: [Rgb; 3],

    /// Node whose unfolding makes this triangle exist.
    pub(crate) owner: NodeIndex,
    /// Node whose visible list holds this triangle while it exists.
    pub(crate) container: NodeIndex,

    pub(crate) prev: Option<TriIndex>,
    pub(crate) next: Option<TriIndex>,
}

impl Tri {
    pub(crate) fn new(
        corners: [NodeId; 3],
        normals: [Vector3<f32>; 3],
        colors: [Rgb; 3],
        root: NodeIndex,
    ) -> Self {
        Self {
            corners,
            proxies: [root; 3],
            normals,
            colors,
            owner: root,
            container: root,
            prev: None,
            next: None,
        }
    }

    /// Identities of the three corner leaves.
    #[inline]
    pub fn corners(&self) -> &[NodeId; 3] {
        &self.corners
    }

    /// Cached proxies; valid only after the last proxy update.
    #[inline]
    pub fn proxies(&self) -> &[NodeIndex; 3] {
        &self.proxies
    }

    #[inline]
    pub fn normals(&self) -> &[Vector3<f32>; 3] {
        &self.normals
    }

    #[inline]
    pub fn colors(&self) -> &[Rgb; 3] {
        &self.colors
    }

    #[inline]
    pub fn owner(&self) -> NodeIndex {
        self.owner
    }

    #[inline]
    pub fn container(&self) -> NodeIndex {
        self.container
    }

    /// Computes the node owning a triangle with the given corners: the
    /// deepest common ancestor of any two of them.
    pub fn owner_id(corners: &[NodeId; 3], max_depth: u8, bits: u32) -> NodeId {
        let [c0, c1, c2] = corners;
        [
            c0.common_ancestor(c1, max_depth, bits),
            c0.common_ancestor(c2, max_depth, bits),
            c1.common_ancestor(c2, max_depth, bits),
        ]
        .into_iter()
        .fold(NodeId::ROOT, |deepest, id| {
            if id.depth() > deepest.depth() { id } else { deepest }
        })
    }

    /// Computes the node containing all three corners, capped at `cull_depth`.
    pub fn container_id(corners: &[NodeId; 3], cull_depth: u8, bits: u32) -> NodeId {
        let [c0, c1, c2] = corners;
        let common = c0.common_ancestor(c1, cull_depth, bits);
        c2.common_ancestor(&common, cull_depth, bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BITS: u32 = 3;

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "triangle arena exceeds u32::MAX")]
    fn tri_index_does_not_truncate() {
        TriIndex::new(u32::MAX as usize + 1);
    }

    fn id(branches: &[usize]) -> NodeId {
        branches
            .iter()
            .fold(NodeId::ROOT, |id, &b| id.child(b, BITS))
    }

    #[test]
    fn owner_is_deepest_pairwise_ancestor() {
        let corners = [id(&[0, 1, 2]), id(&[0, 1, 3]), id(&[0, 4, 0])];
        assert_eq!(Tri::owner_id(&corners, 21, BITS), id(&[0, 1]));

        let corners = [id(&[5, 0]), id(&[2, 2]), id(&[5, 1])];
        assert_eq!(Tri::owner_id(&corners, 21, BITS), id(&[5]));
    }

    #[test]
    fn owner_of_disjoint_corners_is_root() {
        let corners = [id(&[0, 0]), id(&[1, 0]), id(&[2, 0])];
        assert_eq!(Tri::owner_id(&corners, 21, BITS), NodeId::ROOT);
    }

    #[test]
    fn container_covers_all_corners() {
        let corners = [id(&[0, 1, 2]), id(&[0, 1, 3]), id(&[0, 4, 0])];
        assert_eq!(Tri::container_id(&corners, 21, BITS), id(&[0]));
    }

    #[test]
    fn container_capped_at_cull_depth() {
        let corners = [id(&[3, 3, 3, 0]), id(&[3, 3, 3, 1]), id(&[3, 3, 3, 2])];
        assert_eq!(Tri::container_id(&corners, 2, BITS), id(&[3, 3]));
    }

    #[test]
    fn new_tri_points_at_root() {
        let root = NodeIndex::new(7);
        let tri = Tri::new([NodeId::ROOT; 3], [Vector3::z(); 3], [[255, 0, 0]; 3], root);
        assert_eq!(tri.proxies(), &[root; 3]);
        assert_eq!(tri.owner(), root);
        assert_eq!(tri.container(), root);
    }
}
