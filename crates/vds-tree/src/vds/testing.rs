//! Fixtures shared by the unit tests of the `vds` modules.

use nalgebra::{Point3, Vector3};

use super::builder::TreeBuilder;
use super::node::NodeIndex;
use super::tree::VertexTree;

/// Builds a strip of eight vertices along the x axis, clustered pairwise
/// into a binary tree of depth 3.
///
/// Node indices follow creation order: leaves `0..8`, pairs `8..12`
/// (`8 = {0,1}`, `9 = {2,3}`, `10 = {4,5}`, `11 = {6,7}`), halves `12 = {8,9}`
/// and `13 = {10,11}`, and the root `14`.
///
/// Triangles `(i, i+1, i+2)` for `i` in `0..6` are owned by the pair nodes;
/// `(1, 2, 5)` is owned by `12` and `(3, 6, 7)` by `11`.
pub(crate) fn make_strip_tree() -> VertexTree {
    let mut builder = TreeBuilder::default();
    builder.begin_geometry().unwrap();
    for i in 0..8 {
        builder.add_vertex(Point3::new(i as f32, (i % 2) as f32, 0.0));
    }
    for i in 0..6 {
        let shade = 40 * i as u8;
        builder.add_triangle([i, i + 1, i + 2], [Vector3::z(); 3], [[shade, 0, 0]; 3]);
    }
    builder.add_triangle([1, 2, 5], [Vector3::z(); 3], [[0, 255, 0]; 3]);
    builder.add_triangle([3, 6, 7], [Vector3::z(); 3], [[0, 0, 255]; 3]);
    let leaves = builder.end_geometry().unwrap();

    let mut pairs = Vec::new();
    for pair in leaves.chunks(2) {
        let coord = nalgebra::center(&builder.node(pair[0]).coord(), &builder.node(pair[1]).coord());
        pairs.push(builder.cluster_nodes(pair, coord).unwrap());
    }
    let left = builder.cluster_nodes(&pairs[0..2], Point3::new(1.5, 0.5, 0.0)).unwrap();
    let right = builder.cluster_nodes(&pairs[2..4], Point3::new(5.5, 0.5, 0.0)).unwrap();
    builder.cluster_nodes(&[left, right], Point3::new(3.5, 0.5, 0.0)).unwrap();
    builder.end_tree().unwrap()
}

pub(crate) fn n(i: usize) -> NodeIndex {
    NodeIndex::new(i)
}
