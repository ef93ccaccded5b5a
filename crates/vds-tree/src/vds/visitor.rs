//! Visitor pattern for rendering the active simplification.
//!
//! The render traversal hands every visited node's visible triangles to a
//! [`RenderVisitor`], with each corner already resolved to the node that
//! currently stands in for it. Visitors decide what to do with them: emit
//! draw calls, fill vertex buffers, or collect them for inspection.

use nalgebra::{Point3, Vector3};

use crate::{NodeIndex, Rgb, TriIndex};

/// Corner positions closer than this are considered coincident.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// A triangle of the current simplification, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTri {
    /// The triangle in the tree's arena.
    pub index: TriIndex,
    /// Proxy coordinates of the three corners.
    pub positions: [Point3<f32>; 3],
    pub normals: [Vector3<f32>; 3],
    pub colors: [Rgb; 3],
    /// Boundary nodes currently representing the three corners.
    pub proxies: [NodeIndex; 3],
}

impl ResolvedTri {
    /// Unit normal of the triangle as currently shaped, or `None` if it has
    /// collapsed to a line or point.
    pub fn face_normal(&self) -> Option<Vector3<f32>> {
        let [a, b, c] = self.positions;
        (b - a).cross(&(c - a)).try_normalize(DEGENERATE_EPSILON)
    }

    /// Returns `true` if two corners are represented by the same node, so
    /// the triangle has zero area in the current simplification.
    ///
    /// Such triangles are still passed to visitors; filtering them is
    /// the visitor's choice.
    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.proxies;
        a == b || b == c || a == c
    }
}

/// Visitor for processing visible triangles during rendering.
pub trait RenderVisitor {
    /// Called once for every node visited by the traversal, with the
    /// triangles in that node's visible list.
    fn visit(&mut self, node: NodeIndex, tris: &[ResolvedTri]);
}

/// A simple visitor that collects all visited triangles.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<ResolvedTri>,
    visited: Vec<NodeIndex>,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected triangles.
    pub fn into_tris(self) -> Vec<ResolvedTri> {
        self.collected
    }

    pub fn tris(&self) -> &[ResolvedTri] {
        &self.collected
    }

    /// Nodes visited, in traversal order.
    pub fn visited(&self) -> &[NodeIndex] {
        &self.visited
    }
}

impl RenderVisitor for CollectingVisitor {
    fn visit(&mut self, node: NodeIndex, tris: &[ResolvedTri]) {
        self.visited.push(node);
        self.collected.extend_from_slice(tris);
    }
}

/// A visitor that calls a closure for each node's triangles.
pub struct FnVisitor<F>
where
    F: FnMut(NodeIndex, &[ResolvedTri]),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(NodeIndex, &[ResolvedTri]),
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> RenderVisitor for FnVisitor<F>
where
    F: FnMut(NodeIndex, &[ResolvedTri]),
{
    fn visit(&mut self, node: NodeIndex, tris: &[ResolvedTri]) {
        (self.func)(node, tris);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_tri(positions: [[f32; 3]; 3], proxies: [usize; 3]) -> ResolvedTri {
        ResolvedTri {
            index: TriIndex::new(0),
            positions: positions.map(|p| Point3::new(p[0], p[1], p[2])),
            normals: [Vector3::z(); 3],
            colors: [[255, 255, 255]; 3],
            proxies: proxies.map(NodeIndex::new),
        }
    }

    #[test]
    fn face_normal_follows_winding() {
        let tri = make_tri([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], [0, 1, 2]);
        assert_relative_eq!(tri.face_normal().unwrap(), Vector3::z());

        let flipped = make_tri([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]], [0, 1, 2]);
        assert_relative_eq!(flipped.face_normal().unwrap(), -Vector3::z());
    }

    #[test]
    fn collapsed_triangle() {
        let tri = make_tri([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]], [3, 3, 2]);
        assert!(tri.is_degenerate());
        assert!(tri.face_normal().is_none());

        let whole = make_tri([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], [0, 1, 2]);
        assert!(!whole.is_degenerate());
    }

    #[test]
    fn collecting_visitor_collects() {
        let mut visitor = CollectingVisitor::new();
        let tri = make_tri([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], [0, 1, 2]);

        visitor.visit(NodeIndex::new(4), &[tri.clone()]);
        visitor.visit(NodeIndex::new(5), &[]);

        assert_eq!(visitor.visited(), &[NodeIndex::new(4), NodeIndex::new(5)]);
        assert_eq!(visitor.into_tris(), vec![tri]);
    }

    #[test]
    fn fn_visitor_calls_closure() {
        let mut count = 0;
        {
            let mut visitor = FnVisitor::new(|_, tris: &[ResolvedTri]| count += tris.len());
            let tri = make_tri([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], [0, 1, 2]);
            visitor.visit(NodeIndex::new(0), &[tri.clone(), tri]);
        }
        assert_eq!(count, 2);
    }
}
