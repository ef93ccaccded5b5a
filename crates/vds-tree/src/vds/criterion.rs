//! Fold and visibility criteria.
//!
//! The dynamic maintenance routines never decide on their own where the
//! active boundary should lie. They ask a [`FoldCriterion`] for every node
//! they consider. The render traversal similarly asks a [`VisibilityTest`]
//! which parts of the tree can be skipped.
//!
//! Any `Fn(&Node) -> bool` closure is a fold criterion, and any
//! `Fn(&Node) -> Visibility` closure is a visibility test. For view
//! dependent behavior, see [`ViewState`](crate::ViewState).

use super::node::Node;

/// Decides whether a node should be folded.
///
/// Adjustments converge to the same boundary regardless of strategy when the
/// criterion is monotone: if a node should fold, so should all of its
/// descendants. Criteria based on bounding sphere size and depth are.
pub trait FoldCriterion {
    /// Returns `true` if `node` should be folded, `false` if it should be
    /// unfolded.
    fn should_fold(&self, node: &Node) -> bool;
}

impl<F> FoldCriterion for F
where
    F: Fn(&Node) -> bool,
{
    fn should_fold(&self, node: &Node) -> bool {
        self(node)
    }
}

/// Result of classifying a node against the view volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The node's bound lies entirely outside the view volume.
    Invisible,
    /// The node's bound straddles the view volume boundary.
    Partial,
    /// The node's bound lies entirely inside the view volume.
    Full,
}

/// Classifies nodes for culling during rendering.
pub trait VisibilityTest {
    fn classify(&self, node: &Node) -> Visibility;
}

impl<F> VisibilityTest for F
where
    F: Fn(&Node) -> Visibility,
{
    fn classify(&self, node: &Node) -> Visibility {
        self(node)
    }
}

/// Folds every node at or below a fixed depth.
///
/// Produces a uniform cut of the tree; useful for tests and for coarse
/// previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxDepth(pub u8);

impl FoldCriterion for MaxDepth {
    fn should_fold(&self, node: &Node) -> bool {
        node.depth() >= self.0
    }
}

/// Folds every node whose bounding sphere is smaller than a world space
/// radius, independent of the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusThreshold(pub f32);

impl FoldCriterion for RadiusThreshold {
    fn should_fold(&self, node: &Node) -> bool {
        node.bound().radius() < self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundingSphere;
    use nalgebra::Point3;

    fn make_node(depth: u8, radius: f32) -> Node {
        let mut node = Node::new(Point3::origin());
        node.depth = depth;
        node.bound = BoundingSphere::new(Point3::origin(), radius);
        node
    }

    #[test]
    fn max_depth_folds_deep_nodes() {
        let criterion = MaxDepth(2);
        assert!(!criterion.should_fold(&make_node(1, 1.0)));
        assert!(criterion.should_fold(&make_node(2, 1.0)));
        assert!(criterion.should_fold(&make_node(5, 1.0)));
    }

    #[test]
    fn radius_threshold_folds_small_nodes() {
        let criterion = RadiusThreshold(0.5);
        assert!(criterion.should_fold(&make_node(0, 0.25)));
        assert!(!criterion.should_fold(&make_node(0, 0.5)));
    }

    #[test]
    fn closures_are_criteria() {
        let never = |_: &Node| false;
        let cull = |node: &Node| {
            if node.depth() > 0 {
                Visibility::Invisible
            } else {
                Visibility::Full
            }
        };
        assert!(!never.should_fold(&make_node(9, 0.0)));
        assert_eq!(cull.classify(&make_node(0, 1.0)), Visibility::Full);
        assert_eq!(cull.classify(&make_node(1, 1.0)), Visibility::Invisible);
    }
}
