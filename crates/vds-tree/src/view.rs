//! View-dependent fold and visibility criteria.

use nalgebra::{Point3, Vector3};

use crate::vds::{FoldCriterion, Node, Visibility, VisibilityTest};
use crate::BoundingSphere;

/// Default fraction of the field of view below which a node folds.
pub const DEFAULT_THRESHOLD: f32 = 0.02;

/// The viewer: eye position, gaze direction, field of view and the size
/// threshold for folding.
///
/// As a [`FoldCriterion`], a node folds when its bounding sphere lies
/// entirely outside the view cone, or when the angle the sphere subtends is
/// smaller than `threshold * fov`. As a [`VisibilityTest`], it classifies
/// spheres against the same cone. A node whose sphere contains the eye
/// never folds and is always partially visible.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewState {
    eye: Point3<f32>,
    look: Vector3<f32>,
    fov: f32,
    threshold: f32,
}

impl ViewState {
    /// Creates a view from the eye position, gaze direction and full field
    /// of view in radians.
    ///
    /// # Panics
    /// Panics if `look` is zero.
    pub fn new(eye: Point3<f32>, look: Vector3<f32>, fov: f32) -> Self {
        let look = look
            .try_normalize(f32::EPSILON)
            .expect("Gaze direction cannot be zero");
        Self {
            eye,
            look,
            fov,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Creates a view from `eye` towards `target`.
    ///
    /// # Panics
    /// Panics if `eye` and `target` coincide.
    pub fn look_at(eye: Point3<f32>, target: Point3<f32>, fov: f32) -> Self {
        Self::new(eye, target - eye, fov)
    }

    /// Sets the fraction of the field of view below which nodes fold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    #[inline]
    pub fn eye(&self) -> Point3<f32> {
        self.eye
    }

    /// Unit gaze direction.
    #[inline]
    pub fn look(&self) -> Vector3<f32> {
        self.look
    }

    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Angle between the gaze and the sphere center, and the half-angle the
    /// sphere subtends. `None` if the eye is inside the sphere.
    fn cone(&self, sphere: &BoundingSphere) -> Option<(f32, f32)> {
        let to_center = sphere.center() - self.eye;
        let distance = to_center.norm();
        if distance <= sphere.radius() {
            return None;
        }
        let half = (sphere.radius() / distance).asin();
        let angle = (self.look.dot(&to_center) / distance).clamp(-1.0, 1.0).acos();
        Some((angle, half))
    }

    /// Returns `true` if `sphere` should be folded away.
    pub fn should_fold_sphere(&self, sphere: &BoundingSphere) -> bool {
        match self.cone(sphere) {
            None => false,
            Some((angle, half)) if angle - half > self.fov / 2.0 => true,
            Some((_, half)) => 2.0 * half < self.threshold * self.fov,
        }
    }

    /// Classifies `sphere` against the view cone.
    pub fn classify_sphere(&self, sphere: &BoundingSphere) -> Visibility {
        match self.cone(sphere) {
            None => Visibility::Partial,
            Some((angle, half)) if angle - half > self.fov / 2.0 => Visibility::Invisible,
            Some((angle, half)) if angle + half < self.fov / 2.0 => Visibility::Full,
            Some(_) => Visibility::Partial,
        }
    }
}

impl FoldCriterion for ViewState {
    fn should_fold(&self, node: &Node) -> bool {
        self.should_fold_sphere(node.bound())
    }
}

impl VisibilityTest for ViewState {
    fn classify(&self, node: &Node) -> Visibility {
        self.classify_sphere(node.bound())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn make_view() -> ViewState {
        // Looking down -z from the origin with a 90 degree field of view.
        ViewState::new(Point3::origin(), -Vector3::z(), FRAC_PI_2).with_threshold(0.1)
    }

    fn sphere(center: [f32; 3], radius: f32) -> BoundingSphere {
        BoundingSphere::new(Point3::new(center[0], center[1], center[2]), radius)
    }

    #[test]
    fn look_is_normalized() {
        let view = ViewState::look_at(Point3::new(0.0, 0.0, 5.0), Point3::origin(), 1.0);
        assert_eq!(view.look(), -Vector3::z());
    }

    #[test]
    fn large_sphere_in_view_stays_unfolded() {
        let view = make_view();
        assert!(!view.should_fold_sphere(&sphere([0.0, 0.0, -10.0], 2.0)));
        assert_eq!(view.classify_sphere(&sphere([0.0, 0.0, -10.0], 2.0)), Visibility::Full);
    }

    #[test]
    fn small_sphere_folds() {
        let view = make_view();
        // Subtends about 0.02 rad, below 0.1 * pi/2.
        assert!(view.should_fold_sphere(&sphere([0.0, 0.0, -10.0], 0.1)));
    }

    #[test]
    fn sphere_behind_viewer_folds_and_is_invisible() {
        let view = make_view();
        let behind = sphere([0.0, 0.0, 10.0], 2.0);
        assert!(view.should_fold_sphere(&behind));
        assert_eq!(view.classify_sphere(&behind), Visibility::Invisible);
    }

    #[test]
    fn sphere_on_cone_edge_is_partial() {
        let view = make_view();
        // Center exactly 45 degrees off axis.
        let edge = sphere([10.0, 0.0, -10.0], 2.0);
        assert_eq!(view.classify_sphere(&edge), Visibility::Partial);
        assert!(!view.should_fold_sphere(&edge));
    }

    #[test]
    fn eye_inside_sphere() {
        let view = make_view();
        let around = sphere([0.0, 0.0, 1.0], 5.0);
        assert!(!view.should_fold_sphere(&around));
        assert_eq!(view.classify_sphere(&around), Visibility::Partial);
    }

    #[test]
    fn nested_spheres_fold_together() {
        let view = make_view();
        let outer = sphere([3.0, 1.0, -20.0], 1.0);
        let inner = sphere([3.2, 1.0, -20.0], 0.5);
        assert!(view.should_fold_sphere(&outer));
        assert!(view.should_fold_sphere(&inner));
    }

    #[test]
    #[should_panic]
    fn zero_gaze_rejected() {
        let _ = ViewState::new(Point3::origin(), Vector3::zeros(), 1.0);
    }
}
