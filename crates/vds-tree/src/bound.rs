//! Bounding volumes for vertex tree nodes.

use nalgebra::{Point3, Vector3};

/// A sphere enclosing all geometry supported by a node's subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    center: Point3<f32>,
    radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::point(Point3::origin())
    }
}

impl BoundingSphere {
    /// Creates a sphere from a center and radius.
    ///
    /// # Panics
    /// Panics if the radius is negative or NaN.
    pub fn new(center: Point3<f32>, radius: f32) -> Self {
        assert!(radius >= 0.0, "Sphere radius must be non-negative");
        Self { center, radius }
    }

    /// A zero-radius sphere at `point`.
    #[inline]
    pub fn point(point: Point3<f32>) -> Self {
        Self {
            center: point,
            radius: 0.0,
        }
    }

    #[inline]
    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Returns `true` if `point` lies inside or on the sphere.
    #[inline]
    pub fn contains_point(&self, point: &Point3<f32>) -> bool {
        (point - self.center).norm() <= self.radius
    }

    /// Returns `true` if `other` lies entirely inside this sphere, allowing
    /// `epsilon` of slack for rounding.
    pub fn contains_sphere(&self, other: &BoundingSphere, epsilon: f32) -> bool {
        (other.center - self.center).norm() + other.radius <= self.radius + epsilon
    }
}

/// Axis-aligned box accumulated from points and spheres.
///
/// Used while computing node bounds: the box of everything a node must
/// contain gives the sphere center, and the largest reach from that center
/// gives the radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Point3<f32>,
    max: Point3<f32>,
}

impl Aabb {
    /// A box containing exactly one point.
    pub fn from_point(point: Point3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// The smallest box containing all `points`, or `None` if there are none.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut points = points.into_iter();
        let mut aabb = Self::from_point(*points.next()?);
        for p in points {
            aabb.add_point(p);
        }
        Some(aabb)
    }

    #[inline]
    pub fn min(&self) -> Point3<f32> {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Point3<f32> {
        self.max
    }

    pub fn add_point(&mut self, point: &Point3<f32>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn add_sphere(&mut self, sphere: &BoundingSphere) {
        let r = Vector3::repeat(sphere.radius);
        self.add_point(&(sphere.center - r));
        self.add_point(&(sphere.center + r));
    }

    #[inline]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns `true` if all three extents are within `epsilon` of zero.
    pub fn is_degenerate(&self, epsilon: f32) -> bool {
        (self.max - self.min).iter().all(|extent| extent.abs() <= epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_sphere_contains_only_its_center() {
        let sphere = BoundingSphere::point(Point3::new(1.0, 2.0, 3.0));
        assert!(sphere.contains_point(&Point3::new(1.0, 2.0, 3.0)));
        assert!(!sphere.contains_point(&Point3::new(1.0, 2.0, 3.1)));
    }

    #[test]
    fn nested_spheres() {
        let outer = BoundingSphere::new(Point3::origin(), 2.0);
        let inner = BoundingSphere::new(Point3::new(1.0, 0.0, 0.0), 1.0);
        let straddling = BoundingSphere::new(Point3::new(1.5, 0.0, 0.0), 1.0);
        assert!(outer.contains_sphere(&inner, 0.0));
        assert!(!outer.contains_sphere(&straddling, 0.0));
    }

    #[test]
    #[should_panic]
    fn negative_radius_rejected() {
        let _ = BoundingSphere::new(Point3::origin(), -1.0);
    }

    #[test]
    fn aabb_from_points() {
        let points = [
            Point3::new(-1.0, 0.0, 2.0),
            Point3::new(3.0, -4.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let aabb = Aabb::from_points(&points).unwrap();
        assert_eq!(aabb.min(), Point3::new(-1.0, -4.0, 0.0));
        assert_eq!(aabb.max(), Point3::new(3.0, 1.0, 2.0));
        assert_relative_eq!(aabb.center(), Point3::new(1.0, -1.5, 1.0));
    }

    #[test]
    fn aabb_from_no_points() {
        let points: [Point3<f32>; 0] = [];
        assert!(Aabb::from_points(&points).is_none());
    }

    #[test]
    fn aabb_grows_by_sphere() {
        let mut aabb = Aabb::from_point(Point3::origin());
        aabb.add_sphere(&BoundingSphere::new(Point3::new(2.0, 0.0, 0.0), 1.0));
        assert_eq!(aabb.min(), Point3::new(0.0, -1.0, -1.0));
        assert_eq!(aabb.max(), Point3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn degenerate_box() {
        let aabb = Aabb::from_point(Point3::new(5.0, 5.0, 5.0));
        assert!(aabb.is_degenerate(1e-6));

        let mut flat = aabb;
        flat.add_point(&Point3::new(5.0, 6.0, 5.0));
        assert!(!flat.is_degenerate(1e-6));
    }
}
