//! Fundamental geometric types for case modelling.

use std::fmt;

use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

/// Position in three dimensional space measured in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic point.
    #[must_use]
    pub fn to_point3(self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Drop the Z coordinate.
    #[must_use]
    pub const fn planar(self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl From<Point3<f64>> for Point {
    fn from(value: Point3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Point3<f64> {
    fn from(value: Point) -> Self {
        value.to_point3()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Position on a sketch plane measured in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// Distance along the sketch X axis.
    pub x: f64,
    /// Distance along the sketch Y axis.
    pub y: f64,
}

impl Point2 {
    /// Create a [`Point2`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Cartesian vector representing a three dimensional force in newtons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Force {
    /// Force component acting along the global X axis.
    pub x: f64,
    /// Force component acting along the global Y axis.
    pub y: f64,
    /// Force component acting along the global Z axis.
    pub z: f64,
}

impl Force {
    /// Create a [`Force`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the force into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for Force {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

/// Translation vector describing nodal displacement in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Displacement component along the global X axis.
    pub x: f64,
    /// Displacement component along the global Y axis.
    pub y: f64,
    /// Displacement component along the global Z axis.
    pub z: f64,
}

impl Displacement {
    /// Create a [`Displacement`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the displacement into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean length of the displacement.
    #[must_use]
    pub fn magnitude(self) -> f64 {
        self.to_vector().norm()
    }
}

impl From<Vector3<f64>> for Displacement {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use fecase::point;
///
/// let probe = point(0.2, 0.1, 2.5);
/// assert_eq!(probe.z, 2.5);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Convenience helper for creating [`Point2`] instances.
#[must_use]
pub const fn point2(x: f64, y: f64) -> Point2 {
    Point2::new(x, y)
}

/// Convenience helper for creating [`Force`] instances.
///
/// # Examples
/// ```
/// use fecase::force;
///
/// let load = force(0.0, -5.0, 0.0);
/// assert_eq!(load.y, -5.0);
/// ```
#[must_use]
pub const fn force(x: f64, y: f64, z: f64) -> Force {
    Force::new(x, y, z)
}

/// Where a point lies relative to a closed profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    /// Strictly inside the enclosed area.
    Inside,
    /// On one or more edges, within tolerance.
    Boundary,
    /// Outside the enclosed area.
    Outside,
}

/// Area moments of a profile about its centroid, in metres to the fourth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SecondMoments {
    /// Second moment about the centroidal X axis (integral of y squared).
    pub ixx: f64,
    /// Second moment about the centroidal Y axis (integral of x squared).
    pub iyy: f64,
    /// Product of area about the centroid.
    pub ixy: f64,
}

/// Closed, simple polygon used as an extrusion cross-section.
///
/// Points are stored counter-clockwise without a repeated closing point, so
/// outward edge normals always point to the right of each edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2>", into = "Vec<Point2>")]
pub struct Profile {
    /// Ordered vertices.
    points: Vec<Point2>,
}

impl Profile {
    /// Build a profile from an ordered list of vertices.
    ///
    /// Consecutive duplicates and an explicit closing vertex are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::TooFewProfilePoints`] when fewer than three
    /// distinct points remain, [`ConfigurationError::ZeroAreaProfile`] when the
    /// polygon is degenerate and [`ConfigurationError::SelfIntersectingProfile`]
    /// when two non-adjacent edges cross.
    ///
    /// # Examples
    /// ```
    /// use fecase::{point2, Profile};
    ///
    /// let triangle = Profile::polygon(vec![
    ///     point2(0.0, 0.0),
    ///     point2(1.0, 0.0),
    ///     point2(0.0, 1.0),
    /// ])
    /// .expect("valid triangle");
    /// assert!((triangle.area() - 0.5).abs() < 1.0e-12);
    /// ```
    pub fn polygon(points: Vec<Point2>) -> Result<Self, ConfigurationError> {
        let mut distinct: Vec<Point2> = Vec::with_capacity(points.len());
        for candidate in points {
            if !candidate.x.is_finite() || !candidate.y.is_finite() {
                return Err(ConfigurationError::ZeroAreaProfile);
            }
            if distinct.last() != Some(&candidate) {
                distinct.push(candidate);
            }
        }
        while distinct.len() > 1 && distinct.first() == distinct.last() {
            distinct.pop();
        }
        if distinct.len() < 3 {
            return Err(ConfigurationError::TooFewProfilePoints {
                points: distinct.len(),
            });
        }

        let mut profile = Self { points: distinct };
        let scale = profile.characteristic_length();
        let signed_area = profile.signed_area();
        if signed_area.abs() <= f64::EPSILON * scale * scale * 16.0 {
            return Err(ConfigurationError::ZeroAreaProfile);
        }
        if let Some((first, second)) = profile.first_crossing() {
            return Err(ConfigurationError::SelfIntersectingProfile { first, second });
        }
        if signed_area < 0.0 {
            profile.points.reverse();
        }
        Ok(profile)
    }

    /// Build an axis-aligned rectangle from two opposite corners.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroAreaProfile`] when the corners share an
    /// X or Y coordinate.
    pub fn rectangle(first: Point2, second: Point2) -> Result<Self, ConfigurationError> {
        if first.x == second.x || first.y == second.y {
            return Err(ConfigurationError::ZeroAreaProfile);
        }
        Self::polygon(vec![
            first,
            Point2::new(second.x, first.y),
            second,
            Point2::new(first.x, second.y),
        ])
    }

    /// Vertices in counter-clockwise order.
    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Number of edges, which equals the number of vertices.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.points.len()
    }

    /// Endpoints of edge `index`, running from vertex `index` to the next one.
    #[must_use]
    pub fn edge(&self, index: usize) -> (Point2, Point2) {
        let n = self.points.len();
        (self.points[index % n], self.points[(index + 1) % n])
    }

    /// Length of edge `index`.
    #[must_use]
    pub fn edge_length(&self, index: usize) -> f64 {
        let (a, b) = self.edge(index);
        (b.to_vector() - a.to_vector()).norm()
    }

    /// Unit normal of edge `index` pointing away from the enclosed area.
    #[must_use]
    pub fn outward_normal(&self, index: usize) -> Vector2<f64> {
        let (a, b) = self.edge(index);
        let tangent = b.to_vector() - a.to_vector();
        Vector2::new(tangent.y, -tangent.x).normalize()
    }

    /// Enclosed area in square metres.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Centroid of the enclosed area.
    #[must_use]
    pub fn centroid(&self) -> Point2 {
        let area = self.signed_area();
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..self.edge_count() {
            let (a, b) = self.edge(i);
            let cross = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        Point2::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    /// Second moments of area about the centroid.
    #[must_use]
    pub fn second_moments(&self) -> SecondMoments {
        let (mut ixx, mut iyy, mut ixy) = (0.0, 0.0, 0.0);
        for i in 0..self.edge_count() {
            let (a, b) = self.edge(i);
            let cross = a.x * b.y - b.x * a.y;
            ixx += (a.y * a.y + a.y * b.y + b.y * b.y) * cross;
            iyy += (a.x * a.x + a.x * b.x + b.x * b.x) * cross;
            ixy += (a.x * b.y + 2.0 * a.x * a.y + 2.0 * b.x * b.y + b.x * a.y) * cross;
        }
        let area = self.signed_area();
        let centroid = self.centroid();
        SecondMoments {
            ixx: ixx / 12.0 - area * centroid.y * centroid.y,
            iyy: iyy / 12.0 - area * centroid.x * centroid.x,
            ixy: ixy / 24.0 - area * centroid.x * centroid.y,
        }
    }

    /// Lower-left and upper-right corners of the bounding box.
    #[must_use]
    pub fn bounds(&self) -> (Point2, Point2) {
        let mut min = self.points[0];
        let mut max = self.points[0];
        for p in &self.points[1..] {
            min = Point2::new(min.x.min(p.x), min.y.min(p.y));
            max = Point2::new(max.x.max(p.x), max.y.max(p.y));
        }
        (min, max)
    }

    /// Diagonal of the bounding box.
    #[must_use]
    pub fn characteristic_length(&self) -> f64 {
        let (min, max) = self.bounds();
        (max.to_vector() - min.to_vector()).norm()
    }

    /// Shortest distance from `p` to edge `index`.
    #[must_use]
    pub fn distance_to_edge(&self, index: usize, p: Point2) -> f64 {
        let (a, b) = self.edge(index);
        let ab = b.to_vector() - a.to_vector();
        let ap = p.to_vector() - a.to_vector();
        let t = (ap.dot(&ab) / ab.norm_squared()).clamp(0.0, 1.0);
        (ap - ab * t).norm()
    }

    /// Classify `p` against the profile using `tolerance` for edge hits.
    #[must_use]
    pub fn classify(&self, p: Point2, tolerance: f64) -> Containment {
        if (0..self.edge_count()).any(|i| self.distance_to_edge(i, p) <= tolerance) {
            return Containment::Boundary;
        }
        let mut inside = false;
        for i in 0..self.edge_count() {
            let (a, b) = self.edge(i);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        if inside {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }

    /// Shoelace area, positive for counter-clockwise ordering.
    fn signed_area(&self) -> f64 {
        0.5 * (0..self.edge_count())
            .map(|i| {
                let (a, b) = self.edge(i);
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
    }

    /// Find the first pair of non-adjacent edges that touch or cross.
    fn first_crossing(&self) -> Option<(usize, usize)> {
        let n = self.edge_count();
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (a, b) = self.edge(i);
                let (c, d) = self.edge(j);
                if segments_touch(a, b, c, d) {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

impl TryFrom<Vec<Point2>> for Profile {
    type Error = ConfigurationError;

    fn try_from(points: Vec<Point2>) -> Result<Self, Self::Error> {
        Self::polygon(points)
    }
}

impl From<Profile> for Vec<Point2> {
    fn from(profile: Profile) -> Self {
        profile.points
    }
}

/// Orientation of the triangle `a`, `b`, `c`: positive when counter-clockwise.
fn orientation(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether `p` lies within the bounding box of segment `a`-`b`.
fn within_box(a: Point2, b: Point2, p: Point2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether closed segments `a`-`b` and `c`-`d` share at least one point.
fn segments_touch(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);
    if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
        return true;
    }
    (o1 == 0.0 && within_box(a, b, c))
        || (o2 == 0.0 && within_box(a, b, d))
        || (o3 == 0.0 && within_box(c, d, a))
        || (o4 == 0.0 && within_box(c, d, b))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn beam_profile() -> Profile {
        Profile::rectangle(point2(0.1, 0.1), point2(0.3, -0.1)).expect("valid rectangle")
    }

    #[test]
    fn rectangle_is_stored_counter_clockwise() {
        let profile = beam_profile();
        assert_eq!(profile.edge_count(), 4);
        assert!(profile.signed_area() > 0.0);
        assert_relative_eq!(profile.area(), 0.04, epsilon = 1.0e-12);
    }

    #[test]
    fn rectangle_section_properties_match_closed_form() {
        let profile = beam_profile();
        let centroid = profile.centroid();
        assert_relative_eq!(centroid.x, 0.2, epsilon = 1.0e-12);
        assert_relative_eq!(centroid.y, 0.0, epsilon = 1.0e-12);

        let moments = profile.second_moments();
        let expected = 0.2 * 0.2_f64.powi(3) / 12.0;
        assert_relative_eq!(moments.ixx, expected, epsilon = 1.0e-15);
        assert_relative_eq!(moments.iyy, expected, epsilon = 1.0e-15);
        assert_relative_eq!(moments.ixy, 0.0, epsilon = 1.0e-15);
    }

    #[test]
    fn outward_normals_point_away_from_the_area() {
        let profile = beam_profile();
        let centroid = profile.centroid().to_vector();
        for edge in 0..profile.edge_count() {
            let (a, b) = profile.edge(edge);
            let midpoint = (a.to_vector() + b.to_vector()) / 2.0;
            assert!(profile.outward_normal(edge).dot(&(midpoint - centroid)) > 0.0);
        }
    }

    #[test]
    fn degenerate_profiles_are_rejected() {
        assert_eq!(
            Profile::polygon(vec![point2(0.0, 0.0), point2(1.0, 0.0)]),
            Err(ConfigurationError::TooFewProfilePoints { points: 2 })
        );
        assert_eq!(
            Profile::polygon(vec![point2(0.0, 0.0), point2(1.0, 0.0), point2(2.0, 0.0)]),
            Err(ConfigurationError::ZeroAreaProfile)
        );
        assert_eq!(
            Profile::rectangle(point2(0.0, 0.0), point2(0.0, 1.0)),
            Err(ConfigurationError::ZeroAreaProfile)
        );
    }

    #[test]
    fn bow_tie_is_self_intersecting() {
        let error = Profile::polygon(vec![
            point2(0.0, 0.0),
            point2(2.0, 2.0),
            point2(2.0, 0.0),
            point2(0.0, 1.0),
        ])
        .expect_err("crossing edges rejected");
        assert_eq!(
            error,
            ConfigurationError::SelfIntersectingProfile {
                first: 0,
                second: 2
            }
        );
    }

    #[test]
    fn closing_point_is_dropped() {
        let profile = Profile::polygon(vec![
            point2(0.0, 0.0),
            point2(1.0, 0.0),
            point2(1.0, 1.0),
            point2(0.0, 0.0),
        ])
        .expect("closed triangle accepted");
        assert_eq!(profile.points().len(), 3);
    }

    #[test]
    fn classify_distinguishes_inside_boundary_and_outside() {
        let profile = beam_profile();
        assert_eq!(profile.classify(point2(0.2, 0.0), 1.0e-9), Containment::Inside);
        assert_eq!(
            profile.classify(point2(0.2, 0.1), 1.0e-9),
            Containment::Boundary
        );
        assert_eq!(
            profile.classify(point2(0.5, 0.0), 1.0e-9),
            Containment::Outside
        );
    }

    #[test]
    fn profile_deserialization_validates_points() {
        let error = serde_json::from_str::<Profile>(r#"[{"x":0.0,"y":0.0},{"x":1.0,"y":0.0}]"#)
            .expect_err("two points rejected");
        assert!(error.to_string().contains("at least three"));
    }
}
