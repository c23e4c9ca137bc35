//! Prismatic geometry kernel.
//!
//! Every body is a profile extruded along +Z. Face 0 is the cap at `z = 0`,
//! face 1 the cap at `z = depth`, and face `2 + i` the side face swept by
//! profile edge `i`. The solid is a single cell, `CellId(0)`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;

use crate::errors::{CaseError, ConfigurationError};
use crate::geometry::{Containment, Point, Profile};
use crate::registry::EntityKind;
use crate::services::{BodyHandle, CellId, FaceId, GeometryService};

/// Relative tolerance for probe hits, scaled by the body size.
const PROBE_TOLERANCE: f64 = 1.0e-6;

/// Extruded body.
#[derive(Clone, Debug, PartialEq)]
pub struct Prism {
    /// Name the body was created under.
    pub name: String,
    /// Cross-section.
    pub profile: Profile,
    /// Extrusion depth.
    pub depth: f64,
}

impl Prism {
    /// Absolute probe tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        PROBE_TOLERANCE * self.profile.characteristic_length().max(self.depth)
    }

    /// Faces touched by `probe`, in face order.
    #[must_use]
    pub fn faces_at(&self, probe: Point) -> Vec<FaceId> {
        let tol = self.tolerance();
        let planar = probe.planar();
        let mut faces = Vec::new();
        if probe.z < -tol || probe.z > self.depth + tol {
            return faces;
        }
        let section = self.profile.classify(planar, tol);
        if section != Containment::Outside {
            if probe.z.abs() <= tol {
                faces.push(FaceId(0));
            }
            if (probe.z - self.depth).abs() <= tol {
                faces.push(FaceId(1));
            }
        }
        faces.extend(
            (0..self.profile.edge_count())
                .filter(|&edge| self.profile.distance_to_edge(edge, planar) <= tol)
                .map(|edge| FaceId(2 + edge)),
        );
        faces
    }

    /// Whether `probe` lies in the solid or on its boundary.
    #[must_use]
    pub fn contains(&self, probe: Point) -> bool {
        let tol = self.tolerance();
        probe.z >= -tol
            && probe.z <= self.depth + tol
            && self.profile.classify(probe.planar(), tol) != Containment::Outside
    }
}

/// Bodies shared between the geometry kernel and the mesher.
pub type BodyTable = Rc<RefCell<BTreeMap<BodyHandle, Prism>>>;

/// Geometry service over extruded prisms.
#[derive(Debug, Default)]
pub struct ReferenceGeometry {
    /// Known bodies.
    bodies: BodyTable,
    /// Last handle issued.
    last_handle: u64,
}

impl ReferenceGeometry {
    /// Create a kernel with no bodies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table shared with the mesher.
    #[must_use]
    pub fn bodies(&self) -> BodyTable {
        Rc::clone(&self.bodies)
    }

    fn issue(&mut self, prism: Prism) -> BodyHandle {
        self.last_handle += 1;
        let handle = BodyHandle(self.last_handle);
        self.bodies.borrow_mut().insert(handle, prism);
        handle
    }

    fn with_prism<R>(
        &self,
        body: BodyHandle,
        f: impl FnOnce(&Prism) -> R,
    ) -> Result<R, CaseError> {
        self.bodies
            .borrow()
            .get(&body)
            .map(f)
            .ok_or_else(|| unknown_body(body))
    }
}

impl GeometryService for ReferenceGeometry {
    fn extrude(
        &mut self,
        name: &str,
        profile: &Profile,
        depth: f64,
    ) -> Result<BodyHandle, CaseError> {
        if !(depth > 0.0 && depth.is_finite()) {
            return Err(ConfigurationError::NonPositiveDepth { depth }.into());
        }
        let handle = self.issue(Prism {
            name: name.to_owned(),
            profile: profile.clone(),
            depth,
        });
        debug!(body = handle.0, name = name, depth = depth; "Extruded prism");
        Ok(handle)
    }

    fn copy_body(&mut self, body: BodyHandle) -> Result<BodyHandle, CaseError> {
        let prism = self.with_prism(body, Prism::clone)?;
        let handle = self.issue(prism);
        debug!(source = body.0, copy = handle.0; "Copied prism");
        Ok(handle)
    }

    fn volume(&self, body: BodyHandle) -> Result<f64, CaseError> {
        self.with_prism(body, |prism| prism.profile.area() * prism.depth)
    }

    fn cells(&self, body: BodyHandle) -> Result<Vec<CellId>, CaseError> {
        self.with_prism(body, |_| vec![CellId(0)])
    }

    fn faces_at(&self, body: BodyHandle, probe: Point) -> Result<Vec<FaceId>, CaseError> {
        self.with_prism(body, |prism| prism.faces_at(probe))
    }

    fn cells_at(&self, body: BodyHandle, probe: Point) -> Result<Vec<CellId>, CaseError> {
        self.with_prism(body, |prism| {
            if prism.contains(probe) {
                vec![CellId(0)]
            } else {
                Vec::new()
            }
        })
    }
}

/// Error for a handle the kernel never issued.
pub(crate) fn unknown_body(body: BodyHandle) -> CaseError {
    CaseError::not_found(EntityKind::Part, format!("body #{}", body.0))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{point, point2};

    fn beam() -> (ReferenceGeometry, BodyHandle) {
        let mut geometry = ReferenceGeometry::new();
        let profile =
            Profile::rectangle(point2(0.1, 0.1), point2(0.3, -0.1)).expect("valid profile");
        let body = geometry
            .extrude("Beam", &profile, 5.0)
            .expect("extrusion succeeds");
        (geometry, body)
    }

    #[test]
    fn volume_is_area_times_depth() {
        let (geometry, body) = beam();
        assert_relative_eq!(geometry.volume(body).expect("known body"), 0.2, epsilon = 1.0e-12);
    }

    #[test]
    fn face_probes_resolve_caps_and_sides() {
        let (geometry, body) = beam();
        assert_eq!(
            geometry.faces_at(body, point(0.2, 0.0, 0.0)).expect("known body"),
            [FaceId(0)]
        );
        assert_eq!(
            geometry.faces_at(body, point(0.2, 0.0, 5.0)).expect("known body"),
            [FaceId(1)]
        );
        let top = geometry
            .faces_at(body, point(0.2, 0.1, 2.5))
            .expect("known body");
        assert_eq!(top.len(), 1);
        assert!(top[0].0 >= 2);
        assert!(geometry
            .faces_at(body, point(0.2, 0.0, 2.5))
            .expect("known body")
            .is_empty());
    }

    #[test]
    fn probes_on_edges_touch_two_faces() {
        let (geometry, body) = beam();
        assert_eq!(
            geometry
                .faces_at(body, point(0.3, 0.1, 2.5))
                .expect("known body")
                .len(),
            2
        );
        assert_eq!(
            geometry
                .faces_at(body, point(0.2, 0.1, 0.0))
                .expect("known body")
                .len(),
            2
        );
    }

    #[test]
    fn cells_contain_interior_points_only() {
        let (geometry, body) = beam();
        assert_eq!(
            geometry.cells_at(body, point(0.2, 0.0, 2.5)).expect("known body"),
            [CellId(0)]
        );
        assert!(geometry
            .cells_at(body, point(0.5, 0.0, 2.5))
            .expect("known body")
            .is_empty());
    }

    #[test]
    fn copies_are_independent_handles() {
        let (mut geometry, body) = beam();
        let copy = geometry.copy_body(body).expect("known body");
        assert_ne!(copy, body);
        assert_eq!(geometry.cells(copy).expect("copy known"), [CellId(0)]);
        assert_eq!(
            geometry.copy_body(BodyHandle(99)),
            Err(CaseError::not_found(EntityKind::Part, "body #99"))
        );
    }
}
