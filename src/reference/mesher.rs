//! Structured sweep mesher for prismatic bodies.

use log::{debug, warn};

use crate::errors::{CaseError, ConfigurationError};
use crate::mesh::{ElementCode, MeshRequest, MeshSummary};
use crate::services::{BodyHandle, CellId, MeshService};

use super::geometry::{unknown_body, BodyTable, Prism};

/// Largest mesh the mesher agrees to build.
pub const DEFAULT_ELEMENT_LIMIT: usize = 250_000;

/// Most element layers along the extrusion axis. Each layer becomes one beam
/// element of a dense stiffness system in the reference solver.
pub const MAX_SWEEP_DIVISIONS: usize = 500;

/// Tetrahedra per swept brick.
const TETS_PER_BRICK: f64 = 6.0;

/// Sweeps a layered grid through each prism.
#[derive(Debug)]
pub struct ReferenceMesher {
    /// Bodies owned by the geometry kernel.
    bodies: BodyTable,
    /// Element count above which meshing is refused.
    element_limit: usize,
}

impl ReferenceMesher {
    /// Mesher over the bodies of a geometry kernel.
    #[must_use]
    pub fn new(bodies: BodyTable) -> Self {
        Self {
            bodies,
            element_limit: DEFAULT_ELEMENT_LIMIT,
        }
    }

    /// Refuse meshes with more than `limit` elements.
    #[must_use]
    pub fn with_element_limit(mut self, limit: usize) -> Self {
        self.element_limit = limit;
        self
    }
}

/// Divisions needed to cover `length` with elements no larger than `size`.
fn divisions(length: f64, size: f64) -> f64 {
    // Absorb rounding so that 0.2 / 0.1 gives two divisions, not three.
    (length / size - 1.0e-9).ceil().max(1.0)
}

/// Node and element counts of a sweep. Counts stay in `f64` until they have
/// been checked against the limits, so tiny seeds cannot overflow.
#[derive(Clone, Copy, Debug)]
struct Sweep {
    /// Nodes in the mesh.
    nodes: f64,
    /// Elements in the mesh.
    elements: f64,
    /// Element layers along the extrusion axis.
    layers: f64,
}

fn sweep(prism: &Prism, size: f64, code: ElementCode) -> Sweep {
    let (min, max) = prism.profile.bounds();
    let (width, height) = (max.x - min.x, max.y - min.y);
    let nx = divisions(width, size);
    let ny = divisions(height, size);
    let nz = divisions(prism.depth, size);

    // Non-rectangular profiles only fill part of their bounding grid.
    let fill = (prism.profile.area() / (width * height)).clamp(0.0, 1.0);
    let bricks = (nx * ny * fill).round().max(1.0) * nz;
    let elements = if code.is_tetrahedral() {
        bricks * TETS_PER_BRICK
    } else {
        bricks
    };

    let per_edge = if code.is_quadratic() { 2.0 } else { 1.0 };
    let layer = ((nx * per_edge + 1.0) * (ny * per_edge + 1.0) * fill)
        .round()
        .max(1.0);
    Sweep {
        nodes: layer * (nz * per_edge + 1.0),
        elements,
        layers: nz,
    }
}

impl MeshService for ReferenceMesher {
    fn generate(
        &mut self,
        body: BodyHandle,
        request: &MeshRequest,
    ) -> Result<MeshSummary, CaseError> {
        let table = self.bodies.borrow();
        let prism = table.get(&body).ok_or_else(|| unknown_body(body))?;
        let code = request.element_type(CellId(0)).code;
        let counts = sweep(prism, request.seed.size(), code);

        let refusal = if counts.elements > self.element_limit as f64 {
            Some(format!(
                "{:.0} {code} elements exceed the limit of {}",
                counts.elements, self.element_limit
            ))
        } else if counts.layers > MAX_SWEEP_DIVISIONS as f64 {
            Some(format!(
                "{:.0} element layers exceed the limit of {MAX_SWEEP_DIVISIONS}",
                counts.layers
            ))
        } else {
            None
        };
        if let Some(reason) = refusal {
            warn!(part = prism.name, reason = reason; "Mesh too large");
            return Err(ConfigurationError::Unmeshable {
                part: prism.name.clone(),
                reason,
            }
            .into());
        }

        // Both counts are bounded by the checks above.
        let node_count = counts.nodes as usize;
        let element_count = counts.elements as usize;
        let sweep_divisions = counts.layers as usize;
        debug!(
            part = prism.name,
            nodes = node_count,
            elements = element_count,
            layers = sweep_divisions;
            "Swept mesh"
        );
        Ok(MeshSummary {
            seed: request.seed,
            node_count,
            element_count,
            sweep_divisions,
            element_types: [(CellId(0), request.element_type(CellId(0)))].into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::geometry::{point2, Profile};
    use crate::mesh::{ElementType, Seed};
    use crate::reference::geometry::ReferenceGeometry;
    use crate::services::GeometryService;

    fn beam(geometry: &mut ReferenceGeometry) -> BodyHandle {
        let profile =
            Profile::rectangle(point2(0.1, 0.1), point2(0.3, -0.1)).expect("valid profile");
        geometry
            .extrude("Beam", &profile, 5.0)
            .expect("extrusion succeeds")
    }

    fn request(size: f64, code: ElementCode) -> MeshRequest {
        MeshRequest {
            seed: Seed::new(size, 0.1).expect("valid seed"),
            element_types: BTreeMap::from([(CellId(0), ElementType::new(code))]),
        }
    }

    #[test]
    fn brick_sweep_counts_match_the_grid() {
        let mut geometry = ReferenceGeometry::new();
        let body = beam(&mut geometry);
        let mut mesher = ReferenceMesher::new(geometry.bodies());
        let summary = mesher
            .generate(body, &request(0.1, ElementCode::C3D8R))
            .expect("mesh generated");
        assert_eq!(summary.sweep_divisions, 50);
        assert_eq!(summary.element_count, 2 * 2 * 50);
        assert_eq!(summary.node_count, 3 * 3 * 51);
    }

    #[test]
    fn tetrahedra_split_each_brick() {
        let mut geometry = ReferenceGeometry::new();
        let body = beam(&mut geometry);
        let mut mesher = ReferenceMesher::new(geometry.bodies());
        let summary = mesher
            .generate(body, &request(0.1, ElementCode::C3D10))
            .expect("mesh generated");
        assert_eq!(summary.element_count, 2 * 2 * 50 * 6);
        assert_eq!(summary.node_count, 5 * 5 * 101);
    }

    #[test]
    fn oversized_meshes_are_refused() {
        let mut geometry = ReferenceGeometry::new();
        let body = beam(&mut geometry);
        let mut mesher = ReferenceMesher::new(geometry.bodies()).with_element_limit(100);
        let error = mesher
            .generate(body, &request(0.1, ElementCode::C3D8R))
            .expect_err("limit exceeded");
        assert!(matches!(
            error,
            CaseError::Configuration(ConfigurationError::Unmeshable { ref part, .. }) if part == "Beam"
        ));
    }

    #[test]
    fn vanishing_seed_is_unmeshable() {
        let mut geometry = ReferenceGeometry::new();
        let body = beam(&mut geometry);
        let mut mesher = ReferenceMesher::new(geometry.bodies()).with_element_limit(usize::MAX);
        let error = mesher
            .generate(body, &request(1.0e-8, ElementCode::C3D20R))
            .expect_err("seed far too small");
        assert!(matches!(
            error,
            CaseError::Configuration(ConfigurationError::Unmeshable { .. })
        ));
    }

    #[test]
    fn sweeps_deeper_than_the_layer_limit_are_refused() {
        let mut geometry = ReferenceGeometry::new();
        let body = beam(&mut geometry);
        let mut mesher = ReferenceMesher::new(geometry.bodies()).with_element_limit(usize::MAX);
        // 0.005 m over 5 m gives 1000 layers of 40 x 40 bricks.
        let error = mesher
            .generate(body, &request(0.005, ElementCode::C3D8R))
            .expect_err("too many layers");
        assert!(matches!(
            error,
            CaseError::Configuration(ConfigurationError::Unmeshable { ref reason, .. })
                if reason.contains("layers")
        ));
    }

    #[test]
    fn unknown_bodies_are_reported() {
        let geometry = ReferenceGeometry::new();
        let mut mesher = ReferenceMesher::new(geometry.bodies());
        assert!(mesher
            .generate(BodyHandle(7), &request(0.1, ElementCode::C3D8R))
            .is_err());
    }
}
