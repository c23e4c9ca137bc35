//! Serializable image of a case, handed to the solver with each job.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use serde::Serialize;

use crate::geometry::Profile;
use crate::loads::{BoundaryCondition, Load};
use crate::materials::Material;
use crate::mesh::MeshSummary;
use crate::outputs::{FieldOutputRequest, HistoryOutputRequest, OutputVariable};
use crate::services::{BodyHandle, CellId};

/// Section and material resolved for one cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellSnapshot {
    /// Host cell.
    pub cell: CellId,
    /// Assigned section.
    pub section: String,
    /// Material behind the section.
    pub material: Material,
}

/// One meshed body as placed in the assembly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BodySnapshot {
    /// Instance name.
    pub instance: String,
    /// Part the instance was created from.
    pub part: String,
    /// Host body that regions were resolved on.
    pub body: BodyHandle,
    /// Extrusion cross-section.
    pub profile: Profile,
    /// Extrusion depth.
    pub depth: f64,
    /// Placement translation.
    pub translation: [f64; 3],
    /// Placement rotation as a unit quaternion `[i, j, k, w]`.
    pub rotation: [f64; 4],
    /// Section and material per cell.
    pub cells: Vec<CellSnapshot>,
    /// Mesh used for this body.
    pub mesh: MeshSummary,
}

impl BodySnapshot {
    /// Encode a placement.
    pub(crate) fn encode_placement(placement: &Isometry3<f64>) -> ([f64; 3], [f64; 4]) {
        let t = placement.translation.vector;
        let q = placement.rotation.quaternion();
        ([t.x, t.y, t.z], [q.i, q.j, q.k, q.w])
    }

    /// Placement from part coordinates into assembly coordinates.
    #[must_use]
    pub fn placement(&self) -> Isometry3<f64> {
        let [x, y, z] = self.translation;
        let [i, j, k, w] = self.rotation;
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_quaternion(Quaternion::new(w, i, j, k)),
        )
    }
}

/// Analysis step in chain order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepSnapshot {
    /// Step name.
    pub name: String,
    /// Step description; empty for `Initial`.
    pub description: String,
}

/// Everything the solver needs to run a case.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseSnapshot {
    /// Model name.
    pub model: String,
    /// Meshed bodies, one per instance.
    pub bodies: Vec<BodySnapshot>,
    /// Steps in chain order, starting with `Initial`.
    pub steps: Vec<StepSnapshot>,
    /// Field output requests.
    pub field_outputs: Vec<FieldOutputRequest>,
    /// History output requests.
    pub history_outputs: Vec<HistoryOutputRequest>,
    /// Loads.
    pub loads: Vec<Load>,
    /// Boundary conditions.
    pub boundary_conditions: Vec<BoundaryCondition>,
}

impl CaseSnapshot {
    /// Whether a field output request active by the step at position `step`
    /// writes `variable`.
    #[must_use]
    pub fn requests_field(&self, variable: OutputVariable, step: usize) -> bool {
        self.field_outputs.iter().any(|request| {
            request.writes(variable)
                && self
                    .step_index(request.create_step())
                    .is_some_and(|created| created <= step)
        })
    }

    /// Body of `instance`.
    #[must_use]
    pub fn body(&self, instance: &str) -> Option<&BodySnapshot> {
        self.bodies.iter().find(|body| body.instance == instance)
    }

    /// Position of `step` in the chain; `Initial` is 0.
    #[must_use]
    pub fn step_index(&self, step: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == step)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    use super::*;
    use crate::registry::Key;

    #[test]
    fn placement_encoding_restores_the_isometry() {
        let placement = Isometry3::new(
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let (translation, rotation) = BodySnapshot::encode_placement(&placement);
        let [i, j, k, w] = rotation;
        let restored = Isometry3::from_parts(
            Translation3::new(translation[0], translation[1], translation[2]),
            UnitQuaternion::from_quaternion(Quaternion::new(w, i, j, k)),
        );
        let p = Point3::new(1.0, 0.0, 0.0);
        let expected = placement.transform_point(&p);
        let actual = restored.transform_point(&p);
        assert_relative_eq!(expected.x, actual.x, epsilon = 1.0e-12);
        assert_relative_eq!(expected.y, actual.y, epsilon = 1.0e-12);
        assert_relative_eq!(expected.z, actual.z, epsilon = 1.0e-12);
    }

    fn step(name: &str) -> StepSnapshot {
        StepSnapshot {
            name: name.to_owned(),
            description: String::new(),
        }
    }

    #[test]
    fn field_requests_start_writing_in_their_create_step() {
        let snapshot = CaseSnapshot {
            model: "Cantilever Beam".to_owned(),
            bodies: Vec::new(),
            steps: vec![step("Initial"), step("Settle"), step("Apply Load")],
            field_outputs: vec![FieldOutputRequest::new(
                "Selected Field Outputs",
                &Key::new("Apply Load"),
                vec![OutputVariable::U],
            )],
            history_outputs: Vec::new(),
            loads: Vec::new(),
            boundary_conditions: Vec::new(),
        };
        assert!(!snapshot.requests_field(OutputVariable::U, 1));
        assert!(snapshot.requests_field(OutputVariable::U, 2));
        assert!(!snapshot.requests_field(OutputVariable::RF, 2));
    }
}
