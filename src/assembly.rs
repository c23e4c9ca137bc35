//! Placed occurrences of parts.

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::errors::{CaseError, ConfigurationError};
use crate::geometry::Point;
use crate::mesh::MeshSummary;
use crate::part::Part;
use crate::registry::{EntityKind, Key, Named, Registry};
use crate::services::BodyHandle;

/// Placed occurrence of a part inside the assembly.
///
/// A dependent instance shares the part's body and mesh, so edits to the part
/// propagate. An independent instance owns a copy of the body and its own
/// mesh.
#[derive(Clone, Debug)]
pub struct Instance {
    /// Registry key.
    name: String,
    /// Part this instance was created from.
    part: Key<Part>,
    /// Whether the instance shares the part's body and mesh.
    dependent: bool,
    /// Body used for region queries.
    body: BodyHandle,
    /// Rigid placement from part coordinates into assembly coordinates.
    placement: Isometry3<f64>,
    /// Own mesh of an independent instance.
    mesh: Option<MeshSummary>,
}

impl Instance {
    /// Part this instance was created from.
    #[must_use]
    pub fn part(&self) -> &Key<Part> {
        &self.part
    }

    /// Whether the instance shares the part's body and mesh.
    #[must_use]
    pub fn is_dependent(&self) -> bool {
        self.dependent
    }

    /// Body used for region queries.
    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Placement from part coordinates into assembly coordinates.
    #[must_use]
    pub fn placement(&self) -> &Isometry3<f64> {
        &self.placement
    }

    /// Map an assembly-space point into part coordinates.
    #[must_use]
    pub fn to_part(&self, point: Point) -> Point {
        self.placement
            .inverse_transform_point(&point.to_point3())
            .into()
    }

    /// Map a part-space point into assembly coordinates.
    #[must_use]
    pub fn to_assembly(&self, point: Point) -> Point {
        self.placement.transform_point(&point.to_point3()).into()
    }

    /// Own mesh of an independent instance. Always `None` for dependent instances.
    #[must_use]
    pub fn own_mesh(&self) -> Option<&MeshSummary> {
        self.mesh.as_ref()
    }

    /// Store the mesh of an independent instance.
    pub(crate) fn set_own_mesh(&mut self, mesh: MeshSummary) {
        self.mesh = Some(mesh);
    }

    /// Drop the own mesh; returns whether one was present.
    pub(crate) fn clear_own_mesh(&mut self) -> bool {
        self.mesh.take().is_some()
    }
}

impl Named for Instance {
    const KIND: EntityKind = EntityKind::Instance;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Root assembly of a case.
#[derive(Clone, Debug, Default)]
pub struct Assembly {
    /// Instances in creation order.
    instances: Registry<Instance>,
}

impl Assembly {
    /// Instances in creation order.
    #[must_use]
    pub fn instances(&self) -> &Registry<Instance> {
        &self.instances
    }

    /// Place `part` into the assembly at the identity placement.
    ///
    /// `body` is the part's own body for dependent instances and a host copy
    /// otherwise.
    pub(crate) fn instantiate(
        &mut self,
        name: &str,
        part: Key<Part>,
        dependent: bool,
        body: BodyHandle,
    ) -> Result<Key<Instance>, CaseError> {
        self.instances.insert(Instance {
            name: name.to_owned(),
            part,
            dependent,
            body,
            placement: Isometry3::identity(),
            mesh: None,
        })
    }

    /// Instance behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the instance no longer exists.
    pub fn instance(&self, key: &Key<Instance>) -> Result<&Instance, CaseError> {
        self.instances.get(key)
    }

    /// Resolve an instance name.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn lookup(&self, name: &str) -> Result<Key<Instance>, CaseError> {
        self.instances.lookup(name)
    }

    /// Shift an instance by `offset` in assembly coordinates.
    pub(crate) fn translate(
        &mut self,
        key: &Key<Instance>,
        offset: [f64; 3],
    ) -> Result<(), CaseError> {
        let instance = self.instances.get_mut(key)?;
        let shift = Translation3::new(offset[0], offset[1], offset[2]);
        instance.placement = Isometry3::from_parts(shift, UnitQuaternion::identity())
            * instance.placement;
        Ok(())
    }

    /// Rotate an instance by `angle_degrees` about the axis through
    /// `axis_point` along `axis_direction`, right-handed.
    pub(crate) fn rotate(
        &mut self,
        key: &Key<Instance>,
        axis_point: Point,
        axis_direction: [f64; 3],
        angle_degrees: f64,
    ) -> Result<(), CaseError> {
        let instance = self.instances.get_mut(key)?;
        let direction = Vector3::new(axis_direction[0], axis_direction[1], axis_direction[2]);
        let axis = Unit::try_new(direction, f64::EPSILON).ok_or_else(|| {
            ConfigurationError::ZeroRotationAxis {
                instance: instance.name.clone(),
            }
        })?;
        let rotation = UnitQuaternion::from_axis_angle(&axis, angle_degrees.to_radians());
        let about_point = Isometry3::rotation_wrt_point(rotation, axis_point.to_point3());
        instance.placement = about_point * instance.placement;
        Ok(())
    }

    /// Mutable access for mesh bookkeeping.
    pub(crate) fn instances_mut(&mut self) -> &mut Registry<Instance> {
        &mut self.instances
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{point, point2, Profile};

    fn assembly_with_instance() -> (Assembly, Key<Instance>) {
        let mut parts: Registry<Part> = Registry::new();
        let profile =
            Profile::rectangle(point2(0.0, 0.0), point2(1.0, 1.0)).expect("valid profile");
        let part = parts
            .insert(Part::new(
                "Beam".to_owned(),
                profile,
                1.0,
                BodyHandle(1),
                1.0,
                Vec::new(),
            ))
            .expect("part registered");
        let mut assembly = Assembly::default();
        let key = assembly
            .instantiate("Beam-1", part, true, BodyHandle(1))
            .expect("instance created");
        (assembly, key)
    }

    #[test]
    fn translation_maps_points_both_ways() {
        let (mut assembly, key) = assembly_with_instance();
        assembly
            .translate(&key, [1.0, 2.0, 3.0])
            .expect("translate applies");
        let instance = assembly.instance(&key).expect("instance present");
        let global = instance.to_assembly(point(0.5, 0.5, 0.5));
        assert_relative_eq!(global.x, 1.5, epsilon = 1.0e-12);
        assert_relative_eq!(global.y, 2.5, epsilon = 1.0e-12);
        assert_relative_eq!(global.z, 3.5, epsilon = 1.0e-12);
        let local = instance.to_part(global);
        assert_relative_eq!(local.x, 0.5, epsilon = 1.0e-12);
        assert_relative_eq!(local.z, 0.5, epsilon = 1.0e-12);
    }

    #[test]
    fn rotation_about_offset_axis() {
        let (mut assembly, key) = assembly_with_instance();
        assembly
            .rotate(&key, point(1.0, 0.0, 0.0), [0.0, 0.0, 1.0], 90.0)
            .expect("rotate applies");
        let instance = assembly.instance(&key).expect("instance present");
        let moved = instance.to_assembly(point(2.0, 0.0, 0.0));
        assert_relative_eq!(moved.x, 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(moved.y, 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn zero_axis_is_rejected() {
        let (mut assembly, key) = assembly_with_instance();
        let error = assembly
            .rotate(&key, point(0.0, 0.0, 0.0), [0.0, 0.0, 0.0], 45.0)
            .expect_err("zero axis rejected");
        assert_eq!(
            error,
            ConfigurationError::ZeroRotationAxis {
                instance: "Beam-1".to_owned()
            }
            .into()
        );
    }

    #[test]
    fn duplicate_instance_names_are_rejected() {
        let (mut assembly, key) = assembly_with_instance();
        let part = assembly.instance(&key).expect("present").part().clone();
        assert!(assembly
            .instantiate("Beam-1", part, false, BodyHandle(2))
            .is_err());
    }
}
