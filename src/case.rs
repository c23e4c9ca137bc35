//! The case definition: one model, its part, materials, assembly, steps,
//! output requests, loads, boundary conditions and mesh.
//!
//! Every operation validates its own preconditions and fails fast. Nothing is
//! rolled back, so a failed call leaves earlier definitions in place and the
//! caller is expected to abort the run.

use log::{debug, info, warn};
use nalgebra::Isometry3;

use crate::assembly::{Assembly, Instance};
use crate::errors::{CaseError, ConfigurationError, Prerequisite};
use crate::geometry::{Force, Point, Profile};
use crate::loads::{BoundaryCondition, BoundaryKind, Load, LoadKind, PrescribedMotion};
use crate::materials::{Material, Section};
use crate::mesh::{ElementType, MeshSummary, Seed};
use crate::outputs::{
    FieldOutputRequest, HistoryOutputRequest, HistoryVariables, OutputVariable,
    DEFAULT_FIELD_OUTPUT, DEFAULT_HISTORY_OUTPUT,
};
use crate::part::Part;
use crate::region::{self, RegionSelector, ResolvedRegion};
use crate::registry::{EntityKind, Key, Named, Registry};
use crate::services::{CellId, GeometryService, MeshService};
use crate::snapshot::{BodySnapshot, CaseSnapshot, CellSnapshot, StepSnapshot};
use crate::steps::{Step, StepChain, StepProcedure, INITIAL_STEP};

/// Cells a section assignment applies to.
#[derive(Clone, Debug, PartialEq)]
pub enum SectionRegion {
    /// Every cell of the part.
    AllCells,
    /// Cells containing the given probe points, in part coordinates.
    Cells(Vec<Point>),
}

/// Top-level named container for one analysis case.
///
/// # Examples
///
/// ```
/// use fecase::CaseDefinition;
///
/// let mut case = CaseDefinition::new("Model-1");
/// case.rename("Cantilever Beam").expect("valid name");
/// let steel = case
///     .define_material("AISI 1005 Steel", 7872.0, 200.0e9, 0.29)
///     .expect("valid material");
/// let section = case
///     .define_section("Beam Section", steel.name())
///     .expect("material is registered");
/// assert_eq!(section.name(), "Beam Section");
/// assert_eq!(case.name(), "Cantilever Beam");
/// ```
#[derive(Clone, Debug)]
pub struct CaseDefinition {
    /// Model name.
    name: String,
    /// Parts; at most one.
    parts: Registry<Part>,
    /// Materials.
    materials: Registry<Material>,
    /// Sections.
    sections: Registry<Section>,
    /// Root assembly.
    assembly: Assembly,
    /// Step chain.
    steps: StepChain,
    /// Field output requests.
    field_outputs: Registry<FieldOutputRequest>,
    /// History output requests.
    history_outputs: Registry<HistoryOutputRequest>,
    /// Loads.
    loads: Registry<Load>,
    /// Boundary conditions.
    boundary_conditions: Registry<BoundaryCondition>,
    /// Whether further edits are refused.
    frozen: bool,
}

impl CaseDefinition {
    /// Create an empty case.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: Registry::new(),
            materials: Registry::new(),
            sections: Registry::new(),
            assembly: Assembly::default(),
            steps: StepChain::new(),
            field_outputs: Registry::new(),
            history_outputs: Registry::new(),
            loads: Registry::new(),
            boundary_conditions: Registry::new(),
            frozen: false,
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the model. Jobs created afterwards reference the new name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyName`] for an empty name and
    /// [`ConfigurationError::Frozen`] once the case is frozen.
    pub fn rename(&mut self, to: &str) -> Result<(), CaseError> {
        self.ensure_editable()?;
        if to.trim().is_empty() {
            return Err(ConfigurationError::EmptyName {
                kind: EntityKind::Model,
            }
            .into());
        }
        info!(from = self.name, to = to; "Renamed model");
        self.name = to.to_owned();
        Ok(())
    }

    /// Refuse every further edit.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(model = self.name; "Freezing case");
        }
        self.frozen = true;
    }

    /// Whether edits are refused.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Fail when the case is frozen.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Frozen`] once [`Self::freeze`] was called.
    pub fn ensure_editable(&self) -> Result<(), CaseError> {
        if self.frozen {
            warn!(model = self.name; "Edit attempted on a frozen case");
            return Err(ConfigurationError::Frozen {
                model: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Extrude `profile` by `depth` into the case's deformable solid part.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveDepth`] for a non-positive
    /// depth, [`ConfigurationError::PartAlreadyDefined`] when the case already
    /// has a part, [`ConfigurationError::EmptySolid`] when the host reports no
    /// volume, and any error raised by the geometry service.
    pub fn create_part(
        &mut self,
        geometry: &mut dyn GeometryService,
        name: &str,
        profile: Profile,
        depth: f64,
    ) -> Result<Key<Part>, CaseError> {
        self.ensure_editable()?;
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName {
                kind: EntityKind::Part,
            }
            .into());
        }
        if !(depth > 0.0 && depth.is_finite()) {
            return Err(ConfigurationError::NonPositiveDepth { depth }.into());
        }
        if let Some(existing) = self.parts.iter().next() {
            return Err(ConfigurationError::PartAlreadyDefined {
                model: self.name.clone(),
                existing: existing.name().to_owned(),
            }
            .into());
        }

        let body = geometry.extrude(name, &profile, depth)?;
        let volume = geometry.volume(body)?;
        if !(volume > 0.0) {
            return Err(ConfigurationError::EmptySolid {
                part: name.to_owned(),
                volume,
            }
            .into());
        }
        let cells = geometry.cells(body)?;
        info!(part = name, depth = depth, volume = volume, cells = cells.len(); "Created part");
        self.parts
            .insert(Part::new(name.to_owned(), profile, depth, body, volume, cells))
    }

    /// Part behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the part does not exist.
    pub fn part(&self, key: &Key<Part>) -> Result<&Part, CaseError> {
        self.parts.get(key)
    }

    /// Resolve a part name.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn lookup_part(&self, name: &str) -> Result<Key<Part>, CaseError> {
        self.parts.lookup(name)
    }

    /// Register an isotropic elastic material.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidMaterial`] for out-of-range
    /// constants and [`ConfigurationError::DuplicateName`] for a taken name.
    pub fn define_material(
        &mut self,
        name: &str,
        density: f64,
        youngs_modulus: f64,
        poisson_ratio: f64,
    ) -> Result<Key<Material>, CaseError> {
        self.ensure_editable()?;
        let material = Material::new(name, density, youngs_modulus, poisson_ratio)?;
        let key = self.materials.insert(material)?;
        info!(material = name, density = density, youngs_modulus = youngs_modulus; "Defined material");
        Ok(key)
    }

    /// Register a homogeneous solid section made of `material`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `material` is not registered.
    pub fn define_section(
        &mut self,
        name: &str,
        material: &str,
    ) -> Result<Key<Section>, CaseError> {
        self.ensure_editable()?;
        let material = self.materials.lookup(material)?;
        let key = self
            .sections
            .insert(Section::homogeneous_solid(name, material.clone()))?;
        info!(section = name, material = material.name(); "Defined section");
        Ok(key)
    }

    /// Resolve a material name.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn lookup_material(&self, name: &str) -> Result<Key<Material>, CaseError> {
        self.materials.lookup(name)
    }

    /// Resolve a section name.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn lookup_section(&self, name: &str) -> Result<Key<Section>, CaseError> {
        self.sections.lookup(name)
    }

    /// Attach `section` to a region of `part`. A later assignment to the same
    /// cell replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown part or section and
    /// [`CaseError::AmbiguousRegion`] when a probe does not select exactly one
    /// cell.
    pub fn assign_section(
        &mut self,
        geometry: &dyn GeometryService,
        part: &Key<Part>,
        region: &SectionRegion,
        section: &Key<Section>,
    ) -> Result<(), CaseError> {
        self.ensure_editable()?;
        self.sections.get(section)?;
        let target = self.parts.get(part)?;
        let cells = match region {
            SectionRegion::AllCells => target.cells().to_vec(),
            SectionRegion::Cells(probes) => {
                Self::resolve_cells(geometry, target, probes)?
            }
        };
        self.parts.get_mut(part)?.assign_section(&cells, section);
        info!(part = part.name(), section = section.name(), cells = cells.len(); "Assigned section");
        Ok(())
    }

    /// Place `part` in the assembly under `name`.
    ///
    /// A dependent instance shares the part's body and mesh. An independent
    /// instance receives its own copy of the body from the geometry service
    /// and is meshed separately.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown part and
    /// [`ConfigurationError::DuplicateName`] for a taken instance name.
    pub fn instantiate(
        &mut self,
        geometry: &mut dyn GeometryService,
        name: &str,
        part: &Key<Part>,
        dependent: bool,
    ) -> Result<Key<Instance>, CaseError> {
        self.ensure_editable()?;
        let source = self.parts.get(part)?.body();
        if self.assembly.instances().contains(name) {
            return Err(ConfigurationError::DuplicateName {
                kind: EntityKind::Instance,
                name: name.to_owned(),
            }
            .into());
        }
        let body = if dependent {
            source
        } else {
            geometry.copy_body(source)?
        };
        let key = self
            .assembly
            .instantiate(name, part.clone(), dependent, body)?;
        info!(instance = name, part = part.name(), dependent = dependent; "Created instance");
        Ok(key)
    }

    /// Shift an instance in assembly coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown instance.
    pub fn translate_instance(
        &mut self,
        instance: &Key<Instance>,
        offset: [f64; 3],
    ) -> Result<(), CaseError> {
        self.ensure_editable()?;
        self.assembly.translate(instance, offset)?;
        debug!(instance = instance.name(), dx = offset[0], dy = offset[1], dz = offset[2]; "Translated instance");
        Ok(())
    }

    /// Rotate an instance about an axis through `axis_point`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown instance and
    /// [`ConfigurationError::ZeroRotationAxis`] for a zero axis.
    pub fn rotate_instance(
        &mut self,
        instance: &Key<Instance>,
        axis_point: Point,
        axis_direction: [f64; 3],
        angle_degrees: f64,
    ) -> Result<(), CaseError> {
        self.ensure_editable()?;
        self.assembly
            .rotate(instance, axis_point, axis_direction, angle_degrees)?;
        debug!(instance = instance.name(), angle = angle_degrees; "Rotated instance");
        Ok(())
    }

    /// Resolve an instance name.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not registered.
    pub fn lookup_instance(&self, name: &str) -> Result<Key<Instance>, CaseError> {
        self.assembly.lookup(name)
    }

    /// Insert a static general step after `previous`.
    ///
    /// The first analysis step also creates the default output requests
    /// `F-Output-1` and `H-Output-1`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `previous` does not exist and a
    /// configuration error for self-reference, cycles or duplicate names.
    pub fn create_static_step(
        &mut self,
        name: &str,
        previous: &str,
        description: &str,
    ) -> Result<Key<Step>, CaseError> {
        self.ensure_editable()?;
        let key = self.steps.insert(
            name,
            previous,
            StepProcedure::StaticGeneral {
                description: description.to_owned(),
            },
        )?;
        info!(step = name, previous = previous; "Created static step");
        if self.steps.analysis_step_count() == 1 {
            self.field_outputs.insert(FieldOutputRequest::new(
                DEFAULT_FIELD_OUTPUT,
                &key,
                OutputVariable::FIELD_DEFAULTS.to_vec(),
            ))?;
            self.history_outputs.insert(HistoryOutputRequest::new(
                DEFAULT_HISTORY_OUTPUT,
                &key,
                HistoryVariables::Preselect,
            ))?;
            debug!(step = name; "Created default output requests");
        }
        Ok(key)
    }

    /// Resolve a step name, including `Initial`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` is not in the chain.
    pub fn lookup_step(&self, name: &str) -> Result<Key<Step>, CaseError> {
        self.steps.lookup(name)
    }

    /// Create a field output request active from `step`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown step and
    /// [`ConfigurationError::DuplicateName`] for a taken name.
    pub fn create_field_output(
        &mut self,
        name: &str,
        step: &str,
        variables: &[OutputVariable],
    ) -> Result<Key<FieldOutputRequest>, CaseError> {
        self.ensure_editable()?;
        let step = self.steps.lookup(step)?;
        let mut request = FieldOutputRequest::new(name, &step, Vec::new());
        request.set_variables(variables);
        self.field_outputs.insert(request)
    }

    /// Rename a field output request.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `from` does not exist.
    pub fn rename_field_output(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<Key<FieldOutputRequest>, CaseError> {
        self.ensure_editable()?;
        let key = self.field_outputs.rename(from, to)?;
        debug!(from = from, to = to; "Renamed field output request");
        Ok(key)
    }

    /// Replace the variables written by a field output request.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when the request does not exist.
    pub fn set_field_output_variables(
        &mut self,
        request: &Key<FieldOutputRequest>,
        variables: &[OutputVariable],
    ) -> Result<(), CaseError> {
        self.ensure_editable()?;
        self.field_outputs
            .get_mut(request)?
            .set_variables(variables);
        Ok(())
    }

    /// Delete a field output request.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` does not exist.
    pub fn delete_field_output(&mut self, name: &str) -> Result<(), CaseError> {
        self.ensure_editable()?;
        self.field_outputs.remove(name)?;
        debug!(request = name; "Deleted field output request");
        Ok(())
    }

    /// Create a history output request active from `step`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown step and
    /// [`ConfigurationError::DuplicateName`] for a taken name.
    pub fn create_history_output(
        &mut self,
        name: &str,
        step: &str,
        variables: HistoryVariables,
    ) -> Result<Key<HistoryOutputRequest>, CaseError> {
        self.ensure_editable()?;
        let step = self.steps.lookup(step)?;
        self.history_outputs
            .insert(HistoryOutputRequest::new(name, &step, variables))
    }

    /// Rename a history output request.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `from` does not exist.
    pub fn rename_history_output(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<Key<HistoryOutputRequest>, CaseError> {
        self.ensure_editable()?;
        self.history_outputs.rename(from, to)
    }

    /// Delete a history output request.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `name` does not exist.
    pub fn delete_history_output(&mut self, name: &str) -> Result<(), CaseError> {
        self.ensure_editable()?;
        self.history_outputs.remove(name)?;
        debug!(request = name; "Deleted history output request");
        Ok(())
    }

    /// Resolve a probe given in assembly coordinates against `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown instance and
    /// [`CaseError::AmbiguousRegion`] when the probe does not select exactly
    /// one entity.
    pub fn resolve_region(
        &self,
        geometry: &dyn GeometryService,
        instance: &Key<Instance>,
        selector: &RegionSelector,
    ) -> Result<ResolvedRegion, CaseError> {
        let instance = self.assembly.instance(instance)?;
        region::resolve(
            geometry,
            instance.body(),
            selector,
            &instance.placement().inverse(),
        )
    }

    /// Create a load in `step` on the region selected on `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown step or instance,
    /// [`ConfigurationError::LoadInInitialStep`] for a load in `Initial`,
    /// [`ConfigurationError::NonFiniteMagnitude`] for a non-finite value,
    /// [`CaseError::AmbiguousRegion`] for an unresolved probe and
    /// [`ConfigurationError::DuplicateName`] for a taken name.
    pub fn add_load(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        selector: &RegionSelector,
        kind: LoadKind,
    ) -> Result<Key<Load>, CaseError> {
        self.ensure_editable()?;
        let step = self.steps.lookup(step)?;
        if step.name() == INITIAL_STEP {
            return Err(ConfigurationError::LoadInInitialStep {
                load: name.to_owned(),
            }
            .into());
        }
        kind.validate(name)?;
        let region = self.resolve_region(geometry, instance, selector)?;
        let key = self
            .loads
            .insert(Load::new(name, step, instance.clone(), region, kind))?;
        info!(load = name, instance = instance.name(), entity = region.entity; "Applied load");
        Ok(key)
    }

    /// Uniform pressure on the face of `instance` containing `probe`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_load`].
    pub fn apply_pressure(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        probe: Point,
        magnitude: f64,
    ) -> Result<Key<Load>, CaseError> {
        self.add_load(
            geometry,
            name,
            step,
            instance,
            &RegionSelector::face(probe),
            LoadKind::Pressure {
                magnitude,
                amplitude: None,
            },
        )
    }

    /// Concentrated force on the face of `instance` containing `probe`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_load`].
    pub fn apply_concentrated_force(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        probe: Point,
        force: Force,
    ) -> Result<Key<Load>, CaseError> {
        self.add_load(
            geometry,
            name,
            step,
            instance,
            &RegionSelector::face(probe),
            LoadKind::ConcentratedForce { force },
        )
    }

    /// Create a boundary condition in `step` on the region selected on
    /// `instance`. Conditions created in `Initial` hold from the start.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown step or instance,
    /// [`ConfigurationError::NonFiniteMagnitude`] for a non-finite prescribed
    /// value, [`CaseError::AmbiguousRegion`] for an unresolved probe and
    /// [`ConfigurationError::DuplicateName`] for a taken name.
    pub fn add_boundary_condition(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        selector: &RegionSelector,
        kind: BoundaryKind,
    ) -> Result<Key<BoundaryCondition>, CaseError> {
        self.ensure_editable()?;
        let step = self.steps.lookup(step)?;
        kind.validate(name)?;
        let region = self.resolve_region(geometry, instance, selector)?;
        let key = self.boundary_conditions.insert(BoundaryCondition::new(
            name,
            step,
            instance.clone(),
            region,
            kind,
        ))?;
        info!(boundary_condition = name, instance = instance.name(), entity = region.entity; "Applied boundary condition");
        Ok(key)
    }

    /// Fix every degree of freedom on the face containing `probe`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_boundary_condition`].
    pub fn encastre(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        probe: Point,
    ) -> Result<Key<BoundaryCondition>, CaseError> {
        self.add_boundary_condition(
            geometry,
            name,
            step,
            instance,
            &RegionSelector::face(probe),
            BoundaryKind::Encastre,
        )
    }

    /// Fix translations on the face containing `probe`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_boundary_condition`].
    pub fn pinned(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        probe: Point,
    ) -> Result<Key<BoundaryCondition>, CaseError> {
        self.add_boundary_condition(
            geometry,
            name,
            step,
            instance,
            &RegionSelector::face(probe),
            BoundaryKind::Pinned,
        )
    }

    /// Prescribe `motion` on the face containing `probe`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_boundary_condition`].
    pub fn prescribe_displacement(
        &mut self,
        geometry: &dyn GeometryService,
        name: &str,
        step: &str,
        instance: &Key<Instance>,
        probe: Point,
        motion: PrescribedMotion,
    ) -> Result<Key<BoundaryCondition>, CaseError> {
        self.add_boundary_condition(
            geometry,
            name,
            step,
            instance,
            &RegionSelector::face(probe),
            BoundaryKind::Displacement(motion),
        )
    }

    /// Assign `element` to the cells of `part` containing `probes` (part
    /// coordinates). An empty probe list changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for an unknown part and
    /// [`CaseError::AmbiguousRegion`] for an unresolved probe.
    pub fn set_element_type(
        &mut self,
        geometry: &dyn GeometryService,
        part: &Key<Part>,
        probes: &[Point],
        element: ElementType,
    ) -> Result<(), CaseError> {
        self.ensure_editable()?;
        let target = self.parts.get(part)?;
        if probes.is_empty() {
            debug!(part = part.name(); "Element type assignment to an empty region ignored");
            return Ok(());
        }
        let cells = Self::resolve_cells(geometry, target, probes)?;
        let spec = self.parts.get_mut(part)?.mesh_spec_mut();
        for cell in &cells {
            spec.element_types.insert(*cell, element);
        }
        self.discard_instance_meshes(part);
        info!(part = part.name(), element:% = element.code, cells = cells.len(); "Assigned element type");
        Ok(())
    }

    /// Set the global seed of `part`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveSeed`] or
    /// [`ConfigurationError::DeviationFactorOutOfRange`] for values out of
    /// range and [`CaseError::NotFound`] for an unknown part.
    pub fn seed_part(
        &mut self,
        part: &Key<Part>,
        size: f64,
        deviation_factor: f64,
    ) -> Result<(), CaseError> {
        self.ensure_editable()?;
        let seed = Seed::new(size, deviation_factor)?;
        self.parts.get_mut(part)?.mesh_spec_mut().seed = Some(seed);
        self.discard_instance_meshes(part);
        info!(part = part.name(), size = size, deviation_factor = deviation_factor; "Seeded part");
        Ok(())
    }

    /// Mesh `part` and every independent instance of it. Regenerating
    /// replaces the previous mesh.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingSeed`] when the part has no seed
    /// and any error raised by the mesh service.
    pub fn generate_mesh(
        &mut self,
        mesh: &mut dyn MeshService,
        part: &Key<Part>,
    ) -> Result<MeshSummary, CaseError> {
        self.ensure_editable()?;
        let target = self.parts.get(part)?;
        let Some(request) = target.mesh_request() else {
            warn!(part = part.name(); "Mesh generation requested without a seed");
            return Err(ConfigurationError::MissingSeed {
                part: part.name().to_owned(),
            }
            .into());
        };
        let summary = mesh.generate(target.body(), &request)?;
        self.parts.get_mut(part)?.set_mesh(summary.clone());
        info!(
            part = part.name(),
            nodes = summary.node_count,
            elements = summary.element_count;
            "Generated mesh"
        );

        for instance in self.assembly.instances_mut().iter_mut() {
            if instance.part() == part && !instance.is_dependent() {
                let own = mesh.generate(instance.body(), &request)?;
                debug!(instance = instance.name(), elements = own.element_count; "Meshed independent instance");
                instance.set_own_mesh(own);
            }
        }
        Ok(summary)
    }

    /// Prerequisites a job needs that are still missing.
    #[must_use]
    pub fn missing_prerequisites(&self) -> Vec<Prerequisite> {
        let mut missing = Vec::new();
        if self.parts.is_empty() {
            missing.push(Prerequisite::Part);
        }
        if self.parts.is_empty() || self.parts.iter().any(|part| !part.is_fully_assigned()) {
            missing.push(Prerequisite::SectionAssignment);
        }
        if self.assembly.instances().is_empty() {
            missing.push(Prerequisite::Instance);
        }
        if self.steps.analysis_step_count() == 0 {
            missing.push(Prerequisite::Step);
        }
        let part_unmeshed =
            self.parts.is_empty() || self.parts.iter().any(|part| part.mesh().is_none());
        let instance_unmeshed = self
            .assembly
            .instances()
            .iter()
            .any(|instance| !instance.is_dependent() && instance.own_mesh().is_none());
        if part_unmeshed || instance_unmeshed {
            missing.push(Prerequisite::Mesh);
        }
        missing
    }

    /// Serializable image of the case for `job`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::IncompleteModel`] when a prerequisite is missing
    /// and [`CaseError::NotFound`] for a dangling reference.
    pub fn snapshot(&self, job: &str) -> Result<CaseSnapshot, CaseError> {
        let missing = self.missing_prerequisites();
        if !missing.is_empty() {
            return Err(CaseError::IncompleteModel {
                job: job.to_owned(),
                missing,
            });
        }

        let mut bodies = Vec::with_capacity(self.assembly.instances().len());
        for instance in self.assembly.instances().iter() {
            let part = self.parts.get(instance.part())?;
            let mesh = if instance.is_dependent() {
                part.mesh()
            } else {
                instance.own_mesh()
            };
            let mesh = mesh.cloned().ok_or_else(|| CaseError::IncompleteModel {
                job: job.to_owned(),
                missing: vec![Prerequisite::Mesh],
            })?;
            let cells = part
                .cells()
                .iter()
                .map(|cell| self.cell_snapshot(job, part, *cell))
                .collect::<Result<Vec<_>, _>>()?;
            let (translation, rotation) = BodySnapshot::encode_placement(instance.placement());
            bodies.push(BodySnapshot {
                instance: instance.name().to_owned(),
                part: part.name().to_owned(),
                body: instance.body(),
                profile: part.profile().clone(),
                depth: part.depth(),
                translation,
                rotation,
                cells,
                mesh,
            });
        }

        let steps = self
            .steps
            .ordered()
            .into_iter()
            .map(|step| StepSnapshot {
                name: step.name().to_owned(),
                description: match step.procedure() {
                    StepProcedure::Initial => String::new(),
                    StepProcedure::StaticGeneral { description } => description.clone(),
                },
            })
            .collect();

        Ok(CaseSnapshot {
            model: self.name.clone(),
            bodies,
            steps,
            field_outputs: self.field_outputs.iter().cloned().collect(),
            history_outputs: self.history_outputs.iter().cloned().collect(),
            loads: self.loads.iter().cloned().collect(),
            boundary_conditions: self.boundary_conditions.iter().cloned().collect(),
        })
    }

    /// Parts.
    #[must_use]
    pub fn parts(&self) -> &Registry<Part> {
        &self.parts
    }

    /// Materials.
    #[must_use]
    pub fn materials(&self) -> &Registry<Material> {
        &self.materials
    }

    /// Sections.
    #[must_use]
    pub fn sections(&self) -> &Registry<Section> {
        &self.sections
    }

    /// Root assembly.
    #[must_use]
    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// Step chain.
    #[must_use]
    pub fn steps(&self) -> &StepChain {
        &self.steps
    }

    /// Field output requests.
    #[must_use]
    pub fn field_outputs(&self) -> &Registry<FieldOutputRequest> {
        &self.field_outputs
    }

    /// History output requests.
    #[must_use]
    pub fn history_outputs(&self) -> &Registry<HistoryOutputRequest> {
        &self.history_outputs
    }

    /// Loads.
    #[must_use]
    pub fn loads(&self) -> &Registry<Load> {
        &self.loads
    }

    /// Boundary conditions.
    #[must_use]
    pub fn boundary_conditions(&self) -> &Registry<BoundaryCondition> {
        &self.boundary_conditions
    }

    fn resolve_cells(
        geometry: &dyn GeometryService,
        part: &Part,
        probes: &[Point],
    ) -> Result<Vec<CellId>, CaseError> {
        let identity = Isometry3::identity();
        probes
            .iter()
            .map(|probe| {
                region::resolve(geometry, part.body(), &RegionSelector::cell(*probe), &identity)
                    .map(|resolved| CellId(resolved.entity))
            })
            .collect()
    }

    fn discard_instance_meshes(&mut self, part: &Key<Part>) {
        for instance in self.assembly.instances_mut().iter_mut() {
            if instance.part() == part && instance.clear_own_mesh() {
                debug!(instance = instance.name(); "Mesh controls changed, discarding instance mesh");
            }
        }
    }

    fn cell_snapshot(&self, job: &str, part: &Part, cell: CellId) -> Result<CellSnapshot, CaseError> {
        let section_key = part.section_of(cell).ok_or_else(|| CaseError::IncompleteModel {
            job: job.to_owned(),
            missing: vec![Prerequisite::SectionAssignment],
        })?;
        let section = self.sections.get(section_key)?;
        let material = self.materials.get(section.material())?;
        Ok(CellSnapshot {
            cell,
            section: section.name().to_owned(),
            material: material.clone(),
        })
    }
}
