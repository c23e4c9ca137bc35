//! Extruded solid parts and their per-cell attributes.

use std::collections::BTreeMap;

use log::debug;

use crate::geometry::Profile;
use crate::materials::Section;
use crate::mesh::{MeshRequest, MeshSpec, MeshSummary};
use crate::registry::{EntityKind, Key, Named};
use crate::services::{BodyHandle, CellId};

/// Three dimensional deformable solid extruded from a profile.
#[derive(Clone, Debug)]
pub struct Part {
    /// Registry key.
    name: String,
    /// Extrusion cross-section.
    profile: Profile,
    /// Extrusion depth along the sketch normal.
    depth: f64,
    /// Host body.
    body: BodyHandle,
    /// Volume reported by the host.
    volume: f64,
    /// Cells reported by the host.
    cells: Vec<CellId>,
    /// Section assigned to each cell.
    sections: BTreeMap<CellId, Key<Section>>,
    /// Mesh controls.
    mesh_spec: MeshSpec,
    /// Generated mesh, if current.
    mesh: Option<MeshSummary>,
}

impl Part {
    /// Wrap a body the geometry service has already built.
    pub(crate) fn new(
        name: String,
        profile: Profile,
        depth: f64,
        body: BodyHandle,
        volume: f64,
        cells: Vec<CellId>,
    ) -> Self {
        Self {
            name,
            profile,
            depth,
            body,
            volume,
            cells,
            sections: BTreeMap::new(),
            mesh_spec: MeshSpec::default(),
            mesh: None,
        }
    }

    /// Extrusion cross-section.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Extrusion depth in metres.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Host body.
    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Volume in cubic metres.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Cells of the solid.
    #[must_use]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Section assigned to `cell`.
    #[must_use]
    pub fn section_of(&self, cell: CellId) -> Option<&Key<Section>> {
        self.sections.get(&cell)
    }

    /// Whether every cell has a section.
    #[must_use]
    pub fn is_fully_assigned(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| self.sections.contains_key(c))
    }

    /// Mesh controls.
    #[must_use]
    pub fn mesh_spec(&self) -> &MeshSpec {
        &self.mesh_spec
    }

    /// Generated mesh, if current.
    #[must_use]
    pub fn mesh(&self) -> Option<&MeshSummary> {
        self.mesh.as_ref()
    }

    /// Assign `section` to `cells`; later assignments replace earlier ones.
    pub(crate) fn assign_section(&mut self, cells: &[CellId], section: &Key<Section>) {
        for cell in cells {
            if let Some(previous) = self.sections.insert(*cell, section.clone()) {
                if &previous != section {
                    debug!(
                        part = self.name,
                        cell = cell.0,
                        previous = previous.name(),
                        section = section.name();
                        "Replacing section assignment"
                    );
                }
            }
        }
    }

    /// Mutable mesh controls. Editing them discards the current mesh.
    pub(crate) fn mesh_spec_mut(&mut self) -> &mut MeshSpec {
        if self.mesh.take().is_some() {
            debug!(part = self.name; "Mesh controls changed, discarding mesh");
        }
        &mut self.mesh_spec
    }

    /// Build the request for the mesh service, if a seed is set.
    pub(crate) fn mesh_request(&self) -> Option<MeshRequest> {
        self.mesh_spec.seed.map(|seed| MeshRequest {
            seed,
            element_types: self.mesh_spec.element_types.clone(),
        })
    }

    /// Store a freshly generated mesh.
    pub(crate) fn set_mesh(&mut self, mesh: MeshSummary) {
        if self.mesh.replace(mesh).is_some() {
            debug!(part = self.name; "Replaced existing mesh");
        }
    }
}

impl Named for Part {
    const KIND: EntityKind = EntityKind::Part;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}
