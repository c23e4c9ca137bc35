//! Element types, seeding and mesh bookkeeping.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::services::CellId;

/// Element formulation code understood by the solver.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementCode {
    /// 8-node linear brick, reduced integration.
    C3D8R,
    /// 8-node linear brick.
    C3D8,
    /// 8-node linear brick, incompatible modes.
    C3D8I,
    /// 20-node quadratic brick, reduced integration.
    C3D20R,
    /// 4-node linear tetrahedron.
    C3D4,
    /// 10-node quadratic tetrahedron.
    C3D10,
}

impl ElementCode {
    /// Nodes per element.
    #[must_use]
    pub fn node_count(self) -> usize {
        match self {
            ElementCode::C3D8R | ElementCode::C3D8 | ElementCode::C3D8I => 8,
            ElementCode::C3D20R => 20,
            ElementCode::C3D4 => 4,
            ElementCode::C3D10 => 10,
        }
    }

    /// Whether the element is a tetrahedron rather than a brick.
    #[must_use]
    pub fn is_tetrahedral(self) -> bool {
        matches!(self, ElementCode::C3D4 | ElementCode::C3D10)
    }

    /// Whether the element has mid-side nodes.
    #[must_use]
    pub fn is_quadratic(self) -> bool {
        matches!(self, ElementCode::C3D20R | ElementCode::C3D10)
    }
}

impl fmt::Display for ElementCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Element library the formulation is taken from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementLibrary {
    /// Implicit solver library.
    #[default]
    Standard,
    /// Explicit solver library.
    Explicit,
}

/// Kinematic split used by reduced-integration elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicSplit {
    /// Average strain.
    #[default]
    AverageStrain,
    /// Orthogonal.
    Orthogonal,
    /// Centroid.
    Centroid,
}

/// Hourglass stabilisation method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourglassControl {
    /// Solver default.
    #[default]
    Default,
    /// Enhanced strain.
    Enhanced,
    /// Stiffness based.
    Stiffness,
    /// Viscous.
    Viscous,
}

/// Element distortion control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionControl {
    /// Solver default.
    #[default]
    Default,
    /// Enabled.
    On,
    /// Disabled.
    Off,
}

/// Complete element type specification for a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    /// Element formulation.
    pub code: ElementCode,
    /// Element library.
    #[serde(default)]
    pub library: ElementLibrary,
    /// Kinematic split.
    #[serde(default)]
    pub kinematic_split: KinematicSplit,
    /// Second-order accuracy for reduced-integration elements.
    #[serde(default)]
    pub second_order_accuracy: bool,
    /// Hourglass control.
    #[serde(default)]
    pub hourglass_control: HourglassControl,
    /// Distortion control.
    #[serde(default)]
    pub distortion_control: DistortionControl,
}

impl ElementType {
    /// Element type with default controls for `code`.
    #[must_use]
    pub fn new(code: ElementCode) -> Self {
        Self {
            code,
            library: ElementLibrary::default(),
            kinematic_split: KinematicSplit::default(),
            second_order_accuracy: false,
            hourglass_control: HourglassControl::default(),
            distortion_control: DistortionControl::default(),
        }
    }
}

impl Default for ElementType {
    fn default() -> Self {
        Self::new(ElementCode::C3D8R)
    }
}

/// Global seed applied to a part.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    /// Approximate global element size in metres.
    size: f64,
    /// Maximum chordal deviation as a fraction of the element size.
    deviation_factor: f64,
}

impl Seed {
    /// Create a seed after checking its ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveSeed`] when `size` is not
    /// strictly positive and [`ConfigurationError::DeviationFactorOutOfRange`]
    /// when `deviation_factor` lies outside `(0, 1]`.
    pub fn new(size: f64, deviation_factor: f64) -> Result<Self, ConfigurationError> {
        if !(size > 0.0 && size.is_finite()) {
            return Err(ConfigurationError::NonPositiveSeed { size });
        }
        if !(deviation_factor > 0.0 && deviation_factor <= 1.0) {
            return Err(ConfigurationError::DeviationFactorOutOfRange {
                factor: deviation_factor,
            });
        }
        Ok(Self {
            size,
            deviation_factor,
        })
    }

    /// Approximate global element size in metres.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Maximum chordal deviation factor.
    #[must_use]
    pub fn deviation_factor(&self) -> f64 {
        self.deviation_factor
    }
}

/// Mesh controls held by a part until the mesh is generated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSpec {
    /// Element type per cell; cells not listed use [`ElementType::default`].
    pub element_types: BTreeMap<CellId, ElementType>,
    /// Global seed, if one has been set.
    pub seed: Option<Seed>,
}

/// Everything the mesh service needs to mesh one body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshRequest {
    /// Global seed.
    pub seed: Seed,
    /// Element type per cell.
    pub element_types: BTreeMap<CellId, ElementType>,
}

impl MeshRequest {
    /// Element type used for `cell`.
    #[must_use]
    pub fn element_type(&self, cell: CellId) -> ElementType {
        self.element_types.get(&cell).copied().unwrap_or_default()
    }
}

/// Derived description of a generated mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSummary {
    /// Seed the mesh was generated with.
    pub seed: Seed,
    /// Number of nodes.
    pub node_count: usize,
    /// Number of elements.
    pub element_count: usize,
    /// Element layers along the sweep (extrusion) direction.
    pub sweep_divisions: usize,
    /// Element formulation per cell.
    pub element_types: BTreeMap<CellId, ElementType>,
}
