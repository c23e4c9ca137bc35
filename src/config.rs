//! Declarative case description loaded from TOML.
//!
//! [`CaseConfig::default`] describes the cantilever beam: a 0.2 m square steel
//! section, 5 m long, clamped at one end and loaded by a uniform pressure on
//! its top face.

use serde::{Deserialize, Serialize};

use crate::errors::{CaseError, ConfigurationError};
use crate::geometry::{point, point2, Force, Point, Point2, Profile};
use crate::job::{ExplicitPrecision, JobOptions, JobType, OutputPrecision};
use crate::loads::{BoundaryKind, LoadKind, PrescribedMotion};
use crate::mesh::{ElementCode, ElementType};
use crate::outputs::{DEFAULT_FIELD_OUTPUT, DEFAULT_HISTORY_OUTPUT};
use crate::post::PlotState;

/// Complete description of one analysis case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseConfig {
    /// Model naming.
    pub model: ModelConfig,
    /// Part geometry.
    pub part: PartConfig,
    /// Material constants.
    pub material: MaterialConfig,
    /// Section bound to the whole solid.
    pub section: SectionConfig,
    /// Assembly instance.
    pub instance: InstanceConfig,
    /// Analysis steps after `Initial`, in definition order.
    pub steps: Vec<StepConfig>,
    /// Output request edits.
    pub outputs: OutputsConfig,
    /// Applied loads.
    pub loads: Vec<LoadConfig>,
    /// Boundary conditions.
    pub boundary_conditions: Vec<BoundaryConfig>,
    /// Mesh controls.
    pub mesh: MeshConfig,
    /// Solver job.
    pub job: JobConfig,
    /// Post-processing.
    pub post: PostConfig,
}

impl CaseConfig {
    /// Parse a TOML document. Missing sections keep their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] when the document is malformed.
    ///
    /// # Examples
    /// ```
    /// use fecase::CaseConfig;
    ///
    /// let config = CaseConfig::from_toml_str(
    ///     r#"
    ///     [material]
    ///     name = "Aluminium"
    ///     density = 2700.0
    ///     youngs_modulus = 69.0e9
    ///     poisson_ratio = 0.33
    ///     "#,
    /// )
    /// .expect("valid configuration");
    /// assert_eq!(config.material.name, "Aluminium");
    /// assert_eq!(config.part.depth, 5.0);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, CaseError> {
        toml::from_str(text)
            .map_err(|error| CaseError::from(ConfigurationError::Parse(error.to_string())))
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Serialization`] when rendering fails.
    pub fn to_toml_string(&self) -> Result<String, CaseError> {
        toml::to_string_pretty(self)
            .map_err(|error| CaseError::from(ConfigurationError::Serialization(error.to_string())))
    }
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            part: PartConfig::default(),
            material: MaterialConfig::default(),
            section: SectionConfig::default(),
            instance: InstanceConfig::default(),
            steps: vec![StepConfig {
                name: "Apply Load".to_owned(),
                previous: "Initial".to_owned(),
                description: "Load is applied during this step".to_owned(),
            }],
            outputs: OutputsConfig::default(),
            loads: vec![LoadConfig {
                name: "Uniform Applied Pressure".to_owned(),
                step: "Apply Load".to_owned(),
                probe: point(0.2, 0.1, 2.5),
                action: LoadSpec::Pressure {
                    magnitude: 10.0,
                    amplitude: None,
                },
            }],
            boundary_conditions: vec![BoundaryConfig {
                name: "Encaster one end".to_owned(),
                step: "Initial".to_owned(),
                probe: point(0.2, 0.0, 0.0),
                constraint: BoundarySpec::Encastre,
            }],
            mesh: MeshConfig::default(),
            job: JobConfig::default(),
            post: PostConfig::default(),
        }
    }
}

/// Model naming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Name the model is created under.
    pub initial_name: String,
    /// Name the model is renamed to before anything is defined.
    pub name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            initial_name: "Model-1".to_owned(),
            name: "Cantilever Beam".to_owned(),
        }
    }
}

/// Extrusion cross-section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileConfig {
    /// Axis-aligned rectangle from two opposite corners.
    Rectangle {
        /// First corner.
        first: Point2,
        /// Opposite corner.
        second: Point2,
    },
    /// Closed polygon.
    Polygon {
        /// Vertices in order.
        points: Vec<Point2>,
    },
}

impl ProfileConfig {
    /// Validate and build the profile.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigurationError`] raised by [`Profile::polygon`].
    pub fn build(&self) -> Result<Profile, ConfigurationError> {
        match self {
            ProfileConfig::Rectangle { first, second } => Profile::rectangle(*first, *second),
            ProfileConfig::Polygon { points } => Profile::polygon(points.clone()),
        }
    }
}

/// Part geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartConfig {
    /// Part name.
    pub name: String,
    /// Extrusion depth in metres.
    pub depth: f64,
    /// Cross-section.
    pub profile: ProfileConfig,
}

impl Default for PartConfig {
    fn default() -> Self {
        Self {
            name: "Beam".to_owned(),
            depth: 5.0,
            profile: ProfileConfig::Rectangle {
                first: point2(0.1, 0.1),
                second: point2(0.3, -0.1),
            },
        }
    }
}

/// Material constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Material name.
    pub name: String,
    /// Density in kilograms per cubic metre.
    pub density: f64,
    /// Young's modulus in pascals.
    pub youngs_modulus: f64,
    /// Poisson ratio.
    pub poisson_ratio: f64,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            name: "AISI 1005 Steel".to_owned(),
            density: 7872.0,
            youngs_modulus: 200.0e9,
            poisson_ratio: 0.29,
        }
    }
}

/// Homogeneous solid section assigned to every cell of the part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Section name.
    pub name: String,
    /// Material the section refers to.
    pub material: String,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            name: "Beam Section".to_owned(),
            material: "AISI 1005 Steel".to_owned(),
        }
    }
}

/// Rotation about an axis through a point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Point on the axis.
    pub point: Point,
    /// Axis direction.
    pub axis: [f64; 3],
    /// Angle in degrees.
    pub angle: f64,
}

/// Assembly instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Instance name.
    pub name: String,
    /// Whether the instance shares the part's mesh.
    pub dependent: bool,
    /// Translation applied after creation.
    pub translate: Option<[f64; 3]>,
    /// Rotation applied after the translation.
    pub rotate: Option<RotationConfig>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: "Beam Instance".to_owned(),
            dependent: true,
            translate: None,
            rotate: None,
        }
    }
}

/// Static analysis step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name.
    pub name: String,
    /// Immediate predecessor.
    pub previous: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Field output request edit: renames an existing request when `rename_from`
/// is given, otherwise creates a new one in `step`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldOutputConfig {
    /// Request name after the edit.
    pub name: String,
    /// Existing request to rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_from: Option<String>,
    /// Step a new request is created in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Variable codes, e.g. `U` or `RF`.
    pub variables: Vec<String>,
}

/// History output request creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryOutputConfig {
    /// Request name.
    pub name: String,
    /// Step the request is created in.
    pub step: String,
    /// Variable codes; `None` selects the preselected set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
}

/// Output request edits applied after the steps exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    /// History requests deleted after the new ones are created.
    pub delete_history: Vec<String>,
    /// Field request edits.
    pub field: Vec<FieldOutputConfig>,
    /// History requests to create.
    pub history: Vec<HistoryOutputConfig>,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            delete_history: vec![DEFAULT_HISTORY_OUTPUT.to_owned()],
            field: vec![FieldOutputConfig {
                name: "Selected Field Outputs".to_owned(),
                rename_from: Some(DEFAULT_FIELD_OUTPUT.to_owned()),
                step: None,
                variables: ["S", "E", "PEMAG", "U", "RF", "CF"]
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            }],
            history: vec![HistoryOutputConfig {
                name: "Default History Outputs".to_owned(),
                step: "Apply Load".to_owned(),
                variables: None,
            }],
        }
    }
}

/// Physical action of a configured load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadSpec {
    /// Uniform pressure in pascals.
    Pressure {
        /// Pressure magnitude.
        magnitude: f64,
        /// Amplitude curve name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amplitude: Option<String>,
    },
    /// Concentrated force in newtons.
    ConcentratedForce {
        /// Force in assembly coordinates.
        force: Force,
    },
}

impl From<&LoadSpec> for LoadKind {
    fn from(spec: &LoadSpec) -> Self {
        match spec {
            LoadSpec::Pressure {
                magnitude,
                amplitude,
            } => LoadKind::Pressure {
                magnitude: *magnitude,
                amplitude: amplitude.clone(),
            },
            LoadSpec::ConcentratedForce { force } => LoadKind::ConcentratedForce { force: *force },
        }
    }
}

/// Load on the face of the instance containing `probe`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Load name.
    pub name: String,
    /// Step the load is created in.
    pub step: String,
    /// Face probe in assembly coordinates.
    pub probe: Point,
    /// Physical action.
    #[serde(flatten)]
    pub action: LoadSpec,
}

/// Kinematic constraint of a configured boundary condition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundarySpec {
    /// Everything fixed.
    Encastre,
    /// Translations fixed.
    Pinned,
    /// Selected components prescribed; omitted components stay free.
    Displacement {
        /// Translation along X.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        u1: Option<f64>,
        /// Translation along Y.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        u2: Option<f64>,
        /// Translation along Z.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        u3: Option<f64>,
        /// Rotation about X.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ur1: Option<f64>,
        /// Rotation about Y.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ur2: Option<f64>,
        /// Rotation about Z.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ur3: Option<f64>,
    },
}

impl From<BoundarySpec> for BoundaryKind {
    fn from(spec: BoundarySpec) -> Self {
        match spec {
            BoundarySpec::Encastre => BoundaryKind::Encastre,
            BoundarySpec::Pinned => BoundaryKind::Pinned,
            BoundarySpec::Displacement {
                u1,
                u2,
                u3,
                ur1,
                ur2,
                ur3,
            } => BoundaryKind::Displacement(PrescribedMotion {
                u: [u1, u2, u3],
                ur: [ur1, ur2, ur3],
            }),
        }
    }
}

/// Boundary condition on the face of the instance containing `probe`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Condition name.
    pub name: String,
    /// Step the condition is created in; `Initial` holds from the start.
    pub step: String,
    /// Face probe in assembly coordinates.
    pub probe: Point,
    /// Constraint.
    #[serde(flatten)]
    pub constraint: BoundarySpec,
}

/// Mesh controls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Global seed size in metres.
    pub seed_size: f64,
    /// Chordal deviation factor.
    pub deviation_factor: f64,
    /// Cell probes, in part coordinates, receiving `element_type`.
    pub element_probes: Vec<Point>,
    /// Element type for the probed cells.
    pub element_type: ElementType,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            seed_size: 0.1,
            deviation_factor: 0.1,
            element_probes: vec![point(0.2, 0.0, 2.5)],
            element_type: ElementType::new(ElementCode::C3D8R),
        }
    }
}

/// Solver job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Job name.
    pub name: String,
    /// Run the solver's extra consistency checks.
    pub consistency_checking: bool,
    /// Job configuration.
    pub options: JobOptions,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: "CantileverBeamJob".to_owned(),
            consistency_checking: false,
            options: JobOptions {
                job_type: JobType::Analysis,
                description: "Job simulates a loaded cantilever beam".to_owned(),
                explicit_precision: ExplicitPrecision::Single,
                nodal_output_precision: OutputPrecision::Single,
                ..JobOptions::default()
            },
        }
    }
}

/// Post-processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// Viewport name.
    pub viewport: String,
    /// Plot states selected once the result is displayed.
    pub plot_states: Vec<PlotState>,
    /// Deformation scale factor; viewport default when `None`.
    pub deformation_scale: Option<f64>,
    /// Point, in assembly coordinates, whose displacement is reported.
    pub report_probe: Point,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            viewport: "Beam Results Viewport".to_owned(),
            plot_states: vec![PlotState::Deformed],
            deformation_scale: None,
            report_probe: point(0.2, 0.0, 5.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_the_cantilever() {
        let config = CaseConfig::from_toml_str("").expect("empty document parses");
        assert_eq!(config, CaseConfig::default());
    }

    #[test]
    fn rendered_default_parses_back() {
        let text = CaseConfig::default()
            .to_toml_string()
            .expect("default renders");
        assert!(text.contains("Cantilever Beam"));
        let parsed = CaseConfig::from_toml_str(&text).expect("rendered document parses");
        assert_eq!(parsed, CaseConfig::default());
    }

    #[test]
    fn tagged_sections_select_variants() {
        let config = CaseConfig::from_toml_str(
            r#"
            [part]
            name = "Wedge"
            depth = 2.0
            profile = { kind = "polygon", points = [
                { x = 0.0, y = 0.0 },
                { x = 1.0, y = 0.0 },
                { x = 0.0, y = 1.0 },
            ] }

            [[loads]]
            name = "Tip Force"
            step = "Apply Load"
            probe = { x = 0.2, y = 0.2, z = 2.0 }
            kind = "concentrated_force"
            force = { x = 0.0, y = -100.0, z = 0.0 }

            [[boundary_conditions]]
            name = "Roller"
            step = "Initial"
            probe = { x = 0.2, y = 0.2, z = 0.0 }
            kind = "displacement"
            u3 = 0.0
            "#,
        )
        .expect("valid configuration");

        let profile = config.part.profile.build().expect("valid triangle");
        assert_eq!(profile.edge_count(), 3);
        assert_eq!(
            LoadKind::from(&config.loads[0].action),
            LoadKind::ConcentratedForce {
                force: Force::new(0.0, -100.0, 0.0)
            }
        );
        assert_eq!(
            BoundaryKind::from(config.boundary_conditions[0].constraint).components(),
            [None, None, Some(0.0), None, None, None]
        );
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        let error = CaseConfig::from_toml_str("[part]\ndepth = \"deep\"")
            .expect_err("string depth rejected");
        assert!(matches!(
            error,
            CaseError::Configuration(ConfigurationError::Parse(_))
        ));
    }
}
