//! Error types produced while defining, running and post-processing a case.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::geometry::Point;
use crate::region::RegionTarget;
use crate::registry::EntityKind;

/// Error returned by every fallible case operation.
///
/// Each variant carries the key (name, probe point, step or job) that failed so
/// callers can report it without extra bookkeeping. The pipeline never rolls
/// back: the first error aborts the run.
///
/// # Examples
///
/// ```
/// use fecase::{CaseDefinition, CaseError, EntityKind};
///
/// let mut case = CaseDefinition::new("Cantilever Beam");
/// let error = case
///     .define_section("Beam Section", "Unobtainium")
///     .expect_err("unknown material is rejected");
/// assert_eq!(error, CaseError::not_found(EntityKind::Material, "Unobtainium"));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum CaseError {
    /// Returned when the setup is malformed or incomplete.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Returned when a name does not resolve in its registry.
    #[error("{kind} `{name}` is not registered")]
    NotFound {
        /// Registry that was searched.
        kind: EntityKind,
        /// Name that failed to resolve.
        name: String,
    },
    /// Returned when a probe point resolves to zero or several entities.
    #[error(
        "probe point {probe} resolves to {matches} {target} entities; \
         supply a more discriminating point"
    )]
    AmbiguousRegion {
        /// Probe point in the coordinates supplied by the caller.
        probe: Point,
        /// Kind of entity that was searched for.
        target: RegionTarget,
        /// Number of entities found at the probe point.
        matches: usize,
    },
    /// Returned when a job is submitted before its prerequisites exist.
    #[error("job `{job}` cannot be submitted, missing: {}", Prerequisite::join(.missing))]
    IncompleteModel {
        /// Job that was submitted.
        job: String,
        /// Every prerequisite that is absent.
        missing: Vec<Prerequisite>,
    },
    /// Returned when the host reports that the analysis did not complete.
    #[error("job `{job}` failed: {diagnostic}")]
    SolverFailure {
        /// Job that failed.
        job: String,
        /// Diagnostic reported by the solver host.
        diagnostic: String,
    },
    /// Returned when waiting for a job exceeds the configured bound.
    #[error("job `{job}` did not finish within {limit:?}")]
    Timeout {
        /// Job that was being waited on.
        job: String,
        /// Bound that expired.
        limit: Duration,
    },
    /// Returned when a wait is cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("wait for job `{job}` was cancelled")]
    Cancelled {
        /// Job that was being waited on.
        job: String,
    },
}

impl CaseError {
    /// Build a [`CaseError::NotFound`] for `name` in the `kind` registry.
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Model artifact that must exist before a job can be submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prerequisite {
    /// A part has been created.
    Part,
    /// Every cell of the part has a section.
    SectionAssignment,
    /// The part has been placed in the assembly.
    Instance,
    /// At least one analysis step follows `Initial`.
    Step,
    /// A mesh has been generated for every meshable body.
    Mesh,
}

impl Prerequisite {
    /// Join a list of prerequisites for display.
    fn join(missing: &[Prerequisite]) -> String {
        missing
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Prerequisite::Part => "part",
            Prerequisite::SectionAssignment => "section assignment",
            Prerequisite::Instance => "part instance",
            Prerequisite::Step => "analysis step",
            Prerequisite::Mesh => "mesh",
        };
        f.write_str(label)
    }
}

/// Detailed reason behind a [`CaseError::Configuration`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// Returned when a profile has fewer than three distinct points.
    #[error("profile needs at least three distinct points (received {points})")]
    TooFewProfilePoints {
        /// Number of distinct points supplied.
        points: usize,
    },
    /// Returned when a profile encloses no area.
    #[error("profile encloses zero area")]
    ZeroAreaProfile,
    /// Returned when two non-adjacent profile edges cross.
    #[error("profile edges {first} and {second} intersect")]
    SelfIntersectingProfile {
        /// Index of the first offending edge.
        first: usize,
        /// Index of the second offending edge.
        second: usize,
    },
    /// Returned when the extrusion depth is zero, negative or not finite.
    #[error("extrusion depth must be positive (received {depth})")]
    NonPositiveDepth {
        /// Rejected depth.
        depth: f64,
    },
    /// Returned when the host builds a solid without volume.
    #[error("host produced a solid with volume {volume} for part `{part}`")]
    EmptySolid {
        /// Part that was extruded.
        part: String,
        /// Volume reported by the host.
        volume: f64,
    },
    /// Returned when a second part is created in a case.
    #[error("model `{model}` already defines part `{existing}`")]
    PartAlreadyDefined {
        /// Model that owns the part.
        model: String,
        /// Name of the part already present.
        existing: String,
    },
    /// Returned when material constants are not physically meaningful.
    #[error("material `{material}` rejected: {source}")]
    InvalidMaterial {
        /// Material being defined.
        material: String,
        /// Constant that was rejected.
        #[source]
        source: MaterialPropertyError,
    },
    /// Returned when a name is registered twice.
    #[error("{kind} `{name}` is already defined")]
    DuplicateName {
        /// Registry that already holds the name.
        kind: EntityKind,
        /// Name that collided.
        name: String,
    },
    /// Returned when a name is empty.
    #[error("{kind} name must not be empty")]
    EmptyName {
        /// Registry the name was meant for.
        kind: EntityKind,
    },
    /// Returned when a step names itself as its predecessor.
    #[error("step `{step}` cannot follow itself")]
    SelfReferentialStep {
        /// Offending step.
        step: String,
    },
    /// Returned when a step placement would close a loop in the chain.
    #[error("placing step `{step}` after `{previous}` would create a cycle")]
    CyclicStep {
        /// Step being placed.
        step: String,
        /// Declared predecessor.
        previous: String,
    },
    /// Returned when a load is created in the `Initial` step.
    #[error("load `{load}` must be created in an analysis step, not `Initial`")]
    LoadInInitialStep {
        /// Offending load.
        load: String,
    },
    /// Returned when an instance is rotated about a zero-length axis.
    #[error("rotation axis for instance `{instance}` has zero length")]
    ZeroRotationAxis {
        /// Instance being rotated.
        instance: String,
    },
    /// Returned when a seed size is not strictly positive.
    #[error("seed size must be positive (received {size})")]
    NonPositiveSeed {
        /// Rejected size.
        size: f64,
    },
    /// Returned when a deviation factor lies outside `(0, 1]`.
    #[error("deviation factor must lie in (0, 1] (received {factor})")]
    DeviationFactorOutOfRange {
        /// Rejected factor.
        factor: f64,
    },
    /// Returned when a mesh is generated before the part is seeded.
    #[error("part `{part}` has no seed; seed the part before generating its mesh")]
    MissingSeed {
        /// Part without a seed.
        part: String,
    },
    /// Returned when the mesh service cannot mesh the geometry.
    #[error("part `{part}` cannot be meshed: {reason}")]
    Unmeshable {
        /// Part that was meshed.
        part: String,
        /// Reason reported by the host.
        reason: String,
    },
    /// Returned when a load or prescribed value is not finite.
    #[error("`{name}` has a non-finite magnitude ({magnitude})")]
    NonFiniteMagnitude {
        /// Load or boundary condition being defined.
        name: String,
        /// Rejected value.
        magnitude: f64,
    },
    /// Returned when a job resource count is zero.
    #[error("job resource `{field}` must be a positive integer")]
    NonPositiveResource {
        /// Name of the rejected resource field.
        field: &'static str,
    },
    /// Returned when a memory budget lies outside its unit's range.
    #[error("memory budget {value} {units} is out of range")]
    MemoryOutOfRange {
        /// Rejected amount.
        value: f64,
        /// Units the amount was given in.
        units: String,
    },
    /// Returned when a job operation does not apply in its current state.
    #[error("job `{job}` cannot {action} while {state}")]
    InvalidJobTransition {
        /// Job being driven.
        job: String,
        /// Operation that was attempted.
        action: &'static str,
        /// State the job was in.
        state: String,
    },
    /// Returned when a job references a different model than the case supplied.
    #[error("job `{job}` references model `{expected}`, not `{actual}`")]
    ModelMismatch {
        /// Job being submitted.
        job: String,
        /// Model the job was created for.
        expected: String,
        /// Model that was supplied.
        actual: String,
    },
    /// Returned when a display setting is changed on an empty viewport.
    #[error("viewport `{viewport}` has no displayed object")]
    NothingDisplayed {
        /// Viewport being configured.
        viewport: String,
    },
    /// Returned when a deformation scale factor is not strictly positive.
    #[error("deformation scale factor must be positive (received {factor})")]
    NonPositiveScaleFactor {
        /// Rejected factor.
        factor: f64,
    },
    /// Returned when a frozen case is edited.
    #[error("case `{model}` is frozen; no further edits are accepted")]
    Frozen {
        /// Model that was frozen.
        model: String,
    },
    /// Returned when a case configuration document cannot be parsed.
    #[error("failed to parse case configuration: {0}")]
    Parse(String),
    /// Returned when a job package cannot be rendered for the solver.
    #[error("failed to serialize job package: {0}")]
    Serialization(String),
    /// Returned when a result artifact exists but cannot be decoded.
    #[error("result artifact `{path}` is unreadable: {reason}")]
    UnreadableArtifact {
        /// Location of the artifact.
        path: String,
        /// Decoder or I/O message.
        reason: String,
    },
}

/// Error returned when material constants are rejected.
///
/// The variants name the offending constant so callers can point users at the
/// exact table entry that needs fixing.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum MaterialPropertyError {
    /// Returned when the mass density is zero, negative or not finite.
    #[error("density must be positive (received {density})")]
    NonPositiveDensity {
        /// Rejected density in kilograms per cubic metre.
        density: f64,
    },
    /// Returned when the Young's modulus is zero, negative or not finite.
    #[error("Young's modulus must be positive (received {youngs_modulus})")]
    NonPositiveYoungsModulus {
        /// Rejected modulus in pascals.
        youngs_modulus: f64,
    },
    /// Returned when the Poisson ratio lies outside the open interval `(-1, 0.5)`.
    #[error("Poisson ratio must lie in (-1, 0.5) (received {poisson_ratio})")]
    PoissonRatioOutOfRange {
        /// Rejected ratio.
        poisson_ratio: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_model_lists_every_missing_prerequisite() {
        let error = CaseError::IncompleteModel {
            job: "CantileverBeamJob".to_owned(),
            missing: vec![Prerequisite::Mesh, Prerequisite::Step],
        };
        assert_eq!(
            error.to_string(),
            "job `CantileverBeamJob` cannot be submitted, missing: mesh, analysis step"
        );
    }

    #[test]
    fn configuration_errors_convert_into_case_errors() {
        let error: CaseError = ConfigurationError::ZeroAreaProfile.into();
        assert!(matches!(
            error,
            CaseError::Configuration(ConfigurationError::ZeroAreaProfile)
        ));
        assert_eq!(
            error.to_string(),
            "configuration error: profile encloses zero area"
        );
    }

    #[test]
    fn ambiguous_region_names_the_probe_point() {
        let error = CaseError::AmbiguousRegion {
            probe: Point::new(0.1, 0.1, 2.5),
            target: RegionTarget::Face,
            matches: 2,
        };
        assert!(error.to_string().contains("(0.1, 0.1, 2.5)"));
        assert!(error.to_string().contains("2 face entities"));
    }
}
