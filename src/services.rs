//! Capability interfaces for the host that owns geometry, meshing, solving
//! and result storage.
//!
//! The case builder never talks to a global host object. Each operation takes
//! the service it needs, so the orchestration logic runs unchanged against the
//! bundled [`reference`](crate::reference) host or against test doubles.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::CaseError;
use crate::geometry::{Point, Profile};
use crate::job::JobPackage;
use crate::mesh::{MeshRequest, MeshSummary};
use crate::results::ResultDatabase;

/// Opaque handle to a solid body owned by the geometry service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// Host identifier of a face on a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceId(pub usize);

/// Host identifier of a volumetric cell on a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub usize);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face {}", self.0)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {}", self.0)
    }
}

/// Geometry kernel: builds solids and answers spatial queries on them.
///
/// Probe points are always expressed in the body's own coordinates.
pub trait GeometryService {
    /// Extrude `profile` by `depth` along the sketch normal into a deformable solid.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the host rejects the geometry.
    fn extrude(&mut self, name: &str, profile: &Profile, depth: f64)
        -> Result<BodyHandle, CaseError>;

    /// Create an independent copy of `body`.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is unknown to the host.
    fn copy_body(&mut self, body: BodyHandle) -> Result<BodyHandle, CaseError>;

    /// Volume of `body` in cubic metres.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is unknown to the host.
    fn volume(&self, body: BodyHandle) -> Result<f64, CaseError>;

    /// Every cell of `body`.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is unknown to the host.
    fn cells(&self, body: BodyHandle) -> Result<Vec<CellId>, CaseError>;

    /// Faces of `body` that contain or are incident to `probe`.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is unknown to the host.
    fn faces_at(&self, body: BodyHandle, probe: Point) -> Result<Vec<FaceId>, CaseError>;

    /// Cells of `body` that contain `probe`.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is unknown to the host.
    fn cells_at(&self, body: BodyHandle, probe: Point) -> Result<Vec<CellId>, CaseError>;
}

/// Mesh generator.
pub trait MeshService {
    /// Mesh `body`, replacing any mesh the host already holds for it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unmeshable`](crate::ConfigurationError::Unmeshable)
    /// when the geometry cannot be meshed at the requested density.
    fn generate(&mut self, body: BodyHandle, request: &MeshRequest)
        -> Result<MeshSummary, CaseError>;
}

/// Status of a job as reported by the solver host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostJobStatus {
    /// Accepted but not yet started.
    Queued,
    /// Solver process is running.
    Running,
    /// Run finished and wrote its result artifact.
    Completed {
        /// Location of the result artifact.
        artifact: PathBuf,
    },
    /// Run terminated without a usable result.
    Failed {
        /// Diagnostic reported by the solver.
        diagnostic: String,
    },
}

impl HostJobStatus {
    /// Whether the status will not change any more.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Finite-element solver.
pub trait SolverService {
    /// Start a run for `package`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host refuses the package.
    fn submit(&mut self, package: JobPackage) -> Result<(), CaseError>;

    /// Block until the run for `job` reaches a terminal status or `limit`
    /// elapses, then report its status. `None` waits without bound.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] when `job` was never submitted.
    fn wait(&mut self, job: &str, limit: Option<Duration>) -> Result<HostJobStatus, CaseError>;
}

/// Result database reader.
pub trait ResultService {
    /// Open the result artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::NotFound`] for a missing artifact.
    fn open(&mut self, path: &Path) -> Result<ResultDatabase, CaseError>;
}

/// Bundle of host services handed to the pipeline.
pub struct Services<'a> {
    /// Geometry kernel.
    pub geometry: &'a mut dyn GeometryService,
    /// Mesh generator.
    pub mesh: &'a mut dyn MeshService,
    /// Solver.
    pub solver: &'a mut dyn SolverService,
    /// Result reader.
    pub results: &'a mut dyn ResultService,
}
