//! In-process host implementing every service interface.
//!
//! Bodies are extruded prisms, meshes are structured sweeps and the solver
//! idealises each instance as a line of beam elements along its extrusion
//! axis, running each job on a worker thread. Results are written as JSON
//! artifacts into a working directory.
//!
//! # Examples
//!
//! ```no_run
//! use fecase::reference::ReferenceHost;
//! use fecase::{pipeline, CaseConfig, WaitOptions};
//!
//! let mut host = ReferenceHost::new("target/fecase");
//! let outcome = pipeline::run(&CaseConfig::default(), host.services(), &WaitOptions::default())
//!     .expect("cantilever runs");
//! println!("{}", outcome.artifact.display());
//! ```

pub mod beam;
pub mod geometry;
pub mod mesher;
pub mod solver;
pub mod store;

use std::path::PathBuf;
use std::time::Duration;

use crate::services::Services;

pub use geometry::ReferenceGeometry;
pub use mesher::ReferenceMesher;
pub use solver::ReferenceSolver;
pub use store::JsonResultStore;

/// Bundle of the reference services sharing one working directory.
#[derive(Debug)]
pub struct ReferenceHost {
    geometry: ReferenceGeometry,
    mesher: ReferenceMesher,
    solver: ReferenceSolver,
    results: JsonResultStore,
}

impl ReferenceHost {
    /// Host writing packages and artifacts into `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let geometry = ReferenceGeometry::new();
        let mesher = ReferenceMesher::new(geometry.bodies());
        Self {
            geometry,
            mesher,
            solver: ReferenceSolver::new(work_dir),
            results: JsonResultStore,
        }
    }

    /// Delay every solver run by `latency`.
    #[must_use]
    pub fn with_solver_latency(mut self, latency: Duration) -> Self {
        self.solver = self.solver.with_latency(latency);
        self
    }

    /// Refuse meshes with more than `limit` elements.
    #[must_use]
    pub fn with_element_limit(mut self, limit: usize) -> Self {
        self.mesher = self.mesher.with_element_limit(limit);
        self
    }

    /// Borrow the services for one pipeline run.
    pub fn services(&mut self) -> Services<'_> {
        Services {
            geometry: &mut self.geometry,
            mesh: &mut self.mesher,
            solver: &mut self.solver,
            results: &mut self.results,
        }
    }
}
