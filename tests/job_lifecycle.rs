#![warn(clippy::pedantic)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fecase::job::JobPackage;
use fecase::part::Part;
use fecase::pipeline;
use fecase::reference::{JsonResultStore, ReferenceGeometry, ReferenceMesher};
use fecase::{
    point, point2, CancelToken, CaseConfig, CaseDefinition, CaseError, ConfigurationError,
    Displacement, EntityKind, Frame, HostJobStatus, Job, JobOptions, JobState, Key, NodeResult,
    Prerequisite, Profile, ResultDatabase, ResultService, SectionRegion, Services, SolverService,
    WaitOptions,
};

/// Solver that replays a fixed sequence of statuses, then keeps running.
#[derive(Debug, Default)]
struct ScriptedSolver {
    statuses: VecDeque<HostJobStatus>,
    submitted: Vec<String>,
    waits: usize,
}

impl ScriptedSolver {
    fn new(statuses: impl IntoIterator<Item = HostJobStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl SolverService for ScriptedSolver {
    fn submit(&mut self, package: JobPackage) -> Result<(), CaseError> {
        self.submitted.push(package.job);
        Ok(())
    }

    fn wait(&mut self, job: &str, limit: Option<Duration>) -> Result<HostJobStatus, CaseError> {
        if !self.submitted.iter().any(|name| name == job) {
            return Err(CaseError::not_found(EntityKind::Job, job));
        }
        self.waits += 1;
        match self.statuses.pop_front() {
            Some(status) => Ok(status),
            None => {
                thread::sleep(limit.unwrap_or(Duration::from_millis(1)));
                Ok(HostJobStatus::Running)
            }
        }
    }
}

/// Result reader that hands back one canned database.
struct CannedResults(ResultDatabase);

impl ResultService for CannedResults {
    fn open(&mut self, _path: &Path) -> Result<ResultDatabase, CaseError> {
        Ok(self.0.clone())
    }
}

fn canned_result() -> ResultDatabase {
    ResultDatabase {
        job: "CantileverBeamJob".to_owned(),
        model: "Cantilever Beam".to_owned(),
        frames: vec![Frame {
            step: "Apply Load".to_owned(),
            nodes: vec![NodeResult {
                instance: "Beam Instance".to_owned(),
                label: 51,
                position: point(0.2, 0.0, 5.0),
                displacement: Some(Displacement::new(0.0, -1.0e-3, 0.0)),
                reaction: None,
            }],
        }],
    }
}

fn completed(name: &str) -> HostJobStatus {
    HostJobStatus::Completed {
        artifact: PathBuf::from(format!("work/{name}.json")),
    }
}

/// Case with every prerequisite except the mesh.
fn unmeshed_case(geometry: &mut ReferenceGeometry) -> (CaseDefinition, Key<Part>) {
    let mut case = CaseDefinition::new("Cantilever Beam");
    let profile =
        Profile::rectangle(point2(0.1, 0.1), point2(0.3, -0.1)).expect("valid rectangle");
    let part = case
        .create_part(geometry, "Beam", profile, 5.0)
        .expect("part created");
    case.define_material("AISI 1005 Steel", 7872.0, 200.0e9, 0.29)
        .expect("material defined");
    let section = case
        .define_section("Beam Section", "AISI 1005 Steel")
        .expect("section defined");
    case.assign_section(&*geometry, &part, &SectionRegion::AllCells, &section)
        .expect("section assigned");
    case.instantiate(geometry, "Beam Instance", &part, true)
        .expect("instance created");
    case.create_static_step("Apply Load", "Initial", "Load is applied during this step")
        .expect("step created");
    (case, part)
}

fn meshed_case() -> CaseDefinition {
    let mut geometry = ReferenceGeometry::new();
    let mut mesher = ReferenceMesher::new(geometry.bodies());
    let (mut case, part) = unmeshed_case(&mut geometry);
    case.seed_part(&part, 0.1, 0.1).expect("seeded");
    case.generate_mesh(&mut mesher, &part).expect("meshed");
    case
}

#[test]
fn submit_before_meshing_is_incomplete() {
    let mut geometry = ReferenceGeometry::new();
    let (case, _) = unmeshed_case(&mut geometry);
    let mut solver = ScriptedSolver::default();
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");

    assert_eq!(
        job.submit(&case, &mut solver, false),
        Err(CaseError::IncompleteModel {
            job: "CantileverBeamJob".to_owned(),
            missing: vec![Prerequisite::Mesh],
        })
    );
    assert_eq!(job.state(), &JobState::Defined);
    assert!(solver.submitted.is_empty());
}

#[test]
fn submit_after_meshing_moves_to_submitted() {
    let case = meshed_case();
    let mut solver = ScriptedSolver::default();
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");

    job.submit(&case, &mut solver, false).expect("complete model submits");
    assert_eq!(job.state(), &JobState::Submitted);
    assert_eq!(solver.submitted, vec!["CantileverBeamJob".to_owned()]);
    assert!(matches!(
        job.submit(&case, &mut solver, false),
        Err(CaseError::Configuration(
            ConfigurationError::InvalidJobTransition { .. }
        ))
    ));
}

#[test]
fn waiting_on_an_unsubmitted_job_is_rejected() {
    let case = meshed_case();
    let mut solver = ScriptedSolver::default();
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");
    assert!(matches!(
        job.wait_for_completion(&mut solver, &WaitOptions::default()),
        Err(CaseError::Configuration(
            ConfigurationError::InvalidJobTransition { .. }
        ))
    ));
}

#[test]
fn non_convergence_is_a_solver_failure() {
    let case = meshed_case();
    let mut solver = ScriptedSolver::new([
        HostJobStatus::Queued,
        HostJobStatus::Running,
        HostJobStatus::Failed {
            diagnostic: "Too many attempts made for this increment".to_owned(),
        },
    ]);
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");
    job.submit(&case, &mut solver, false).expect("submitted");

    assert_eq!(
        job.wait_for_completion(&mut solver, &WaitOptions::default()),
        Err(CaseError::SolverFailure {
            job: "CantileverBeamJob".to_owned(),
            diagnostic: "Too many attempts made for this increment".to_owned(),
        })
    );
    assert_eq!(
        job.state(),
        &JobState::Failed {
            diagnostic: "Too many attempts made for this increment".to_owned()
        }
    );
}

#[test]
fn completed_jobs_report_the_same_artifact_again() {
    let case = meshed_case();
    let mut solver = ScriptedSolver::new([HostJobStatus::Running, completed("CantileverBeamJob")]);
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");
    job.submit(&case, &mut solver, false).expect("submitted");

    let first = job
        .wait_for_completion(&mut solver, &WaitOptions::default())
        .expect("completes");
    let waits = solver.waits;
    let second = job
        .wait_for_completion(&mut solver, &WaitOptions::default())
        .expect("still complete");
    assert_eq!(first, PathBuf::from("work/CantileverBeamJob.json"));
    assert_eq!(first, second);
    assert_eq!(solver.waits, waits);
}

#[test]
fn endless_run_times_out() {
    let case = meshed_case();
    let mut solver = ScriptedSolver::default();
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");
    job.submit(&case, &mut solver, false).expect("submitted");

    let limit = Duration::from_millis(30);
    assert_eq!(
        job.wait_for_completion(&mut solver, &WaitOptions::with_timeout(limit)),
        Err(CaseError::Timeout {
            job: "CantileverBeamJob".to_owned(),
            limit,
        })
    );
    assert_eq!(job.state(), &JobState::Running);
}

#[test]
fn wait_is_cancelled_from_another_thread() {
    let case = meshed_case();
    let mut solver = ScriptedSolver::default();
    let mut job =
        Job::new("CantileverBeamJob", &case, JobOptions::default()).expect("job created");
    job.submit(&case, &mut solver, false).expect("submitted");

    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.cancel();
    });
    let wait = WaitOptions {
        timeout: None,
        poll_interval: Duration::from_millis(5),
        cancel,
    };
    assert_eq!(
        job.wait_for_completion(&mut solver, &wait),
        Err(CaseError::Cancelled {
            job: "CantileverBeamJob".to_owned()
        })
    );
    canceller.join().expect("canceller finished");
}

#[test]
fn pipeline_runs_against_substitute_services() {
    let config = CaseConfig::default();
    let mut geometry = ReferenceGeometry::new();
    let mut mesher = ReferenceMesher::new(geometry.bodies());
    let mut solver = ScriptedSolver::new([completed("CantileverBeamJob")]);
    let mut results = CannedResults(canned_result());
    let services = Services {
        geometry: &mut geometry,
        mesh: &mut mesher,
        solver: &mut solver,
        results: &mut results,
    };

    let outcome =
        pipeline::run(&config, services, &WaitOptions::default()).expect("pipeline completes");
    assert_eq!(
        outcome.probe_displacement(&config),
        Some(Displacement::new(0.0, -1.0e-3, 0.0))
    );
    assert_eq!(outcome.artifact, PathBuf::from("work/CantileverBeamJob.json"));
    assert!(outcome.case.is_frozen());
}

#[test]
fn missing_artifact_is_not_found() {
    let config = CaseConfig::default();
    let dir = tempfile::tempdir().expect("temporary directory");
    let artifact = dir.path().join("CantileverBeamJob.json");
    let mut geometry = ReferenceGeometry::new();
    let mut mesher = ReferenceMesher::new(geometry.bodies());
    let mut solver = ScriptedSolver::new([HostJobStatus::Completed {
        artifact: artifact.clone(),
    }]);
    let mut results = JsonResultStore;
    let services = Services {
        geometry: &mut geometry,
        mesh: &mut mesher,
        solver: &mut solver,
        results: &mut results,
    };

    assert_eq!(
        pipeline::run(&config, services, &WaitOptions::default()).err(),
        Some(CaseError::not_found(
            EntityKind::ResultArtifact,
            artifact.display().to_string()
        ))
    );
}
