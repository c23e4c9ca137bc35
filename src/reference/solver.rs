//! Background solver: each submitted job runs on its own worker thread and
//! reports its status over a channel.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use nalgebra::Vector3;
use thiserror::Error;

use crate::assembly::Instance;
use crate::errors::{CaseError, ConfigurationError};
use crate::geometry::{Displacement, Force, Point};
use crate::job::{JobPackage, JobType};
use crate::loads::{BoundaryCondition, BoundaryKind, Load, LoadKind};
use crate::outputs::OutputVariable;
use crate::region::{RegionTarget, ResolvedRegion};
use crate::registry::{EntityKind, Key, Named};
use crate::results::{Frame, NodeResult, ResultDatabase};
use crate::services::{HostJobStatus, SolverService};
use crate::snapshot::{BodySnapshot, CaseSnapshot};
use crate::steps::Step;

use super::beam::{BeamError, BeamModel};

/// Reason a run ends without a result.
#[derive(Debug, Error)]
enum RunError {
    /// The beam system could not be solved.
    #[error(transparent)]
    Beam(#[from] BeamError),
    /// A body has no section and therefore no material.
    #[error("instance `{instance}` has no section assignment")]
    NoSection {
        /// Offending instance.
        instance: String,
    },
    /// A load or boundary condition names an instance missing from the package.
    #[error("`{name}` references unknown instance `{instance}`")]
    UnknownInstance {
        /// Load or boundary condition.
        name: String,
        /// Instance it references.
        instance: String,
    },
    /// A load or boundary condition names a step missing from the package.
    #[error("`{name}` references unknown step `{step}`")]
    UnknownStep {
        /// Load or boundary condition.
        name: String,
        /// Step it references.
        step: String,
    },
    /// A region does not exist on its body.
    #[error("`{name}` references {target} {entity}, which instance `{instance}` does not have")]
    InvalidRegion {
        /// Load or boundary condition.
        name: String,
        /// Instance the region belongs to.
        instance: String,
        /// Kind of entity.
        target: RegionTarget,
        /// Host identifier.
        entity: usize,
    },
    /// The artifact could not be written.
    #[error("cannot write result artifact {path}: {source}")]
    Artifact {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O or encoding error.
        source: io::Error,
    },
}

/// One submitted job.
#[derive(Debug)]
struct Run {
    /// Status updates from the worker.
    updates: Receiver<HostJobStatus>,
    /// Most recent status.
    status: HostJobStatus,
}

/// Solver host running jobs on worker threads.
#[derive(Debug)]
pub struct ReferenceSolver {
    /// Directory that receives packages and result artifacts.
    work_dir: PathBuf,
    /// Artificial delay before each run starts.
    latency: Duration,
    /// Runs by job name.
    runs: BTreeMap<String, Run>,
}

impl ReferenceSolver {
    /// Solver writing into `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            latency: Duration::ZERO,
            runs: BTreeMap::new(),
        }
    }

    /// Delay every run by `latency` before it starts solving.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Directory that receives packages and result artifacts.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl SolverService for ReferenceSolver {
    fn submit(&mut self, package: JobPackage) -> Result<(), CaseError> {
        let job = package.job.clone();
        if let Some(run) = self.runs.get(&job) {
            if !run.status.is_terminal() {
                return Err(ConfigurationError::InvalidJobTransition {
                    job,
                    action: "be resubmitted",
                    state: "running".to_owned(),
                }
                .into());
            }
        }

        let failure = |error: io::Error| CaseError::SolverFailure {
            job: job.clone(),
            diagnostic: error.to_string(),
        };
        fs::create_dir_all(&self.work_dir).map_err(failure)?;
        let package_path = self.work_dir.join(format!("{job}.package.json"));
        fs::write(&package_path, package.to_json()?).map_err(failure)?;

        let (sender, updates) = mpsc::channel();
        let work_dir = self.work_dir.clone();
        let latency = self.latency;
        thread::Builder::new()
            .name(format!("solver-{job}"))
            .spawn(move || {
                let _ = sender.send(HostJobStatus::Running);
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                let _ = sender.send(execute(&package, &work_dir));
            })
            .map_err(failure)?;

        info!(job = job, package:? = package_path; "Job submitted");
        self.runs.insert(
            job,
            Run {
                updates,
                status: HostJobStatus::Queued,
            },
        );
        Ok(())
    }

    fn wait(&mut self, job: &str, limit: Option<Duration>) -> Result<HostJobStatus, CaseError> {
        let run = self
            .runs
            .get_mut(job)
            .ok_or_else(|| CaseError::not_found(EntityKind::Job, job))?;
        let deadline = limit.map(|limit| Instant::now() + limit);

        while !run.status.is_terminal() {
            let update = match deadline {
                Some(deadline) => run
                    .updates
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => run
                    .updates
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match update {
                Ok(status) => {
                    debug!(job = job, status:? = status; "Solver status");
                    run.status = status;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    run.status = HostJobStatus::Failed {
                        diagnostic: "solver worker exited without reporting".to_owned(),
                    };
                }
            }
        }
        Ok(run.status.clone())
    }
}

/// Run `package` to completion and report the terminal status.
fn execute(package: &JobPackage, work_dir: &Path) -> HostJobStatus {
    info!(job = package.job, job_type:? = package.options.job_type; "Analysis started");
    let outcome = analyse(package).and_then(|result| write_artifact(&result, work_dir));
    match outcome {
        Ok(artifact) => {
            info!(job = package.job, artifact:? = artifact; "Analysis completed");
            HostJobStatus::Completed { artifact }
        }
        Err(error) => {
            warn!(job = package.job, error:% = error; "Analysis failed");
            HostJobStatus::Failed {
                diagnostic: error.to_string(),
            }
        }
    }
}

fn write_artifact(result: &ResultDatabase, work_dir: &Path) -> Result<PathBuf, RunError> {
    let path = work_dir.join(format!("{}.json", result.job));
    serde_json::to_string_pretty(result)
        .map_err(io::Error::from)
        .and_then(|text| fs::write(&path, text))
        .map_err(|source| RunError::Artifact {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Solve every analysis step of `package`.
fn analyse(package: &JobPackage) -> Result<ResultDatabase, RunError> {
    let case = &package.case;
    let strict = package.consistency_checking || package.options.job_type == JobType::DataCheck;
    let loads = checked(
        case,
        &case.loads,
        strict,
        Load::instance,
        Load::step,
        Load::region,
    )?;
    let constraints = checked(
        case,
        &case.boundary_conditions,
        strict,
        BoundaryCondition::instance,
        BoundaryCondition::step,
        BoundaryCondition::region,
    )?;

    let mut frames = Vec::new();
    if package.options.job_type == JobType::Analysis {
        for (index, step) in case.steps.iter().enumerate().skip(1) {
            let write_u = case.requests_field(OutputVariable::U, index);
            let write_rf = case.requests_field(OutputVariable::RF, index);
            let mut nodes = Vec::new();
            for body in &case.bodies {
                let active_loads = loads
                    .iter()
                    .filter(|(load, step_index)| {
                        *step_index <= index && load.instance().name() == body.instance
                    })
                    .map(|(load, _)| *load);
                let active_constraints = constraints
                    .iter()
                    .filter(|(bc, step_index)| {
                        *step_index <= index && bc.instance().name() == body.instance
                    })
                    .map(|(bc, _)| *bc);
                nodes.extend(solve_body(
                    body,
                    active_loads,
                    active_constraints,
                    write_u,
                    write_rf,
                )?);
            }
            debug!(job = package.job, step = step.name, nodes = nodes.len(); "Frame solved");
            frames.push(Frame {
                step: step.name.clone(),
                nodes,
            });
        }
    }

    Ok(ResultDatabase {
        job: package.job.clone(),
        model: package.model.clone(),
        frames,
    })
}

/// Pair each entry with its step position, dropping or rejecting entries whose
/// references do not resolve in `case`.
fn checked<'a, T: Named>(
    case: &CaseSnapshot,
    entries: &'a [T],
    strict: bool,
    instance_of: impl Fn(&T) -> &Key<Instance>,
    step_of: impl Fn(&T) -> &Key<Step>,
    region_of: impl Fn(&T) -> &ResolvedRegion,
) -> Result<Vec<(&'a T, usize)>, RunError> {
    let mut accepted = Vec::with_capacity(entries.len());
    for entry in entries {
        let instance = instance_of(entry).name();
        let verdict = match (case.body(instance), case.step_index(step_of(entry).name())) {
            (None, _) => Err(RunError::UnknownInstance {
                name: entry.name().to_owned(),
                instance: instance.to_owned(),
            }),
            (_, None) => Err(RunError::UnknownStep {
                name: entry.name().to_owned(),
                step: step_of(entry).name().to_owned(),
            }),
            (Some(body), Some(step_index)) => {
                let region = region_of(entry);
                if region_exists(body, region) {
                    Ok(step_index)
                } else {
                    Err(RunError::InvalidRegion {
                        name: entry.name().to_owned(),
                        instance: instance.to_owned(),
                        target: region.target,
                        entity: region.entity,
                    })
                }
            }
        };
        match verdict {
            Ok(step_index) => accepted.push((entry, step_index)),
            Err(error) if strict => return Err(error),
            Err(error) => warn!(error:% = error; "Skipping unresolved entry"),
        }
    }
    Ok(accepted)
}

fn region_exists(body: &BodySnapshot, region: &ResolvedRegion) -> bool {
    if region.body != body.body {
        return false;
    }
    match region.target {
        RegionTarget::Face => region.entity < 2 + body.profile.edge_count(),
        RegionTarget::Cell => body.cells.iter().any(|cell| cell.cell.0 == region.entity),
    }
}

/// Build, load, constrain and solve the beam model of one body.
fn solve_body<'a>(
    body: &BodySnapshot,
    loads: impl Iterator<Item = &'a Load>,
    constraints: impl Iterator<Item = &'a BoundaryCondition>,
    write_u: bool,
    write_rf: bool,
) -> Result<Vec<NodeResult>, RunError> {
    let material = body
        .cells
        .first()
        .map(|cell| cell.material.elastic())
        .ok_or_else(|| RunError::NoSection {
            instance: body.instance.clone(),
        })?;
    let mut model = BeamModel::new(
        body.instance.as_str(),
        &body.profile,
        body.depth,
        material,
        body.mesh.sweep_divisions,
    );
    let placement = body.placement();
    let to_local = placement.rotation.inverse();

    for load in loads {
        match load.kind() {
            LoadKind::Pressure { magnitude, .. } => {
                apply_pressure(&mut model, body, load.region(), *magnitude);
            }
            LoadKind::ConcentratedForce { force } => {
                let local = to_local * force.to_vector();
                let region = load.region();
                let node = region_node(&model, region).unwrap_or_else(|| {
                    model.nearest_node(region.local_probe.z)
                });
                let arm = region.local_probe.to_point3() - model.node_position(node).to_point3();
                model.apply_nodal_load(node, local, arm.cross(&local));
            }
        }
    }

    for bc in constraints {
        let components = bc.kind().components();
        match region_node(&model, bc.region()) {
            Some(node) => model.constrain(node, components),
            None => model.constrain_all(components),
        }
        if let BoundaryKind::Displacement(_) = bc.kind() {
            debug!(bc = bc.name(), instance = body.instance; "Prescribed motion in part axes");
        }
    }

    let solution = model.solve()?;
    Ok((0..model.node_count())
        .map(|node| {
            let position = placement.transform_point(&model.node_position(node).to_point3());
            NodeResult {
                instance: body.instance.clone(),
                label: node + 1,
                position: Point::from(position),
                displacement: write_u.then(|| {
                    Displacement::from(placement.rotation * solution.translation(node))
                }),
                reaction: if write_rf {
                    solution
                        .reaction(node)
                        .map(|reaction| Force::from(placement.rotation * reaction))
                } else {
                    None
                },
            }
        })
        .collect())
}

/// End node for a cap face; `None` for regions spanning the whole axis.
fn region_node(model: &BeamModel, region: &ResolvedRegion) -> Option<usize> {
    match (region.target, region.entity) {
        (RegionTarget::Face, 0) => Some(0),
        (RegionTarget::Face, 1) => Some(model.last_node()),
        _ => None,
    }
}

/// Pressure acts against the outward normal of its face.
fn apply_pressure(model: &mut BeamModel, body: &BodySnapshot, region: &ResolvedRegion, pressure: f64) {
    let area = model.section().area;
    match (region.target, region.entity) {
        (RegionTarget::Face, 0) => {
            model.apply_nodal_load(0, Vector3::new(0.0, 0.0, pressure * area), Vector3::zeros());
        }
        (RegionTarget::Face, 1) => {
            let tip = model.last_node();
            model.apply_nodal_load(tip, Vector3::new(0.0, 0.0, -pressure * area), Vector3::zeros());
        }
        (RegionTarget::Face, face) => {
            let edge = face - 2;
            let normal = body.profile.outward_normal(edge);
            let line = -pressure * body.profile.edge_length(edge) * normal;
            let (a, b) = body.profile.edge(edge);
            let midpoint = (a.to_vector() + b.to_vector()) / 2.0;
            let arm = midpoint - model.section().centroid.to_vector();
            let torque = arm.x * line.y - arm.y * line.x;
            model.apply_line_load(Vector3::new(line.x, line.y, 0.0), torque);
        }
        (RegionTarget::Cell, _) => {
            warn!(instance = body.instance; "Pressure on a cell region has no effect");
        }
    }
}
