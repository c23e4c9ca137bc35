//! Solver jobs: resource configuration, submission and the completion wait.
//!
//! A job moves through `Defined → Submitted → Running → {Completed, Failed}`.
//! Submission is refused until every model prerequisite exists, and the wait
//! is bounded by an optional timeout and a [`CancelToken`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::case::CaseDefinition;
use crate::errors::{CaseError, ConfigurationError};
use crate::registry::EntityKind;
use crate::services::{HostJobStatus, SolverService};
use crate::snapshot::CaseSnapshot;

/// Kind of solver run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Full analysis.
    #[default]
    Analysis,
    /// Input check only; no increments are solved.
    DataCheck,
}

/// Floating point precision of the explicit solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplicitPrecision {
    /// Single precision.
    #[default]
    Single,
    /// Double precision.
    Double,
}

/// Precision of nodal output written to the result artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPrecision {
    /// Single precision.
    #[default]
    Single,
    /// Full precision.
    Full,
}

/// How the explicit solver splits work across processors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelizationMethod {
    /// Domain decomposition.
    #[default]
    Domain,
    /// Loop-level parallelism.
    Loop,
}

/// Process model used for parallel runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiprocessingMode {
    /// Host default.
    #[default]
    Default,
    /// Shared-memory threads.
    Threads,
    /// Message passing.
    Mpi,
}

/// Unit of the memory budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryUnits {
    /// Percentage of physical memory.
    #[default]
    Percentage,
    /// Megabytes.
    Megabytes,
    /// Gigabytes.
    Gigabytes,
}

impl fmt::Display for MemoryUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MemoryUnits::Percentage => "%",
            MemoryUnits::Megabytes => "MB",
            MemoryUnits::Gigabytes => "GB",
        };
        f.write_str(label)
    }
}

/// Resource envelope of the solver process. Passed to the host verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Processor count.
    pub cpus: u32,
    /// Domain count for domain decomposition.
    pub domains: u32,
    /// Memory budget, in `memory_units`.
    pub memory: f64,
    /// Unit of `memory`.
    pub memory_units: MemoryUnits,
    /// Parallelization of the explicit solver.
    pub parallelization: ParallelizationMethod,
    /// Process model.
    pub multiprocessing: MultiprocessingMode,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cpus: 1,
            domains: 1,
            memory: 50.0,
            memory_units: MemoryUnits::Percentage,
            parallelization: ParallelizationMethod::Domain,
            multiprocessing: MultiprocessingMode::Default,
        }
    }
}

impl ResourceConfig {
    /// Type and range checks; nothing beyond that is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonPositiveResource`] for a zero count and
    /// [`ConfigurationError::MemoryOutOfRange`] for a memory budget outside
    /// `(0, 100]` percent or a non-positive absolute amount.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.cpus == 0 {
            return Err(ConfigurationError::NonPositiveResource { field: "cpus" });
        }
        if self.domains == 0 {
            return Err(ConfigurationError::NonPositiveResource { field: "domains" });
        }
        let in_range = match self.memory_units {
            MemoryUnits::Percentage => self.memory > 0.0 && self.memory <= 100.0,
            MemoryUnits::Megabytes | MemoryUnits::Gigabytes => {
                self.memory > 0.0 && self.memory.is_finite()
            }
        };
        if !in_range {
            return Err(ConfigurationError::MemoryOutOfRange {
                value: self.memory,
                units: self.memory_units.to_string(),
            });
        }
        Ok(())
    }
}

/// Diagnostic print switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Echo the input file.
    pub echo: bool,
    /// Print model definition data.
    pub model: bool,
    /// Print contact constraint data.
    pub contact: bool,
    /// Print history data.
    pub history: bool,
}

/// Everything configurable on a job besides its name and model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Kind of run.
    pub job_type: JobType,
    /// Free-form description.
    pub description: String,
    /// Explicit solver precision.
    pub explicit_precision: ExplicitPrecision,
    /// Nodal output precision.
    pub nodal_output_precision: OutputPrecision,
    /// Resource envelope.
    pub resources: ResourceConfig,
    /// Print switches.
    pub print: PrintOptions,
    /// Scratch directory; host default when `None`.
    pub scratch: Option<PathBuf>,
}

/// Lifecycle state of a [`Job`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Created, not yet submitted.
    Defined,
    /// Accepted by the solver.
    Submitted,
    /// The solver reported that the run started.
    Running,
    /// Finished with a result artifact.
    Completed {
        /// Location of the result artifact.
        artifact: PathBuf,
    },
    /// Finished without a usable result.
    Failed {
        /// Diagnostic reported by the solver.
        diagnostic: String,
    },
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Defined => f.write_str("defined"),
            JobState::Submitted => f.write_str("submitted"),
            JobState::Running => f.write_str("running"),
            JobState::Completed { .. } => f.write_str("completed"),
            JobState::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// Shared flag that aborts a [`Job::wait_for_completion`] in progress.
///
/// Clones share the flag, so a token can be handed to another thread and
/// cancelled from there.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Bounds on [`Job::wait_for_completion`].
#[derive(Clone, Debug)]
pub struct WaitOptions {
    /// Total time to wait; `None` waits until the solver finishes.
    pub timeout: Option<Duration>,
    /// Longest single blocking call to the solver between cancellation checks.
    pub poll_interval: Duration,
    /// Cancellation flag.
    pub cancel: CancelToken,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(100),
            cancel: CancelToken::new(),
        }
    }
}

impl WaitOptions {
    /// Wait at most `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}

/// Serialized case plus the job configuration, as handed to the solver.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobPackage {
    /// Job name.
    pub job: String,
    /// Model name.
    pub model: String,
    /// Job configuration.
    pub options: JobOptions,
    /// Whether the solver should run its extra consistency checks.
    pub consistency_checking: bool,
    /// Case definition.
    pub case: CaseSnapshot,
}

impl JobPackage {
    /// Render the package as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Serialization`] when rendering fails.
    pub fn to_json(&self) -> Result<String, CaseError> {
        serde_json::to_string_pretty(self)
            .map_err(|error| CaseError::from(ConfigurationError::Serialization(error.to_string())))
    }
}

/// Unit of solver work bound to a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    /// Job name.
    name: String,
    /// Model the job was created for.
    model: String,
    /// Job configuration.
    options: JobOptions,
    /// Lifecycle state.
    state: JobState,
}

impl Job {
    /// Define a job for `case`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyName`] for an empty name and any
    /// resource range error from [`ResourceConfig::validate`].
    pub fn new(
        name: impl Into<String>,
        case: &CaseDefinition,
        options: JobOptions,
    ) -> Result<Self, CaseError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName {
                kind: EntityKind::Job,
            }
            .into());
        }
        options.resources.validate()?;
        debug!(job = name, model = case.name(); "Defined job");
        Ok(Self {
            name,
            model: case.name().to_owned(),
            options,
            state: JobState::Defined,
        })
    }

    /// Job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model the job was created for.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Job configuration.
    #[must_use]
    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Result artifact of a completed job.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        match &self.state {
            JobState::Completed { artifact } => Some(artifact),
            _ => None,
        }
    }

    /// Hand the case to the solver.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidJobTransition`] unless the job is
    /// `Defined`, [`ConfigurationError::ModelMismatch`] when `case` is not the
    /// model the job was created for, [`CaseError::IncompleteModel`] listing
    /// every missing prerequisite, and any error the solver raises.
    pub fn submit(
        &mut self,
        case: &CaseDefinition,
        solver: &mut dyn SolverService,
        consistency_checking: bool,
    ) -> Result<(), CaseError> {
        if self.state != JobState::Defined {
            return Err(self.transition_error("be submitted"));
        }
        if case.name() != self.model {
            return Err(ConfigurationError::ModelMismatch {
                job: self.name.clone(),
                expected: self.model.clone(),
                actual: case.name().to_owned(),
            }
            .into());
        }
        let missing = case.missing_prerequisites();
        if !missing.is_empty() {
            warn!(job = self.name, missing = missing.len(); "Job submitted before the model is complete");
            return Err(CaseError::IncompleteModel {
                job: self.name.clone(),
                missing,
            });
        }
        let package = JobPackage {
            job: self.name.clone(),
            model: self.model.clone(),
            options: self.options.clone(),
            consistency_checking,
            case: case.snapshot(&self.name)?,
        };
        solver.submit(package)?;
        self.state = JobState::Submitted;
        info!(job = self.name, model = self.model; "Submitted job");
        Ok(())
    }

    /// Block until the solver finishes the run, the timeout expires or the
    /// wait is cancelled. Returns the result artifact on success.
    ///
    /// Calling it again on a completed job returns the same artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::SolverFailure`] with the host diagnostic when the
    /// run fails, [`CaseError::Timeout`] when `options.timeout` expires,
    /// [`CaseError::Cancelled`] when the token is cancelled, and
    /// [`ConfigurationError::InvalidJobTransition`] when the job was never
    /// submitted or already failed.
    pub fn wait_for_completion(
        &mut self,
        solver: &mut dyn SolverService,
        options: &WaitOptions,
    ) -> Result<PathBuf, CaseError> {
        match &self.state {
            JobState::Submitted | JobState::Running => {}
            JobState::Completed { artifact } => return Ok(artifact.clone()),
            JobState::Defined | JobState::Failed { .. } => {
                return Err(self.transition_error("be waited on"));
            }
        }

        let started = Instant::now();
        let poll = options.poll_interval.max(Duration::from_millis(1));
        loop {
            if options.cancel.is_cancelled() {
                warn!(job = self.name; "Wait for completion cancelled");
                return Err(CaseError::Cancelled {
                    job: self.name.clone(),
                });
            }
            let slice = match options.timeout {
                Some(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        warn!(job = self.name, limit_ms = limit.as_millis(); "Job did not finish in time");
                        return Err(CaseError::Timeout {
                            job: self.name.clone(),
                            limit,
                        });
                    }
                    poll.min(limit - elapsed)
                }
                None => poll,
            };

            match solver.wait(&self.name, Some(slice))? {
                HostJobStatus::Queued => {}
                HostJobStatus::Running => {
                    if self.state == JobState::Submitted {
                        debug!(job = self.name; "Job is running");
                        self.state = JobState::Running;
                    }
                }
                HostJobStatus::Completed { artifact } => {
                    info!(job = self.name, artifact:? = artifact; "Job completed");
                    self.state = JobState::Completed {
                        artifact: artifact.clone(),
                    };
                    return Ok(artifact);
                }
                HostJobStatus::Failed { diagnostic } => {
                    warn!(job = self.name, diagnostic = diagnostic; "Job failed");
                    self.state = JobState::Failed {
                        diagnostic: diagnostic.clone(),
                    };
                    return Err(CaseError::SolverFailure {
                        job: self.name.clone(),
                        diagnostic,
                    });
                }
            }
        }
    }

    fn transition_error(&self, action: &'static str) -> CaseError {
        ConfigurationError::InvalidJobTransition {
            job: self.name.clone(),
            action,
            state: self.state.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resources_match_a_single_cpu_half_memory_run() {
        let resources = ResourceConfig::default();
        assert_eq!(resources.cpus, 1);
        assert_eq!(resources.memory_units, MemoryUnits::Percentage);
        assert!(resources.validate().is_ok());
    }

    #[test]
    fn resource_ranges_are_checked() {
        let zero_cpus = ResourceConfig {
            cpus: 0,
            ..ResourceConfig::default()
        };
        assert_eq!(
            zero_cpus.validate(),
            Err(ConfigurationError::NonPositiveResource { field: "cpus" })
        );
        let too_much = ResourceConfig {
            memory: 150.0,
            ..ResourceConfig::default()
        };
        assert_eq!(
            too_much.validate(),
            Err(ConfigurationError::MemoryOutOfRange {
                value: 150.0,
                units: "%".to_owned()
            })
        );
        let megabytes = ResourceConfig {
            memory: 4096.0,
            memory_units: MemoryUnits::Megabytes,
            ..ResourceConfig::default()
        };
        assert!(megabytes.validate().is_ok());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn job_options_fill_missing_fields_from_defaults() {
        let options: JobOptions =
            toml::from_str("description = \"Job simulates a loaded cantilever beam\"\n[resources]\ncpus = 4\n")
                .expect("valid options");
        assert_eq!(options.resources.cpus, 4);
        assert_eq!(options.resources.memory, 50.0);
        assert_eq!(options.job_type, JobType::Analysis);
    }

    #[test]
    fn state_labels() {
        assert_eq!(JobState::Defined.to_string(), "defined");
        assert_eq!(
            JobState::Failed {
                diagnostic: String::new()
            }
            .to_string(),
            "failed"
        );
    }
}
