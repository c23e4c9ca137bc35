//! End-to-end run of a [`CaseConfig`]: build the case, submit the job, wait
//! for the result and bind it to a viewport.
//!
//! Every stage completes before the next starts and the first error aborts the
//! run. Nothing is rolled back.

use std::path::PathBuf;

use log::info;

use crate::case::{CaseDefinition, SectionRegion};
use crate::config::CaseConfig;
use crate::errors::CaseError;
use crate::geometry::Displacement;
use crate::job::{Job, WaitOptions};
use crate::loads::{BoundaryKind, LoadKind};
use crate::outputs::{parse_variables, HistoryVariables};
use crate::post::{Session, Viewport};
use crate::region::RegionSelector;
use crate::registry::{Key, Named};
use crate::results::ResultDatabase;
use crate::services::{GeometryService, MeshService, Services};
use crate::steps::INITIAL_STEP;

/// Everything a completed run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The case, frozen.
    pub case: CaseDefinition,
    /// The completed job.
    pub job: Job,
    /// Location of the result artifact.
    pub artifact: PathBuf,
    /// Post-processing session holding the result viewport.
    pub session: Session,
    /// Viewport displaying the result.
    pub viewport: Key<Viewport>,
}

impl PipelineOutcome {
    /// Result shown in the outcome's viewport.
    #[must_use]
    pub fn result(&self) -> Option<&ResultDatabase> {
        self.session
            .viewport(&self.viewport)
            .ok()
            .and_then(Viewport::displayed_object)
    }

    /// Displacement of the node nearest to `config.post.report_probe`.
    #[must_use]
    pub fn probe_displacement(&self, config: &CaseConfig) -> Option<Displacement> {
        self.result()?
            .displacement_near(&config.instance.name, config.post.report_probe)
    }
}

/// Define the model, assembly, steps, outputs, loads and mesh described by
/// `config`.
///
/// # Errors
///
/// Returns the first error raised by any definition stage.
pub fn build_case(
    config: &CaseConfig,
    geometry: &mut dyn GeometryService,
    mesh: &mut dyn MeshService,
) -> Result<CaseDefinition, CaseError> {
    let mut case = CaseDefinition::new(config.model.initial_name.as_str());
    if config.model.name != config.model.initial_name {
        case.rename(&config.model.name)?;
    }

    let profile = config.part.profile.build()?;
    let part = case.create_part(geometry, &config.part.name, profile, config.part.depth)?;

    let material = &config.material;
    case.define_material(
        &material.name,
        material.density,
        material.youngs_modulus,
        material.poisson_ratio,
    )?;
    let section = case.define_section(&config.section.name, &config.section.material)?;
    case.assign_section(&*geometry, &part, &SectionRegion::AllCells, &section)?;
    info!(part = config.part.name, section = config.section.name; "Part defined");

    let placement = &config.instance;
    let instance = case.instantiate(geometry, &placement.name, &part, placement.dependent)?;
    if let Some(offset) = placement.translate {
        case.translate_instance(&instance, offset)?;
    }
    if let Some(rotation) = placement.rotate {
        case.rotate_instance(&instance, rotation.point, rotation.axis, rotation.angle)?;
    }

    for step in &config.steps {
        case.create_static_step(&step.name, &step.previous, &step.description)?;
    }

    for request in &config.outputs.field {
        let variables = parse_variables(&request.variables)?;
        match &request.rename_from {
            Some(from) => {
                let key = case.rename_field_output(from, &request.name)?;
                case.set_field_output_variables(&key, &variables)?;
            }
            None => {
                let step = match &request.step {
                    Some(step) => step.clone(),
                    None => last_step(&case),
                };
                case.create_field_output(&request.name, &step, &variables)?;
            }
        }
    }
    for request in &config.outputs.history {
        let variables = match &request.variables {
            Some(codes) => HistoryVariables::Variables(parse_variables(codes)?),
            None => HistoryVariables::Preselect,
        };
        case.create_history_output(&request.name, &request.step, variables)?;
    }
    for name in &config.outputs.delete_history {
        case.delete_history_output(name)?;
    }

    for load in &config.loads {
        case.add_load(
            &*geometry,
            &load.name,
            &load.step,
            &instance,
            &RegionSelector::face(load.probe),
            LoadKind::from(&load.action),
        )?;
    }
    for bc in &config.boundary_conditions {
        case.add_boundary_condition(
            &*geometry,
            &bc.name,
            &bc.step,
            &instance,
            &RegionSelector::face(bc.probe),
            BoundaryKind::from(bc.constraint),
        )?;
    }

    let controls = &config.mesh;
    case.set_element_type(
        &*geometry,
        &part,
        &controls.element_probes,
        controls.element_type,
    )?;
    case.seed_part(&part, controls.seed_size, controls.deviation_factor)?;
    let summary = case.generate_mesh(mesh, &part)?;
    info!(
        model = case.name(),
        nodes = summary.node_count,
        elements = summary.element_count;
        "Case defined"
    );
    Ok(case)
}

/// Build the case, run its job and open the result in a viewport. The case is
/// frozen once the viewport shows the result.
///
/// # Errors
///
/// Returns the first error raised by any stage, including
/// [`CaseError::SolverFailure`], [`CaseError::Timeout`] and
/// [`CaseError::Cancelled`] from the wait.
///
/// # Examples
///
/// ```
/// use fecase::reference::ReferenceHost;
/// use fecase::{pipeline, CaseConfig, WaitOptions};
///
/// let dir = tempfile::tempdir().expect("temporary directory");
/// let mut host = ReferenceHost::new(dir.path());
/// let config = CaseConfig::default();
/// let outcome = pipeline::run(&config, host.services(), &WaitOptions::default())
///     .expect("cantilever runs");
/// let tip = outcome.probe_displacement(&config).expect("tip displacement");
/// assert!(tip.y < 0.0);
/// ```
pub fn run(
    config: &CaseConfig,
    services: Services<'_>,
    wait: &WaitOptions,
) -> Result<PipelineOutcome, CaseError> {
    let Services {
        geometry,
        mesh,
        solver,
        results,
    } = services;
    let mut case = build_case(config, geometry, mesh)?;

    let mut job = Job::new(&config.job.name, &case, config.job.options.clone())?;
    job.submit(&case, solver, config.job.consistency_checking)?;
    let artifact = job.wait_for_completion(solver, wait)?;

    let mut session = Session::new();
    let viewport = session.create_viewport(&config.post.viewport)?;
    let result = session.open_result(results, &artifact)?;
    let view = session.viewport_mut(&viewport)?;
    view.set_displayed_object(result);
    view.set_plot_state(&config.post.plot_states)?;
    if let Some(scale) = config.post.deformation_scale {
        view.set_deformation_scale(scale)?;
    }

    case.freeze();
    info!(job = job.name(), artifact:? = artifact, viewport = viewport.name(); "Pipeline complete");
    Ok(PipelineOutcome {
        case,
        job,
        artifact,
        session,
        viewport,
    })
}

/// Name of the last step in the chain.
fn last_step(case: &CaseDefinition) -> String {
    case.steps()
        .ordered()
        .last()
        .map_or_else(|| INITIAL_STEP.to_owned(), |step| step.name().to_owned())
}
