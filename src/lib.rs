#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod assembly;
pub mod case;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod job;
pub mod loads;
pub mod materials;
pub mod mesh;
pub mod outputs;
pub mod part;
pub mod pipeline;
pub mod post;
pub mod reference;
pub mod region;
pub mod registry;
pub mod results;
pub mod services;
pub mod snapshot;
pub mod steps;

pub use assembly::{Assembly, Instance};
pub use case::{CaseDefinition, SectionRegion};
pub use config::CaseConfig;
pub use errors::{CaseError, ConfigurationError, MaterialPropertyError, Prerequisite};
pub use geometry::{force, point, point2, Displacement, Force, Point, Point2, Profile};
pub use job::{CancelToken, Job, JobOptions, JobState, JobType, WaitOptions};
pub use loads::{BoundaryCondition, BoundaryKind, Load, LoadKind};
pub use materials::{Elastic, Material, Section};
pub use mesh::{ElementCode, ElementType, MeshSummary, Seed};
pub use outputs::{HistoryVariables, OutputVariable};
pub use part::Part;
pub use pipeline::PipelineOutcome;
pub use post::{PlotState, Session, Viewport};
pub use region::RegionSelector;
pub use registry::{EntityKind, Key, Named, Registry};
pub use results::{Frame, NodeResult, ResultDatabase};
pub use services::{
    BodyHandle, CellId, FaceId, GeometryService, HostJobStatus, MeshService, ResultService,
    Services, SolverService,
};
pub use steps::{Step, StepChain, StepProcedure, INITIAL_STEP};
