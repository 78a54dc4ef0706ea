//! Application layer
//!
//! Wires the collaborators together and drives one harvest run.

pub mod harvest_pipeline;
pub mod run_summary;

pub use harvest_pipeline::{HarvestPipeline, PipelineCollaborators, RunOutcome};
pub use run_summary::{ItemFailure, RunSummary, Stage};
