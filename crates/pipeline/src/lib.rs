//! Job orchestration for the two-stage 3D generation pipeline.
//!
//! - [`JobOrchestrator`] drives image generation, reconstruction job
//!   creation, and concurrent per-model status polling.
//! - [`poll::poll_until`] is the single polling primitive every status
//!   loop is built on.
//! - [`UpdateBus`] publishes per-model [`JobUpdate`]s for rendering.
//! - [`RunHandle`] yields per-model outcomes of one run as they finish.

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod poll;
pub mod run;

pub use error::PipelineError;
pub use events::{JobUpdate, ModelState, UpdateBus};
pub use orchestrator::JobOrchestrator;
pub use poll::PollConfig;
pub use run::{ModelOutcome, RunHandle, RunReport, RunUpdates};
