use showroom_core::job::JobStatus;
use showroom_core::types::ModelIdentifier;

/// Errors produced by the generation pipeline.
///
/// Every error is terminal for the unit of work it describes; nothing in
/// the pipeline retries automatically. Variants carry rendered detail
/// strings rather than source errors so one stage failure can be
/// reported to every model of a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The request failed validation before any remote call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An image-generation call failed or returned nothing usable.
    #[error("Generation failed at {stage} stage: {detail}")]
    GenerationFailed { stage: &'static str, detail: String },

    /// A display URL could not be turned into a storage locator.
    #[error("Locator translation failed: {0}")]
    LocatorTranslationFailed(String),

    /// The create-job call failed or did not return a job per model.
    #[error("Reconstruction job creation failed: {0}")]
    JobCreationFailed(String),

    /// The backend reported the job as failed or timed out.
    #[error("Reconstruction failed for model {model}: backend reported {status}")]
    ReconstructionFailed {
        model: ModelIdentifier,
        status: JobStatus,
    },

    /// The client-side attempt ceiling was reached without a terminal
    /// backend status.
    #[error("Polling exhausted for model {model} after {attempts} attempts")]
    PollingExhausted {
        model: ModelIdentifier,
        attempts: u32,
    },

    /// Saving a generated asset to the catalog failed.
    #[error("Saving asset failed: {0}")]
    SaveFailed(String),

    /// A polling task ended without reporting an outcome.
    #[error("Polling task for model {model} aborted: {detail}")]
    TaskAborted {
        model: ModelIdentifier,
        detail: String,
    },

    /// The run was cancelled before this unit of work finished.
    #[error("Cancelled")]
    Cancelled,
}

impl PipelineError {
    /// The image stage failed.
    pub fn image_failed(detail: impl Into<String>) -> Self {
        Self::GenerationFailed {
            stage: "image",
            detail: detail.into(),
        }
    }
}
