//! The [`RemoteJobService`] boundary.
//!
//! The orchestrator only ever talks to the generation backend through
//! this trait, so tests can substitute a scripted service and the HTTP
//! client stays swappable.

use std::collections::BTreeMap;

use async_trait::async_trait;
use showroom_core::generation::GeneratedAsset;
use showroom_core::job::{JobStatus, ModelArtifact};
use showroom_core::types::{CommandId, ModelIdentifier};

use crate::error::RemoteError;
use crate::locator::Locator;

/// Source image for the image-to-image stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An image already held by the storage service.
    Stored(Locator),
    /// Raw bytes sent as a multipart upload.
    Upload {
        bytes: Vec<u8>,
        file_name: String,
        content_type: String,
    },
}

/// One status reading of a reconstruction job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusReport {
    /// The raw status string as the backend reported it.
    pub raw_status: String,
    pub glb_url: Option<String>,
    pub usdz_url: Option<String>,
}

impl JobStatusReport {
    pub fn new(raw_status: impl Into<String>) -> Self {
        Self {
            raw_status: raw_status.into(),
            glb_url: None,
            usdz_url: None,
        }
    }

    pub fn with_glb(mut self, url: impl Into<String>) -> Self {
        self.glb_url = Some(url.into());
        self
    }

    pub fn with_usdz(mut self, url: impl Into<String>) -> Self {
        self.usdz_url = Some(url.into());
        self
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_backend(&self.raw_status)
    }

    /// The artifact described by this report, if it carries any URI.
    pub fn artifact(&self) -> Option<ModelArtifact> {
        ModelArtifact::from_uris(self.glb_url.clone(), self.usdz_url.clone())
    }
}

/// Operations offered by the remote generation backend.
///
/// Every method performs exactly one remote call and never retries.
#[async_trait]
pub trait RemoteJobService: Send + Sync {
    /// Text-to-image. Returns the display URL of the generated image.
    async fn generate_image(
        &self,
        prompt: &str,
        asset_name: Option<&str>,
    ) -> Result<String, RemoteError>;

    /// Image-to-image customization from a reference. Returns the
    /// display URL of the new image.
    async fn image_to_image(&self, source: ImageSource, prompt: &str)
        -> Result<String, RemoteError>;

    /// Start one reconstruction job per model in a single call.
    async fn create_reconstruction_jobs(
        &self,
        locator: &Locator,
        models: &[ModelIdentifier],
    ) -> Result<BTreeMap<ModelIdentifier, CommandId>, RemoteError>;

    /// Read the current status of one job.
    async fn check_reconstruction_job(
        &self,
        command_id: &str,
        model: &ModelIdentifier,
    ) -> Result<JobStatusReport, RemoteError>;

    /// Persist a generated model to the asset catalog.
    async fn save_generated_asset(&self, asset: &GeneratedAsset) -> Result<(), RemoteError>;
}
