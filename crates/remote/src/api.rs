//! HTTP client for the remote generation service.
//!
//! Wraps the service's JSON endpoints (image generation, image-to-image,
//! reconstruction job creation and status, asset saving) using
//! [`reqwest`]. Every response passes through [`envelope::decode`] so
//! both direct and proxy-wrapped payloads are accepted.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use showroom_core::generation::GeneratedAsset;
use showroom_core::types::{CommandId, ModelIdentifier};

use crate::envelope;
use crate::error::RemoteError;
use crate::locator::Locator;
use crate::messages::{
    CheckJobBody, CheckJobResponse, CreateJobBody, CreateJobResponse, GenerateImageBody,
    ImageToImageBody, ImageUrlResponse,
};
use crate::service::{ImageSource, JobStatusReport, RemoteJobService};

/// HTTP client for one deployment of the generation service.
pub struct RemoteJobApi {
    client: reqwest::Client,
    api_url: String,
}

impl RemoteJobApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `https://host/prod`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client whose requests give up after `timeout`.
    pub fn with_timeout(
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Base HTTP URL of the service.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// POST a JSON body and decode the (possibly enveloped) response.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RemoteError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let response = Self::ensure_success(response).await?;
        let value = response.json::<serde_json::Value>().await?;
        envelope::decode(value)
    }

    /// Assert the response has a success status code. An envelope in
    /// the body is still checked for a non-2xx `statusCode`.
    async fn check_status(response: reqwest::Response) -> Result<(), RemoteError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
            envelope::normalize(value)?;
        }
        Ok(())
    }

    fn image_url(response: ImageUrlResponse, endpoint: &str) -> Result<String, RemoteError> {
        response
            .into_url()
            .ok_or_else(|| RemoteError::Decode(format!("{endpoint} returned no image URL")))
    }
}

#[async_trait]
impl RemoteJobService for RemoteJobApi {
    async fn generate_image(
        &self,
        prompt: &str,
        asset_name: Option<&str>,
    ) -> Result<String, RemoteError> {
        let body = GenerateImageBody { prompt, asset_name };
        let response: ImageUrlResponse = self.post_json("generate-image", &body).await?;
        let url = Self::image_url(response, "generate-image")?;
        tracing::debug!(image_url = %url, "Image generated");
        Ok(url)
    }

    async fn image_to_image(
        &self,
        source: ImageSource,
        prompt: &str,
    ) -> Result<String, RemoteError> {
        let response: ImageUrlResponse = match source {
            ImageSource::Stored(locator) => {
                let locator = locator.to_string();
                let body = ImageToImageBody {
                    locator: &locator,
                    prompt,
                };
                self.post_json("image-to-image", &body).await?
            }
            ImageSource::Upload {
                bytes,
                file_name,
                content_type,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)?;
                let form = Form::new().text("prompt", prompt.to_string()).part("file", part);

                let response = self
                    .client
                    .post(self.endpoint("image-to-image"))
                    .multipart(form)
                    .send()
                    .await?;
                Self::parse_response(response).await?
            }
        };
        Self::image_url(response, "image-to-image")
    }

    async fn create_reconstruction_jobs(
        &self,
        locator: &Locator,
        models: &[ModelIdentifier],
    ) -> Result<BTreeMap<ModelIdentifier, CommandId>, RemoteError> {
        let locator = locator.to_string();
        let body = CreateJobBody {
            locator: &locator,
            models: models.iter().map(ModelIdentifier::as_str).collect(),
        };
        let response: CreateJobResponse = self.post_json("create-3d-job", &body).await?;

        let mut jobs: BTreeMap<ModelIdentifier, CommandId> = response
            .results
            .into_iter()
            .filter(|(_, command_id)| !command_id.trim().is_empty())
            .map(|(model, command_id)| (ModelIdentifier::new(model), command_id))
            .collect();

        // Single-model deployments answer with a bare command id.
        if jobs.is_empty() {
            if let (Some(command_id), [model]) = (response.command_id, models) {
                if !command_id.trim().is_empty() {
                    jobs.insert(model.clone(), command_id);
                }
            }
        }

        tracing::debug!(locator = %locator, jobs = jobs.len(), "Reconstruction jobs created");
        Ok(jobs)
    }

    async fn check_reconstruction_job(
        &self,
        command_id: &str,
        model: &ModelIdentifier,
    ) -> Result<JobStatusReport, RemoteError> {
        let body = CheckJobBody {
            command_id,
            model_name: Some(model.as_str()),
        };
        let response: CheckJobResponse = self.post_json("check-3d-job", &body).await?;

        Ok(JobStatusReport {
            raw_status: response.status,
            glb_url: response.glb_presigned_url,
            usdz_url: response.usdz_presigned_url,
        })
    }

    async fn save_generated_asset(&self, asset: &GeneratedAsset) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.endpoint("save-generated-asset"))
            .json(asset)
            .send()
            .await?;

        Self::check_status(response).await
    }
}
