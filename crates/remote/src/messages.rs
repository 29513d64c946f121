//! Wire-level request and response bodies for the remote service.
//!
//! Field names follow the service's JSON exactly; the service mixes
//! camelCase and snake_case between endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body for `POST /generate-image`.
#[derive(Debug, Serialize)]
pub struct GenerateImageBody<'a> {
    pub prompt: &'a str,
    #[serde(rename = "assetName", skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<&'a str>,
}

/// Body for `POST /image-to-image` when the source is already stored.
#[derive(Debug, Serialize)]
pub struct ImageToImageBody<'a> {
    pub locator: &'a str,
    pub prompt: &'a str,
}

/// Response of both image endpoints. Which field is populated depends
/// on the endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrlResponse {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub presigned_url: Option<String>,
}

impl ImageUrlResponse {
    /// The first non-empty URL the service returned.
    pub fn into_url(self) -> Option<String> {
        self.image_url
            .into_iter()
            .chain(self.presigned_url)
            .find(|u| !u.trim().is_empty())
    }
}

/// Body for `POST /create-3d-job`.
#[derive(Debug, Serialize)]
pub struct CreateJobBody<'a> {
    pub locator: &'a str,
    pub models: Vec<&'a str>,
}

/// Response of `POST /create-3d-job`.
///
/// Multi-model deployments answer with a `results` map; single-model
/// deployments answer with one bare `commandId`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateJobResponse {
    #[serde(default)]
    pub results: BTreeMap<String, String>,
    #[serde(rename = "commandId", default)]
    pub command_id: Option<String>,
}

/// Body for `POST /check-3d-job`.
#[derive(Debug, Serialize)]
pub struct CheckJobBody<'a> {
    #[serde(rename = "commandId")]
    pub command_id: &'a str,
    #[serde(rename = "modelName", skip_serializing_if = "Option::is_none")]
    pub model_name: Option<&'a str>,
}

/// Response of `POST /check-3d-job`.
#[derive(Debug, Deserialize)]
pub struct CheckJobResponse {
    pub status: String,
    #[serde(default)]
    pub glb_presigned_url: Option<String>,
    #[serde(default)]
    pub usdz_presigned_url: Option<String>,
}
