//! Generation requests and the image-stage artifacts they produce.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ModelIdentifier;

// ---------------------------------------------------------------------------
// Image references
// ---------------------------------------------------------------------------

/// A reference image supplied alongside (or instead of) a text prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Raw image bytes uploaded by the user (file picker, camera capture).
    Uploaded {
        bytes: Vec<u8>,
        file_name: String,
        content_type: String,
    },
    /// A previously served image: either a display URL or a canonical
    /// storage locator.
    Remote(String),
}

/// The single image produced by the image-generation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Opaque remote locator (usually a presigned display URL).
    pub uri: String,
}

impl ImageArtifact {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// A user's intent to generate 3D assets.
///
/// Built once and then handed to the orchestrator; it is never mutated
/// afterwards. Target models are kept in a sorted set so the same
/// identifier can never be requested twice within one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    reference_image: Option<ImageReference>,
    target_models: BTreeSet<ModelIdentifier>,
    asset_name: Option<String>,
}

impl GenerationRequest {
    pub fn new<I, M>(prompt: impl Into<String>, target_models: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModelIdentifier>,
    {
        Self {
            prompt: prompt.into(),
            reference_image: None,
            target_models: target_models.into_iter().map(Into::into).collect(),
            asset_name: None,
        }
    }

    /// Attach a reference image (switches the image stage to image-to-image).
    pub fn with_reference(mut self, reference: ImageReference) -> Self {
        self.reference_image = Some(reference);
        self
    }

    /// Attach a friendly name the backend uses when storing the image.
    pub fn with_asset_name(mut self, name: impl Into<String>) -> Self {
        self.asset_name = Some(name.into());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn reference_image(&self) -> Option<&ImageReference> {
        self.reference_image.as_ref()
    }

    pub fn target_models(&self) -> &BTreeSet<ModelIdentifier> {
        &self.target_models
    }

    pub fn asset_name(&self) -> Option<&str> {
        self.asset_name.as_deref()
    }

    /// Check the request is submittable.
    ///
    /// - the prompt is non-empty unless a reference image is supplied;
    /// - at least one target model is requested;
    /// - no target model identifier is blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_prompt(&self.prompt, self.reference_image.is_some())?;

        if self.target_models.is_empty() {
            return Err(CoreError::Validation(
                "At least one target model must be requested".into(),
            ));
        }
        if self
            .target_models
            .iter()
            .any(|m| m.as_str().trim().is_empty())
        {
            return Err(CoreError::Validation(
                "Target model identifiers must not be blank".into(),
            ));
        }
        Ok(())
    }
}

/// A prompt may only be empty when a reference image carries the intent.
pub fn validate_prompt(prompt: &str, has_reference: bool) -> Result<(), CoreError> {
    if prompt.trim().is_empty() && !has_reference {
        return Err(CoreError::Validation(
            "Prompt must not be empty when no reference image is supplied".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Saved assets
// ---------------------------------------------------------------------------

/// Catalog metadata submitted when a generated model is saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAsset {
    pub name: String,
    pub description: String,
    pub category: String,
    pub material: String,
    pub color: String,
    pub price: f64,
    pub dimensions: String,
    pub model_url: String,
}

impl GeneratedAsset {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("Asset name must not be empty".into()));
        }
        if self.model_url.trim().is_empty() {
            return Err(CoreError::Validation(
                "Asset model URL must not be empty".into(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CoreError::Validation(format!(
                "Asset price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn target_models_are_deduplicated() {
        let req = GenerationRequest::new("a red chair", ["modelA", "modelB", "modelA"]);
        assert_eq!(req.target_models().len(), 2);
    }

    #[test]
    fn empty_prompt_without_reference_is_rejected() {
        let req = GenerationRequest::new("   ", ["modelA"]);
        assert_matches!(req.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn empty_prompt_with_reference_is_accepted() {
        let req = GenerationRequest::new("", ["modelA"])
            .with_reference(ImageReference::Remote("s3://bucket/in.png".into()));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn no_target_models_is_rejected() {
        let req = GenerationRequest::new("a lamp", Vec::<&str>::new());
        assert_matches!(
            req.validate(),
            Err(CoreError::Validation(msg)) if msg.contains("target model")
        );
    }

    #[test]
    fn blank_model_identifier_is_rejected() {
        let req = GenerationRequest::new("a lamp", [" "]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn asset_name_is_optional() {
        let req = GenerationRequest::new("a lamp", ["triposr"]);
        assert!(req.asset_name().is_none());
        let req = req.with_asset_name("Desk Lamp");
        assert_eq!(req.asset_name(), Some("Desk Lamp"));
    }

    #[test]
    fn generated_asset_serializes_camel_case() {
        let asset = GeneratedAsset {
            name: "Chair".into(),
            model_url: "https://example.com/chair.glb".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["modelUrl"], "https://example.com/chair.glb");
        assert!(asset.validate().is_ok());
    }

    #[test]
    fn generated_asset_rejects_negative_price() {
        let asset = GeneratedAsset {
            name: "Chair".into(),
            model_url: "https://example.com/chair.glb".into(),
            price: -1.0,
            ..Default::default()
        };
        assert!(asset.validate().is_err());
    }
}
