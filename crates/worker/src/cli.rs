//! Command-line arguments.
//!
//! ```text
//! showroom-worker [--model <ID>]... [--reference <URL>] [--name <NAME>] [PROMPT]...
//! ```
//!
//! Positional words are joined into the prompt. `--model` may be
//! repeated; without it the configured `TARGET_MODELS` are used.

use clap::{ArgAction, Parser};
use showroom_core::generation::{GenerationRequest, ImageReference};
use showroom_core::types::ModelIdentifier;

#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(
    name = "showroom-worker",
    version,
    about = "Generate an image from a prompt and reconstruct it as 3D models"
)]
pub struct Args {
    /// Reconstruction model to run. Repeat for several models.
    #[arg(short = 'm', long = "model", value_name = "ID", action = ArgAction::Append)]
    pub models: Vec<String>,

    /// Reference image (display URL or s3:// locator) for image-to-image.
    #[arg(short = 'r', long = "reference", value_name = "URL")]
    pub reference: Option<String>,

    /// Friendly name used when the backend stores the generated image.
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub asset_name: Option<String>,

    /// Text prompt. May be empty when a reference image is given.
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,
}

impl Args {
    pub fn prompt(&self) -> String {
        self.prompt.join(" ")
    }

    /// Build the generation request, falling back to `default_models`
    /// when no `--model` was given.
    pub fn into_request(self, default_models: &[ModelIdentifier]) -> GenerationRequest {
        let prompt = self.prompt();
        let models: Vec<ModelIdentifier> = if self.models.is_empty() {
            default_models.to_vec()
        } else {
            self.models.into_iter().map(ModelIdentifier::new).collect()
        };

        let mut request = GenerationRequest::new(prompt, models);
        if let Some(uri) = self.reference {
            request = request.with_reference(ImageReference::Remote(uri));
        }
        if let Some(name) = self.asset_name {
            request = request.with_asset_name(name);
        }
        request
    }
}
