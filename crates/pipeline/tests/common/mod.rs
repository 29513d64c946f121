//! Scripted [`RemoteJobService`] used by the orchestrator tests.
//!
//! Each command id gets a queue of status readings. The last reading of
//! a queue repeats forever, so a single `Pending` entry models a job
//! that never finishes and a single terminal entry models a settled job.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use showroom_core::generation::GeneratedAsset;
use showroom_core::types::{CommandId, ModelIdentifier};
use showroom_remote::{ImageSource, JobStatusReport, Locator, RemoteError, RemoteJobService};
use tokio::sync::Notify;

/// Presigned display URL returned by the default image stage.
pub const IMAGE_URL: &str =
    "https://demo-assets.s3.amazonaws.com/generated-images/red-chair.png?X-Amz-Signature=abc123";

/// Locator the default image URL translates to.
pub const IMAGE_LOCATOR: &str = "s3://demo-assets/generated-images/red-chair.png";

/// One recorded call against the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GenerateImage {
        prompt: String,
        asset_name: Option<String>,
    },
    ImageToImage {
        source: ImageSource,
        prompt: String,
    },
    CreateJobs {
        locator: String,
        models: Vec<String>,
    },
    Check {
        command_id: String,
        model: String,
    },
    Save {
        name: String,
    },
}

/// A scripted status reading.
#[derive(Debug, Clone)]
pub enum Reading {
    Report(JobStatusReport),
    Error,
}

pub fn pending() -> Reading {
    Reading::Report(JobStatusReport::new("InProgress"))
}

pub fn success_without_urls() -> Reading {
    Reading::Report(JobStatusReport::new("Success"))
}

const MODEL_BASE_URL: &str = "https://demo-assets.s3.amazonaws.com/generated-3d-assets";

pub fn success(name: &str) -> Reading {
    Reading::Report(
        JobStatusReport::new("Success")
            .with_glb(format!("{MODEL_BASE_URL}/{name}.glb"))
            .with_usdz(format!("{MODEL_BASE_URL}/{name}.usdz")),
    )
}

pub fn status(raw: &str) -> Reading {
    Reading::Report(JobStatusReport::new(raw))
}

pub fn check_error() -> Reading {
    Reading::Error
}

pub struct ScriptedService {
    image: Result<String, u16>,
    image_gate: Option<Arc<Notify>>,
    jobs: Result<BTreeMap<String, String>, u16>,
    save: Result<(), u16>,
    readings: Mutex<HashMap<String, VecDeque<Reading>>>,
    calls: Mutex<Vec<Call>>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            image: Ok(IMAGE_URL.to_string()),
            image_gate: None,
            jobs: Ok(BTreeMap::new()),
            save: Ok(()),
            readings: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_url(mut self, url: &str) -> Self {
        self.image = Ok(url.to_string());
        self
    }

    pub fn failing_image(mut self, status: u16) -> Self {
        self.image = Err(status);
        self
    }

    /// Hold every image call until `gate` is notified.
    pub fn with_image_gate(mut self, gate: Arc<Notify>) -> Self {
        self.image_gate = Some(gate);
        self
    }

    pub fn with_jobs<const N: usize>(mut self, jobs: [(&str, &str); N]) -> Self {
        self.jobs = Ok(jobs
            .iter()
            .map(|(model, cmd)| (model.to_string(), cmd.to_string()))
            .collect());
        self
    }

    pub fn failing_jobs(mut self, status: u16) -> Self {
        self.jobs = Err(status);
        self
    }

    pub fn failing_save(mut self, status: u16) -> Self {
        self.save = Err(status);
        self
    }

    pub fn with_readings(self, command_id: &str, readings: Vec<Reading>) -> Self {
        self.readings
            .lock()
            .unwrap()
            .insert(command_id.to_string(), readings.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn check_count(&self, command_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Check { command_id: id, .. } if id == command_id))
            .count()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateJobs { .. }))
            .count()
    }

    async fn pass_image_gate(&self) {
        if let Some(gate) = &self.image_gate {
            gate.notified().await;
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn api_error(status: u16) -> RemoteError {
        RemoteError::ApiError {
            status,
            body: "scripted failure".into(),
        }
    }
}

#[async_trait]
impl RemoteJobService for ScriptedService {
    async fn generate_image(
        &self,
        prompt: &str,
        asset_name: Option<&str>,
    ) -> Result<String, RemoteError> {
        self.record(Call::GenerateImage {
            prompt: prompt.to_string(),
            asset_name: asset_name.map(str::to_string),
        });
        self.pass_image_gate().await;
        self.image.clone().map_err(Self::api_error)
    }

    async fn image_to_image(
        &self,
        source: ImageSource,
        prompt: &str,
    ) -> Result<String, RemoteError> {
        self.record(Call::ImageToImage {
            source,
            prompt: prompt.to_string(),
        });
        self.pass_image_gate().await;
        self.image.clone().map_err(Self::api_error)
    }

    async fn create_reconstruction_jobs(
        &self,
        locator: &Locator,
        models: &[ModelIdentifier],
    ) -> Result<BTreeMap<ModelIdentifier, CommandId>, RemoteError> {
        self.record(Call::CreateJobs {
            locator: locator.to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
        });
        let jobs = self.jobs.clone().map_err(Self::api_error)?;
        Ok(jobs
            .into_iter()
            .map(|(model, cmd)| (ModelIdentifier::new(model), cmd))
            .collect())
    }

    async fn check_reconstruction_job(
        &self,
        command_id: &str,
        model: &ModelIdentifier,
    ) -> Result<JobStatusReport, RemoteError> {
        self.record(Call::Check {
            command_id: command_id.to_string(),
            model: model.to_string(),
        });

        let reading = {
            let mut readings = self.readings.lock().unwrap();
            let queue = readings
                .get_mut(command_id)
                .ok_or_else(|| Self::api_error(404))?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match reading {
            Some(Reading::Report(report)) => Ok(report),
            Some(Reading::Error) | None => Err(Self::api_error(503)),
        }
    }

    async fn save_generated_asset(&self, asset: &GeneratedAsset) -> Result<(), RemoteError> {
        self.record(Call::Save {
            name: asset.name.clone(),
        });
        self.save.map_err(Self::api_error)
    }
}
