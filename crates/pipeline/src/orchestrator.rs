//! The generation pipeline orchestrator.
//!
//! [`JobOrchestrator`] turns a [`GenerationRequest`] into per-model 3D
//! artifacts: it generates one image, asks the remote service for one
//! reconstruction job per target model, and polls every job
//! concurrently. Stages run strictly in order; once jobs exist, each
//! model succeeds or fails independently of the others.
//!
//! All work of a run lives under one [`CancellationToken`] (a child of
//! the orchestrator's token) and one [`JoinSet`], so cancelling the run
//! or shutting the orchestrator down stops every child poll.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use showroom_core::generation::{
    validate_prompt, GeneratedAsset, GenerationRequest, ImageArtifact, ImageReference,
};
use showroom_core::job::{JobStatus, ModelArtifact, ReconstructionJob};
use showroom_core::types::{CommandId, ModelIdentifier};
use showroom_remote::{to_locator, ImageSource, JobStatusReport, RemoteJobService};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::events::{JobUpdate, ModelState, UpdateBus};
use crate::poll::{poll_until, PollConfig, PollError, PollStep};
use crate::run::{ModelOutcome, RunHandle};

/// Drives image generation, job creation, and status polling against a
/// [`RemoteJobService`].
///
/// Cheap to clone; clones share the service, the update bus, and the
/// shutdown token.
#[derive(Clone)]
pub struct JobOrchestrator {
    service: Arc<dyn RemoteJobService>,
    poll_config: PollConfig,
    updates: Arc<UpdateBus>,
    /// Master cancellation token; every run holds a child of it.
    cancel: CancellationToken,
}

impl JobOrchestrator {
    pub fn new(service: Arc<dyn RemoteJobService>, poll_config: PollConfig) -> Self {
        Self {
            service,
            poll_config,
            updates: Arc::new(UpdateBus::default()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll_config
    }

    /// Subscribe to per-model state updates of every run started by
    /// this orchestrator. Use [`RunHandle::subscribe`] to follow a
    /// single run from its first transition.
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    /// Cancel every run started by this orchestrator (and its clones).
    pub fn shutdown(&self) {
        tracing::info!("Shutting down job orchestrator");
        self.cancel.cancel();
    }

    // -----------------------------------------------------------------------
    // Stage 1: image generation
    // -----------------------------------------------------------------------

    /// Generate the image a reconstruction will start from.
    ///
    /// Without a reference this is text-to-image; with one it is
    /// image-to-image. Exactly one remote call is made, with no retry.
    pub async fn generate_image(
        &self,
        prompt: &str,
        reference: Option<&ImageReference>,
    ) -> Result<ImageArtifact, PipelineError> {
        self.generate_image_named(prompt, reference, None).await
    }

    async fn generate_image_named(
        &self,
        prompt: &str,
        reference: Option<&ImageReference>,
        asset_name: Option<&str>,
    ) -> Result<ImageArtifact, PipelineError> {
        validate_prompt(prompt, reference.is_some())
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;

        let result = match reference {
            None => self.service.generate_image(prompt, asset_name).await,
            Some(ImageReference::Remote(uri)) => {
                let locator = to_locator(uri)
                    .map_err(|e| PipelineError::LocatorTranslationFailed(e.to_string()))?;
                self.service
                    .image_to_image(ImageSource::Stored(locator), prompt)
                    .await
            }
            Some(ImageReference::Uploaded {
                bytes,
                file_name,
                content_type,
            }) => {
                let source = ImageSource::Upload {
                    bytes: bytes.clone(),
                    file_name: file_name.clone(),
                    content_type: content_type.clone(),
                };
                self.service.image_to_image(source, prompt).await
            }
        };

        match result {
            Ok(uri) => {
                tracing::info!(image_url = %uri, "Image generated");
                Ok(ImageArtifact::new(uri))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image generation failed");
                Err(PipelineError::image_failed(e.to_string()))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stage 2: reconstruction job creation
    // -----------------------------------------------------------------------

    /// Start one reconstruction job per model with a single remote call.
    ///
    /// The image URI is translated to a storage locator first; if that
    /// fails no call is made. The result has exactly one command id per
    /// requested model.
    pub async fn create_reconstruction_jobs(
        &self,
        image: &ImageArtifact,
        models: &BTreeSet<ModelIdentifier>,
    ) -> Result<BTreeMap<ModelIdentifier, CommandId>, PipelineError> {
        if models.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "At least one target model must be requested".into(),
            ));
        }

        let locator = to_locator(&image.uri)
            .map_err(|e| PipelineError::LocatorTranslationFailed(e.to_string()))?;

        let requested: Vec<ModelIdentifier> = models.iter().cloned().collect();
        let mut jobs = self
            .service
            .create_reconstruction_jobs(&locator, &requested)
            .await
            .map_err(|e| PipelineError::JobCreationFailed(e.to_string()))?;

        if jobs.is_empty() {
            return Err(PipelineError::JobCreationFailed(
                "service returned no jobs".into(),
            ));
        }

        jobs.retain(|model, command_id| {
            let wanted = models.contains(model);
            if !wanted {
                tracing::warn!(
                    model = %model,
                    command_id = %command_id,
                    "Ignoring unrequested job",
                );
            }
            wanted
        });

        let missing: Vec<&str> = models
            .iter()
            .filter(|m| !jobs.contains_key(*m))
            .map(ModelIdentifier::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::JobCreationFailed(format!(
                "no command id returned for: {}",
                missing.join(", ")
            )));
        }

        tracing::info!(locator = %locator, jobs = jobs.len(), "Reconstruction jobs created");
        Ok(jobs)
    }

    // -----------------------------------------------------------------------
    // Stage 3: status polling
    // -----------------------------------------------------------------------

    /// Poll one job until the backend reports a terminal status or the
    /// attempt ceiling is reached.
    ///
    /// `Success` without any model URL is not terminal; polling goes on
    /// until a URL is published.
    pub async fn poll_job(
        &self,
        command_id: &str,
        model: &ModelIdentifier,
    ) -> Result<ModelArtifact, PipelineError> {
        let mut job = ReconstructionJob::new(command_id, model.clone());
        self.track_job(&mut job, &self.cancel).await
    }

    async fn track_job(
        &self,
        job: &mut ReconstructionJob,
        cancel: &CancellationToken,
    ) -> Result<ModelArtifact, PipelineError> {
        let command_id = job.command_id.clone();
        let model = job.model.clone();

        let outcome = {
            let (command_id, model) = (command_id.as_str(), &model);
            poll_until(&self.poll_config, cancel, move |attempt| async move {
                match self.service.check_reconstruction_job(command_id, model).await {
                    Ok(report) => classify(&report, model, command_id, attempt),
                    Err(e) => {
                        // A failed status read is not a job status; try again next tick.
                        tracing::warn!(
                            model = %model,
                            command_id = %command_id,
                            attempt,
                            error = %e,
                            "Status check failed",
                        );
                        PollStep::Continue
                    }
                }
            })
            .await
        };

        match outcome {
            Ok(artifact) => {
                record(job, JobStatus::Success);
                tracing::info!(
                    model = %model,
                    command_id = %command_id,
                    "Reconstruction succeeded",
                );
                Ok(artifact)
            }
            Err(PollError::Failed(status)) => {
                record(job, status);
                tracing::warn!(
                    model = %model,
                    command_id = %command_id,
                    %status,
                    "Reconstruction failed",
                );
                Err(PipelineError::ReconstructionFailed {
                    model: model.clone(),
                    status,
                })
            }
            Err(PollError::Exhausted { attempts }) => {
                tracing::warn!(
                    model = %model,
                    command_id = %command_id,
                    attempts,
                    "Polling exhausted",
                );
                Err(PipelineError::PollingExhausted {
                    model: model.clone(),
                    attempts,
                })
            }
            Err(PollError::Cancelled) => {
                tracing::info!(model = %model, command_id = %command_id, "Polling cancelled");
                Err(PipelineError::Cancelled)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Full pipeline
    // -----------------------------------------------------------------------

    /// Run the whole pipeline in the background.
    ///
    /// The returned [`RunHandle`] yields one outcome per target model as
    /// each finishes. If an early stage fails, every model reports that
    /// stage's error. Must be called from within a Tokio runtime.
    pub fn generate_and_reconstruct(&self, request: GenerationRequest) -> RunHandle {
        let run_id = Uuid::new_v4();
        let cancel = self.cancel.child_token();
        let models = request.target_models().clone();
        let (outcome_tx, outcome_rx) = mpsc::channel(models.len().max(1));
        let run_updates = (self.updates.clone(), self.updates.subscribe());

        let this = self.clone();
        let run_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            tracing::info!(
                %run_id,
                models = request.target_models().len(),
                "Generation run started",
            );
            this.run_pipeline(run_id, request, outcome_tx, run_cancel).await;
            tracing::info!(%run_id, "Generation run finished");
        });

        RunHandle::new(run_id, models, outcome_rx, run_updates, cancel, task)
    }

    /// Persist a generated model to the asset catalog.
    pub async fn save_asset(&self, asset: &GeneratedAsset) -> Result<(), PipelineError> {
        asset
            .validate()
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;

        self.service
            .save_generated_asset(asset)
            .await
            .map_err(|e| PipelineError::SaveFailed(e.to_string()))?;

        tracing::info!(name = %asset.name, "Generated asset saved");
        Ok(())
    }

    // ---- private helpers ----

    async fn run_pipeline(
        &self,
        run_id: Uuid,
        request: GenerationRequest,
        outcomes: mpsc::Sender<ModelOutcome>,
        cancel: CancellationToken,
    ) {
        let models = request.target_models().clone();
        for model in &models {
            self.publish(run_id, model, ModelState::Idle);
        }

        if let Err(e) = request.validate() {
            let err = PipelineError::InvalidRequest(e.to_string());
            self.fail_all(run_id, &models, err, &outcomes).await;
            return;
        }
        if cancel.is_cancelled() {
            self.fail_all(run_id, &models, PipelineError::Cancelled, &outcomes)
                .await;
            return;
        }

        for model in &models {
            self.publish(run_id, model, ModelState::GeneratingImage);
        }
        let image = match self
            .generate_image_named(
                request.prompt(),
                request.reference_image(),
                request.asset_name(),
            )
            .await
        {
            Ok(image) => image,
            Err(e) => {
                self.fail_all(run_id, &models, e, &outcomes).await;
                return;
            }
        };

        if cancel.is_cancelled() {
            self.fail_all(run_id, &models, PipelineError::Cancelled, &outcomes)
                .await;
            return;
        }

        let jobs = match self.create_reconstruction_jobs(&image, &models).await {
            Ok(jobs) => jobs,
            Err(e) => {
                self.fail_all(run_id, &models, e, &outcomes).await;
                return;
            }
        };

        let mut polls = JoinSet::new();
        for (model, command_id) in jobs {
            self.publish(
                run_id,
                &model,
                ModelState::AwaitingReconstruction {
                    command_id: command_id.clone(),
                },
            );

            let this = self.clone();
            let cancel = cancel.clone();
            polls.spawn(async move {
                let mut job = ReconstructionJob::new(command_id, model);
                let result = this.track_job(&mut job, &cancel).await;
                (job.model, result)
            });
        }

        let mut pending = models;
        while let Some(joined) = polls.join_next().await {
            match joined {
                Ok((model, result)) => {
                    pending.remove(&model);
                    self.report(run_id, model, result, &outcomes).await;
                }
                Err(e) => {
                    tracing::error!(%run_id, error = %e, "Polling task panicked");
                }
            }
        }

        // Only reachable for models whose task panicked.
        for model in pending {
            let err = PipelineError::TaskAborted {
                model: model.clone(),
                detail: "polling task ended without an outcome".into(),
            };
            self.report(run_id, model, Err(err), &outcomes).await;
        }
    }

    async fn fail_all(
        &self,
        run_id: Uuid,
        models: &BTreeSet<ModelIdentifier>,
        err: PipelineError,
        outcomes: &mpsc::Sender<ModelOutcome>,
    ) {
        tracing::warn!(%run_id, error = %err, "Generation run failed before polling");
        for model in models {
            self.report(run_id, model.clone(), Err(err.clone()), outcomes)
                .await;
        }
    }

    async fn report(
        &self,
        run_id: Uuid,
        model: ModelIdentifier,
        result: Result<ModelArtifact, PipelineError>,
        outcomes: &mpsc::Sender<ModelOutcome>,
    ) {
        let state = match &result {
            Ok(artifact) => ModelState::Succeeded {
                artifact: artifact.clone(),
            },
            Err(e) => ModelState::Failed {
                reason: e.to_string(),
            },
        };
        self.publish(run_id, &model, state);

        if outcomes.send((model, result)).await.is_err() {
            tracing::debug!(%run_id, "Run handle dropped, outcome discarded");
        }
    }

    fn publish(&self, run_id: Uuid, model: &ModelIdentifier, state: ModelState) {
        self.updates
            .publish(JobUpdate::new(run_id, model.clone(), state));
    }
}

/// Classify one status reading.
fn classify(
    report: &JobStatusReport,
    model: &ModelIdentifier,
    command_id: &str,
    attempt: u32,
) -> PollStep<ModelArtifact, JobStatus> {
    match report.status() {
        JobStatus::Success => match report.artifact() {
            Some(artifact) => PollStep::Done(artifact),
            None => {
                tracing::debug!(
                    model = %model,
                    command_id = %command_id,
                    attempt,
                    "Job succeeded but no model URL is published yet",
                );
                PollStep::Continue
            }
        },
        status @ (JobStatus::Failed | JobStatus::TimedOut) => PollStep::Failed(status),
        JobStatus::Pending => {
            if !JobStatus::is_known_backend_status(&report.raw_status) {
                tracing::warn!(
                    model = %model,
                    command_id = %command_id,
                    raw_status = %report.raw_status,
                    "Unknown job status, treating as pending",
                );
            } else {
                tracing::debug!(model = %model, command_id = %command_id, attempt, "Job pending");
            }
            PollStep::Continue
        }
    }
}

/// Apply a terminal status to the job record.
fn record(job: &mut ReconstructionJob, status: JobStatus) {
    if let Err(e) = job.advance(status) {
        tracing::error!(
            model = %job.model,
            command_id = %job.command_id,
            error = %e,
            "Rejected status change",
        );
    }
}
