//! Handle to one in-flight generation run and its final report.

use std::collections::{BTreeMap, BTreeSet};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use showroom_core::job::ModelArtifact;
use showroom_core::types::ModelIdentifier;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::events::{JobUpdate, UpdateBus};

/// Final outcome for one model of a run.
pub type ModelOutcome = (ModelIdentifier, Result<ModelArtifact, PipelineError>);

/// Handle to a running [`generate_and_reconstruct`] pipeline.
///
/// Yields exactly one [`ModelOutcome`] per target model, in completion
/// order, then ends. The sequence cannot be restarted. Dropping the
/// handle cancels the run.
///
/// [`generate_and_reconstruct`]: crate::JobOrchestrator::generate_and_reconstruct
pub struct RunHandle {
    run_id: Uuid,
    models: BTreeSet<ModelIdentifier>,
    outcomes: mpsc::Receiver<ModelOutcome>,
    /// Subscribed before the pipeline task was spawned.
    first_updates: Option<broadcast::Receiver<JobUpdate>>,
    bus: Arc<UpdateBus>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: Uuid,
        models: BTreeSet<ModelIdentifier>,
        outcomes: mpsc::Receiver<ModelOutcome>,
        updates: (Arc<UpdateBus>, broadcast::Receiver<JobUpdate>),
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        let (bus, first_updates) = updates;
        Self {
            run_id,
            models,
            outcomes,
            first_updates: Some(first_updates),
            bus,
            cancel,
            task,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The models this run was asked to produce.
    pub fn models(&self) -> &BTreeSet<ModelIdentifier> {
        &self.models
    }

    /// Wait for the next model to finish. Returns `None` once every
    /// model has reported.
    pub async fn next(&mut self) -> Option<ModelOutcome> {
        self.outcomes.recv().await
    }

    /// State transitions of this run only.
    ///
    /// The first call replays every transition since the run started.
    /// Later calls only see transitions published after the call, so
    /// they only end if every model finishes after that point.
    pub fn subscribe(&mut self) -> RunUpdates {
        let rx = match self.first_updates.take() {
            Some(rx) => rx,
            None => self.bus.subscribe(),
        };
        RunUpdates {
            run_id: self.run_id,
            remaining: self.models.clone(),
            rx,
        }
    }

    /// Request cooperative cancellation. Polling stops at the next
    /// check; unfinished models report [`PipelineError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the background pipeline task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Drain every remaining outcome into a [`RunReport`].
    pub async fn collect(mut self) -> RunReport {
        let mut outcomes = BTreeMap::new();
        while let Some((model, result)) = self.next().await {
            outcomes.insert(model, result);
        }
        RunReport {
            run_id: self.run_id,
            outcomes,
        }
    }
}

impl Stream for RunHandle {
    type Item = ModelOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.outcomes.poll_recv(cx)
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Receiver of one run's [`JobUpdate`]s.
///
/// Ends once every model of the run has reached a terminal state.
pub struct RunUpdates {
    run_id: Uuid,
    remaining: BTreeSet<ModelIdentifier>,
    rx: broadcast::Receiver<JobUpdate>,
}

impl RunUpdates {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the next transition of this run.
    pub async fn recv(&mut self) -> Option<JobUpdate> {
        while !self.remaining.is_empty() {
            match self.rx.recv().await {
                Ok(update) if update.run_id == self.run_id => {
                    if update.state.is_terminal() {
                        self.remaining.remove(&update.model);
                    }
                    return Some(update);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(run_id = %self.run_id, skipped, "Run update receiver lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        None
    }
}

/// Per-model outcomes of a finished run.
///
/// Each model succeeds or fails on its own; there is no aggregate flag.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcomes: BTreeMap<ModelIdentifier, Result<ModelArtifact, PipelineError>>,
}

impl RunReport {
    pub fn get(&self, model: &ModelIdentifier) -> Option<&Result<ModelArtifact, PipelineError>> {
        self.outcomes.get(model)
    }

    pub fn successes(&self) -> impl Iterator<Item = (&ModelIdentifier, &ModelArtifact)> {
        self.outcomes
            .iter()
            .filter_map(|(model, result)| result.as_ref().ok().map(|a| (model, a)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ModelIdentifier, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|(model, result)| result.as_ref().err().map(|e| (model, e)))
    }
}
