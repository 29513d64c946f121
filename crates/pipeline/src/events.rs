//! Per-model state updates published for the presentation layer.
//!
//! [`UpdateBus`] wraps a `tokio::sync::broadcast` channel. Subscribe
//! before starting a run to observe every transition of that run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use showroom_core::job::ModelArtifact;
use showroom_core::types::{CommandId, ModelIdentifier};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ModelState / JobUpdate
// ---------------------------------------------------------------------------

/// Where one model of one run currently stands.
///
/// Transitions: `Idle -> GeneratingImage -> AwaitingReconstruction ->
/// Succeeded | Failed`. A run may jump straight to `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelState {
    Idle,
    GeneratingImage,
    AwaitingReconstruction { command_id: CommandId },
    Succeeded { artifact: ModelArtifact },
    Failed { reason: String },
}

impl ModelState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

/// A state transition for one model within one run.
#[derive(Debug, Clone, Serialize)]
pub struct JobUpdate {
    pub run_id: Uuid,
    pub model: ModelIdentifier,
    pub state: ModelState,
    pub timestamp: DateTime<Utc>,
}

impl JobUpdate {
    pub fn new(run_id: Uuid, model: ModelIdentifier, state: ModelState) -> Self {
        Self {
            run_id,
            model,
            state,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out of [`JobUpdate`]s.
///
/// When the buffer is full the oldest updates are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct UpdateBus {
    sender: broadcast::Sender<JobUpdate>,
}

impl UpdateBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an update to all current subscribers.
    pub fn publish(&self, update: JobUpdate) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(update);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.sender.subscribe()
    }
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
