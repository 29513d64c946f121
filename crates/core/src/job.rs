//! Reconstruction jobs, their status state machine, and the model
//! artifacts a successful job yields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{CommandId, ModelIdentifier};

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Status of one reconstruction job as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
    TimedOut,
}

impl JobStatus {
    /// Map a backend status string to a [`JobStatus`].
    ///
    /// The backend relays run-command statuses verbatim, so several
    /// spellings collapse onto one variant. Matching is case-insensitive.
    /// Unrecognised values are treated as still running.
    pub fn from_backend(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "completed" => Self::Success,
            "failed" | "failure" | "error" | "cancelled" | "canceled" | "cancelling" => {
                Self::Failed
            }
            "timedout" | "timed_out" | "timeout" => Self::TimedOut,
            _ => Self::Pending,
        }
    }

    /// Whether `raw` is a status string [`from_backend`](Self::from_backend)
    /// recognises (as opposed to falling back to `Pending`).
    pub fn is_known_backend_status(raw: &str) -> bool {
        matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "pending"
                | "inprogress"
                | "in_progress"
                | "delayed"
                | "success"
                | "succeeded"
                | "completed"
                | "failed"
                | "failure"
                | "error"
                | "cancelled"
                | "canceled"
                | "cancelling"
                | "timedout"
                | "timed_out"
                | "timeout"
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Validate a status transition. Status only ever moves out of
    /// `Pending`; a terminal status never changes again.
    pub fn transition(self, to: JobStatus) -> Result<JobStatus, CoreError> {
        match (self, to) {
            (Self::Pending, next) => Ok(next),
            (from, to) if from == to => Ok(to),
            (from, to) => Err(CoreError::InvalidTransition { from, to }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::TimedOut => "TimedOut",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ModelArtifact
// ---------------------------------------------------------------------------

/// Downloadable 3D model files produced by a successful job.
///
/// Always carries at least one non-empty URI; construct through
/// [`ModelArtifact::from_uris`]. Deserialization goes through the same
/// check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawModelArtifact")]
pub struct ModelArtifact {
    glb_uri: Option<String>,
    usdz_uri: Option<String>,
}

#[derive(Deserialize)]
struct RawModelArtifact {
    #[serde(default)]
    glb_uri: Option<String>,
    #[serde(default)]
    usdz_uri: Option<String>,
}

impl TryFrom<RawModelArtifact> for ModelArtifact {
    type Error = CoreError;

    fn try_from(raw: RawModelArtifact) -> Result<Self, Self::Error> {
        Self::from_uris(raw.glb_uri, raw.usdz_uri)
            .ok_or_else(|| CoreError::Validation("Model artifact needs a GLB or USDZ URI".into()))
    }
}

impl ModelArtifact {
    /// Build an artifact from optional URIs. Empty strings count as
    /// absent. Returns `None` when neither URI is present.
    pub fn from_uris(glb_uri: Option<String>, usdz_uri: Option<String>) -> Option<Self> {
        let glb_uri = glb_uri.filter(|u| !u.trim().is_empty());
        let usdz_uri = usdz_uri.filter(|u| !u.trim().is_empty());
        if glb_uri.is_none() && usdz_uri.is_none() {
            return None;
        }
        Some(Self { glb_uri, usdz_uri })
    }

    pub fn glb_uri(&self) -> Option<&str> {
        self.glb_uri.as_deref()
    }

    pub fn usdz_uri(&self) -> Option<&str> {
        self.usdz_uri.as_deref()
    }
}

// ---------------------------------------------------------------------------
// ReconstructionJob
// ---------------------------------------------------------------------------

/// One image-to-3D job running under a single model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionJob {
    pub command_id: CommandId,
    pub model: ModelIdentifier,
    status: JobStatus,
}

impl ReconstructionJob {
    pub fn new(command_id: impl Into<CommandId>, model: ModelIdentifier) -> Self {
        Self {
            command_id: command_id.into(),
            model,
            status: JobStatus::Pending,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Record a newly observed status, enforcing monotonicity.
    pub fn advance(&mut self, observed: JobStatus) -> Result<JobStatus, CoreError> {
        self.status = self.status.transition(observed)?;
        Ok(self.status)
    }
}
