use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one asynchronous reconstruction job, as issued
/// by the remote service.
pub type CommandId = String;

/// Selects which reconstruction backend variant should produce an
/// artifact (e.g. `"triposr"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelIdentifier(String);

impl ModelIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelIdentifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModelIdentifier {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for ModelIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
