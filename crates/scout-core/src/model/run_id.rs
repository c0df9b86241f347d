use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CoreEngineError;

/// Token opaco asignado por el llamador. Es la clave de checkpoint/resume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreEngineError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreEngineError::EmptyRunId);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
