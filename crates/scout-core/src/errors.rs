//! Errores del core.
//!
//! - `StageError`: fallo de una etapa. Es serializable porque queda registrado
//!   en `WorkflowState::last_error` y viaja dentro de los checkpoints.
//! - `CoreEngineError`: uso indebido del motor o fallos de infraestructura que
//!   impiden siquiera arrancar/reanudar un run.
//! - `StateError`: violación de invariantes de `WorkflowState`.
//! - `CheckpointError`: contrato del `CheckpointStore`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clasificación estable de errores de etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// URL o esquema mal formado (error de entrada del llamador).
    Validation,
    /// Bloqueo SSRF.
    SecurityRejection,
    /// Transporte del colaborador no disponible.
    CollaboratorUnavailable,
    /// Llamada al colaborador excedió su timeout.
    CollaboratorTimeout,
    /// Error inesperado dentro de una etapa.
    InternalStage,
    /// Cancelación observada en un límite de etapa.
    Cancelled,
}

impl ErrorKind {
    /// Sólo los fallos de transporte admiten reintento (siempre del run completo
    /// y siempre decidido por el llamador).
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::CollaboratorUnavailable | ErrorKind::CollaboratorTimeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::SecurityRejection => "security_rejection",
            ErrorKind::CollaboratorUnavailable => "collaborator_unavailable",
            ErrorKind::CollaboratorTimeout => "collaborator_timeout",
            ErrorKind::InternalStage => "internal_stage",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Error terminal de una etapa. Cualquier `StageError` falla el run completo.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    #[error("invalid url '{url}': {reason}")]
    Validation { url: String, reason: String },
    #[error("url '{url}' rejected: {reason}")]
    SecurityRejection { url: String, reason: String },
    #[error("collaborator unavailable for '{target}': {message}")]
    CollaboratorUnavailable { target: String, message: String },
    #[error("collaborator call for '{target}' timed out after {timeout_ms}ms")]
    CollaboratorTimeout { target: String, timeout_ms: u64 },
    #[error("internal stage error: {message}")]
    #[serde(rename = "internal_stage")]
    Internal { message: String },
    #[error("run cancelled before stage '{stage}'")]
    Cancelled { stage: String },
}

impl StageError {
    pub fn internal(message: impl Into<String>) -> Self {
        StageError::Internal { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::Validation { .. } => ErrorKind::Validation,
            StageError::SecurityRejection { .. } => ErrorKind::SecurityRejection,
            StageError::CollaboratorUnavailable { .. } => ErrorKind::CollaboratorUnavailable,
            StageError::CollaboratorTimeout { .. } => ErrorKind::CollaboratorTimeout,
            StageError::Internal { .. } => ErrorKind::InternalStage,
            StageError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// URL o colaborador al que se refiere el error, si aplica.
    pub fn target(&self) -> Option<&str> {
        match self {
            StageError::Validation { url, .. } | StageError::SecurityRejection { url, .. } => Some(url),
            StageError::CollaboratorUnavailable { target, .. } | StageError::CollaboratorTimeout { target, .. } => {
                Some(target)
            }
            StageError::Internal { .. } | StageError::Cancelled { .. } => None,
        }
    }
}

impl From<StateError> for StageError {
    fn from(err: StateError) -> Self {
        StageError::internal(err.to_string())
    }
}

/// Violaciones de invariantes del estado del run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("run is terminal ({0}); no further mutation allowed")]
    Terminal(&'static str),
    #[error("url '{0}' is not a target of this run")]
    UnknownTarget(String),
    #[error("cannot complete a run without a report")]
    MissingReport,
}

/// Errores del contrato `CheckpointStore`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("sequence {attempted} for run '{run_id}' is not greater than committed {latest}")]
    SequenceConflict { run_id: String, attempted: u64, latest: u64 },
    #[error("checkpoint serialization: {0}")]
    Serialization(String),
    #[error("checkpoint backend: {0}")]
    Backend(String),
}

/// Errores del motor que impiden ejecutar/reanudar un run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreEngineError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("run id must not be empty")]
    EmptyRunId,
    #[error("checkpoint belongs to run '{found}', expected '{expected}'")]
    RunIdMismatch { expected: String, found: String },
    #[error("checkpoint {sequence} for run '{run_id}' failed fingerprint verification")]
    CorruptCheckpoint { run_id: String, sequence: u64 },
    #[error("checkpoint store unavailable: {0}")]
    CheckpointUnavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<CheckpointError> for CoreEngineError {
    fn from(err: CheckpointError) -> Self {
        CoreEngineError::CheckpointUnavailable(err.to_string())
    }
}
