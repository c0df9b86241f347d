//! Cliente de herramientas remotas con endpoint provisto por el llamador.
//!
//! Es el segundo punto de uso de `UrlGuard`: el endpoint se valida antes de
//! cada `connect` y cada `call_tool`, con la misma función que protege al
//! fetch de páginas.
use async_trait::async_trait;
use log::debug;
use scout_core::{StageContext, StageError};
use scout_guard::{GuardError, UrlGuard, ValidatedUrl};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::collaborators::CollaboratorError;

/// Transporte concreto hacia el servidor de herramientas.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn connect(&self, endpoint: &Url) -> Result<(), CollaboratorError>;

    async fn call_tool(&self, endpoint: &Url, tool: &str, arguments: Value) -> Result<Value, CollaboratorError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool endpoint rejected: {0}")]
    Rejected(#[from] GuardError),
    #[error("tool transport: {0}")]
    Transport(#[from] CollaboratorError),
}

impl ToolError {
    pub fn into_stage_error(self, endpoint: &str, ctx: &StageContext) -> StageError {
        match self {
            ToolError::Rejected(err) => err.into_stage_error(endpoint),
            ToolError::Transport(err) => err.into_stage_error(endpoint, ctx),
        }
    }
}

pub struct GuardedToolClient<T: ToolTransport> {
    guard: UrlGuard,
    transport: T,
    endpoint: String,
}

impl<T: ToolTransport> GuardedToolClient<T> {
    pub fn new(guard: UrlGuard, transport: T, endpoint: impl Into<String>) -> Self {
        Self { guard,
               transport,
               endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn connect(&self) -> Result<ValidatedUrl, ToolError> {
        let endpoint = self.guard.validate(&self.endpoint).await?;
        self.transport.connect(endpoint.url()).await?;
        debug!("tool transport connected host={}", endpoint.host());
        Ok(endpoint)
    }

    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolError> {
        let endpoint = self.guard.validate(&self.endpoint).await?;
        debug!("tool call host={} tool={}", endpoint.host(), tool);
        Ok(self.transport.call_tool(endpoint.url(), tool, arguments).await?)
    }
}
