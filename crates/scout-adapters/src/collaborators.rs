//! Contratos de los colaboradores externos: fetch de páginas y llamadas de
//! modelo. Las implementaciones reales (navegador remoto, proxy de modelos)
//! viven fuera de este workspace y se inyectan al construir el pipeline.
use std::fmt;

use async_trait::async_trait;
use scout_core::{StageContext, StageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Fallos que un colaborador puede reportar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("timed out")]
    Timeout,
    #[error("call failed: {0}")]
    CallFailed(String),
}

impl CollaboratorError {
    /// Traduce al error de etapa; `target` es la URL o el colaborador
    /// afectado.
    pub fn into_stage_error(self, target: &str, ctx: &StageContext) -> StageError {
        match self {
            CollaboratorError::Timeout => StageError::CollaboratorTimeout { target: target.to_string(),
                                                                            timeout_ms: ctx.call_timeout.as_millis() as u64 },
            other => StageError::CollaboratorUnavailable { target: target.to_string(),
                                                           message: other.to_string() },
        }
    }
}

/// Resultado crudo de un fetch: texto de la página y captura visual.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedPage {
    pub text: String,
    pub visual: Vec<u8>,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Sólo recibe URLs ya aceptadas por `UrlGuard`.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CollaboratorError>;
}

/// Capacidad de modelo requerida por una llamada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vision,
    Text,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Vision => "vision",
            Capability::Text => "text",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Llamada de modelo etiquetada por capacidad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCall {
    AnalyzeVisual { image: Vec<u8>, prompt: String },
    Synthesize { context: String, prompt: String },
}

impl ModelCall {
    pub fn capability(&self) -> Capability {
        match self {
            ModelCall::AnalyzeVisual { .. } => Capability::Vision,
            ModelCall::Synthesize { .. } => Capability::Text,
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn analyze_visual(&self, image: &[u8], prompt: &str) -> Result<String, CollaboratorError>;

    async fn synthesize(&self, context: &str, prompt: &str) -> Result<String, CollaboratorError>;

    /// Enruta la llamada al método de su capacidad.
    async fn dispatch(&self, call: ModelCall) -> Result<String, CollaboratorError> {
        match call {
            ModelCall::AnalyzeVisual { image, prompt } => self.analyze_visual(&image, &prompt).await,
            ModelCall::Synthesize { context, prompt } => self.synthesize(&context, &prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scout_core::{ErrorKind, RunId};

    use super::*;

    struct Tagging;

    #[async_trait]
    impl ModelClient for Tagging {
        async fn analyze_visual(&self, image: &[u8], _prompt: &str) -> Result<String, CollaboratorError> {
            Ok(format!("vision:{}", image.len()))
        }

        async fn synthesize(&self, context: &str, _prompt: &str) -> Result<String, CollaboratorError> {
            Ok(format!("text:{context}"))
        }
    }

    #[tokio::test]
    async fn dispatch_routes_by_capability() {
        let call = ModelCall::AnalyzeVisual { image: vec![1, 2, 3],
                                              prompt: "p".into() };
        assert_eq!(call.capability(), Capability::Vision);
        assert_eq!(Tagging.dispatch(call).await.expect("vision"), "vision:3");

        let call = ModelCall::Synthesize { context: "ctx".into(),
                                           prompt: "p".into() };
        assert_eq!(call.capability(), Capability::Text);
        assert_eq!(Tagging.dispatch(call).await.expect("text"), "text:ctx");
    }

    #[test]
    fn timeout_maps_to_collaborator_timeout_with_target() {
        let ctx = StageContext::new(RunId::new("r").expect("id"), Duration::from_secs(30));
        let err = CollaboratorError::Timeout.into_stage_error("https://a.example", &ctx);
        assert_eq!(err.kind(), ErrorKind::CollaboratorTimeout);
        assert_eq!(err.target(), Some("https://a.example"));

        let err = CollaboratorError::CallFailed("500".into()).into_stage_error("model:text", &ctx);
        assert_eq!(err.kind(), ErrorKind::CollaboratorUnavailable);
    }
}
