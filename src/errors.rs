use scout_core::CoreEngineError;
use scout_persistence::PersistenceError;
use thiserror::Error;

/// Errores del entrypoint: todo lo que impide siquiera producir un
/// `RunOutcome`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error del motor: {0}")]
    Engine(#[from] CoreEngineError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error interno: {0}")]
    Internal(String),
}

impl AppError {
    /// Prefijo estable usado en la salida JSON de error del runner.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Configuration error",
            AppError::Engine(_) | AppError::Persistence(_) => "Workflow error",
            AppError::Internal(_) => "Unexpected error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_variant_format() {
        let err = AppError::Config("JOB_ID no definido".into());
        assert_eq!(err.to_string(), "Error de configuración: JOB_ID no definido");
        assert_eq!(err.category(), "Configuration error");
    }

    #[test]
    fn engine_errors_convert() {
        let err: AppError = CoreEngineError::EmptyRunId.into();
        assert!(matches!(err, AppError::Engine(_)));
        assert_eq!(err.category(), "Workflow error");
    }
}
