use std::time::Duration;

use crate::constants::DEFAULT_CALL_TIMEOUT_SECS;
use crate::model::RunId;
use crate::stage::StageContext;

/// Parámetros de ejecución del motor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timeout por llamada a colaborador (fetch, modelo, escritura de
    /// checkpoint).
    pub call_timeout: Duration,
    /// Permite descartar URLs cuyo fetch falló por transporte. Desactivado
    /// por defecto: cualquier fallo falla el run completo.
    pub tolerate_partial: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
               tolerate_partial: false }
    }
}

impl EngineConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_partial_tolerance(mut self, tolerate: bool) -> Self {
        self.tolerate_partial = tolerate;
        self
    }

    pub(crate) fn context_for(&self, run_id: RunId) -> StageContext {
        StageContext { run_id,
                       call_timeout: self.call_timeout,
                       tolerate_partial: self.tolerate_partial }
    }
}
