use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::StageError;
use crate::model::RunId;

/// Contexto que el motor entrega a cada etapa.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub run_id: RunId,
    /// Timeout por llamada a colaborador.
    pub call_timeout: Duration,
    /// Tolerancia parcial por URL (opt-in; por defecto falla el run completo).
    pub tolerate_partial: bool,
}

impl StageContext {
    pub fn new(run_id: RunId, call_timeout: Duration) -> Self {
        Self { run_id,
               call_timeout,
               tolerate_partial: false }
    }

    /// Ejecuta una llamada a colaborador con el timeout configurado. Vencer el
    /// plazo es un fallo de etapa (`CollaboratorTimeout`), nunca un cuelgue.
    pub async fn bounded<F, T>(&self, target: &str, call: F) -> Result<T, StageError>
        where F: Future<Output = Result<T, StageError>>
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("collaborator timeout run_id={} target={} timeout_ms={}",
                      self.run_id,
                      target,
                      self.call_timeout.as_millis());
                Err(StageError::CollaboratorTimeout { target: target.to_string(),
                                                      timeout_ms: self.call_timeout.as_millis() as u64 })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_turns_slow_calls_into_timeouts() {
        let ctx = StageContext::new(RunId::new("r").expect("id"), Duration::from_millis(10));
        let res: Result<(), _> = ctx.bounded("https://slow.example", async {
                                        tokio::time::sleep(Duration::from_secs(5)).await;
                                        Ok(())
                                    })
                                    .await;
        assert_eq!(res,
                   Err(StageError::CollaboratorTimeout { target: "https://slow.example".into(),
                                                         timeout_ms: 10 }));
    }

    #[tokio::test]
    async fn bounded_passes_through_fast_results() {
        let ctx = StageContext::new(RunId::new("r").expect("id"), Duration::from_secs(1));
        let res = ctx.bounded("t", async { Ok::<_, StageError>(7) }).await;
        assert_eq!(res, Ok(7));
    }
}
