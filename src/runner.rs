//! Ejecución de un job: abre el store, arma el pipeline estándar y traduce el
//! `RunOutcome` a la salida JSON del entrypoint.
use std::sync::Arc;

use log::{info, warn};
use scout_adapters::{standard_engine, Collaborators};
use scout_core::{CancellationToken, CheckpointStore, ErrorKind, InMemoryCheckpointStore, RunOutcome, RunStatus};
use scout_persistence::{build_pool, DbConfig, PgCheckpointStore};
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppError;

/// Línea JSON que el runner imprime al terminar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl JobReport {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        Self { job_id: outcome.run_id.to_string(),
               status: outcome.status,
               report: outcome.report.clone(),
               error: outcome.error.as_ref().map(ToString::to_string),
               error_kind: outcome.error.as_ref().map(|e| e.kind()) }
    }

    pub fn exit_code(&self) -> u8 {
        match self.status {
            RunStatus::Complete => 0,
            _ => 1,
        }
    }
}

/// Store Postgres si hay `DbConfig`; si no, uno en memoria (sin resume entre
/// procesos).
pub async fn open_store(database: Option<&DbConfig>) -> Result<Arc<dyn CheckpointStore>, AppError> {
    match database {
        Some(cfg) => {
            let cfg = cfg.clone();
            let pool = tokio::task::spawn_blocking(move || {
                           build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
                       }).await
                         .map_err(|e| AppError::Internal(format!("pool task: {e}")))??;
            info!("checkpoint store: postgres");
            Ok(Arc::new(PgCheckpointStore::from_pool(pool)))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory checkpoint store (no cross-process resume)");
            Ok(Arc::new(InMemoryCheckpointStore::new()))
        }
    }
}

/// Ejecuta (o reanuda) el job descrito por `config`.
pub async fn run_job<C>(store: C,
                        collaborators: &Collaborators,
                        config: &AppConfig,
                        cancel: &CancellationToken)
                        -> Result<RunOutcome, AppError>
    where C: CheckpointStore
{
    let engine = standard_engine(store, collaborators, config.engine.clone())?;
    info!("Starting job {} with {} URLs",
          config.job.run_id,
          config.job.targets.len());
    let outcome = engine.submit_with_cancel(config.job.run_id.clone(), config.job.targets.clone(), cancel)
                        .await?;
    match &outcome.error {
        None => info!("Job {} finished status={} executed={} resumed_from={:?}",
                      outcome.run_id,
                      outcome.status.as_str(),
                      outcome.executed_stages.len(),
                      outcome.resumed_from),
        Some(err) => warn!("Job {} failed kind={:?}: {}", outcome.run_id, err.kind(), err),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_omits_report_field() {
        let report = JobReport { job_id: "job-2".into(),
                                 status: RunStatus::Failed,
                                 report: None,
                                 error: Some("url 'https://localhost/' rejected: local host".into()),
                                 error_kind: Some(ErrorKind::SecurityRejection) };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "security_rejection");
        assert!(json.get("report").is_none());
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn in_memory_store_without_database() {
        let store = open_store(None).await.unwrap();
        let run = scout_core::RunId::new("empty-run").unwrap();
        assert!(store.get_latest(&run).await.unwrap().is_none());
    }
}
