use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;

use super::Checkpoint;
use crate::errors::CheckpointError;
use crate::model::RunId;

/// Almacenamiento append-only de checkpoints, indexado por `RunId` +
/// secuencia.
///
/// Contrato:
/// - `put` es síncrono respecto al llamador: devolver `Ok` significa que el
///   checkpoint es durable y visible para `get_latest`.
/// - Las secuencias de un run son estrictamente crecientes; un `put` con
///   secuencia no mayor a la última confirmada devuelve `SequenceConflict`.
/// - Escrituras concurrentes de runs distintos son independientes.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;

    /// Último checkpoint confirmado del run, si existe.
    async fn get_latest(&self, run_id: &RunId) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Historia completa del run en orden ascendente de secuencia.
    async fn history(&self, run_id: &RunId) -> Result<Vec<Checkpoint>, CheckpointError>;
}

/// Backend en memoria. Cada run mantiene su propio log; el lock por entrada de
/// `DashMap` hace atómica la comprobación de secuencia + append.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    inner: DashMap<RunId, Vec<Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cantidad de runs con al menos un checkpoint.
    pub fn run_count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let mut log = self.inner.entry(checkpoint.run_id.clone()).or_default();
        let latest = log.last().map(|c| c.sequence).unwrap_or(0);
        if checkpoint.sequence <= latest {
            return Err(CheckpointError::SequenceConflict { run_id: checkpoint.run_id.to_string(),
                                                           attempted: checkpoint.sequence,
                                                           latest });
        }
        debug!("checkpoint put run_id={} seq={} stage={}",
               checkpoint.run_id,
               checkpoint.sequence,
               checkpoint.stage);
        log.push(checkpoint);
        Ok(())
    }

    async fn get_latest(&self, run_id: &RunId) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.inner.get(run_id).and_then(|log| log.last().cloned()))
    }

    async fn history(&self, run_id: &RunId) -> Result<Vec<Checkpoint>, CheckpointError> {
        Ok(self.inner.get(run_id).map(|log| log.clone()).unwrap_or_default())
    }
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<T> {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        (**self).put(checkpoint).await
    }

    async fn get_latest(&self, run_id: &RunId) -> Result<Option<Checkpoint>, CheckpointError> {
        (**self).get_latest(run_id).await
    }

    async fn history(&self, run_id: &RunId) -> Result<Vec<Checkpoint>, CheckpointError> {
        (**self).history(run_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkflowState;
    use crate::stage::StageId;

    fn checkpoint(run: &str, seq: u64) -> Checkpoint {
        let state = WorkflowState::new(RunId::new(run).expect("id"), ["https://a.example"]);
        Checkpoint::seal(seq, StageId::new("fetch_all"), state).expect("seal")
    }

    #[tokio::test]
    async fn sequences_are_strictly_increasing_per_run() {
        let store = InMemoryCheckpointStore::new();
        store.put(checkpoint("r1", 1)).await.expect("first");
        store.put(checkpoint("r1", 2)).await.expect("second");
        let err = store.put(checkpoint("r1", 2)).await.unwrap_err();
        assert_eq!(err,
                   CheckpointError::SequenceConflict { run_id: "r1".into(),
                                                       attempted: 2,
                                                       latest: 2 });
        // Otro run no se ve afectado.
        store.put(checkpoint("r2", 1)).await.expect("other run");

        let r1 = RunId::new("r1").expect("id");
        let latest = store.get_latest(&r1).await.expect("get").expect("some");
        assert_eq!(latest.sequence, 2);
        assert_eq!(store.history(&r1).await.expect("history").len(), 2);
        assert_eq!(store.run_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_runs_write_independently() {
        let store = std::sync::Arc::new(InMemoryCheckpointStore::new());
        let mut handles = Vec::new();
        for run in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for seq in 1..=5 {
                    store.put(checkpoint(&format!("run-{run}"), seq)).await.expect("put");
                }
            }));
        }
        for h in handles {
            h.await.expect("join");
        }
        for run in 0..8 {
            let id = RunId::new(format!("run-{run}")).expect("id");
            let seqs: Vec<u64> = store.history(&id).await.expect("h").iter().map(|c| c.sequence).collect();
            assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        }
    }
}
