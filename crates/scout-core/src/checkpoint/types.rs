//! `Checkpoint`: snapshot inmutable de `WorkflowState` con número de secuencia.
//!
//! Rol en el flujo:
//! - El motor sella un checkpoint tras cada etapa completada y lo entrega al
//!   `CheckpointStore` antes de iniciar la siguiente etapa.
//! - `fingerprint` es el hash blake3 del JSON canónico del estado (incluye
//!   `ENGINE_VERSION`), verificado al reanudar.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::constants::ENGINE_VERSION;
use crate::errors::CheckpointError;
use crate::hashing::hash_value;
use crate::model::{RunId, WorkflowState};
use crate::stage::StageId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: RunId,
    /// Estrictamente creciente por `run_id`, comienza en 1.
    pub sequence: u64,
    /// Etapa cuya finalización originó este checkpoint.
    pub stage: StageId,
    pub fingerprint: String,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Construye y sella un checkpoint calculando su fingerprint.
    pub fn seal(sequence: u64, stage: StageId, state: WorkflowState) -> Result<Self, CheckpointError> {
        let fingerprint = fingerprint_of(&state)?;
        Ok(Self { run_id: state.run_id().clone(),
                  sequence,
                  stage,
                  fingerprint,
                  state,
                  created_at: Utc::now() })
    }

    /// Recalcula el fingerprint y lo compara con el almacenado.
    pub fn verify(&self) -> Result<bool, CheckpointError> {
        Ok(fingerprint_of(&self.state)? == self.fingerprint)
    }
}

fn fingerprint_of(state: &WorkflowState) -> Result<String, CheckpointError> {
    let value = serde_json::to_value(state).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
    Ok(hash_value(&json!({
        "engine_version": ENGINE_VERSION,
        "state": value,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tampered_state_fails_verification() {
        let state = WorkflowState::new(RunId::new("job-1").expect("id"), ["https://a.example"]);
        let mut cp = Checkpoint::seal(1, StageId::new("fetch_all"), state).expect("seal");
        assert!(cp.verify().expect("verify"));

        cp.state.set_report("forged").expect("mutable");
        assert!(!cp.verify().expect("verify"));
    }
}
