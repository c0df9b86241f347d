use serde::Serialize;

use crate::errors::StageError;
use crate::model::{RunId, RunStatus, WorkflowState};
use crate::stage::StageId;

/// Resultado devuelto al llamador tras un `submit`.
///
/// `Complete` siempre trae `report`; `Failed` siempre trae `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    pub report: Option<String>,
    pub error: Option<StageError>,
    /// Secuencia del checkpoint desde el que se reanudó, si hubo uno.
    pub resumed_from: Option<u64>,
    /// Etapas ejecutadas en esta invocación (no incluye las restauradas).
    pub executed_stages: Vec<StageId>,
    /// Última secuencia confirmada para el run (0 si ninguna).
    pub last_sequence: u64,
    #[serde(skip)]
    pub state: WorkflowState,
}

impl RunOutcome {
    pub(crate) fn from_state(state: WorkflowState,
                             resumed_from: Option<u64>,
                             executed_stages: Vec<StageId>,
                             last_sequence: u64)
                             -> Self {
        Self { run_id: state.run_id().clone(),
               status: state.status(),
               report: state.report().map(str::to_string),
               error: state.last_error().cloned(),
               resumed_from,
               executed_stages,
               last_sequence,
               state }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_with_internal_error_serializes() {
        let mut state = WorkflowState::new(RunId::new("job-i").expect("id"), ["https://a.example"]);
        state.fail(StageError::internal("model returned an empty report")).expect("fail");
        let outcome = RunOutcome::from_state(state, Some(3), Vec::new(), 3);

        let json = serde_json::to_value(&outcome).expect("serialize outcome");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "internal_stage");
        assert_eq!(json["error"]["message"], "model returned an empty report");
        assert!(json.get("state").is_none());
    }
}
