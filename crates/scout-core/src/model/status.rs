use serde::{Deserialize, Serialize};

/// Estado de ciclo de vida de un run.
///
/// Transiciones válidas:
/// - `Running` -> `Complete`
/// - `Running` -> `Failed`
///
/// No existe transición de vuelta a `Running` desde un estado terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Complete => "complete",
            RunStatus::Failed => "failed",
        }
    }
}
