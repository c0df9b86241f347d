use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StageContext;
use crate::errors::StageError;
use crate::model::WorkflowState;

/// Identificador estable de una etapa dentro del plan. Se persiste en el
/// ledger `completed_stages` de cada checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Campos de `WorkflowState` que una etapa puede escribir. Etapas hermanas de
/// un mismo grupo paralelo deben declarar slots disjuntos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSlot {
    /// Artifacts de fetch (y URLs descartadas bajo tolerancia parcial).
    Fetched,
    Structures,
    Visuals,
    Report,
}

/// Contrato de una etapa. Implementaciones deben ser puras respecto al estado
/// recibido: todo efecto externo pasa por colaboradores acotados por
/// `StageContext::bounded`.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Identificador estable y único dentro del plan.
    fn id(&self) -> StageId;

    /// Slot de `WorkflowState` que esta etapa produce.
    fn writes(&self) -> StateSlot;

    /// Ejecuta la etapa sobre una copia del estado y devuelve el estado nuevo.
    async fn run(&self, state: WorkflowState, ctx: &StageContext) -> Result<WorkflowState, StageError>;
}
