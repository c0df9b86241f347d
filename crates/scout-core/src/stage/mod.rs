//! Definiciones relacionadas a etapas (stages).
//!
//! Una etapa es una transformación `WorkflowState -> WorkflowState` que puede
//! invocar colaboradores externos. El motor sólo incorpora de su salida el
//! `StateSlot` que la etapa declara escribir.

pub mod context;
pub mod definition;

pub use context::StageContext;
pub use definition::{Stage, StageId, StateSlot};
