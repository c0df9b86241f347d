//! Modelos del run: identificador, estado agregado y artifacts por URL.

pub mod artifacts;
pub mod run_id;
pub mod state;
pub mod status;

pub use artifacts::{FetchArtifact, StructureSummary, VisualInsight};
pub use run_id::RunId;
pub use state::WorkflowState;
pub use status::RunStatus;
