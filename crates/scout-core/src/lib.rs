//! scout-core: motor durable de ejecución de pipelines (DAG con checkpoints).
//!
//! El motor recibe un `RunId` y una lista de URLs objetivo, ejecuta las
//! etapas declaradas en un `ExecutionPlan` (secuenciales o en paralelo) y
//! persiste un `Checkpoint` inmutable tras cada etapa completada. Re-enviar el
//! mismo `RunId` reanuda desde el último checkpoint confirmado.
pub mod checkpoint;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod hashing;
pub mod model;
pub mod stage;

pub use checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore};
pub use engine::{EngineBuilder, EngineConfig, ExecutionPlan, RunOutcome, WorkflowEngine};
pub use errors::{CheckpointError, CoreEngineError, ErrorKind, StageError, StateError};
pub use model::{FetchArtifact, RunId, RunStatus, StructureSummary, VisualInsight, WorkflowState};
pub use stage::{Stage, StageContext, StageId, StateSlot};

// Re-export para que los consumidores no dependan de tokio-util directamente.
pub use tokio_util::sync::CancellationToken;
