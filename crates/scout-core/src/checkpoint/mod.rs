//! Checkpoints inmutables y trait `CheckpointStore`.

mod store;
mod types;

pub use store::{CheckpointStore, InMemoryCheckpointStore};
pub use types::Checkpoint;
