//! Etapas concretas del pipeline.

pub mod fetch;
pub mod structure;
pub mod synthesize;
pub mod visual;

pub use fetch::{FetchStage, NO_TARGETS};
pub use structure::{extract_structure, StructureStage};
pub use synthesize::{SynthesisContext, SynthesizeStage};
pub use visual::VisualStage;
