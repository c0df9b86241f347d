//! scout-adapters: colaboradores externos y etapas concretas del pipeline.
//!
//! Este crate provee:
//! - Contratos de colaboradores (`PageFetcher`, `ModelClient`,
//!   `ToolTransport`) y el enrutamiento por `Capability`.
//! - Las cuatro etapas del DAG y `standard_engine`, que las ensambla.
//! - `GuardedToolClient`, que valida endpoints de herramientas con el mismo
//!   `UrlGuard` que protege al fetch.
pub mod collaborators;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod tools;

pub use collaborators::{Capability, CollaboratorError, FetchedPage, ModelCall, ModelClient, PageFetcher};
pub use pipeline::{standard_engine, Collaborators, FETCH_ALL, STRUCTURE_ANALYZE, SYNTHESIZE, VISUAL_ANALYZE};
pub use stages::{extract_structure, FetchStage, NO_TARGETS, StructureStage, SynthesisContext, SynthesizeStage, VisualStage};
pub use tools::{GuardedToolClient, ToolError, ToolTransport};
