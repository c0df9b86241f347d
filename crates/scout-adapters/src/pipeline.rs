//! Ensamblado del DAG estándar:
//! `fetch_all` -> {`visual_analyze`, `structure_analyze`} -> `synthesize`.
use std::sync::Arc;

use scout_core::{CheckpointStore, CoreEngineError, EngineConfig, Stage, WorkflowEngine};
use scout_guard::{ContentSanitizer, UrlGuard};

use crate::collaborators::{ModelClient, PageFetcher};
use crate::stages::{FetchStage, StructureStage, SynthesizeStage, VisualStage};

pub const FETCH_ALL: &str = "fetch_all";
pub const VISUAL_ANALYZE: &str = "visual_analyze";
pub const STRUCTURE_ANALYZE: &str = "structure_analyze";
pub const SYNTHESIZE: &str = "synthesize";

/// Dependencias inyectadas al construir el pipeline. Cada engine recibe las
/// suyas; no hay instancias globales compartidas entre runs.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub model: Arc<dyn ModelClient>,
    pub guard: UrlGuard,
    pub sanitizer: ContentSanitizer,
}

impl Collaborators {
    pub fn new(fetcher: Arc<dyn PageFetcher>, model: Arc<dyn ModelClient>, guard: UrlGuard) -> Self {
        Self { fetcher,
               model,
               guard,
               sanitizer: ContentSanitizer::default() }
    }
}

/// Construye el engine con el pipeline estándar sobre `store`.
pub fn standard_engine<C>(store: C,
                          collaborators: &Collaborators,
                          config: EngineConfig)
                          -> Result<WorkflowEngine<C>, CoreEngineError>
    where C: CheckpointStore
{
    let fetch = FetchStage::new(Arc::clone(&collaborators.fetcher),
                                collaborators.guard.clone(),
                                collaborators.sanitizer);
    let analyze: Vec<Arc<dyn Stage>> =
        vec![Arc::new(VisualStage::new(Arc::clone(&collaborators.model))), Arc::new(StructureStage::new())];

    WorkflowEngine::builder(store).with_config(config)
                                  .first_stage(fetch)
                                  .then_parallel(analyze)
                                  .then(SynthesizeStage::new(Arc::clone(&collaborators.model)))
                                  .build()
}
