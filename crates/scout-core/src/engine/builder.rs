//! Builder para `WorkflowEngine`.
//!
//! Obliga a declarar primero la etapa inicial y luego encadenar pasos
//! secuenciales (`then`) o grupos paralelos (`then_parallel`). La validación
//! del DAG (ids únicos, slots disjuntos entre hermanas) ocurre en `build`.
//!
//! ```ignore
//! let engine = WorkflowEngine::builder(store)
//!     .first_stage(FetchStage::new(..))
//!     .then_parallel(vec![visual, structure])
//!     .then(SynthesizeStage::new(..))
//!     .build()?;
//! ```
use std::sync::Arc;

use super::{EngineConfig, ExecutionPlan, WorkflowEngine};
use crate::checkpoint::CheckpointStore;
use crate::errors::CoreEngineError;
use crate::stage::Stage;

/// Estado inicial del builder: sólo el store y la configuración.
#[derive(Debug)]
pub struct EngineBuilderInit<C: CheckpointStore> {
    store: C,
    config: EngineConfig,
}

impl<C: CheckpointStore> EngineBuilderInit<C> {
    pub(crate) fn new(store: C) -> Self {
        Self { store,
               config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Define la etapa inicial del plan.
    pub fn first_stage<S>(self, stage: S) -> EngineBuilder<C>
        where S: Stage + 'static
    {
        let mut plan = ExecutionPlan::new();
        plan.push_group(vec![Arc::new(stage)]);
        EngineBuilder { store: self.store,
                        config: self.config,
                        plan }
    }
}

/// Builder con al menos una etapa declarada.
#[derive(Debug)]
pub struct EngineBuilder<C: CheckpointStore> {
    store: C,
    config: EngineConfig,
    plan: ExecutionPlan,
}

impl<C: CheckpointStore> EngineBuilder<C> {
    /// Añade un paso secuencial.
    pub fn then<S>(mut self, stage: S) -> Self
        where S: Stage + 'static
    {
        self.plan.push_group(vec![Arc::new(stage)]);
        self
    }

    /// Añade un grupo de etapas que corren en paralelo; el motor espera a
    /// todas antes de continuar.
    pub fn then_parallel(mut self, stages: Vec<Arc<dyn Stage>>) -> Self {
        self.plan.push_group(stages);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<WorkflowEngine<C>, CoreEngineError> {
        self.plan.validate()?;
        Ok(WorkflowEngine::from_parts(self.store, self.plan, self.config))
    }
}
