use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use log::info;
use scout_core::{Stage, StageContext, StageError, StageId, StateSlot, StructureSummary, VisualInsight, WorkflowState};
use serde::Serialize;

use crate::collaborators::{Capability, ModelCall, ModelClient};
use crate::pipeline::SYNTHESIZE;
use crate::prompts::SYNTHESIS_PROMPT;

/// Contexto que recibe el modelo de texto. Los mapas conservan el orden de
/// las URLs objetivo.
#[derive(Debug, Serialize)]
pub struct SynthesisContext<'a> {
    pub targets: Vec<&'a str>,
    pub visual_insights: &'a IndexMap<String, VisualInsight>,
    pub structures: &'a IndexMap<String, StructureSummary>,
    /// URLs descartadas bajo tolerancia parcial, con el motivo.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<(&'a str, String)>,
}

impl<'a> SynthesisContext<'a> {
    pub fn from_state(state: &'a WorkflowState) -> Self {
        Self { targets: state.targets().collect(),
               visual_insights: state.visuals(),
               structures: state.structures(),
               dropped: state.dropped()
                             .iter()
                             .map(|(url, err)| (url.as_str(), err.to_string()))
                             .collect() }
    }

    pub fn to_json(&self) -> Result<String, StageError> {
        serde_json::to_string_pretty(self).map_err(|e| StageError::internal(format!("synthesis context: {e}")))
    }
}

/// `synthesize`: une insights visuales y estructura en el reporte final.
pub struct SynthesizeStage {
    model: Arc<dyn ModelClient>,
}

impl SynthesizeStage {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Stage for SynthesizeStage {
    fn id(&self) -> StageId {
        StageId::new(SYNTHESIZE)
    }

    fn writes(&self) -> StateSlot {
        StateSlot::Report
    }

    async fn run(&self, mut state: WorkflowState, ctx: &StageContext) -> Result<WorkflowState, StageError> {
        let context = SynthesisContext::from_state(&state).to_json()?;
        let target = format!("model:{}", Capability::Text);
        let call = ModelCall::Synthesize { context,
                                           prompt: SYNTHESIS_PROMPT.to_string() };
        let report = ctx.bounded(&target, async {
                            self.model.dispatch(call).await.map_err(|e| e.into_stage_error(&target, ctx))
                        })
                        .await?;

        let report = report.trim();
        if report.is_empty() {
            return Err(StageError::internal("model returned an empty report"));
        }
        info!("report synthesized run_id={} chars={}", ctx.run_id, report.chars().count());
        state.set_report(report)?;
        Ok(state)
    }
}
