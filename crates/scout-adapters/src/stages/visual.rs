use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use scout_core::{Stage, StageContext, StageError, StageId, StateSlot, VisualInsight, WorkflowState};
use tokio::task::JoinSet;

use crate::collaborators::{ModelCall, ModelClient};
use crate::pipeline::VISUAL_ANALYZE;
use crate::prompts::{VISUAL_CONFIDENCE, VISUAL_PROMPT};

/// `visual_analyze`: una llamada de visión por página descargada, en
/// paralelo. Escribe sólo `visuals`.
pub struct VisualStage {
    model: Arc<dyn ModelClient>,
}

impl VisualStage {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Stage for VisualStage {
    fn id(&self) -> StageId {
        StageId::new(VISUAL_ANALYZE)
    }

    fn writes(&self) -> StateSlot {
        StateSlot::Visuals
    }

    async fn run(&self, mut state: WorkflowState, ctx: &StageContext) -> Result<WorkflowState, StageError> {
        let mut set = JoinSet::new();
        for (url, artifact) in state.fetched() {
            let model = Arc::clone(&self.model);
            let ctx = ctx.clone();
            let url = url.clone();
            let call = ModelCall::AnalyzeVisual { image: artifact.visual.clone(),
                                                  prompt: VISUAL_PROMPT.to_string() };
            set.spawn(async move {
                   debug!("model call run_id={} capability={} url={}", ctx.run_id, call.capability(), url);
                   let insight = ctx.bounded(&url, async {
                                        model.dispatch(call).await.map_err(|e| e.into_stage_error(&url, &ctx))
                                    })
                                    .await;
                   (url, insight)
               });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((url, Ok(insight))) => state.record_visual(&url,
                                                              VisualInsight { insight,
                                                                              confidence: VISUAL_CONFIDENCE })?,
                Ok((_, Err(err))) => {
                    set.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    set.abort_all();
                    return Err(StageError::internal(format!("visual task failed: {join_err}")));
                }
            }
        }
        info!("visual analysis done run_id={} pages={}", ctx.run_id, state.visuals().len());
        Ok(state)
    }
}
