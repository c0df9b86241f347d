//! `fetch_all`: valida todas las URLs, las descarga en paralelo y sanea cada
//! página apenas llega.
//!
//! - Ninguna URL se descarga si alguna es rechazada por `UrlGuard`.
//! - Los resultados se fusionan por URL, no por orden de llegada.
//! - Política estricta por defecto: el primer fallo aborta las descargas
//!   restantes. Con tolerancia parcial, sólo los fallos de transporte se
//!   descartan y se registran en `dropped`.
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use scout_core::{FetchArtifact, Stage, StageContext, StageError, StageId, StateSlot, WorkflowState};
use scout_guard::{ContentSanitizer, UrlGuard};
use tokio::task::JoinSet;

use crate::collaborators::PageFetcher;
use crate::pipeline::FETCH_ALL;

/// Target reportado cuando el run no trae URLs.
pub const NO_TARGETS: &str = "<none>";

pub struct FetchStage {
    fetcher: Arc<dyn PageFetcher>,
    guard: UrlGuard,
    sanitizer: ContentSanitizer,
}

impl FetchStage {
    pub fn new(fetcher: Arc<dyn PageFetcher>, guard: UrlGuard, sanitizer: ContentSanitizer) -> Self {
        Self { fetcher,
               guard,
               sanitizer }
    }
}

#[async_trait]
impl Stage for FetchStage {
    fn id(&self) -> StageId {
        StageId::new(FETCH_ALL)
    }

    fn writes(&self) -> StateSlot {
        StateSlot::Fetched
    }

    async fn run(&self, mut state: WorkflowState, ctx: &StageContext) -> Result<WorkflowState, StageError> {
        let targets: Vec<String> = state.targets().map(str::to_string).collect();
        if targets.is_empty() {
            return Err(StageError::Validation { url: NO_TARGETS.to_string(),
                                                reason: "no target urls".into() });
        }

        let mut validated = Vec::with_capacity(targets.len());
        for url in targets {
            match self.guard.validate(&url).await {
                Ok(ok) => validated.push((url, ok)),
                Err(err) => return Err(err.into_stage_error(&url)),
            }
        }

        let mut set = JoinSet::new();
        for (url, target) in validated {
            let fetcher = Arc::clone(&self.fetcher);
            let sanitizer = self.sanitizer;
            let ctx = ctx.clone();
            set.spawn(async move {
                   let fetched = ctx.bounded(&url, async {
                                        fetcher.fetch(target.url())
                                               .await
                                               .map_err(|e| e.into_stage_error(&url, &ctx))
                                    })
                                    .await;
                   let artifact = fetched.map(|page| {
                                             let clean = sanitizer.sanitize_with_report(&page.text);
                                             FetchArtifact { text: clean.text,
                                                             visual: page.visual,
                                                             redactions: clean.redactions,
                                                             truncated: clean.truncated }
                                         });
                   (url, artifact)
               });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((url, Ok(artifact))) => {
                    info!("page fetched run_id={} url={} bytes={} redactions={} truncated={}",
                          ctx.run_id,
                          url,
                          artifact.text.len(),
                          artifact.redactions,
                          artifact.truncated);
                    state.record_fetch(&url, artifact)?;
                }
                Ok((url, Err(err))) if ctx.tolerate_partial && err.kind().is_retryable() => {
                    warn!("dropping target run_id={} url={} error={}", ctx.run_id, url, err);
                    state.record_dropped(&url, err)?;
                }
                Ok((url, Err(err))) => {
                    warn!("fetch failed run_id={} url={} error={}", ctx.run_id, url, err);
                    set.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    set.abort_all();
                    return Err(StageError::internal(format!("fetch task failed: {join_err}")));
                }
            }
        }

        if state.fetched().is_empty() {
            let first = state.dropped().values().next().cloned();
            return Err(first.unwrap_or_else(|| StageError::internal("no page was fetched")));
        }
        Ok(state)
    }
}
