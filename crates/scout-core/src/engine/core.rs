//! Core `WorkflowEngine`.
//!
//! Ciclo de un `submit`:
//! 1. Carga el último checkpoint del run (acotado por timeout). Si existe,
//!    verifica su fingerprint y restaura el estado tal cual; si ya es
//!    terminal devuelve el resultado sin ejecutar nada.
//! 2. Recorre los grupos del plan saltando las etapas presentes en
//!    `completed_stages`. La cancelación se observa sólo aquí, entre grupos.
//! 3. Cada etapa recibe una copia del estado; el motor incorpora únicamente
//!    el slot que la etapa declara (`adopt_slot`).
//! 4. Tras el éxito del grupo confirma un checkpoint por etapa, en orden de
//!    plan, antes de pasar al siguiente grupo.
//!
//! Cualquier fallo de etapa falla el run completo y no se confirma checkpoint
//! alguno para él: el último checkpoint exitoso queda como punto de
//! reanudación.
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{EngineBuilderInit, EngineConfig, ExecutionPlan, RunOutcome};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::constants::CHECKPOINT_STORE_TARGET;
use crate::errors::{CoreEngineError, ErrorKind, StageError, StateError};
use crate::model::{RunId, WorkflowState};
use crate::stage::{Stage, StageContext, StageId};

/// Motor durable de ejecución de pipelines.
pub struct WorkflowEngine<C>
    where C: CheckpointStore
{
    store: Arc<C>,
    plan: ExecutionPlan,
    config: EngineConfig,
}

impl<C> WorkflowEngine<C> where C: CheckpointStore
{
    /// Crea un builder para declarar el plan del engine.
    #[inline]
    pub fn builder(store: C) -> EngineBuilderInit<C> {
        EngineBuilderInit::new(store)
    }

    pub(crate) fn from_parts(store: C, plan: ExecutionPlan, config: EngineConfig) -> Self {
        Self { store: Arc::new(store),
               plan,
               config }
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Historia de checkpoints del run (orden ascendente de secuencia).
    pub async fn history(&self, run_id: &RunId) -> Result<Vec<Checkpoint>, CoreEngineError> {
        Ok(self.store.history(run_id).await?)
    }

    /// Ejecuta (o reanuda) el run. Equivale a `submit_with_cancel` con un
    /// token que nunca se cancela.
    pub async fn submit<I, S>(&self, run_id: RunId, targets: I) -> Result<RunOutcome, CoreEngineError>
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.submit_with_cancel(run_id, targets, &CancellationToken::new()).await
    }

    /// Ejecuta (o reanuda) el run observando `cancel` en cada límite de etapa.
    ///
    /// Devuelve `Err` sólo cuando el run no puede siquiera arrancar
    /// (checkpoint ilegible, store caído al cargar). Los fallos de etapa se
    /// reportan como `RunOutcome` con estado `Failed`.
    pub async fn submit_with_cancel<I, S>(&self,
                                          run_id: RunId,
                                          targets: I,
                                          cancel: &CancellationToken)
                                          -> Result<RunOutcome, CoreEngineError>
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        let ctx = self.config.context_for(run_id.clone());
        let requested = WorkflowState::new(run_id.clone(), targets);

        let (mut state, mut sequence, resumed_from) = match self.load_latest(&ctx).await? {
            Some(checkpoint) => {
                verify_restored(&run_id, &checkpoint)?;
                if !checkpoint.state.targets().eq(requested.targets()) {
                    warn!("resume target mismatch run_id={} checkpoint_targets={} requested_targets={}; keeping checkpointed targets",
                          run_id,
                          checkpoint.state.target_count(),
                          requested.target_count());
                }
                info!("resuming run run_id={} seq={} stage={}",
                      run_id,
                      checkpoint.sequence,
                      checkpoint.stage);
                let seq = checkpoint.sequence;
                (checkpoint.state, seq, Some(seq))
            }
            None => {
                info!("starting run run_id={} targets={}", run_id, requested.target_count());
                (requested, 0, None)
            }
        };

        if state.status().is_terminal() {
            info!("run already terminal run_id={} status={}", run_id, state.status().as_str());
            return Ok(RunOutcome::from_state(state, resumed_from, Vec::new(), sequence));
        }

        let mut executed = Vec::new();
        for group in self.plan.groups() {
            let pending: Vec<Arc<dyn Stage>> =
                group.iter().filter(|s| !state.has_completed(&s.id())).cloned().collect();
            if pending.is_empty() {
                continue;
            }

            if cancel.is_cancelled() {
                let err = StageError::Cancelled { stage: pending[0].id().to_string() };
                return Ok(fail_run(state, err, resumed_from, executed, sequence));
            }

            let outputs = match run_group(&pending, &state, &ctx).await {
                Ok(outputs) => outputs,
                Err(err) => return Ok(fail_run(state, err, resumed_from, executed, sequence)),
            };

            for (stage, output) in pending.iter().zip(outputs) {
                let id = stage.id();
                let mut next = state.clone();
                if let Err(err) = self.merge_output(&mut next, stage.as_ref(), &output) {
                    return Ok(fail_run(state, err.into(), resumed_from, executed, sequence));
                }

                if let Err(err) = self.commit(&ctx, sequence + 1, id.clone(), &next).await {
                    return Ok(fail_run(state, err, resumed_from, executed, sequence));
                }
                sequence += 1;
                state = next;
                executed.push(id);
            }
        }

        if !state.status().is_terminal() {
            // Todas las etapas estaban confirmadas pero el run nunca se cerró.
            let err = StageError::internal("plan exhausted without a terminal state");
            return Ok(fail_run(state, err, resumed_from, executed, sequence));
        }

        info!("run complete run_id={} executed={} seq={}", run_id, executed.len(), sequence);
        Ok(RunOutcome::from_state(state, resumed_from, executed, sequence))
    }

    /// Incorpora la salida de una etapa y, si era la última pendiente del
    /// plan, cierra el run como `Complete`.
    fn merge_output(&self, next: &mut WorkflowState, stage: &dyn Stage, output: &WorkflowState) -> Result<(), StateError> {
        next.adopt_slot(stage.writes(), output)?;
        next.mark_stage_completed(stage.id())?;
        if self.is_final(next) {
            next.complete()?;
        }
        Ok(())
    }

    fn is_final(&self, state: &WorkflowState) -> bool {
        self.plan.groups().iter().flatten().all(|s| state.has_completed(&s.id()))
    }

    async fn load_latest(&self, ctx: &StageContext) -> Result<Option<Checkpoint>, CoreEngineError> {
        match tokio::time::timeout(ctx.call_timeout, self.store.get_latest(&ctx.run_id)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CoreEngineError::CheckpointUnavailable(format!("get_latest timed out after {}ms",
                                                                         ctx.call_timeout.as_millis()))),
        }
    }

    /// Escritura síncrona del checkpoint: el siguiente grupo no arranca hasta
    /// que el store confirma.
    async fn commit(&self,
                    ctx: &StageContext,
                    sequence: u64,
                    stage: StageId,
                    snapshot: &WorkflowState)
                    -> Result<(), StageError> {
        let checkpoint =
            Checkpoint::seal(sequence, stage.clone(), snapshot.clone()).map_err(|e| StageError::internal(e.to_string()))?;
        ctx.bounded(CHECKPOINT_STORE_TARGET, async {
               self.store
                   .put(checkpoint)
                   .await
                   .map_err(|e| StageError::CollaboratorUnavailable { target: CHECKPOINT_STORE_TARGET.to_string(),
                                                                      message: e.to_string() })
           })
           .await?;
        info!("checkpoint committed run_id={} stage={} seq={}", ctx.run_id, stage, sequence);
        Ok(())
    }
}

impl<C> std::fmt::Debug for WorkflowEngine<C> where C: CheckpointStore
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
         .field("plan", &self.plan)
         .field("config", &self.config)
         .finish()
    }
}

fn verify_restored(run_id: &RunId, checkpoint: &Checkpoint) -> Result<(), CoreEngineError> {
    if &checkpoint.run_id != run_id || checkpoint.state.run_id() != run_id {
        return Err(CoreEngineError::RunIdMismatch { expected: run_id.to_string(),
                                                    found: checkpoint.state.run_id().to_string() });
    }
    if !checkpoint.verify()? {
        error!("checkpoint fingerprint mismatch run_id={} seq={}", run_id, checkpoint.sequence);
        return Err(CoreEngineError::CorruptCheckpoint { run_id: run_id.to_string(),
                                                        sequence: checkpoint.sequence });
    }
    Ok(())
}

/// Ejecuta las etapas pendientes de un grupo. Un grupo de una etapa corre en
/// la tarea actual; las hermanas corren en un `JoinSet` y el primer error
/// aborta a las demás. Las salidas vuelven en orden de plan.
async fn run_group(pending: &[Arc<dyn Stage>],
                   state: &WorkflowState,
                   ctx: &StageContext)
                   -> Result<Vec<WorkflowState>, StageError> {
    if let [stage] = pending {
        debug!("stage start run_id={} stage={}", ctx.run_id, stage.id());
        return stage.run(state.clone(), ctx).await.map(|out| vec![out]);
    }

    let mut set = JoinSet::new();
    for (index, stage) in pending.iter().enumerate() {
        let stage = Arc::clone(stage);
        let input = state.clone();
        let ctx = ctx.clone();
        debug!("stage start run_id={} stage={} parallel=true", ctx.run_id, stage.id());
        set.spawn(async move {
               let result = stage.run(input, &ctx).await;
               (index, result)
           });
    }

    let mut outputs: Vec<Option<WorkflowState>> = vec![None; pending.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(output))) => outputs[index] = Some(output),
            Ok((index, Err(err))) => {
                warn!("sibling stage failed run_id={} stage={} kind={}",
                      ctx.run_id,
                      pending[index].id(),
                      err.kind().as_str());
                set.abort_all();
                return Err(err);
            }
            Err(join_err) => {
                set.abort_all();
                return Err(StageError::internal(format!("stage task failed: {join_err}")));
            }
        }
    }
    outputs.into_iter()
           .collect::<Option<Vec<_>>>()
           .ok_or_else(|| StageError::internal("parallel group finished without every sibling output"))
}

fn fail_run(mut state: WorkflowState,
            err: StageError,
            resumed_from: Option<u64>,
            executed: Vec<StageId>,
            sequence: u64)
            -> RunOutcome {
    match err.kind() {
        ErrorKind::SecurityRejection | ErrorKind::Validation | ErrorKind::Cancelled => {
            warn!("run failed run_id={} kind={} error={}", state.run_id(), err.kind().as_str(), err)
        }
        _ => error!("run failed run_id={} kind={} error={}", state.run_id(), err.kind().as_str(), err),
    }
    if let Err(e) = state.fail(err) {
        error!("could not mark run failed run_id={} error={}", state.run_id(), e);
    }
    RunOutcome::from_state(state, resumed_from, executed, sequence)
}
