//! `WorkflowState`: registro mutable que atraviesa todas las etapas de un run.
//!
//! Invariantes:
//! - Una vez terminal (`Complete`/`Failed`), ninguna etapa puede mutarlo.
//! - Los mapas de artifacts sólo aceptan URLs del conjunto objetivo, por lo
//!   que nunca superan su tamaño.
//! - Los mapas se mantienen en el orden de `targets`, no en orden de llegada.
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::{FetchArtifact, RunId, RunStatus, StructureSummary, VisualInsight};
use crate::errors::{StageError, StateError};
use crate::stage::{StageId, StateSlot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    run_id: RunId,
    targets: IndexSet<String>,
    fetched: IndexMap<String, FetchArtifact>,
    structures: IndexMap<String, StructureSummary>,
    visuals: IndexMap<String, VisualInsight>,
    /// URLs descartadas bajo tolerancia parcial (opt-in), con su error.
    dropped: IndexMap<String, StageError>,
    report: Option<String>,
    status: RunStatus,
    last_error: Option<StageError>,
    completed_stages: Vec<StageId>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    /// Estado inicial `Running`. Las URLs duplicadas se colapsan conservando
    /// la primera aparición.
    pub fn new<I, S>(run_id: RunId, targets: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { run_id,
               targets: targets.into_iter().map(Into::into).collect(),
               fetched: IndexMap::new(),
               structures: IndexMap::new(),
               visuals: IndexMap::new(),
               dropped: IndexMap::new(),
               report: None,
               status: RunStatus::Running,
               last_error: None,
               completed_stages: Vec::new(),
               started_at: Utc::now(),
               finished_at: None }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn is_target(&self, url: &str) -> bool {
        self.targets.contains(url)
    }

    pub fn fetched(&self) -> &IndexMap<String, FetchArtifact> {
        &self.fetched
    }

    pub fn structures(&self) -> &IndexMap<String, StructureSummary> {
        &self.structures
    }

    pub fn visuals(&self) -> &IndexMap<String, VisualInsight> {
        &self.visuals
    }

    pub fn dropped(&self) -> &IndexMap<String, StageError> {
        &self.dropped
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&StageError> {
        self.last_error.as_ref()
    }

    pub fn completed_stages(&self) -> &[StageId] {
        &self.completed_stages
    }

    pub fn has_completed(&self, stage: &StageId) -> bool {
        self.completed_stages.contains(stage)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    fn ensure_running(&self) -> Result<(), StateError> {
        if self.status.is_terminal() {
            return Err(StateError::Terminal(self.status.as_str()));
        }
        Ok(())
    }

    fn ensure_target(&self, url: &str) -> Result<(), StateError> {
        if !self.targets.contains(url) {
            return Err(StateError::UnknownTarget(url.to_string()));
        }
        Ok(())
    }

    pub fn record_fetch(&mut self, url: &str, artifact: FetchArtifact) -> Result<(), StateError> {
        self.ensure_running()?;
        self.ensure_target(url)?;
        self.fetched.insert(url.to_string(), artifact);
        self.fetched.sort_by(|a, _, b, _| self.targets.get_index_of(a).cmp(&self.targets.get_index_of(b)));
        Ok(())
    }

    pub fn record_structure(&mut self, url: &str, summary: StructureSummary) -> Result<(), StateError> {
        self.ensure_running()?;
        self.ensure_target(url)?;
        self.structures.insert(url.to_string(), summary);
        self.structures.sort_by(|a, _, b, _| self.targets.get_index_of(a).cmp(&self.targets.get_index_of(b)));
        Ok(())
    }

    pub fn record_visual(&mut self, url: &str, insight: VisualInsight) -> Result<(), StateError> {
        self.ensure_running()?;
        self.ensure_target(url)?;
        self.visuals.insert(url.to_string(), insight);
        self.visuals.sort_by(|a, _, b, _| self.targets.get_index_of(a).cmp(&self.targets.get_index_of(b)));
        Ok(())
    }

    pub fn record_dropped(&mut self, url: &str, error: StageError) -> Result<(), StateError> {
        self.ensure_running()?;
        self.ensure_target(url)?;
        self.dropped.insert(url.to_string(), error);
        self.dropped.sort_by(|a, _, b, _| self.targets.get_index_of(a).cmp(&self.targets.get_index_of(b)));
        Ok(())
    }

    pub fn set_report(&mut self, report: impl Into<String>) -> Result<(), StateError> {
        self.ensure_running()?;
        self.report = Some(report.into());
        Ok(())
    }

    pub(crate) fn mark_stage_completed(&mut self, stage: StageId) -> Result<(), StateError> {
        self.ensure_running()?;
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
        Ok(())
    }

    /// Copia el slot que escribió una etapa hermana desde su estado de salida.
    /// Es la única vía por la que el motor incorpora resultados de etapas, de
    /// modo que cada etapa sólo puede alterar el slot que declara.
    pub(crate) fn adopt_slot(&mut self, slot: StateSlot, from: &WorkflowState) -> Result<(), StateError> {
        self.ensure_running()?;
        match slot {
            StateSlot::Fetched => {
                for url in from.fetched.keys().chain(from.dropped.keys()) {
                    self.ensure_target(url)?;
                }
                self.fetched = from.fetched.clone();
                self.dropped = from.dropped.clone();
            }
            StateSlot::Structures => {
                for url in from.structures.keys() {
                    self.ensure_target(url)?;
                }
                self.structures = from.structures.clone();
            }
            StateSlot::Visuals => {
                for url in from.visuals.keys() {
                    self.ensure_target(url)?;
                }
                self.visuals = from.visuals.clone();
            }
            StateSlot::Report => self.report = from.report.clone(),
        }
        Ok(())
    }

    /// `Running -> Complete`. Un run completo siempre lleva reporte.
    pub(crate) fn complete(&mut self) -> Result<(), StateError> {
        self.ensure_running()?;
        if self.report.is_none() {
            return Err(StateError::MissingReport);
        }
        self.status = RunStatus::Complete;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `Running -> Failed`. Un run fallido siempre lleva error.
    pub(crate) fn fail(&mut self, error: StageError) -> Result<(), StateError> {
        self.ensure_running()?;
        self.status = RunStatus::Failed;
        self.last_error = Some(error);
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::new(RunId::new("job-1").expect("run id"),
                           ["https://b.example", "https://a.example", "https://b.example"])
    }

    fn artifact(text: &str) -> FetchArtifact {
        FetchArtifact { text: text.into(),
                        visual: vec![1, 2, 3],
                        redactions: 0,
                        truncated: false }
    }

    #[test]
    fn targets_are_unique_and_keep_input_order() {
        let s = state();
        assert_eq!(s.targets().collect::<Vec<_>>(), vec!["https://b.example", "https://a.example"]);
        assert_eq!(s.status(), RunStatus::Running);
    }

    #[test]
    fn artifact_maps_follow_target_order_not_arrival() {
        let mut s = state();
        s.record_fetch("https://a.example", artifact("a")).expect("a");
        s.record_fetch("https://b.example", artifact("b")).expect("b");
        let keys: Vec<_> = s.fetched().keys().cloned().collect();
        assert_eq!(keys, vec!["https://b.example", "https://a.example"]);
    }

    #[test]
    fn rejects_urls_outside_target_set() {
        let mut s = state();
        let err = s.record_fetch("https://evil.example", artifact("x")).unwrap_err();
        assert_eq!(err, StateError::UnknownTarget("https://evil.example".into()));
        assert!(s.fetched().is_empty());
    }

    #[test]
    fn terminal_state_is_frozen() {
        let mut s = state();
        s.fail(StageError::internal("boom")).expect("fail");
        assert!(s.record_fetch("https://a.example", artifact("a")).is_err());
        assert!(s.set_report("late").is_err());
        assert!(s.fail(StageError::internal("again")).is_err());
        assert_eq!(s.status(), RunStatus::Failed);
        assert!(s.last_error().is_some());
    }

    #[test]
    fn complete_requires_report() {
        let mut s = state();
        assert_eq!(s.complete(), Err(StateError::MissingReport));
        s.set_report("done").expect("report");
        s.complete().expect("complete");
        assert_eq!(s.status(), RunStatus::Complete);
        assert!(s.finished_at().is_some());
    }
}
