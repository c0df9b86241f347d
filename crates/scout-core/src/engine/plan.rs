//! `ExecutionPlan`: DAG de etapas expresado como lista ordenada de grupos.
//!
//! Cada grupo se ejecuta cuando el anterior terminó; las etapas dentro de un
//! grupo corren en paralelo y deben escribir slots disjuntos de
//! `WorkflowState`.
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::errors::CoreEngineError;
use crate::stage::{Stage, StageId};

#[derive(Clone, Default)]
pub struct ExecutionPlan {
    groups: Vec<Vec<Arc<dyn Stage>>>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade un grupo. Un grupo de una sola etapa es un paso secuencial.
    pub fn push_group(&mut self, group: Vec<Arc<dyn Stage>>) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[Vec<Arc<dyn Stage>>] {
        &self.groups
    }

    /// Identificadores en orden de plan (grupos en orden, hermanas en orden de
    /// declaración).
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.groups.iter().flatten().map(|s| s.id()).collect()
    }

    pub fn stage_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Reglas:
    /// - al menos un grupo y ningún grupo vacío;
    /// - ids únicos en todo el plan;
    /// - dentro de un grupo, slots de escritura disjuntos.
    pub fn validate(&self) -> Result<(), CoreEngineError> {
        if self.groups.is_empty() {
            return Err(CoreEngineError::InvalidPlan("plan has no stages".into()));
        }
        let mut seen_ids = HashSet::new();
        for (index, group) in self.groups.iter().enumerate() {
            if group.is_empty() {
                return Err(CoreEngineError::InvalidPlan(format!("group {index} is empty")));
            }
            let mut slots = HashSet::new();
            for stage in group {
                let id = stage.id();
                if !seen_ids.insert(id.clone()) {
                    return Err(CoreEngineError::InvalidPlan(format!("duplicate stage id '{id}'")));
                }
                if !slots.insert(stage.writes()) {
                    return Err(CoreEngineError::InvalidPlan(format!("stage '{id}' writes {:?} which a sibling in group {index} already writes",
                                                                    stage.writes())));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<Vec<String>> = self.groups
                                           .iter()
                                           .map(|g| g.iter().map(|s| s.id().to_string()).collect())
                                           .collect();
        f.debug_struct("ExecutionPlan").field("groups", &groups).finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::errors::StageError;
    use crate::model::WorkflowState;
    use crate::stage::{StageContext, StateSlot};

    struct Noop(&'static str, StateSlot);

    #[async_trait]
    impl Stage for Noop {
        fn id(&self) -> StageId {
            StageId::new(self.0)
        }

        fn writes(&self) -> StateSlot {
            self.1
        }

        async fn run(&self, state: WorkflowState, _ctx: &StageContext) -> Result<WorkflowState, StageError> {
            Ok(state)
        }
    }

    fn stage(id: &'static str, slot: StateSlot) -> Arc<dyn Stage> {
        Arc::new(Noop(id, slot))
    }

    #[test]
    fn empty_plan_is_invalid() {
        assert!(matches!(ExecutionPlan::new().validate(), Err(CoreEngineError::InvalidPlan(_))));
    }

    #[test]
    fn siblings_must_write_disjoint_slots() {
        let mut plan = ExecutionPlan::new();
        plan.push_group(vec![stage("a", StateSlot::Visuals), stage("b", StateSlot::Visuals)]);
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("'b'"), "{err}");
    }

    #[test]
    fn duplicate_ids_are_rejected_across_groups() {
        let mut plan = ExecutionPlan::new();
        plan.push_group(vec![stage("a", StateSlot::Fetched)]);
        plan.push_group(vec![stage("a", StateSlot::Report)]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn stage_ids_follow_plan_order() {
        let mut plan = ExecutionPlan::new();
        plan.push_group(vec![stage("fetch", StateSlot::Fetched)]);
        plan.push_group(vec![stage("v", StateSlot::Visuals), stage("s", StateSlot::Structures)]);
        plan.validate().expect("valid");
        assert_eq!(plan.stage_ids(), vec![StageId::new("fetch"), StageId::new("v"), StageId::new("s")]);
        assert_eq!(plan.stage_count(), 3);
    }
}
