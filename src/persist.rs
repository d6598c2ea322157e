//! Hands a [`Changeset`] to whatever owns the authoritative workflow.
//!
//! Every call is independent: a failure is recorded and the remaining calls
//! still run. Nothing is rolled back; a report with failures means the
//! caller must reload authoritative state.

use serde::Serialize;
use tracing::{debug, warn};

use crate::changes::{Changeset, GroupUpdate, MembershipChange, StepUpdate};
use crate::error::StoreError;
use crate::model::{GroupRole, Workflow};

/// Update calls the engine needs from the workflow's owner.
pub trait WorkflowStore {
    fn update_step(&mut self, step_id: &str, update: &StepUpdate) -> Result<(), StoreError>;

    fn update_group(&mut self, group_id: &str, update: &GroupUpdate) -> Result<(), StoreError>;

    /// Adds a step to, or removes it from, a group.
    fn assign_group(&mut self, change: &MembershipChange) -> Result<(), StoreError>;

    fn delete_edge(&mut self, edge_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistCall {
    DeleteEdge,
    AssignGroup,
    UpdateStep,
    UpdateGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistFailure {
    pub call: PersistCall,
    pub id: String,
    #[serde(serialize_with = "display")]
    pub error: StoreError,
}

fn display<S: serde::Serializer>(error: &StoreError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistReport {
    pub attempted: usize,
    pub failures: Vec<PersistFailure>,
}

impl PersistReport {
    /// Local state can no longer be trusted and must be re-fetched.
    pub fn needs_reload(&self) -> bool {
        !self.failures.is_empty()
    }

    fn track(&mut self, call: PersistCall, id: &str, result: Result<(), StoreError>) {
        self.attempted += 1;
        if let Err(error) = result {
            warn!(?call, id, error = %error, "persist call failed");
            self.failures.push(PersistFailure {
                call,
                id: id.to_string(),
                error,
            });
        }
    }
}

/// Issues edge deletions, membership changes, step updates and group
/// updates, in that order.
pub fn persist<S: WorkflowStore + ?Sized>(changes: &Changeset, store: &mut S) -> PersistReport {
    let mut report = PersistReport::default();
    for edge_id in &changes.deleted_edges {
        report.track(PersistCall::DeleteEdge, edge_id, store.delete_edge(edge_id));
    }
    for change in &changes.memberships {
        report.track(PersistCall::AssignGroup, &change.step_id, store.assign_group(change));
    }
    for (step_id, update) in &changes.steps {
        report.track(PersistCall::UpdateStep, step_id, store.update_step(step_id, update));
    }
    for (group_id, update) in &changes.groups {
        report.track(PersistCall::UpdateGroup, group_id, store.update_group(group_id, update));
    }
    debug!(
        attempted = report.attempted,
        failed = report.failures.len(),
        "changeset persisted"
    );
    report
}

/// The in-memory workflow acts as its own store.
impl WorkflowStore for Workflow {
    fn update_step(&mut self, step_id: &str, update: &StepUpdate) -> Result<(), StoreError> {
        if let Some(group_id) = &update.parent_group_id {
            if self.group(group_id).is_none() {
                return Err(missing("group", group_id));
            }
        }
        let step = self
            .steps
            .iter_mut()
            .find(|step| step.id == step_id)
            .ok_or_else(|| missing("step", step_id))?;
        step.position_x = update.position.x;
        step.position_y = update.position.y;
        step.group_role = update.parent_group_id.as_ref().map(|_| GroupRole::Body);
        step.block_group_id = update.parent_group_id.clone();
        Ok(())
    }

    fn update_group(&mut self, group_id: &str, update: &GroupUpdate) -> Result<(), StoreError> {
        let group = self
            .groups
            .iter_mut()
            .find(|group| group.id == group_id)
            .ok_or_else(|| missing("group", group_id))?;
        group.position_x = update.position.x;
        group.position_y = update.position.y;
        group.width = update.size.width;
        group.height = update.size.height;
        Ok(())
    }

    fn assign_group(&mut self, change: &MembershipChange) -> Result<(), StoreError> {
        if let Some(group_id) = &change.to {
            if self.group(group_id).is_none() {
                return Err(missing("group", group_id));
            }
        }
        let step = self
            .steps
            .iter_mut()
            .find(|step| step.id == change.step_id)
            .ok_or_else(|| missing("step", &change.step_id))?;
        if step.block_group_id != change.from {
            return Err(StoreError::Rejected {
                kind: "step",
                id: change.step_id.clone(),
                message: format!(
                    "expected group {:?}, found {:?}",
                    change.from, step.block_group_id
                ),
            });
        }
        step.group_role = change.to.as_ref().map(|_| GroupRole::Body);
        step.block_group_id = change.to.clone();
        Ok(())
    }

    fn delete_edge(&mut self, edge_id: &str) -> Result<(), StoreError> {
        let before = self.edges.len();
        self.edges.retain(|edge| edge.id != edge_id);
        if self.edges.len() == before {
            return Err(missing("edge", edge_id));
        }
        Ok(())
    }
}

fn missing(kind: &'static str, id: &str) -> StoreError {
    StoreError::Missing {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::geometry::{Point, Rect};
    use crate::interaction::Canvas;
    use crate::model::{BlockGroup, Edge, GroupKind, Step, StepType};

    fn workflow() -> Workflow {
        Workflow {
            steps: vec![
                Step::new("inner", StepType::Llm, 60.0, 100.0).in_group("g"),
                Step::new("loose", StepType::Tool, 700.0, 100.0),
            ],
            edges: vec![Edge::steps("e1", "inner", "loose")],
            groups: vec![BlockGroup::new(
                "g",
                GroupKind::Parallel,
                Rect::new(0.0, 0.0, 600.0, 400.0),
            )],
        }
    }

    /// Rejects every step update, accepts the rest.
    #[derive(Default)]
    struct FlakyStore {
        calls: Vec<String>,
    }

    impl WorkflowStore for FlakyStore {
        fn update_step(&mut self, step_id: &str, _: &StepUpdate) -> Result<(), StoreError> {
            self.calls.push(format!("step:{step_id}"));
            Err(StoreError::Rejected {
                kind: "step",
                id: step_id.to_string(),
                message: "conflict".into(),
            })
        }

        fn update_group(&mut self, group_id: &str, _: &GroupUpdate) -> Result<(), StoreError> {
            self.calls.push(format!("group:{group_id}"));
            Ok(())
        }

        fn assign_group(&mut self, change: &MembershipChange) -> Result<(), StoreError> {
            self.calls.push(format!("assign:{}", change.step_id));
            Ok(())
        }

        fn delete_edge(&mut self, edge_id: &str) -> Result<(), StoreError> {
            self.calls.push(format!("edge:{edge_id}"));
            Ok(())
        }
    }

    #[test]
    fn local_workflow_matches_applied_changeset() {
        let config = CanvasConfig::default();
        let original = workflow();
        let changes = Canvas::new(&original, &config)
            .drag_step("inner", Point::new(700.0, 300.0))
            .unwrap();

        let mut persisted = original.clone();
        let report = persist(&changes, &mut persisted);
        assert!(!report.needs_reload());
        assert_eq!(report.attempted, 3);

        let mut applied = original.clone();
        applied.apply(&changes);
        assert_eq!(persisted, applied);
        assert_eq!(persisted.step("inner").unwrap().block_group_id, None);
        assert!(persisted.edges.is_empty());
    }

    #[test]
    fn failures_do_not_stop_remaining_calls() {
        let config = CanvasConfig::default();
        let original = workflow();
        let changes = Canvas::new(&original, &config)
            .drag_step("inner", Point::new(700.0, 300.0))
            .unwrap();

        let mut store = FlakyStore::default();
        let report = persist(&changes, &mut store);
        assert_eq!(store.calls, vec!["edge:e1", "assign:inner", "step:inner"]);
        assert!(report.needs_reload());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].call, PersistCall::UpdateStep);
    }

    #[test]
    fn stale_membership_is_rejected() {
        let mut local = workflow();
        let change = MembershipChange {
            step_id: "loose".into(),
            from: Some("g".into()),
            to: None,
        };
        assert!(matches!(
            local.assign_group(&change),
            Err(StoreError::Rejected { .. })
        ));
        assert_eq!(
            local.delete_edge("nope"),
            Err(StoreError::Missing {
                kind: "edge",
                id: "nope".into()
            })
        );
    }
}
