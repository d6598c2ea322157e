use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::changes::{CascadeReport, Changeset, GroupUpdate, MembershipChange, StepUpdate};
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::geometry::{Point, Rect};
use crate::interaction::drop_zone::GroupBox;
use crate::model::Workflow;

#[derive(Debug, Clone)]
pub(crate) struct SceneStep {
    pub id: String,
    pub rect: Rect,
    pub group: Option<String>,
}

/// Working copy of step and group geometry for one gesture. Elements are
/// addressed by stable id; the input workflow is never mutated and the
/// resulting changeset is a diff against it.
pub(crate) struct Scene<'w> {
    pub config: &'w CanvasConfig,
    workflow: &'w Workflow,
    steps: Vec<SceneStep>,
    step_index: HashMap<String, usize>,
    groups: Vec<GroupBox>,
    group_index: HashMap<String, usize>,
}

impl<'w> Scene<'w> {
    pub fn new(workflow: &'w Workflow, config: &'w CanvasConfig) -> Result<Self, CanvasError> {
        workflow.validate()?;
        let steps: Vec<SceneStep> = workflow
            .steps
            .iter()
            .map(|step| SceneStep {
                id: step.id.clone(),
                rect: step.rect(config),
                group: step.block_group_id.clone(),
            })
            .collect();
        let groups: Vec<GroupBox> = workflow
            .groups
            .iter()
            .map(|group| GroupBox::new(group.id.clone(), group.rect()))
            .collect();
        let step_index = steps
            .iter()
            .enumerate()
            .map(|(idx, step)| (step.id.clone(), idx))
            .collect();
        let group_index = groups
            .iter()
            .enumerate()
            .map(|(idx, group)| (group.id.clone(), idx))
            .collect();
        Ok(Self {
            config,
            workflow,
            steps,
            step_index,
            groups,
            group_index,
        })
    }

    pub fn groups(&self) -> &[GroupBox] {
        &self.groups
    }

    pub fn step(&self, id: &str) -> Result<&SceneStep, CanvasError> {
        self.step_index
            .get(id)
            .map(|idx| &self.steps[*idx])
            .ok_or_else(|| CanvasError::UnknownStep(id.to_string()))
    }

    pub fn group_rect(&self, id: &str) -> Result<Rect, CanvasError> {
        self.group_index
            .get(id)
            .map(|idx| self.groups[*idx].rect)
            .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))
    }

    pub fn step_rect(&self, id: &str) -> Option<Rect> {
        self.step_index.get(id).map(|idx| self.steps[*idx].rect)
    }

    pub fn set_step_origin(&mut self, id: &str, origin: Point) {
        if let Some(idx) = self.step_index.get(id) {
            let step = &mut self.steps[*idx];
            step.rect = step.rect.with_origin(origin);
        }
    }

    pub fn set_step_group(&mut self, id: &str, group: Option<String>) {
        if let Some(idx) = self.step_index.get(id) {
            self.steps[*idx].group = group;
        }
    }

    /// Moves a group together with every member step.
    pub fn move_group(&mut self, id: &str, dx: f32, dy: f32) {
        let Some(idx) = self.group_index.get(id) else {
            return;
        };
        let group = &mut self.groups[*idx];
        group.rect = group.rect.translated(dx, dy);
        for step in &mut self.steps {
            if step.group.as_deref() == Some(id) {
                step.rect = step.rect.translated(dx, dy);
            }
        }
    }

    /// Replaces a group's bounds without touching its members.
    pub fn set_group_rect(&mut self, id: &str, rect: Rect) {
        if let Some(idx) = self.group_index.get(id) {
            self.groups[*idx].rect = rect;
        }
    }

    pub fn member_ids(&self, group_id: &str) -> Vec<String> {
        self.steps
            .iter()
            .filter(|step| step.group.as_deref() == Some(group_id))
            .map(|step| step.id.clone())
            .collect()
    }

    pub fn ungrouped(&self) -> impl Iterator<Item = &SceneStep> {
        self.steps.iter().filter(|step| step.group.is_none())
    }

    pub fn into_changeset(self, cascade: CascadeReport) -> Changeset {
        let mut changes = Changeset {
            cascade,
            ..Changeset::default()
        };
        let mut touched: BTreeSet<&str> = BTreeSet::new();

        for (original, current) in self.workflow.steps.iter().zip(&self.steps) {
            let moved = !original.position().approx_eq(current.rect.origin());
            let regrouped = original.block_group_id != current.group;
            if !moved && !regrouped {
                continue;
            }
            changes.steps.insert(
                current.id.clone(),
                StepUpdate {
                    position: current.rect.origin(),
                    parent_group_id: current.group.clone(),
                },
            );
            if regrouped {
                changes.memberships.push(MembershipChange {
                    step_id: current.id.clone(),
                    from: original.block_group_id.clone(),
                    to: current.group.clone(),
                });
                touched.insert(original.id.as_str());
            }
        }

        // Crossing a group boundary invalidates the step's connections.
        changes.deleted_edges = self
            .workflow
            .edges
            .iter()
            .filter(|edge| touched.iter().any(|step_id| edge.touches_step(step_id)))
            .map(|edge| edge.id.clone())
            .collect();

        let mut groups = BTreeMap::new();
        for (original, current) in self.workflow.groups.iter().zip(&self.groups) {
            let before = original.rect();
            if before.approx_eq(&current.rect) {
                continue;
            }
            groups.insert(
                current.id.clone(),
                GroupUpdate {
                    position: current.rect.origin(),
                    size: current.rect.size(),
                    delta: Point::new(current.rect.x - before.x, current.rect.y - before.y),
                },
            );
        }
        changes.groups = groups;
        changes
    }
}
