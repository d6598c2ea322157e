//! Position and membership deltas produced by gestures and auto-layout.
//!
//! A [`Changeset`] is the only output shape of the engine: the caller
//! persists it through its own step/group/edge update calls (see
//! [`crate::persist`]) or applies it to a local [`crate::model::Workflow`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geometry::{Point, Size};
use crate::interaction::cascade::{PushDirection, PushRecord, Pushed};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    pub position: Point,
    pub parent_group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    pub position: Point,
    pub size: Size,
    /// Displacement of the group origin relative to its persisted position.
    pub delta: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipChange {
    pub step_id: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// What the cascade engine did while resolving one gesture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub direction: Option<PushDirection>,
    pub pushes: Vec<PushRecord>,
    /// Set when the depth guard dropped a push that was still needed.
    pub truncated: bool,
}

impl CascadeReport {
    /// Appends a push. The first recorded push fixes the cascade direction.
    pub(crate) fn record(&mut self, target: Pushed, direction: PushDirection, dx: f32, dy: f32) {
        self.direction.get_or_insert(direction);
        self.pushes.push(PushRecord {
            target,
            direction,
            delta_x: dx,
            delta_y: dy,
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub steps: BTreeMap<String, StepUpdate>,
    pub groups: BTreeMap<String, GroupUpdate>,
    pub memberships: Vec<MembershipChange>,
    pub deleted_edges: Vec<String>,
    pub cascade: CascadeReport,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
            && self.groups.is_empty()
            && self.memberships.is_empty()
            && self.deleted_edges.is_empty()
    }

    /// Steps that joined `group_id` in this changeset.
    pub fn added_to<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.memberships
            .iter()
            .filter(move |change| change.to.as_deref() == Some(group_id))
            .map(|change| change.step_id.as_str())
    }

    /// Steps that left `group_id` in this changeset.
    pub fn removed_from<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.memberships
            .iter()
            .filter(move |change| change.from.as_deref() == Some(group_id))
            .map(|change| change.step_id.as_str())
    }

    pub fn step_position(&self, step_id: &str) -> Option<Point> {
        self.steps.get(step_id).map(|update| update.position)
    }

    pub fn group_position(&self, group_id: &str) -> Option<Point> {
        self.groups.get(group_id).map(|update| update.position)
    }
}
