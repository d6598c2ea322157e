//! Drag and resize semantics for steps and block groups.
//!
//! Every gesture is resolved on a private [`scene::Scene`] and reported as a
//! [`Changeset`]; the input workflow is never mutated.

pub mod cascade;
mod drag;
pub mod drop_zone;
pub(crate) mod scene;

pub use cascade::{PushDirection, PushPosition, PushRecord, Pushed, calculate_push_position};
pub use drop_zone::{
    DropTarget, DropZone, GroupBox, ValidPosition, classify, find_group_boundary_collision,
    find_group_collision, inner_bounds, snap_outside, snap_to_valid_position,
};

use crate::changes::Changeset;
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::geometry::{Point, Rect};
use crate::model::Workflow;
use scene::Scene;

/// Entry point for interactive gestures over one workflow snapshot.
pub struct Canvas<'w> {
    workflow: &'w Workflow,
    config: &'w CanvasConfig,
}

impl<'w> Canvas<'w> {
    pub fn new(workflow: &'w Workflow, config: &'w CanvasConfig) -> Self {
        Self { workflow, config }
    }

    /// A step was released at `position`: relative to its parent group when
    /// grouped, absolute otherwise.
    pub fn drag_step(&self, step_id: &str, position: Point) -> Result<Changeset, CanvasError> {
        let mut scene = Scene::new(self.workflow, self.config)?;
        let report = drag::step_drag_stop(&mut scene, step_id, position)?;
        Ok(scene.into_changeset(report))
    }

    /// A group was released with its origin at `position`.
    pub fn drag_group(&self, group_id: &str, position: Point) -> Result<Changeset, CanvasError> {
        let mut scene = Scene::new(self.workflow, self.config)?;
        let report = drag::group_drag_stop(&mut scene, group_id, position)?;
        Ok(scene.into_changeset(report))
    }

    /// A group resize ended at `bounds`.
    pub fn resize_group(&self, group_id: &str, bounds: Rect) -> Result<Changeset, CanvasError> {
        let mut scene = Scene::new(self.workflow, self.config)?;
        let report = drag::group_resize_stop(&mut scene, group_id, bounds)?;
        Ok(scene.into_changeset(report))
    }

    /// Snapshots member offsets at resize start.
    pub fn begin_resize(&self, group_id: &str) -> Result<ResizeSession, CanvasError> {
        let group = self
            .workflow
            .group(group_id)
            .ok_or_else(|| CanvasError::UnknownGroup(group_id.to_string()))?;
        let start = group.rect();
        let offsets = self
            .workflow
            .members(group_id)
            .map(|step| {
                (
                    step.id.clone(),
                    Point::new(step.position_x - start.x, step.position_y - start.y),
                )
            })
            .collect();
        Ok(ResizeSession {
            start,
            offsets,
        })
    }
}

/// Live resize state. Dragging the top or left handle moves the group
/// origin; children compensate so they stay fixed on the canvas.
#[derive(Debug, Clone)]
pub struct ResizeSession {
    start: Rect,
    offsets: Vec<(String, Point)>,
}

impl ResizeSession {
    /// Group-relative child positions for the live bounds.
    pub fn child_positions(&self, live: &Rect) -> Vec<(String, Point)> {
        let dx = live.x - self.start.x;
        let dy = live.y - self.start.y;
        self.offsets
            .iter()
            .map(|(id, offset)| (id.clone(), offset.offset(-dx, -dy)))
            .collect()
    }
}
