use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::CanvasConfig;
use crate::geometry::{Point, Rect, snap_down, snap_to_grid, snap_up};
use crate::interaction::cascade::PushDirection;
use crate::model::GroupRole;

/// A group's outer bounds as seen by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBox {
    pub id: String,
    pub rect: Rect,
}

impl GroupBox {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropZone {
    /// Fully within the group's interior.
    Inside,
    /// Overlapping the group without fitting its interior; never a valid resting state.
    Boundary,
    Outside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub group_id: Option<String>,
    pub zone: DropZone,
    pub role: Option<GroupRole>,
}

impl DropTarget {
    fn outside() -> Self {
        Self {
            group_id: None,
            zone: DropZone::Outside,
            role: None,
        }
    }
}

/// Where [`snap_to_valid_position`] settled a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidPosition {
    pub position: Point,
    pub zone: DropZone,
    /// Edge the box left through when it was moved outside.
    pub direction: Option<PushDirection>,
}

/// Group interior: outer bounds minus padding and boundary on every side,
/// minus the header strip on top.
pub fn inner_bounds(group: &Rect, config: &CanvasConfig) -> Rect {
    let side = config.group.side_inset();
    let top = config.group.top_inset();
    Rect::new(
        group.x + side,
        group.y + top,
        (group.width - side * 2.0).max(0.0),
        (group.height - top - side).max(0.0),
    )
}

/// Classifies `rect` against `groups`, topmost group first. The first group
/// whose outer bounds overlap the box decides the result.
pub fn classify(
    rect: &Rect,
    groups: &[GroupBox],
    exclude: Option<&str>,
    config: &CanvasConfig,
) -> DropTarget {
    for group in groups.iter().rev() {
        if exclude == Some(group.id.as_str()) {
            continue;
        }
        if !rect.overlaps(&group.rect) {
            continue;
        }
        let inner = inner_bounds(&group.rect, config);
        if inner.contains(rect) {
            return DropTarget {
                group_id: Some(group.id.clone()),
                zone: DropZone::Inside,
                role: Some(GroupRole::Body),
            };
        }
        return DropTarget {
            group_id: Some(group.id.clone()),
            zone: DropZone::Boundary,
            role: None,
        };
    }
    DropTarget::outside()
}

/// Resolves a box resting on a group's boundary to the nearer of two valid
/// spots: clamped into the interior, or moved out past the nearest edge.
pub fn snap_to_valid_position(rect: &Rect, group: &Rect, config: &CanvasConfig) -> ValidPosition {
    let current = rect.origin();
    let (outside, direction) = snap_outside(rect, group, config);
    let Some(inside) = clamp_inside(rect, group, config) else {
        return ValidPosition {
            position: outside,
            zone: DropZone::Outside,
            direction: Some(direction),
        };
    };

    if current.distance(inside) <= current.distance(outside) {
        ValidPosition {
            position: inside,
            zone: DropZone::Inside,
            direction: None,
        }
    } else {
        ValidPosition {
            position: outside,
            zone: DropZone::Outside,
            direction: Some(direction),
        }
    }
}

/// Grid-aligned position fully inside the group's interior closest to the
/// box, or `None` when the interior cannot hold it.
pub fn clamp_inside(rect: &Rect, group: &Rect, config: &CanvasConfig) -> Option<Point> {
    let grid = config.grid_size;
    let inner = inner_bounds(group, config);
    let min_x = snap_up(inner.x, grid);
    let max_x = snap_down(inner.right() - rect.width, grid);
    let min_y = snap_up(inner.y, grid);
    let max_y = snap_down(inner.bottom() - rect.height, grid);
    if min_x > max_x || min_y > max_y {
        return None;
    }
    let x = snap_to_grid(rect.x, grid).clamp(min_x, max_x);
    let y = snap_to_grid(rect.y, grid).clamp(min_y, max_y);
    Some(Point::new(x, y))
}

/// Moves the box out through the group edge requiring the smallest
/// displacement, keeping one push gap of clearance.
pub fn snap_outside(rect: &Rect, group: &Rect, config: &CanvasConfig) -> (Point, PushDirection) {
    let grid = config.grid_size;
    let gap = config.push_gap;
    let held_x = snap_to_grid(rect.x, grid);
    let held_y = snap_to_grid(rect.y, grid);

    let candidates = [
        (
            Point::new(snap_down(group.x - gap - rect.width, grid), held_y),
            PushDirection::Left,
        ),
        (
            Point::new(snap_up(group.right() + gap, grid), held_y),
            PushDirection::Right,
        ),
        (
            Point::new(held_x, snap_down(group.y - gap - rect.height, grid)),
            PushDirection::Up,
        ),
        (
            Point::new(held_x, snap_up(group.bottom() + gap, grid)),
            PushDirection::Down,
        ),
    ];

    let current = rect.origin();
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if current.distance(candidate.0) < current.distance(best.0) {
            best = *candidate;
        }
    }
    best
}

/// First group (topmost first) whose outer bounds the box overlaps.
pub fn find_group_boundary_collision<'g>(
    rect: &Rect,
    groups: &'g [GroupBox],
    skip: &HashSet<String>,
) -> Option<&'g GroupBox> {
    groups
        .iter()
        .rev()
        .filter(|group| !skip.contains(&group.id))
        .find(|group| rect.overlaps(&group.rect))
}

/// First group (topmost first) closer to the box than `gap`.
pub fn find_group_collision<'g>(
    rect: &Rect,
    groups: &'g [GroupBox],
    gap: f32,
    skip: &HashSet<String>,
) -> Option<&'g GroupBox> {
    let padded = rect.expanded(gap);
    groups
        .iter()
        .rev()
        .filter(|group| !skip.contains(&group.id))
        .find(|group| padded.overlaps(&group.rect))
}
