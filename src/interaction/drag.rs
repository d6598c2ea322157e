use tracing::debug;

use crate::changes::CascadeReport;
use crate::error::CanvasError;
use crate::geometry::{Point, Rect, snap_to_grid, snap_up};
use crate::interaction::cascade::{Cascade, Pushed, Pusher};
use crate::interaction::drop_zone::{
    DropZone, classify, inner_bounds, snap_outside, snap_to_valid_position,
};
use crate::interaction::scene::Scene;

/// Leaf drag-stop. `position` is the step origin as reported by the canvas:
/// relative to the parent group while the step is grouped, absolute otherwise.
pub(super) fn step_drag_stop(
    scene: &mut Scene<'_>,
    step_id: &str,
    position: Point,
) -> Result<CascadeReport, CanvasError> {
    let config = scene.config;
    let step = scene.step(step_id)?.clone();
    let absolute = match &step.group {
        Some(group_id) => {
            let parent = scene.group_rect(group_id)?;
            position.offset(parent.x, parent.y)
        }
        None => position,
    };
    let rect = step.rect.with_origin(absolute.snapped(config.grid_size));
    let target = classify(&rect, scene.groups(), None, config);

    let (zone, group_id) = match (target.zone, target.group_id) {
        (DropZone::Outside, _) | (_, None) => {
            scene.set_step_origin(step_id, rect.origin());
            scene.set_step_group(step_id, None);
            return Ok(CascadeReport::default());
        }
        (zone, Some(group_id)) => (zone, group_id),
    };

    if zone == DropZone::Inside {
        debug!(step = step_id, group = %group_id, "step dropped inside group");
        scene.set_step_origin(step_id, rect.origin());
        scene.set_step_group(step_id, Some(group_id));
        return Ok(CascadeReport::default());
    }

    let group_rect = scene.group_rect(&group_id)?;
    let resolved = snap_to_valid_position(&rect, &group_rect, config);
    scene.set_step_origin(step_id, resolved.position);
    if resolved.zone == DropZone::Inside {
        debug!(step = step_id, group = %group_id, "boundary drop snapped inside");
        scene.set_step_group(step_id, Some(group_id));
        return Ok(CascadeReport::default());
    }

    debug!(step = step_id, group = %group_id, direction = ?resolved.direction, "boundary drop snapped outside");
    scene.set_step_group(step_id, None);
    let mut cascade = Cascade::new(scene, None);
    cascade.pin_group(&group_id);
    cascade.pin_step(step_id);
    cascade.enqueue(Pusher::Step(step_id.to_string()));
    Ok(cascade.run())
}

/// Group drag-stop: absorb steps now fully inside, resolve the group's own
/// collision (this fixes the cascade direction), then push out foreign steps
/// and neighbouring groups.
pub(super) fn group_drag_stop(
    scene: &mut Scene<'_>,
    group_id: &str,
    position: Point,
) -> Result<CascadeReport, CanvasError> {
    let config = scene.config;
    let start = scene.group_rect(group_id)?;
    let target = position.snapped(config.grid_size);
    scene.move_group(group_id, target.x - start.x, target.y - start.y);
    let dropped = scene.group_rect(group_id)?;

    let inner = inner_bounds(&dropped, config);
    let added: Vec<String> = scene
        .ungrouped()
        .filter(|step| inner.contains(&step.rect))
        .map(|step| step.id.clone())
        .collect();
    for step_id in &added {
        debug!(step = %step_id, group = group_id, "step absorbed by dropped group");
        scene.set_step_group(step_id, Some(group_id.to_string()));
    }

    let mut report = CascadeReport::default();
    let mut anchor = None;
    let hit = classify(&dropped, scene.groups(), Some(group_id), config);
    if let (DropZone::Inside | DropZone::Boundary, Some(other_id)) = (hit.zone, hit.group_id) {
        let other = scene.group_rect(&other_id)?;
        let (resolved, direction) = snap_outside(&dropped, &other, config);
        let dx = resolved.x - dropped.x;
        let dy = resolved.y - dropped.y;
        debug!(group = group_id, away_from = %other_id, ?direction, "group dropped onto another group");
        // Absorbed steps are members by now and travel with the group.
        scene.move_group(group_id, dx, dy);
        report.record(Pushed::Group(group_id.to_string()), direction, dx, dy);
        anchor = Some(other_id);
    }

    let direction = report.direction;
    let mut cascade = Cascade::new(scene, direction).with_report(report);
    cascade.pin_group(group_id);
    if let Some(other_id) = &anchor {
        cascade.pin_group(other_id);
    }
    cascade.enqueue(Pusher::Group(group_id.to_string()));
    Ok(cascade.run())
}

/// Resize-stop: clamp to the minimum size, evict members that no longer fit,
/// absorb loose steps that now fit, then cascade from the new bounds.
pub(super) fn group_resize_stop(
    scene: &mut Scene<'_>,
    group_id: &str,
    bounds: Rect,
) -> Result<CascadeReport, CanvasError> {
    let config = scene.config;
    let grid = config.grid_size;
    scene.group_rect(group_id)?;
    let rect = Rect::new(
        snap_to_grid(bounds.x, grid),
        snap_to_grid(bounds.y, grid),
        snap_up(bounds.width.max(config.group.min_width), grid),
        snap_up(bounds.height.max(config.group.min_height), grid),
    );
    scene.set_group_rect(group_id, rect);
    let inner = inner_bounds(&rect, config);

    let mut evicted = Vec::new();
    for member_id in scene.member_ids(group_id) {
        let Some(member) = scene.step_rect(&member_id) else {
            continue;
        };
        if inner.contains(&member) {
            continue;
        }
        let snapped = member.with_origin(member.origin().snapped(grid));
        let origin = if snapped.overlaps(&rect) {
            snap_outside(&member, &rect, config).0
        } else {
            snapped.origin()
        };
        debug!(step = %member_id, group = group_id, "member evicted by resize");
        scene.set_step_origin(&member_id, origin);
        scene.set_step_group(&member_id, None);
        evicted.push(member_id);
    }

    let absorbed: Vec<String> = scene
        .ungrouped()
        .filter(|step| !evicted.contains(&step.id) && inner.contains(&step.rect))
        .map(|step| step.id.clone())
        .collect();
    for step_id in absorbed {
        debug!(step = %step_id, group = group_id, "step absorbed by resize");
        scene.set_step_group(&step_id, Some(group_id.to_string()));
    }

    let mut cascade = Cascade::new(scene, None);
    cascade.pin_group(group_id);
    for step_id in evicted {
        cascade.enqueue(Pusher::Step(step_id));
    }
    cascade.enqueue(Pusher::Group(group_id.to_string()));
    Ok(cascade.run())
}
