//! Push resolution and breadth-first cascade propagation.
//!
//! A cascade starts from one element that now collides with something and
//! pushes whatever it hits. Pushed elements are queued and push in turn.
//! The first push fixes the direction for the whole cascade, so chains move
//! along one axis instead of zig-zagging.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

use crate::changes::CascadeReport;
use crate::config::CanvasConfig;
use crate::geometry::{Point, Rect, snap_down, snap_to_grid, snap_up};
use crate::interaction::drop_zone::{find_group_boundary_collision, find_group_collision};
use crate::interaction::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPosition {
    pub x: f32,
    pub y: f32,
    pub delta_x: f32,
    pub delta_y: f32,
    pub direction: PushDirection,
}

/// Element moved by a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pushed {
    Step(String),
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRecord {
    pub target: Pushed,
    pub direction: PushDirection,
    pub delta_x: f32,
    pub delta_y: f32,
}

/// Computes where `pushed` goes when `pusher` collides with it: flush
/// against the pusher's facing edge plus one push gap, orthogonal
/// coordinate held. Without a fixed direction the axis of the larger
/// centre-to-centre displacement wins.
pub fn calculate_push_position(
    pushed: &Rect,
    pusher: &Rect,
    fixed: Option<PushDirection>,
    config: &CanvasConfig,
) -> PushPosition {
    let direction = fixed.unwrap_or_else(|| push_direction(pushed, pusher));
    let grid = config.grid_size;
    let gap = config.push_gap;
    let held_x = snap_to_grid(pushed.x, grid);
    let held_y = snap_to_grid(pushed.y, grid);

    let (x, y) = match direction {
        PushDirection::Right => (snap_up(pusher.right() + gap, grid), held_y),
        PushDirection::Left => (snap_down(pusher.x - gap - pushed.width, grid), held_y),
        PushDirection::Down => (held_x, snap_up(pusher.bottom() + gap, grid)),
        PushDirection::Up => (held_x, snap_down(pusher.y - gap - pushed.height, grid)),
    };

    PushPosition {
        x,
        y,
        delta_x: x - pushed.x,
        delta_y: y - pushed.y,
        direction,
    }
}

fn push_direction(pushed: &Rect, pusher: &Rect) -> PushDirection {
    let from = pusher.center();
    let to = pushed.center();
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            PushDirection::Right
        } else {
            PushDirection::Left
        }
    } else if dy >= 0.0 {
        PushDirection::Down
    } else {
        PushDirection::Up
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pusher {
    Group(String),
    Step(String),
}

/// Breadth-first worklist of pushers over a [`Scene`].
pub(crate) struct Cascade<'s, 'w> {
    scene: &'s mut Scene<'w>,
    queue: VecDeque<(Pusher, usize)>,
    processed_groups: HashSet<String>,
    processed_steps: HashSet<String>,
    /// Groups moved by this cascade, in push order.
    pushed_groups: Vec<String>,
    report: CascadeReport,
}

impl<'s, 'w> Cascade<'s, 'w> {
    pub fn new(scene: &'s mut Scene<'w>, direction: Option<PushDirection>) -> Self {
        Self {
            scene,
            queue: VecDeque::new(),
            processed_groups: HashSet::new(),
            processed_steps: HashSet::new(),
            pushed_groups: Vec::new(),
            report: CascadeReport {
                direction,
                ..CascadeReport::default()
            },
        }
    }

    /// Carries over pushes already made while resolving the gesture itself.
    pub fn with_report(mut self, report: CascadeReport) -> Self {
        self.report = report;
        self
    }

    /// Excludes a group from being pushed.
    pub fn pin_group(&mut self, id: &str) {
        self.processed_groups.insert(id.to_string());
    }

    /// Excludes a step from being pushed.
    pub fn pin_step(&mut self, id: &str) {
        self.processed_steps.insert(id.to_string());
    }

    pub fn enqueue(&mut self, pusher: Pusher) {
        self.queue.push_back((pusher, 0));
    }

    pub fn run(mut self) -> CascadeReport {
        let max_depth = self.scene.config.max_cascade_depth;
        while let Some((pusher, depth)) = self.queue.pop_front() {
            if depth >= max_depth {
                if !self.still_colliding(&pusher) {
                    continue;
                }
                warn!(
                    depth,
                    pending = self.queue.len() + 1,
                    "cascade depth limit reached, remaining pushes dropped"
                );
                self.report.truncated = true;
                break;
            }
            match pusher {
                Pusher::Group(id) => self.push_from_group(&id, depth),
                Pusher::Step(id) => self.push_from_step(&id, depth),
            }
        }
        self.report
    }

    fn push_from_group(&mut self, id: &str, depth: usize) {
        let Ok(pusher) = self.scene.group_rect(id) else {
            return;
        };
        let gap = self.scene.config.group_gap;

        let mut skip = self.processed_groups.clone();
        skip.insert(id.to_string());
        let mut hits = Vec::new();
        while let Some(hit) = find_group_collision(&pusher, self.scene.groups(), gap, &skip) {
            skip.insert(hit.id.clone());
            hits.push((hit.id.clone(), hit.rect));
        }
        self.push_groups(hits, &pusher, depth);

        let hits: Vec<(String, Rect)> = self
            .scene
            .ungrouped()
            .filter(|step| !self.processed_steps.contains(&step.id))
            .filter(|step| step.rect.overlaps(&pusher))
            .map(|step| (step.id.clone(), step.rect))
            .collect();
        for (step_id, rect) in hits {
            let push = calculate_push_position(&rect, &pusher, self.report.direction, self.scene.config);
            debug!(step = %step_id, by = %id, direction = ?push.direction, "pushing step out of group");
            self.scene
                .set_step_origin(&step_id, rect.origin().offset(push.delta_x, push.delta_y));
            self.processed_steps.insert(step_id.clone());
            self.record(Pushed::Step(step_id.clone()), push);
            self.queue.push_back((Pusher::Step(step_id), depth + 1));
        }
    }

    fn push_from_step(&mut self, id: &str, depth: usize) {
        let Some(pusher) = self.scene.step_rect(id) else {
            return;
        };
        let mut skip = self.processed_groups.clone();
        let mut hits = Vec::new();
        while let Some(hit) = find_group_boundary_collision(&pusher, self.scene.groups(), &skip) {
            skip.insert(hit.id.clone());
            hits.push((hit.id.clone(), hit.rect));
        }
        self.push_groups(hits, &pusher, depth);
    }

    /// Pushes every group one pusher hit, nearest first, so later hits stack
    /// behind earlier ones along the cascade direction.
    fn push_groups(&mut self, mut hits: Vec<(String, Rect)>, pusher: &Rect, depth: usize) {
        let from = pusher.center();
        hits.sort_by(|a, b| {
            from.distance(a.1.center())
                .partial_cmp(&from.distance(b.1.center()))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (id, rect) in hits {
            self.push_group(&id, &rect, pusher, depth);
        }
    }

    fn push_group(&mut self, id: &str, rect: &Rect, pusher: &Rect, depth: usize) {
        let config = self.scene.config;
        let first = calculate_push_position(rect, pusher, self.report.direction, config);
        let direction = first.direction;
        let mut target = rect.with_origin(Point::new(first.x, first.y));
        // Each step clears one already pushed group further along the axis.
        for _ in 0..self.pushed_groups.len() {
            let Some(blocker) = self.pushed_blocker(id, &target) else {
                break;
            };
            let next = calculate_push_position(&target, &blocker, Some(direction), config);
            target = target.with_origin(Point::new(next.x, next.y));
        }
        let push = PushPosition {
            x: target.x,
            y: target.y,
            delta_x: target.x - rect.x,
            delta_y: target.y - rect.y,
            direction,
        };

        debug!(group = %id, direction = ?push.direction, dx = push.delta_x, dy = push.delta_y, "pushing group");
        self.scene.move_group(id, push.delta_x, push.delta_y);
        self.processed_groups.insert(id.to_string());
        self.pushed_groups.push(id.to_string());
        self.record(Pushed::Group(id.to_string()), push);
        self.queue.push_back((Pusher::Group(id.to_string()), depth + 1));
    }

    /// An already pushed group that `target` would come within the group gap of.
    fn pushed_blocker(&self, id: &str, target: &Rect) -> Option<Rect> {
        let gap = self.scene.config.group_gap;
        self.pushed_groups
            .iter()
            .filter(|other| other.as_str() != id)
            .filter_map(|other| self.scene.group_rect(other).ok())
            .find(|other| other.expanded(gap).overlaps(target))
    }

    /// Whether a queued pusher would still move anything if it ran.
    fn still_colliding(&self, pusher: &Pusher) -> bool {
        match pusher {
            Pusher::Group(id) => {
                let Ok(rect) = self.scene.group_rect(id) else {
                    return false;
                };
                let mut skip = self.processed_groups.clone();
                skip.insert(id.clone());
                let gap = self.scene.config.group_gap;
                find_group_collision(&rect, self.scene.groups(), gap, &skip).is_some()
                    || self
                        .scene
                        .ungrouped()
                        .any(|step| !self.processed_steps.contains(&step.id) && step.rect.overlaps(&rect))
            }
            Pusher::Step(id) => self.scene.step_rect(id).is_some_and(|rect| {
                find_group_boundary_collision(&rect, self.scene.groups(), &self.processed_groups).is_some()
            }),
        }
    }

    fn record(&mut self, target: Pushed, push: PushPosition) {
        self.report
            .record(target, push.direction, push.delta_x, push.delta_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockGroup, GroupKind, Step, StepType, Workflow};

    #[test]
    fn push_axis_follows_larger_displacement() {
        let config = CanvasConfig::default();
        let pusher = Rect::new(0.0, 0.0, 200.0, 200.0);
        let right = Rect::new(150.0, 20.0, 200.0, 200.0);
        let push = calculate_push_position(&right, &pusher, None, &config);
        assert_eq!(push.direction, PushDirection::Right);
        assert_eq!((push.x, push.y), (220.0, 20.0));
        assert_eq!((push.delta_x, push.delta_y), (70.0, 0.0));

        let below = Rect::new(20.0, 150.0, 200.0, 200.0);
        let push = calculate_push_position(&below, &pusher, None, &config);
        assert_eq!(push.direction, PushDirection::Down);
        assert_eq!((push.x, push.y), (20.0, 220.0));
    }

    #[test]
    fn fixed_direction_overrides_geometry() {
        let config = CanvasConfig::default();
        let pusher = Rect::new(0.0, 0.0, 200.0, 200.0);
        let below = Rect::new(20.0, 140.0, 100.0, 100.0);
        let push = calculate_push_position(&below, &pusher, Some(PushDirection::Left), &config);
        assert_eq!(push.direction, PushDirection::Left);
        assert_eq!(push.x, -120.0);
        assert_eq!(push.y, 140.0);
    }

    #[test]
    fn pushed_box_clears_pusher_even_off_grid() {
        let config = CanvasConfig::default();
        let pusher = Rect::new(0.0, 0.0, 213.0, 97.0);
        let pushed = Rect::new(200.0, 10.0, 100.0, 50.0);
        let push = calculate_push_position(&pushed, &pusher, None, &config);
        let placed = pushed.with_origin(Point::new(push.x, push.y));
        assert!(!placed.overlaps(&pusher));
        assert!(placed.x - pusher.right() >= config.push_gap);
        assert_eq!(push.x % config.grid_size, 0.0);
    }

    fn row_of_groups(count: usize) -> Workflow {
        let mut workflow = Workflow::default();
        for idx in 0..count {
            workflow.groups.push(BlockGroup::new(
                format!("g{idx}"),
                GroupKind::Parallel,
                Rect::new(idx as f32 * 320.0, 0.0, 300.0, 200.0),
            ));
        }
        workflow
    }

    #[test]
    fn cascade_propagates_in_one_direction() {
        let config = CanvasConfig::default();
        let workflow = row_of_groups(4);
        let mut scene = Scene::new(&workflow, &config).unwrap();
        scene.move_group("g0", 100.0, 40.0);

        let mut cascade = Cascade::new(&mut scene, None);
        cascade.pin_group("g0");
        cascade.enqueue(Pusher::Group("g0".into()));
        let report = cascade.run();

        assert_eq!(report.pushes.len(), 3);
        assert!(report.pushes.iter().all(|p| p.direction == PushDirection::Right));
        assert_eq!(report.direction, Some(PushDirection::Right));
        assert!(!report.truncated);

        let rects: Vec<Rect> = scene.groups().iter().map(|g| g.rect).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.expanded(config.group_gap).overlaps(b));
            }
        }
    }

    #[test]
    fn cascade_stops_at_depth_guard() {
        let mut config = CanvasConfig::default();
        config.max_cascade_depth = 2;
        let workflow = row_of_groups(6);
        let mut scene = Scene::new(&workflow, &config).unwrap();
        scene.move_group("g0", 100.0, 0.0);

        let mut cascade = Cascade::new(&mut scene, None);
        cascade.pin_group("g0");
        cascade.enqueue(Pusher::Group("g0".into()));
        let report = cascade.run();

        assert!(report.truncated);
        assert_eq!(report.pushes.len(), 2);
    }

    #[test]
    fn one_pusher_stacks_every_group_it_hits() {
        let config = CanvasConfig::default();
        let workflow = Workflow {
            groups: vec![
                BlockGroup::new("a", GroupKind::Parallel, Rect::new(0.0, 0.0, 300.0, 200.0)),
                BlockGroup::new("b", GroupKind::Foreach, Rect::new(400.0, 0.0, 200.0, 200.0)),
                BlockGroup::new("c", GroupKind::Foreach, Rect::new(620.0, 0.0, 200.0, 200.0)),
            ],
            ..Workflow::default()
        };
        let mut scene = Scene::new(&workflow, &config).unwrap();
        scene.set_group_rect("a", Rect::new(0.0, 0.0, 700.0, 200.0));

        let mut cascade = Cascade::new(&mut scene, None);
        cascade.pin_group("a");
        cascade.enqueue(Pusher::Group("a".into()));
        let report = cascade.run();

        assert_eq!(report.pushes.len(), 2);
        assert_eq!(report.direction, Some(PushDirection::Right));
        assert_eq!(scene.group_rect("b").unwrap().x, 720.0);
        assert_eq!(scene.group_rect("c").unwrap().x, 940.0);

        let rects: Vec<Rect> = scene.groups().iter().map(|g| g.rect).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.expanded(config.group_gap).overlaps(b), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn reaching_depth_limit_with_nothing_left_is_not_truncation() {
        let mut config = CanvasConfig::default();
        config.max_cascade_depth = 2;
        let workflow = row_of_groups(3);
        let mut scene = Scene::new(&workflow, &config).unwrap();
        scene.move_group("g0", 100.0, 0.0);

        let mut cascade = Cascade::new(&mut scene, None);
        cascade.pin_group("g0");
        cascade.enqueue(Pusher::Group("g0".into()));
        let report = cascade.run();

        assert_eq!(report.pushes.len(), 2);
        assert!(!report.truncated);
    }

    #[test]
    fn moving_group_pushes_loose_steps() {
        let config = CanvasConfig::default();
        let mut workflow = row_of_groups(1);
        workflow
            .steps
            .push(Step::new("loose", StepType::Tool, 320.0, 40.0));
        let mut scene = Scene::new(&workflow, &config).unwrap();
        scene.move_group("g0", 60.0, 0.0);

        let mut cascade = Cascade::new(&mut scene, None);
        cascade.pin_group("g0");
        cascade.enqueue(Pusher::Group("g0".into()));
        let report = cascade.run();

        assert_eq!(report.pushes.len(), 1);
        assert_eq!(report.pushes[0].target, Pushed::Step("loose".into()));
        let moved = scene.step_rect("loose").unwrap();
        assert_eq!(moved.x, 380.0);
        assert!(!moved.overlaps(&scene.group_rect("g0").unwrap()));
    }
}
