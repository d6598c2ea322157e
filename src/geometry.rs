use serde::{Deserialize, Serialize};

const COORD_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn snapped(self, grid: f32) -> Self {
        Self::new(snap_to_grid(self.x, grid), snap_to_grid(self.y, grid))
    }

    /// Equal within the tolerance used when diffing persisted coordinates.
    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() < COORD_TOLERANCE && (self.y - other.y).abs() < COORD_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box, top-left origin, in the shared canvas coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap: boxes that only touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.right() > other.x
            && self.x < other.right()
            && self.bottom() > other.y
            && self.y < other.bottom()
    }

    /// True when `other` lies fully within `self`, edges included.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn expanded(&self, by: f32) -> Rect {
        Rect::new(
            self.x - by,
            self.y - by,
            self.width + by * 2.0,
            self.height + by * 2.0,
        )
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn approx_eq(&self, other: &Rect) -> bool {
        self.origin().approx_eq(other.origin())
            && (self.width - other.width).abs() < COORD_TOLERANCE
            && (self.height - other.height).abs() < COORD_TOLERANCE
    }

    pub fn with_origin(&self, origin: Point) -> Rect {
        Rect::new(origin.x, origin.y, self.width, self.height)
    }

    /// Smallest box covering every rect, or `None` for an empty input.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        let mut any = false;
        for rect in rects {
            any = true;
            min_x = min_x.min(rect.x);
            min_y = min_y.min(rect.y);
            max_x = max_x.max(rect.right());
            max_y = max_y.max(rect.bottom());
        }
        any.then(|| Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// Rounds `value` to the nearest multiple of `grid`.
pub fn snap_to_grid(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    normalize_zero((value / grid).round() * grid)
}

/// Smallest grid multiple that is `>= value`.
pub fn snap_up(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    normalize_zero((value / grid - GRID_EPSILON).ceil() * grid)
}

/// Largest grid multiple that is `<= value`.
pub fn snap_down(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    normalize_zero((value / grid + GRID_EPSILON).floor() * grid)
}

pub fn is_on_grid(value: f32, grid: f32) -> bool {
    grid <= 0.0 || (value - snap_to_grid(value, grid)).abs() <= 1e-3
}

// Absorbs f32 noise so an exact multiple never rounds a whole unit away.
const GRID_EPSILON: f32 = 1e-4;

fn normalize_zero(value: f32) -> f32 {
    if value == 0.0 { 0.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_nearest_multiple() {
        assert_eq!(snap_to_grid(29.0, 20.0), 20.0);
        assert_eq!(snap_to_grid(31.0, 20.0), 40.0);
        assert_eq!(snap_to_grid(-31.0, 20.0), -40.0);
        assert_eq!(snap_to_grid(-4.0, 20.0), 0.0);
        assert!(snap_to_grid(-4.0, 20.0).is_sign_positive());
    }

    #[test]
    fn directional_snaps_respect_bounds() {
        assert_eq!(snap_up(21.0, 20.0), 40.0);
        assert_eq!(snap_up(40.0, 20.0), 40.0);
        assert_eq!(snap_down(39.0, 20.0), 20.0);
        assert_eq!(snap_down(40.0, 20.0), 40.0);
        assert_eq!(snap_down(-1.0, 20.0), -20.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 50.0, 50.0);
        let c = Rect::new(99.0, 99.0, 50.0, 50.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn containment_is_inclusive() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(outer.contains(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains(&Rect::new(90.0, 10.0, 20.0, 20.0)));
    }

    #[test]
    fn union_covers_all_boxes() {
        let rects = [Rect::new(0.0, 10.0, 10.0, 10.0), Rect::new(50.0, -5.0, 10.0, 10.0)];
        let union = Rect::union_all(&rects).unwrap();
        assert_eq!(union, Rect::new(0.0, -5.0, 60.0, 25.0));
        assert!(Rect::union_all(&[]).is_none());
    }
}
