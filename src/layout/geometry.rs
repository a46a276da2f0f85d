use serde::{Deserialize, Serialize};

const COARSE_SAMPLES: usize = 40;
const REFINE_SAMPLES: usize = 20;
const REFINE_WINDOW: f32 = 0.025;
const T_PRECISION: f32 = 1000.0;

pub const LABEL_T_MIN: f32 = 0.05;
pub const LABEL_T_MAX: f32 = 0.95;
pub const DEFAULT_LABEL_T: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance_sq(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned box in top-left/size form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn from_corners(min: Point, max: Point) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        Rect::from_corners(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Cubic bezier in Bernstein form.
pub fn bezier_point(t: f32, p0: Point, p1: Point, p2: Point, p3: Point) -> Point {
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let t2 = t * t;
    let a = mt2 * mt;
    let b = 3.0 * mt2 * t;
    let c = 3.0 * mt * t2;
    let d = t2 * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// S-shaped horizontal link: both control points sit on the vertical line
/// halfway between the endpoints. Label anchoring relies on this shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub start: Point,
    pub end: Point,
}

impl Curve {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn control_points(&self) -> [Point; 4] {
        let mid = (self.start.x + self.end.x) / 2.0;
        [
            self.start,
            Point::new(mid, self.start.y),
            Point::new(mid, self.end.y),
            self.end,
        ]
    }

    pub fn point_at(&self, t: f32) -> Point {
        let [p0, p1, p2, p3] = self.control_points();
        bezier_point(t, p0, p1, p2, p3)
    }

    pub fn nearest_t(&self, point: Point) -> f32 {
        nearest_t(point, self.start, self.end)
    }

    pub fn to_path_data(&self) -> String {
        let [p0, p1, p2, p3] = self.control_points();
        format!(
            "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
            p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
        )
    }
}

/// Parameter of the curve point closest to `point`, rounded to three
/// decimals. Coarse uniform sampling followed by a dense pass around the
/// coarse minimum; the refined result is never farther than the coarse one.
pub fn nearest_t(point: Point, start: Point, end: Point) -> f32 {
    let curve = Curve::new(start, end);

    let mut best_t = 0.0f32;
    let mut best_dist = f32::INFINITY;
    for i in 0..=COARSE_SAMPLES {
        let t = i as f32 / COARSE_SAMPLES as f32;
        let dist = curve.point_at(t).distance_sq(point);
        if dist < best_dist {
            best_dist = dist;
            best_t = t;
        }
    }

    let lo = (best_t - REFINE_WINDOW).max(0.0);
    let hi = (best_t + REFINE_WINDOW).min(1.0);
    let coarse_t = best_t;
    for i in 0..=REFINE_SAMPLES {
        let t = lo + (hi - lo) * i as f32 / REFINE_SAMPLES as f32;
        let dist = curve.point_at(t).distance_sq(point);
        if dist < best_dist {
            best_dist = dist;
            best_t = t;
        }
    }
    if !best_t.is_finite() {
        best_t = coarse_t;
    }

    ((best_t * T_PRECISION).round() / T_PRECISION).clamp(0.0, 1.0)
}

/// Keeps a persisted label away from both endpoint nodes.
pub fn clamp_label_t(t: f32) -> f32 {
    t.clamp(LABEL_T_MIN, LABEL_T_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> Curve {
        Curve::new(Point::new(10.0, 40.0), Point::new(250.0, 180.0))
    }

    #[test]
    fn endpoints_are_exact() {
        let c = curve();
        let [p0, p1, p2, p3] = c.control_points();
        assert_eq!(bezier_point(0.0, p0, p1, p2, p3), c.start);
        assert_eq!(bezier_point(1.0, p0, p1, p2, p3), c.end);
    }

    #[test]
    fn midpoint_of_level_curve_stays_on_the_line() {
        let c = Curve::new(Point::new(0.0, 75.0), Point::new(300.0, 75.0));
        let mid = c.point_at(0.5);
        assert_eq!(mid.y, 75.0);
        assert_eq!(mid.x, 150.0);
    }

    #[test]
    fn control_points_share_midline() {
        let [_, p1, p2, _] = curve().control_points();
        assert_eq!(p1.x, 130.0);
        assert_eq!(p2.x, 130.0);
        assert_eq!(p1.y, 40.0);
        assert_eq!(p2.y, 180.0);
    }

    #[test]
    fn nearest_t_recovers_curve_points() {
        let c = curve();
        for t0 in [0.0, 0.013, 0.25, 0.5, 0.731, 0.99, 1.0] {
            let t = c.nearest_t(c.point_at(t0));
            assert!((t - t0).abs() < 0.01, "t0={t0} got {t}");
        }
    }

    #[test]
    fn nearest_t_stays_in_unit_range() {
        let c = curve();
        for cursor in [
            Point::new(-500.0, -500.0),
            Point::new(900.0, 900.0),
            Point::new(130.0, 110.0),
        ] {
            let t = c.nearest_t(cursor);
            assert!((0.0..=1.0).contains(&t));
        }
        assert_eq!(c.nearest_t(Point::new(-500.0, 40.0)), 0.0);
        assert_eq!(c.nearest_t(Point::new(900.0, 180.0)), 1.0);
    }

    #[test]
    fn nearest_t_rounds_to_three_decimals() {
        let t = curve().nearest_t(Point::new(77.0, 61.0));
        assert_eq!((t * 1000.0).round() / 1000.0, t);
    }

    #[test]
    fn label_clamp_bounds() {
        assert_eq!(clamp_label_t(0.0), LABEL_T_MIN);
        assert_eq!(clamp_label_t(1.0), LABEL_T_MAX);
        assert_eq!(clamp_label_t(0.3), 0.3);
    }

    #[test]
    fn path_data_is_cubic() {
        let d = curve().to_path_data();
        assert!(d.starts_with("M 10.00 40.00 C 130.00 40.00"));
    }
}
