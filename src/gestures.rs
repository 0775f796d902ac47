use std::fmt;

use log::debug;
use serde::Serialize;

use crate::config::GestureThresholds;
use crate::trajectory::{Point, TrajectoryBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Event topic of the built-in detector for this direction.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Left => "LeftMotion",
            Direction::Right => "RightMotion",
            Direction::Up => "UpMotion",
            Direction::Down => "DownMotion",
        }
    }

    pub fn window(self, th: &GestureThresholds) -> MotionWindow {
        let (t, r) = (th.threshold, th.range);
        match self {
            Direction::Right => MotionWindow::horizontal(t, r, t),
            Direction::Left => MotionWindow::horizontal(-r, -t, t),
            Direction::Down => MotionWindow::vertical(t, r, t),
            Direction::Up => MotionWindow::vertical(-r, -t, t),
        }
    }
}

/// Open rectangle a displacement vector must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionWindow {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl MotionWindow {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn horizontal(min_x: f64, max_x: f64, range_y: f64) -> Self {
        Self::new(min_x, max_x, -range_y, range_y)
    }

    pub fn vertical(min_y: f64, max_y: f64, range_x: f64) -> Self {
        Self::new(-range_x, range_x, min_y, max_y)
    }

    pub fn contains(&self, v: Point) -> bool {
        v.x > self.min_x && v.x < self.max_x && v.y > self.min_y && v.y < self.max_y
    }
}

/// Net movement across the trajectory: the telescoped sum of differences
/// between consecutive points, i.e. newest minus oldest.
pub fn displacement(points: &TrajectoryBuffer) -> Point {
    if points.len() <= 1 {
        return Point::default();
    }
    let mut v = Point::default();
    for (prev, cur) in points.iter().zip(points.iter().skip(1)) {
        v.x += prev.x - cur.x;
        v.y += prev.y - cur.y;
    }
    v
}

/// Per-round cache so every detector sees the same displacement vector
/// without recomputing it. Must be reset before the trajectory changes.
#[derive(Debug, Default)]
pub struct ClassificationRound {
    cached: Option<Point>,
}

impl ClassificationRound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displacement(&mut self, points: &TrajectoryBuffer) -> Point {
        *self.cached.get_or_insert_with(|| displacement(points))
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    pub fn reset(&mut self) {
        self.cached = None;
    }
}

pub type Predicate = Box<dyn Fn(Point, &TrajectoryBuffer) -> bool>;

enum Rule {
    Window(MotionWindow),
    Custom(Predicate),
}

/// A named trajectory predicate. The name doubles as its event topic and
/// as its identity when registering with an engine.
pub struct GestureDetector {
    name: String,
    rule: Rule,
}

impl fmt::Debug for GestureDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("GestureDetector");
        d.field("name", &self.name);
        match &self.rule {
            Rule::Window(w) => d.field("rule", w),
            Rule::Custom(_) => d.field("rule", &"<custom>"),
        };
        d.finish()
    }
}

impl GestureDetector {
    pub fn window(name: impl Into<String>, window: MotionWindow) -> Self {
        Self {
            name: name.into(),
            rule: Rule::Window(window),
        }
    }

    /// Detector backed by an arbitrary test of the round's displacement vector
    /// and the trajectory itself.
    pub fn custom<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Point, &TrajectoryBuffer) -> bool + 'static,
    {
        Self {
            name: name.into(),
            rule: Rule::Custom(Box::new(f)),
        }
    }

    pub fn direction(dir: Direction, th: &GestureThresholds) -> Self {
        Self::window(dir.name(), dir.window(th))
    }

    pub fn left() -> Self {
        Self::direction(Direction::Left, &GestureThresholds::default())
    }

    pub fn right() -> Self {
        Self::direction(Direction::Right, &GestureThresholds::default())
    }

    pub fn up() -> Self {
        Self::direction(Direction::Up, &GestureThresholds::default())
    }

    pub fn down() -> Self {
        Self::direction(Direction::Down, &GestureThresholds::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, points: &TrajectoryBuffer, round: &mut ClassificationRound) -> bool {
        let v = round.displacement(points);
        match &self.rule {
            Rule::Window(w) => w.contains(v),
            Rule::Custom(f) => f(v, points),
        }
    }
}

/// The four directional detectors, in the order they are usually registered.
pub fn builtin(th: &GestureThresholds) -> Vec<GestureDetector> {
    Direction::ALL
        .iter()
        .map(|&d| GestureDetector::direction(d, th))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub name: String,
    pub displacement: Point,
}

/// Ordered set of detectors; the first one to match wins.
#[derive(Debug, Default)]
pub struct GestureClassifier {
    detectors: Vec<GestureDetector>,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `detector` unless one with the same name is already registered.
    pub fn register(&mut self, detector: GestureDetector) -> bool {
        if self.contains(detector.name()) {
            debug!("detector '{}' already registered", detector.name());
            return false;
        }
        self.detectors.push(detector);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.detectors.iter().any(|d| d.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn classify(
        &self,
        points: &TrajectoryBuffer,
        round: &mut ClassificationRound,
    ) -> Option<Classification> {
        let hit = self.detectors.iter().find(|d| d.matches(points, round))?;
        Some(Classification {
            name: hit.name.clone(),
            displacement: round.displacement(points),
        })
    }
}
