//! Fixed-capacity history of motion centroids.

use serde::Serialize;

use crate::error::{MotionError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ring buffer of the most recent centroids; the oldest entry is overwritten
/// once `capacity` points are stored.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer {
    slots: Vec<Point>,
    /// Slot of the last pushed point, `None` until the first push.
    head: Option<usize>,
    len: usize,
}

impl TrajectoryBuffer {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MotionError::InvalidHistoryLength);
        }
        Ok(Self {
            slots: vec![Point::default(); capacity],
            head: None,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, p: Point) {
        let cap = self.slots.len();
        let next = self.head.map_or(0, |h| (h + 1) % cap);
        self.slots[next] = p;
        self.head = Some(next);
        self.len = (self.len + 1).min(cap);
    }

    /// Point pushed `back` steps before the most recent one (0 = most recent).
    ///
    /// Any `back` is accepted and wraps around the ring, so values at or past
    /// `len()` return stale slots.
    pub fn get(&self, back: usize) -> Result<Point> {
        let head = self.head.ok_or(MotionError::EmptyBuffer)?;
        let cap = self.slots.len();
        let i = (head + cap - back % cap) % cap;
        Ok(self.slots[i])
    }

    /// Stored points, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.len).filter_map(move |k| self.get(k).ok())
    }

    pub fn reset(&mut self) {
        self.slots.fill(Point::default());
        self.head = None;
        self.len = 0;
    }
}
