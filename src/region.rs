//! Movement magnitude and centroid over a rectangular part of a motion mask.

use serde::Serialize;

use crate::error::{MotionError, Result};
use crate::frame::{MotionMask, channel_sum};
use crate::trajectory::Point;

/// A rectangle in mask pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole mask.
    pub fn full(mask: &MotionMask) -> Self {
        Self::new(0, 0, mask.width(), mask.height())
    }

    /// Builds a region from optional parts, flooring the origin.
    ///
    /// Missing origin components are 0 and a missing width is the mask width.
    /// A missing height also falls back to the mask *width*; rows below the
    /// mask then read as no motion.
    pub fn resolve(
        x: Option<f64>,
        y: Option<f64>,
        width: Option<u32>,
        height: Option<u32>,
        mask: &MotionMask,
    ) -> Self {
        let floor = |v: Option<f64>| v.map(|v| v.floor().max(0.0) as u32).unwrap_or(0);
        Self {
            x: floor(x),
            y: floor(y),
            width: width.unwrap_or(mask.width()),
            height: height.unwrap_or(mask.width()),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// Centroid of the moving pixels in a region, in region-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovementPoint {
    pub x: f64,
    pub y: f64,
    /// Mean distance of the moving pixels from the centroid, when requested.
    pub radius: Option<f64>,
}

impl MovementPoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone)]
pub struct RegionAnalyzer {
    stride: usize,
}

impl RegionAnalyzer {
    pub fn new(stride: usize) -> Result<Self> {
        if stride == 0 {
            return Err(MotionError::InvalidStride);
        }
        Ok(Self { stride })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Region width rounded up to a multiple of the stride.
    fn sampled_width(&self, region: &Region) -> usize {
        (region.width as usize).div_ceil(self.stride) * self.stride
    }

    /// Calls `f(local_x, local_y, channel_mean)` for every sampled position of
    /// the region.
    ///
    /// Positions are the mask's own sampled pixels (flattened index a multiple
    /// of the stride). Since the width is a stride multiple, every row yields
    /// the same number of samples. Positions outside the mask report 0.
    fn for_each_sample(
        &self,
        mask: &MotionMask,
        region: &Region,
        mut f: impl FnMut(u32, u32, f64),
    ) {
        let s = self.stride;
        let (mw, mh) = (mask.width() as usize, mask.height() as usize);
        let raw = mask.as_raw();
        let x = region.x as usize;
        let end = x + self.sampled_width(region);

        for ly in 0..region.height as usize {
            let row = region.y as usize + ly;
            let base = row * mw;
            let first = x + (s - (base + x) % s) % s;
            for col in (first..end).step_by(s) {
                let value = if row < mh && col < mw {
                    channel_sum(raw, (base + col) * 4) as f64 / 3.0
                } else {
                    0.0
                };
                f((col - x) as u32, ly as u32, value);
            }
        }
    }

    /// Mean channel value over the sampled pixels, 0 (still) to 255 (all moving).
    ///
    /// A region without samples (zero width or height) yields NaN.
    pub fn average_movement(&self, mask: &MotionMask, region: &Region) -> f64 {
        let mut total = 0.0;
        let mut n = 0usize;
        self.for_each_sample(mask, region, |_, _, v| {
            total += v;
            n += 1;
        });
        total / n as f64
    }

    /// Average position of the moving pixels.
    ///
    /// The region center enters the average once as a prior, so a few
    /// scattered pixels only pull the centroid part of the way.
    pub fn movement_point(
        &self,
        mask: &MotionMask,
        region: &Region,
        include_radius: bool,
    ) -> MovementPoint {
        let prior = region.center();
        let (mut sx, mut sy) = (prior.x, prior.y);
        let mut count = 1usize;
        self.for_each_sample(mask, region, |lx, ly, v| {
            if v > 0.0 {
                sx += lx as f64;
                sy += ly as f64;
                count += 1;
            }
        });
        if count > 1 {
            sx /= count as f64;
            sy /= count as f64;
        }

        let radius = include_radius.then(|| {
            let mut acc = 0.0;
            self.for_each_sample(mask, region, |lx, ly, v| {
                if v > 0.0 {
                    let dx = lx as f64 - sx;
                    let dy = ly as f64 - sy;
                    acc += (dx * dx + dy * dy).sqrt();
                }
            });
            acc / count as f64
        });

        MovementPoint {
            x: sx,
            y: sy,
            radius,
        }
    }
}
