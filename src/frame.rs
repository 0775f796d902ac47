//! Binary motion masks from pairs of consecutive frames.

use image::RgbaImage;

use crate::error::{MotionError, Result};

/// A captured RGBA frame.
pub type PixelFrame = RgbaImage;

/// A frame-shaped buffer whose sampled pixels are black (no motion) or white (motion).
pub type MotionMask = RgbaImage;

pub const MOTION: u8 = 0xFF;

/// Sum of the R, G and B channels of the pixel starting at `offset`.
#[inline]
pub(crate) fn channel_sum(raw: &[u8], offset: usize) -> i32 {
    raw[offset] as i32 + raw[offset + 1] as i32 + raw[offset + 2] as i32
}

/// Thresholds the luminance difference of `current` against `previous`.
///
/// Only every `stride`-th pixel of the flattened grid is examined; the others
/// stay zeroed in the returned mask.
pub fn diff(
    current: &PixelFrame,
    previous: &PixelFrame,
    stride: usize,
    threshold: u32,
) -> Result<MotionMask> {
    if stride == 0 {
        return Err(MotionError::InvalidStride);
    }
    let a = current.as_raw();
    let b = previous.as_raw();
    if a.len() != b.len() {
        return Err(MotionError::LengthMismatch {
            current: a.len(),
            previous: b.len(),
        });
    }

    let mut mask = MotionMask::new(current.width(), current.height());
    let out: &mut [u8] = &mut mask;
    let pixels = a.len() / 4;

    for i in (0..pixels).step_by(stride) {
        let o = i * 4;
        // (s1 - s2) / 3 truncates toward zero, same as truncating avg1 - avg2
        let d = ((channel_sum(a, o) - channel_sum(b, o)) / 3).unsigned_abs();
        let v = if d > threshold { MOTION } else { 0 };
        out[o] = v;
        out[o + 1] = v;
        out[o + 2] = v;
        out[o + 3] = 0xFF;
    }
    Ok(mask)
}
