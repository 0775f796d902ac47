//! Frame sources feeding the engine.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use image::imageops::{self, FilterType};
use log::{debug, info};

use crate::error::CaptureError;
use crate::frame::PixelFrame;

/// Supplies RGBA frames of a fixed size on demand.
pub trait FrameSource {
    /// Prepares the device. Called by `MotionEngine::start`.
    fn init(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn capture(&mut self) -> Result<PixelFrame, CaptureError>;
}

/// Frames queued in memory, handed out once each.
#[derive(Debug, Default)]
pub struct ReplaySource {
    frames: VecDeque<PixelFrame>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = PixelFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, frame: PixelFrame) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn capture(&mut self) -> Result<PixelFrame, CaptureError> {
        self.frames.pop_front().ok_or(CaptureError::Exhausted)
    }
}

/// Recorded frames read from image files in a directory, in file name order.
///
/// Frames whose size differs from the requested one are resized.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    width: u32,
    height: u32,
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            dir: dir.into(),
            width,
            height,
            paths: Vec::new(),
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_image(p: &Path) -> bool {
    p.is_file() && ImageFormat::from_path(p).is_ok()
}

impl FrameSource for ImageSequenceSource {
    fn init(&mut self) -> Result<(), CaptureError> {
        let rd = fs::read_dir(&self.dir).map_err(|source| CaptureError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = rd
            .flatten()
            .map(|e| e.path())
            .filter(|p| is_image(p))
            .collect();
        if paths.is_empty() {
            return Err(CaptureError::Init(format!(
                "no image files in {}",
                self.dir.display()
            )));
        }
        paths.sort();
        info!("{} frames found in {}", paths.len(), self.dir.display());
        self.paths = paths;
        self.next = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<PixelFrame, CaptureError> {
        let path = self.paths.get(self.next).ok_or(CaptureError::Exhausted)?;
        let img = image::open(path)
            .map_err(|source| CaptureError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgba8();
        self.next += 1;

        if img.dimensions() == (self.width, self.height) {
            return Ok(img);
        }
        debug!(
            "resizing {} from {:?} to {}x{}",
            path.display(),
            img.dimensions(),
            self.width,
            self.height
        );
        Ok(imageops::resize(&img, self.width, self.height, FilterType::Triangle))
    }
}
