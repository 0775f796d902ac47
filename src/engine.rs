use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::{thread, time::Duration};

use crate::config::EngineConfig;
use crate::error::{CaptureError, Result};
use crate::events::{self, Event, Notifier};
use crate::frame::{self, MotionMask, PixelFrame};
use crate::gestures::{
    self, Classification, ClassificationRound, Direction, GestureClassifier, GestureDetector,
};
use crate::region::{MovementPoint, Region, RegionAnalyzer};
use crate::source::FrameSource;
use crate::trajectory::TrajectoryBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Never started; no previous frame.
    Idle,
    Running,
    /// Halted; the previous frame is dropped on the next start.
    Stopped,
}

/// Requests a stop from outside the engine, e.g. from an event listener.
/// The tick in progress always completes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What a single tick observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Whole-frame movement, measured only when detectors are registered.
    pub average_movement: Option<f64>,
    pub trajectory_len: usize,
    pub gesture: Option<Classification>,
}

pub struct MotionEngine<S: FrameSource> {
    config: EngineConfig,
    source: S,
    analyzer: RegionAnalyzer,
    trajectory: TrajectoryBuffer,
    classifier: GestureClassifier,
    round: ClassificationRound,
    notifier: Notifier,
    state: EngineState,
    previous: Option<PixelFrame>,
    mask: Option<MotionMask>,
    stop: StopHandle,
    ticks: u64,
}

impl<S: FrameSource> MotionEngine<S> {
    /// Fails if the configuration is invalid (e.g. a zero stride).
    pub fn new(config: EngineConfig, source: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            analyzer: RegionAnalyzer::new(config.pixels_to_skip)?,
            trajectory: TrajectoryBuffer::new(config.history_buffer_length)?,
            config,
            source,
            classifier: GestureClassifier::new(),
            round: ClassificationRound::new(),
            notifier: Notifier::new(),
            state: EngineState::Idle,
            previous: None,
            mask: None,
            stop: StopHandle::default(),
            ticks: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn trajectory(&self) -> &TrajectoryBuffer {
        &self.trajectory
    }

    pub fn last_mask(&self) -> Option<&MotionMask> {
        self.mask.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Subscribes to `error`, `streamInit`, `frame` or a detector topic.
    pub fn on<F>(&mut self, topic: &str, f: F)
    where
        F: FnMut(&Event<'_>) + 'static,
    {
        self.notifier.on(topic, f);
    }

    /// Registers `detector` (once per name) and listens for its matches.
    pub fn on_motion<F>(&mut self, detector: GestureDetector, f: F)
    where
        F: FnMut(&Event<'_>) + 'static,
    {
        let topic = detector.name().to_string();
        if self.classifier.register(detector) {
            debug!("registered detector '{topic}'");
        }
        self.notifier.on(&topic, f);
    }

    /// Registers the built-in detector for `dir`, bounded by the configured
    /// `[gestures]` threshold and range.
    pub fn on_direction<F>(&mut self, dir: Direction, f: F)
    where
        F: FnMut(&Event<'_>) + 'static,
    {
        let detector = GestureDetector::direction(dir, &self.config.gestures);
        self.on_motion(detector, f);
    }

    /// Registers all four built-in detectors with one listener.
    pub fn on_any_direction<F>(&mut self, f: F)
    where
        F: FnMut(&Event<'_>) + Clone + 'static,
    {
        for detector in gestures::builtin(&self.config.gestures) {
            self.on_motion(detector, f.clone());
        }
    }

    /// Initializes the frame source and enters `Running`.
    ///
    /// A source failure is announced on the `error` topic and also returned;
    /// the engine stays halted until started again.
    pub fn start(&mut self) -> Result<()> {
        if self.state == EngineState::Running && !self.stop.is_requested() {
            return Ok(());
        }
        if self.state != EngineState::Idle {
            self.previous = None;
            self.mask = None;
            self.trajectory.reset();
            self.round.reset();
        }
        self.stop.clear();

        if let Err(e) = self.source.init() {
            warn!("frame source init failed: {e}");
            self.notifier.trigger(
                events::ERROR,
                &Event::Error {
                    message: format!("Webcam stream could not be initialized: {e}"),
                    cause: &e,
                },
            );
            return Err(e.into());
        }

        self.state = EngineState::Running;
        info!(
            "engine running ({}x{}, stride {})",
            self.config.width, self.config.height, self.config.pixels_to_skip
        );
        self.notifier.trigger(
            events::STREAM_INIT,
            &Event::StreamInit {
                width: self.config.width,
                height: self.config.height,
            },
        );
        Ok(())
    }

    /// Halts after the current tick. No `frame` events fire until `start`.
    pub fn stop(&mut self) {
        self.stop.request_stop();
        if self.state != EngineState::Stopped {
            info!("engine stopped after {} ticks", self.ticks);
            self.state = EngineState::Stopped;
        }
    }

    /// Processes one frame. Returns `None` when the engine is not running or
    /// the source failed to deliver (reported on the `error` topic).
    pub fn tick(&mut self) -> Result<Option<TickReport>> {
        if self.stop.is_requested() {
            self.stop();
        }
        if self.state != EngineState::Running {
            return Ok(None);
        }

        let current = match self.source.capture() {
            Ok(f) => f,
            Err(e) => {
                self.halt_on_capture_error(e);
                return Ok(None);
            }
        };

        let expected = (self.config.width, self.config.height);
        if current.dimensions() != expected {
            self.halt_on_capture_error(CaptureError::WrongSize {
                index: self.ticks as usize,
                got: current.dimensions(),
                expected,
            });
            return Ok(None);
        }

        let previous = self.previous.take().unwrap_or_else(|| current.clone());
        let mask = match frame::diff(
            &current,
            &previous,
            self.config.pixels_to_skip,
            self.config.color_diff_threshold,
        ) {
            Ok(m) => m,
            Err(e) => {
                // the next frame is compared against this one
                self.previous = Some(current);
                return Err(e);
            }
        };

        self.ticks += 1;
        let tick = self.ticks;
        self.notifier
            .trigger(events::FRAME, &Event::Frame { tick, mask: &mask });

        let mut report = TickReport {
            tick,
            average_movement: None,
            trajectory_len: 0,
            gesture: None,
        };

        if !self.classifier.is_empty() {
            let region = Region::full(&mask);
            let avg = self.analyzer.average_movement(&mask, &region);
            report.average_movement = Some(avg);

            if avg > self.config.motion_threshold {
                let p = self.analyzer.movement_point(&mask, &region, false);
                self.trajectory.push(p.point());
                debug!("tick {tick}: movement {avg:.1}, centroid ({:.1}, {:.1})", p.x, p.y);
            } else if !self.trajectory.is_empty() {
                debug!("tick {tick}: movement {avg:.1}, trajectory cleared");
                self.trajectory.reset();
            }

            if let Some(hit) = self.classifier.classify(&self.trajectory, &mut self.round) {
                info!(
                    "gesture {} (displacement {:.1}, {:.1})",
                    hit.name, hit.displacement.x, hit.displacement.y
                );
                self.notifier.trigger(&hit.name, &Event::Gesture(&hit));
                self.trajectory.reset();
                report.gesture = Some(hit);
            }
        }
        self.round.reset();
        report.trajectory_len = self.trajectory.len();

        self.previous = Some(current);
        self.mask = Some(mask);
        Ok(Some(report))
    }

    /// Announces `e` on the `error` topic and halts until the next `start`.
    fn halt_on_capture_error(&mut self, e: CaptureError) {
        warn!("frame capture failed: {e}");
        self.notifier.trigger(
            events::ERROR,
            &Event::Error {
                message: format!("frame capture failed: {e}"),
                cause: &e,
            },
        );
        self.state = EngineState::Stopped;
    }

    /// Ticks every `tick_interval_millis` until stopped or the source fails.
    /// An error from a tick stops the engine before it is returned.
    pub fn run(&mut self) -> Result<()> {
        let interval = Duration::from_millis(self.config.tick_interval_millis);
        while self.state == EngineState::Running {
            if let Err(e) = self.tick() {
                self.stop();
                return Err(e);
            }
            if self.stop.is_requested() {
                self.stop();
            }
            if self.state != EngineState::Running {
                break;
            }
            thread::sleep(interval);
        }
        Ok(())
    }

    /// Average movement of `region` in the last mask; the whole frame when
    /// `region` is `None`.
    pub fn average_movement(&self, region: Option<Region>) -> Option<f64> {
        let mask = self.mask.as_ref()?;
        let region = region.unwrap_or_else(|| Region::resolve(None, None, None, None, mask));
        Some(self.analyzer.average_movement(mask, &region))
    }

    /// Movement centroid of `region` in the last mask.
    pub fn movement_point(
        &self,
        region: Option<Region>,
        include_radius: bool,
    ) -> Option<MovementPoint> {
        let mask = self.mask.as_ref()?;
        let region = region.unwrap_or_else(|| Region::resolve(None, None, None, None, mask));
        Some(self.analyzer.movement_point(mask, &region, include_radius))
    }

    pub fn status_report(&self) -> serde_json::Value {
        serde_json::json!({
            "state": self.state,
            "ticks": self.ticks,
            "trajectory_length": self.trajectory.len(),
            "detectors": self.classifier.names(),
            "config": self.config,
        })
    }
}
