use std::cell::RefCell;
use std::rc::Rc;

use camgesture::events::{self, Event};
use camgesture::{
    CaptureError, Direction, EngineConfig, EngineState, FrameSource, GestureDetector,
    MotionEngine, MotionError, PixelFrame, ReplaySource,
};
use image::{Rgba, RgbaImage};

const W: u32 = 200;
const H: u32 = 20;

fn config() -> EngineConfig {
    EngineConfig {
        width: W,
        height: H,
        pixels_to_skip: 1,
        motion_threshold: 5.0,
        tick_interval_millis: 0,
        ..EngineConfig::default()
    }
}

/// Black frame with a 4 pixel wide white bar starting at column `x`.
fn bar(x: u32) -> PixelFrame {
    RgbaImage::from_fn(W, H, |c, _| {
        if (x..x + 4).contains(&c) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

fn frames(xs: &[u32]) -> ReplaySource {
    ReplaySource::new(xs.iter().map(|&x| bar(x)))
}

type Log = Rc<RefCell<Vec<String>>>;

fn record(engine: &mut MotionEngine<ReplaySource>, topic: &str, log: &Log) {
    let log = log.clone();
    let name = topic.to_string();
    engine.on(topic, move |_| log.borrow_mut().push(name.clone()));
}

fn with_directions(engine: &mut MotionEngine<ReplaySource>, log: &Log) {
    let log = log.clone();
    engine.on_any_direction(move |e| {
        if let Event::Gesture(hit) = e {
            log.borrow_mut().push(hit.name.clone());
        }
    });
}

fn tick_all(engine: &mut MotionEngine<ReplaySource>) {
    while engine.source_mut().remaining() > 0 {
        engine.tick().unwrap();
    }
}

#[test]
fn bar_sweeping_right_is_a_right_motion() {
    camgesture::logging::init();
    let mut engine = MotionEngine::new(config(), frames(&[0, 30, 60, 90, 90])).unwrap();
    let log = Log::default();
    with_directions(&mut engine, &log);
    engine.start().unwrap();

    let first = engine.tick().unwrap().unwrap();
    assert_eq!(first.average_movement, Some(0.0));
    assert_eq!(first.trajectory_len, 0);

    assert!(engine.tick().unwrap().unwrap().gesture.is_none());
    let third = engine.tick().unwrap().unwrap();
    assert!(third.gesture.is_none());
    assert_eq!(third.trajectory_len, 2);

    let fourth = engine.tick().unwrap().unwrap();
    let hit = fourth.gesture.expect("gesture on fourth tick");
    assert_eq!(hit.name, "RightMotion");
    assert!(hit.displacement.x > 40.0);
    assert!(hit.displacement.y.abs() < 1e-9);
    assert_eq!(fourth.trajectory_len, 0);

    // still frame: no movement, nothing recorded
    let still = engine.tick().unwrap().unwrap();
    assert_eq!(still.average_movement, Some(0.0));
    assert_eq!(*log.borrow(), vec!["RightMotion"]);
}

#[test]
fn bar_sweeping_left_is_a_left_motion() {
    let mut engine = MotionEngine::new(config(), frames(&[150, 120, 90, 60])).unwrap();
    let log = Log::default();
    with_directions(&mut engine, &log);
    engine.start().unwrap();
    tick_all(&mut engine);
    assert_eq!(*log.borrow(), vec!["LeftMotion"]);
}

#[test]
fn pause_in_motion_clears_the_trajectory() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 30, 30, 60, 90])).unwrap();
    let log = Log::default();
    with_directions(&mut engine, &log);
    engine.start().unwrap();
    tick_all(&mut engine);
    // the still frame between 30 and 30 resets history, so 30 -> 60 -> 90 is too short
    assert!(log.borrow().is_empty());
    assert_eq!(engine.trajectory().len(), 2);
}

#[test]
fn first_registered_detector_wins() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 30, 60, 90])).unwrap();
    let log = Log::default();
    let l = log.clone();
    engine.on_motion(GestureDetector::right(), move |_| {
        l.borrow_mut().push("right".into())
    });
    let l = log.clone();
    engine.on_motion(GestureDetector::custom("Diagonal", |v, _| v.x > 40.0), move |_| {
        l.borrow_mut().push("diagonal".into())
    });
    engine.start().unwrap();
    tick_all(&mut engine);
    assert_eq!(*log.borrow(), vec!["right"]);
}

#[test]
fn on_motion_registers_a_detector_once() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 30, 60, 90])).unwrap();
    let log = Log::default();
    with_directions(&mut engine, &log);
    with_directions(&mut engine, &log);
    let status = engine.status_report();
    assert_eq!(
        status["detectors"],
        serde_json::json!(["LeftMotion", "RightMotion", "UpMotion", "DownMotion"])
    );

    engine.start().unwrap();
    tick_all(&mut engine);
    // both listeners on the topic fire for the single match
    assert_eq!(*log.borrow(), vec!["RightMotion", "RightMotion"]);
}

#[test]
fn no_detectors_means_no_tracking() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 30])).unwrap();
    engine.start().unwrap();
    tick_all(&mut engine);
    assert!(engine.trajectory().is_empty());
    assert!(engine.last_mask().is_some());
}

#[test]
fn stop_prevents_further_frames() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 30, 60, 90])).unwrap();
    let log = Log::default();
    record(&mut engine, events::FRAME, &log);

    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(engine.tick().unwrap().is_none());
    assert!(log.borrow().is_empty());

    engine.start().unwrap();
    engine.tick().unwrap();
    engine.stop();
    assert!(engine.tick().unwrap().is_none());
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn restart_discards_previous_frame() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 100])).unwrap();
    engine.start().unwrap();
    engine.tick().unwrap();
    engine.stop();
    engine.start().unwrap();
    engine.tick().unwrap();
    // diffed against a copy of itself, not against the bar at 0
    assert_eq!(engine.average_movement(None), Some(0.0));
}

#[test]
fn stop_handle_ends_run_after_gesture() {
    let mut engine = MotionEngine::new(config(), frames(&[0, 30, 60, 90, 120, 150, 180])).unwrap();
    let log = Log::default();
    record(&mut engine, events::FRAME, &log);
    let handle = engine.stop_handle();
    engine.on_motion(GestureDetector::right(), move |_| handle.request_stop());

    engine.start().unwrap();
    engine.run().unwrap();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(log.borrow().len(), 4);
    assert_eq!(engine.source_mut().remaining(), 3);
}

#[test]
fn exhausted_source_reports_error_and_stops() {
    let mut engine = MotionEngine::new(config(), frames(&[0])).unwrap();
    let log = Log::default();
    record(&mut engine, events::ERROR, &log);
    engine.start().unwrap();
    engine.run().unwrap();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(*log.borrow(), vec!["error"]);
    assert!(engine.tick().unwrap().is_none());
}

struct BrokenCamera;

impl FrameSource for BrokenCamera {
    fn init(&mut self) -> Result<(), CaptureError> {
        Err(CaptureError::Init("no device".into()))
    }

    fn capture(&mut self) -> Result<PixelFrame, CaptureError> {
        unreachable!("never initialized")
    }
}

#[test]
fn failed_init_is_announced() {
    let mut engine = MotionEngine::new(config(), BrokenCamera).unwrap();
    let seen = Rc::new(RefCell::new(String::new()));
    let s = seen.clone();
    engine.on(events::ERROR, move |e| {
        if let Event::Error { message, .. } = e {
            *s.borrow_mut() = message.clone();
        }
    });
    let started = Rc::new(RefCell::new(false));
    let st = started.clone();
    engine.on(events::STREAM_INIT, move |_| *st.borrow_mut() = true);

    assert!(matches!(engine.start(), Err(MotionError::Capture(_))));
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(seen.borrow().contains("no device"));
    assert!(!*started.borrow());
    assert!(engine.tick().unwrap().is_none());
}

#[test]
fn configured_gesture_threshold_reaches_the_detectors() {
    // about 20px of travel: short for the default threshold of 40
    let mut cfg = config();
    cfg.gestures.threshold = 10.0;
    let mut engine = MotionEngine::new(cfg, frames(&[0, 10, 20, 30])).unwrap();
    let log = Log::default();
    let l = log.clone();
    engine.on_direction(Direction::Right, move |e| {
        if let Event::Gesture(hit) = e {
            l.borrow_mut().push(hit.name.clone());
        }
    });
    engine.start().unwrap();
    tick_all(&mut engine);
    assert_eq!(*log.borrow(), vec!["RightMotion"]);

    let mut engine = MotionEngine::new(config(), frames(&[0, 10, 20, 30])).unwrap();
    let log = Log::default();
    with_directions(&mut engine, &log);
    engine.start().unwrap();
    tick_all(&mut engine);
    assert!(log.borrow().is_empty());
    assert_eq!(engine.trajectory().len(), 3);
}

fn small() -> PixelFrame {
    RgbaImage::new(10, 10)
}

#[test]
fn wrong_sized_frame_is_reported_and_stops() {
    let mut engine =
        MotionEngine::new(config(), ReplaySource::new([small(), small(), small()])).unwrap();
    let frames_seen = Log::default();
    record(&mut engine, events::FRAME, &frames_seen);
    let sizes = Rc::new(RefCell::new(Vec::new()));
    let s = sizes.clone();
    engine.on(events::ERROR, move |e| {
        if let Event::Error {
            cause: CaptureError::WrongSize { got, expected, .. },
            ..
        } = e
        {
            s.borrow_mut().push((*got, *expected));
        }
    });

    engine.start().unwrap();
    assert!(engine.tick().unwrap().is_none());
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(*sizes.borrow(), vec![((10, 10), (W, H))]);
    assert!(frames_seen.borrow().is_empty());
    assert!(engine.last_mask().is_none());
}

#[test]
fn frame_size_change_does_not_wedge_the_engine() {
    let mut src = frames(&[0]);
    for _ in 0..3 {
        src.push(small());
    }
    src.push(bar(30));
    src.push(bar(60));
    let mut engine = MotionEngine::new(config(), src).unwrap();
    let errors = Log::default();
    record(&mut engine, events::ERROR, &errors);

    engine.start().unwrap();
    engine.run().unwrap();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(errors.borrow().len(), 1);

    for _ in 0..2 {
        engine.start().unwrap();
        assert!(engine.tick().unwrap().is_none());
        assert_eq!(engine.state(), EngineState::Stopped);
    }
    assert_eq!(errors.borrow().len(), 3);

    engine.start().unwrap();
    assert_eq!(engine.tick().unwrap().unwrap().average_movement, None);
    assert_eq!(engine.average_movement(None), Some(0.0));
    engine.tick().unwrap().unwrap();
    assert!(engine.average_movement(None).unwrap() > 0.0);
    assert_eq!(engine.state(), EngineState::Running);
}

#[test]
fn zero_stride_fails_construction() {
    let cfg = EngineConfig {
        pixels_to_skip: 0,
        ..config()
    };
    assert!(matches!(
        MotionEngine::new(cfg, ReplaySource::default()),
        Err(MotionError::InvalidStride)
    ));
}

#[test]
fn status_report_describes_engine() {
    let mut engine = MotionEngine::new(config(), frames(&[0])).unwrap();
    engine.on_motion(GestureDetector::up(), |_| {});
    engine.start().unwrap();
    engine.tick().unwrap();
    let status = engine.status_report();
    assert_eq!(status["state"], "Running");
    assert_eq!(status["ticks"], 1);
    assert_eq!(status["detectors"][0], "UpMotion");
    assert_eq!(status["config"]["width"], W);
}
