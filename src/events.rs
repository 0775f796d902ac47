//! Named-topic publish/subscribe used to announce engine results.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::error::CaptureError;
use crate::frame::MotionMask;
use crate::gestures::Classification;

pub const ERROR: &str = "error";
pub const STREAM_INIT: &str = "streamInit";
pub const FRAME: &str = "frame";

#[derive(Debug)]
pub enum Event<'a> {
    Error {
        message: String,
        cause: &'a CaptureError,
    },
    StreamInit {
        width: u32,
        height: u32,
    },
    Frame {
        tick: u64,
        mask: &'a MotionMask,
    },
    Gesture(&'a Classification),
}

pub type Listener = Box<dyn FnMut(&Event<'_>)>;

#[derive(Default)]
pub struct Notifier {
    listeners: HashMap<String, Vec<Listener>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (topic, ls) in &self.listeners {
            m.entry(topic, &ls.len());
        }
        m.finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, topic: &str, f: F)
    where
        F: FnMut(&Event<'_>) + 'static,
    {
        self.listeners
            .entry(topic.to_string())
            .or_default()
            .push(Box::new(f));
    }

    /// Runs every listener of `topic` in subscription order. Topics nobody
    /// listens to are ignored.
    pub fn trigger(&mut self, topic: &str, event: &Event<'_>) {
        let Some(ls) = self.listeners.get_mut(topic) else {
            return;
        };
        trace!("trigger {topic} ({} listeners)", ls.len());
        for l in ls.iter_mut() {
            l(event);
        }
    }

    pub fn has_listeners(&self, topic: &str) -> bool {
        self.listeners.get(topic).is_some_and(|ls| !ls.is_empty())
    }
}
