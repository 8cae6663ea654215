//! Stream filters that turn raw sensor samples into discrete events.
//!
//! A detector runs on its poller's thread. When it fires it hands a
//! [`DetectionEvent`] to the waiting localisation sweep through a
//! capacity-1 channel, clears its sample window and ignores input for a
//! configured dead time.

mod edge;
mod line;
mod window;

pub use edge::EdgeDetector;
pub use line::LineDetector;
pub use window::SampleWindow;

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Consumes samples routed by a poller
pub trait Detector: Send {
    /// Feed one sample taken at `at`
    fn process(&mut self, sample: f32, at: Instant);

    /// Drop all filter state, as on a fresh start
    fn reset(&mut self);

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Direction of an ultrasonic threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Distance dropped below the threshold (a wall came into view)
    Falling,
    /// Distance rose above the threshold (a wall left the view)
    Rising,
}

/// What a detector saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Line,
    Edge(EdgeKind),
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionEvent {
    pub detection: Detection,
    pub at: Instant,
}

/// Create the detector → localisation rendezvous
pub fn rendezvous() -> (EventSender, Receiver<DetectionEvent>) {
    let (tx, rx) = bounded(1);
    (EventSender { tx }, rx)
}

/// Sending half of the rendezvous, owned by one detector
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<DetectionEvent>,
}

impl EventSender {
    /// Hand an event to the waiting sweep without blocking the poller
    ///
    /// Returns false when the event was dropped.
    pub fn notify(&self, source: &'static str, event: DetectionEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                tracing::debug!("{}: {:?}", source, event.detection);
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "{}: dropping {:?}, previous event not consumed",
                    source,
                    event.detection
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("{}: no listener for {:?}", source, event.detection);
                false
            }
        }
    }
}

/// Post-detection blanking interval
#[derive(Debug, Clone)]
pub(crate) struct DeadTime {
    duration: Duration,
    until: Option<Instant>,
}

impl DeadTime {
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            duration,
            until: None,
        }
    }

    pub(crate) fn arm(&mut self, at: Instant) {
        self.until = Some(at + self.duration);
    }

    /// True while samples at `at` must be ignored
    pub(crate) fn absorbs(&mut self, at: Instant) -> bool {
        match self.until {
            Some(until) if at < until => true,
            Some(_) => {
                self.until = None;
                false
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.until = None;
    }
}
