//! Ultrasonic edge detector
//!
//! Watches the averaged wall distance cross a fixed threshold. The first
//! crossing of a search may go either way; its direction is remembered and
//! the second crossing must match it, after which the search starts over.

use std::time::{Duration, Instant};

use super::{DeadTime, Detection, DetectionEvent, Detector, EdgeKind, EventSender, SampleWindow};
use crate::config::EdgeDetectorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeSearch {
    AwaitingFirst,
    AwaitingSecond(EdgeKind),
}

pub struct EdgeDetector {
    config: EdgeDetectorConfig,
    window: SampleWindow,
    search: EdgeSearch,
    dead_time: DeadTime,
    events: EventSender,
}

impl EdgeDetector {
    pub fn new(config: EdgeDetectorConfig, events: EventSender) -> Self {
        Self {
            window: SampleWindow::new(config.window),
            dead_time: DeadTime::new(Duration::from_millis(config.dead_time_ms)),
            search: EdgeSearch::AwaitingFirst,
            config,
            events,
        }
    }

    fn crossing(&self, previous: f32, average: f32) -> Option<EdgeKind> {
        let threshold = self.config.threshold;
        if previous > threshold && average < threshold {
            Some(EdgeKind::Falling)
        } else if previous < threshold && average > threshold {
            Some(EdgeKind::Rising)
        } else {
            None
        }
    }

    fn fire(&mut self, kind: EdgeKind, at: Instant) {
        self.events.notify(
            self.name(),
            DetectionEvent {
                detection: Detection::Edge(kind),
                at,
            },
        );
        self.window.clear();
        self.dead_time.arm(at);
    }
}

impl Detector for EdgeDetector {
    fn process(&mut self, sample: f32, at: Instant) {
        if self.dead_time.absorbs(at) {
            return;
        }
        // Non-positive readings are sensor errors
        if sample.is_nan() || sample <= 0.0 {
            return;
        }

        let previous = self.window.average();
        let average = self.window.push(sample.min(self.config.max_reading));
        let Some(previous) = previous else {
            return;
        };
        let Some(kind) = self.crossing(previous, average) else {
            return;
        };

        match self.search {
            EdgeSearch::AwaitingFirst => {
                self.search = EdgeSearch::AwaitingSecond(kind);
                self.fire(kind, at);
            }
            EdgeSearch::AwaitingSecond(expected) if expected == kind => {
                self.search = EdgeSearch::AwaitingFirst;
                self.fire(kind, at);
            }
            EdgeSearch::AwaitingSecond(_) => {}
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.search = EdgeSearch::AwaitingFirst;
        self.dead_time.clear();
    }

    fn name(&self) -> &'static str {
        "edge"
    }
}
