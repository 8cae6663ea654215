//! Color line-crossing detector
//!
//! A grid line shows up as a dip in reflectance followed by a recovery.
//! The detector arms on a steep negative difference of the moving average
//! and fires on the following steep positive difference, provided it comes
//! within `pulse_ticks` samples of the last dip.

use std::time::{Duration, Instant};

use super::{DeadTime, Detection, DetectionEvent, Detector, EventSender, SampleWindow};
use crate::config::LineDetectorConfig;

pub struct LineDetector {
    config: LineDetectorConfig,
    window: SampleWindow,
    armed: bool,
    countdown: u32,
    dead_time: DeadTime,
    events: EventSender,
}

impl LineDetector {
    pub fn new(config: LineDetectorConfig, events: EventSender) -> Self {
        Self {
            window: SampleWindow::new(config.window),
            dead_time: DeadTime::new(Duration::from_millis(config.dead_time_ms)),
            countdown: config.pulse_ticks,
            armed: false,
            config,
            events,
        }
    }

    fn fire(&mut self, at: Instant) {
        self.events.notify(
            self.name(),
            DetectionEvent {
                detection: Detection::Line,
                at,
            },
        );
        self.window.clear();
        self.armed = false;
        self.dead_time.arm(at);
    }
}

impl Detector for LineDetector {
    fn process(&mut self, sample: f32, at: Instant) {
        if self.dead_time.absorbs(at) {
            return;
        }

        let previous = self.window.average();
        let average = self.window.push(sample);
        let Some(previous) = previous else {
            return;
        };

        let difference = (average - previous) * self.config.scale;
        if difference < -self.config.threshold {
            self.armed = true;
            self.countdown = self.config.pulse_ticks;
        } else if self.armed && difference > self.config.threshold {
            self.fire(at);
        } else if self.armed {
            if self.countdown == 0 {
                self.armed = false;
            } else {
                self.countdown -= 1;
            }
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.armed = false;
        self.countdown = self.config.pulse_ticks;
        self.dead_time.clear();
    }

    fn name(&self) -> &'static str {
        "line"
    }
}
