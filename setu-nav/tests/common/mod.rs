//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chakra_io::{Motor, SampleSource};
use parking_lot::Mutex;

use setu_nav::{Localisation, Navigation, Odometer, SetuConfig};

/// One motor call, as recorded by [`ScriptedMotor`]
#[derive(Debug, Clone, PartialEq)]
pub enum MotorCall {
    Rotate(i32, bool),
    Forward,
    Backward,
    Stop,
}

/// Motor that records commands and finishes every move instantly
///
/// [`hold_moving`](Self::hold_moving) makes it report motion for a number
/// of polls, until stopped.
#[derive(Default)]
pub struct ScriptedMotor {
    calls: Mutex<Vec<MotorCall>>,
    moving_polls: AtomicUsize,
    on_rest: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ScriptedMotor {
    pub fn hold_moving(&self, polls: usize) {
        self.moving_polls.store(polls, Ordering::SeqCst);
    }

    /// Run `hook` once, on the first poll that finds the motor at rest
    pub fn on_next_rest(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_rest.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<MotorCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &MotorCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    /// Straight legs issued without waiting, as the travel loop does
    pub fn non_blocking_rotations(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, MotorCall::Rotate(_, true)))
            .count()
    }
}

impl Motor for ScriptedMotor {
    fn set_speed(&self, _: f64) -> chakra_io::Result<()> {
        Ok(())
    }

    fn set_acceleration(&self, _: f64) -> chakra_io::Result<()> {
        Ok(())
    }

    fn forward(&self) -> chakra_io::Result<()> {
        self.calls.lock().push(MotorCall::Forward);
        Ok(())
    }

    fn backward(&self) -> chakra_io::Result<()> {
        self.calls.lock().push(MotorCall::Backward);
        Ok(())
    }

    fn stop(&self, _: bool) -> chakra_io::Result<()> {
        self.moving_polls.store(0, Ordering::SeqCst);
        self.calls.lock().push(MotorCall::Stop);
        Ok(())
    }

    fn rotate(&self, degrees: i32, return_immediately: bool) -> chakra_io::Result<()> {
        self.calls
            .lock()
            .push(MotorCall::Rotate(degrees, return_immediately));
        Ok(())
    }

    fn is_moving(&self) -> chakra_io::Result<bool> {
        let held = self
            .moving_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if held.is_err() {
            let hook = self.on_rest.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
        Ok(held.is_ok())
    }

    fn tacho_count(&self) -> chakra_io::Result<i32> {
        Ok(0)
    }
}

/// Sample source that replays a waveform in a loop
pub struct ScriptedSource {
    samples: Vec<f32>,
    index: usize,
}

impl ScriptedSource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples, index: 0 }
    }

    /// Constant reading
    pub fn flat(value: f32) -> Self {
        Self::new(vec![value])
    }

    /// `high` for `gap` samples, then `low` for `width` samples, repeating
    pub fn pulses(high: f32, low: f32, gap: usize, width: usize) -> Self {
        let mut samples = vec![high; gap];
        samples.extend(std::iter::repeat(low).take(width));
        Self::new(samples)
    }
}

impl SampleSource for ScriptedSource {
    fn fetch_sample(&mut self) -> chakra_io::Result<f32> {
        let sample = self.samples[self.index % self.samples.len()];
        self.index += 1;
        Ok(sample)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Configuration with short periods, dead times and timeouts
pub fn fast_config() -> SetuConfig {
    let mut config = SetuConfig::default();
    config.board.tile = 30.0;
    config.robot.turn_settle_ms = 0;
    config.pollers.color_period_ms = 2;
    config.pollers.ultrasonic_period_ms = 2;
    config.localisation.settle_ms = 0;
    config.localisation.event_timeout_ms = 2_000;
    config.localisation.line.dead_time_ms = 20;
    config.localisation.edge.window = 1;
    config.localisation.edge.dead_time_ms = 20;
    config.navigation.poll_interval_ms = 1;
    config
}

/// The core wired to scripted motors and sensors
pub struct Rig {
    pub left: Arc<ScriptedMotor>,
    pub right: Arc<ScriptedMotor>,
    pub odometer: Arc<Odometer>,
    pub navigation: Arc<Navigation>,
    pub localisation: Arc<Localisation>,
}

impl Rig {
    pub fn new(config: &SetuConfig, color: ScriptedSource, ultrasonic: ScriptedSource) -> Self {
        let left = Arc::new(ScriptedMotor::default());
        let right = Arc::new(ScriptedMotor::default());
        let odometer = Arc::new(Odometer::new(
            left.clone(),
            right.clone(),
            config.robot.wheel_radius,
            config.robot.track,
            Duration::from_millis(config.odometer.period_ms),
        ));
        let navigation = Arc::new(Navigation::new(
            odometer.clone(),
            left.clone(),
            right.clone(),
            config.robot.clone(),
        ));
        let localisation = Arc::new(Localisation::from_sources(
            navigation.clone(),
            Box::new(color),
            Box::new(ultrasonic),
            config,
        ));
        Self {
            left,
            right,
            odometer,
            navigation,
            localisation,
        }
    }
}
