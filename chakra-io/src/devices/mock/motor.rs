//! Mock regulated motor
//!
//! Holds the commanded motion; the simulation loop advances it with
//! [`MockMotor::advance`] and accumulates the tachometer.

use crate::drivers::Motor;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll interval while a blocking command waits for completion
const BLOCKING_POLL: Duration = Duration::from_millis(2);

/// Extra time allowed on top of the nominal duration of a blocking rotate
const BLOCKING_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drive {
    Idle,
    Forward,
    Backward,
    /// Signed wheel degrees still to turn
    Target(f64),
}

#[derive(Debug)]
struct MotorState {
    speed: f64,
    acceleration: f64,
    velocity: f64,
    drive: Drive,
    tacho: f64,
}

/// Mock motor driver
#[derive(Clone)]
pub struct MockMotor {
    name: &'static str,
    state: Arc<Mutex<MotorState>>,
}

impl MockMotor {
    /// Create an idle motor with zeroed tachometer
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(MotorState {
                speed: 0.0,
                acceleration: 0.0,
                velocity: 0.0,
                drive: Drive::Idle,
                tacho: 0.0,
            })),
        }
    }

    /// Advance the motor by `dt` seconds
    ///
    /// Returns the signed wheel rotation in degrees over the step.
    pub fn advance(&self, dt: f64) -> f64 {
        let mut state = self.state.lock();
        let direction = match state.drive {
            Drive::Idle => {
                state.velocity = 0.0;
                return 0.0;
            }
            Drive::Forward => 1.0,
            Drive::Backward => -1.0,
            Drive::Target(remaining) => remaining.signum(),
        };

        state.velocity = if state.acceleration > 0.0 {
            (state.velocity + state.acceleration * dt).min(state.speed)
        } else {
            state.speed
        };

        let mut step = direction * state.velocity * dt;
        if let Drive::Target(remaining) = state.drive {
            if step.abs() >= remaining.abs() {
                step = remaining;
                state.drive = Drive::Idle;
                state.velocity = 0.0;
            } else {
                state.drive = Drive::Target(remaining - step);
            }
        }
        state.tacho += step;
        step
    }

    fn wait_idle(&self, limit: Duration) -> Result<()> {
        let deadline = Instant::now() + limit;
        while self.state.lock().drive != Drive::Idle {
            if Instant::now() >= deadline {
                log::warn!("{}: blocking command did not finish in {:?}", self.name, limit);
                return Err(Error::MotorTimeout {
                    motor: self.name,
                    limit,
                });
            }
            std::thread::sleep(BLOCKING_POLL);
        }
        Ok(())
    }
}

impl Motor for MockMotor {
    fn set_speed(&self, degrees_per_sec: f64) -> Result<()> {
        if !degrees_per_sec.is_finite() || degrees_per_sec < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "{}: speed {}",
                self.name, degrees_per_sec
            )));
        }
        self.state.lock().speed = degrees_per_sec;
        Ok(())
    }

    fn set_acceleration(&self, degrees_per_sec2: f64) -> Result<()> {
        self.state.lock().acceleration = degrees_per_sec2.max(0.0);
        Ok(())
    }

    fn forward(&self) -> Result<()> {
        self.state.lock().drive = Drive::Forward;
        Ok(())
    }

    fn backward(&self) -> Result<()> {
        self.state.lock().drive = Drive::Backward;
        Ok(())
    }

    fn stop(&self, _return_immediately: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.drive = Drive::Idle;
        state.velocity = 0.0;
        Ok(())
    }

    fn rotate(&self, degrees: i32, return_immediately: bool) -> Result<()> {
        let speed = {
            let mut state = self.state.lock();
            state.drive = if degrees == 0 {
                Drive::Idle
            } else {
                Drive::Target(degrees as f64)
            };
            state.speed
        };
        log::debug!("{}: rotate {} deg", self.name, degrees);

        if return_immediately || degrees == 0 {
            return Ok(());
        }
        if speed <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "{}: rotate with zero speed",
                self.name
            )));
        }
        let nominal = Duration::from_secs_f64(degrees.unsigned_abs() as f64 / speed);
        self.wait_idle(nominal + BLOCKING_SLACK)
    }

    fn is_moving(&self) -> Result<bool> {
        Ok(self.state.lock().drive != Drive::Idle)
    }

    fn tacho_count(&self) -> Result<i32> {
        Ok(self.state.lock().tacho.round() as i32)
    }
}
