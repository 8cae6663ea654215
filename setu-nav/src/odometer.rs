//! Pose store: wheel tachometer dead reckoning
//!
//! Integrates left/right wheel rotation into (x, y, θ) on a background
//! thread. Heading is in degrees, 0 along +y and increasing clockwise, so a
//! forward step of `d` moves by `(d·sin θ, d·cos θ)`.
//!
//! The pose and the distance travelled since the last localisation fix
//! share one mutex; readers never see a torn 3-tuple.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chakra_io::Motor;
use parking_lot::Mutex;

use crate::error::Result;
use crate::geometry::Coordinate;
use crate::utils::normalize_degrees;

/// Robot pose in board coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// X position (cm)
    pub x: f64,
    /// Y position (cm)
    pub y: f64,
    /// Heading (degrees, [0, 360))
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_degrees(theta),
        }
    }

    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }
}

#[derive(Debug)]
struct PoseState {
    pose: Pose,
    distance_since_fix: f64,
}

/// Dead-reckoning pose store
pub struct Odometer {
    state: Mutex<PoseState>,
    left: Arc<dyn Motor>,
    right: Arc<dyn Motor>,
    wheel_radius: f64,
    track: f64,
    period: Duration,
    /// Tachometer readings at the previous tick
    last_tacho: Mutex<Option<(i32, i32)>>,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Odometer {
    /// Create a pose store at the origin
    ///
    /// # Arguments
    /// * `wheel_radius` - Wheel radius in cm
    /// * `track` - Distance between wheels in cm
    /// * `period` - Integration period for the background thread
    pub fn new(
        left: Arc<dyn Motor>,
        right: Arc<dyn Motor>,
        wheel_radius: f64,
        track: f64,
        period: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(PoseState {
                pose: Pose::new(0.0, 0.0, 0.0),
                distance_since_fix: 0.0,
            }),
            left,
            right,
            wheel_radius,
            track,
            period,
            last_tacho: Mutex::new(None),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Snapshot of the full pose
    pub fn pose(&self) -> Pose {
        self.state.lock().pose
    }

    pub fn x(&self) -> f64 {
        self.state.lock().pose.x
    }

    pub fn y(&self) -> f64 {
        self.state.lock().pose.y
    }

    /// Heading in degrees, [0, 360)
    pub fn theta(&self) -> f64 {
        self.state.lock().pose.theta
    }

    pub fn set_x(&self, x: f64) {
        self.state.lock().pose.x = x;
    }

    pub fn set_y(&self, y: f64) {
        self.state.lock().pose.y = y;
    }

    /// Overwrite the heading; any multiple of 360 maps to the same value
    pub fn set_theta(&self, theta: f64) {
        self.state.lock().pose.theta = normalize_degrees(theta);
    }

    pub fn set_pose(&self, pose: Pose) {
        self.state.lock().pose = Pose::new(pose.x, pose.y, pose.theta);
    }

    /// Read-modify-write the pose under the lock
    ///
    /// The heading is re-normalized after `f` runs. Returns the stored pose.
    pub fn correct<F>(&self, f: F) -> Pose
    where
        F: FnOnce(&mut Pose),
    {
        let mut state = self.state.lock();
        f(&mut state.pose);
        state.pose.theta = normalize_degrees(state.pose.theta);
        state.pose
    }

    /// Path length travelled since the last [`mark_fixed`](Self::mark_fixed)
    pub fn distance_since_fix(&self) -> f64 {
        self.state.lock().distance_since_fix
    }

    /// Reset the distance counter after a localisation fix
    pub fn mark_fixed(&self) {
        self.state.lock().distance_since_fix = 0.0;
    }

    /// Apply one integration step from wheel rotation deltas in degrees
    pub fn integrate(&self, left_deg: f64, right_deg: f64) -> Pose {
        let dist_left = std::f64::consts::PI * self.wheel_radius * left_deg / 180.0;
        let dist_right = std::f64::consts::PI * self.wheel_radius * right_deg / 180.0;
        let dist = 0.5 * (dist_left + dist_right);
        let dtheta = ((dist_left - dist_right) / self.track).to_degrees();

        let mut state = self.state.lock();
        let theta = normalize_degrees(state.pose.theta + dtheta);
        let rad = theta.to_radians();
        state.pose.theta = theta;
        state.pose.x += dist * rad.sin();
        state.pose.y += dist * rad.cos();
        state.distance_since_fix += dist.abs();
        state.pose
    }

    /// Read both tachometers and integrate the change since the last tick
    pub fn tick(&self) -> Result<Pose> {
        let now = (self.left.tacho_count()?, self.right.tacho_count()?);
        let previous = self.last_tacho.lock().replace(now);

        match previous {
            Some((left, right)) => {
                Ok(self.integrate((now.0 - left) as f64, (now.1 - right) as f64))
            }
            None => Ok(self.pose()),
        }
    }

    /// Spawn the integration thread; no-op when already running
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let odometer = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("odometer".into())
            .spawn(move || odometer.run());

        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                tracing::info!("Odometer started ({:?} period)", self.period);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Signal the integration thread to exit and wait for it
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Odometer thread panicked");
            }
            tracing::info!("Odometer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn run(&self) {
        while self.running.load(Ordering::Acquire) {
            let started = Instant::now();
            if let Err(e) = self.tick() {
                tracing::warn!("Odometer tick skipped: {}", e);
            }
            if let Some(remaining) = self.period.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }
}
