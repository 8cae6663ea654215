//! Mock device for hardware-free robot simulation
//!
//! Simulates the two drive motors, the downward color sensor and the
//! forward ultrasonic sensor of the grid robot on a walled, tiled board.
//!
//! | Component | Simulation Method |
//! |-----------|-------------------|
//! | Drive motors | Regulated speed, relative rotate targets, tachometer |
//! | Kinematics | Differential drive with Gaussian wheel slip |
//! | Color sensor | Reflectance lookup against painted grid lines |
//! | Ultrasonic | Ray cast against the four board walls |
//!
//! # Simulation Loop
//!
//! ```text
//! Every physics_period_ms:
//! 1. Advance both motors (speed ramp, rotate targets)
//! 2. Feed wheel rotation into the physics state
//! ```
//!
//! Sensors are sampled on demand by their pollers and read the
//! ground-truth pose under the physics lock.
//!
//! # Module Structure
//!
//! - [`config`]: Simulation parameters with defaults
//! - [`physics`]: Differential drive kinematics and wall ray casting
//! - `motor`: Regulated motor implementing [`Motor`](crate::drivers::Motor)
//! - `sensor_sim`: Color and ultrasonic sample sources
//! - `noise`: Seeded noise generator

pub mod config;
mod motor;
mod noise;
pub mod physics;
mod sensor_sim;

pub use config::SimulationConfig;
pub use motor::MockMotor;
pub use physics::TruePose;
pub use sensor_sim::{MockColorSensor, MockUltrasonicSensor};

use crate::error::Result;
use noise::{NoiseGenerator, NoiseStream};
use parking_lot::Mutex;
use physics::PhysicsState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Simulated robot: two motors, two sensors, one physics loop
pub struct MockRobot {
    config: SimulationConfig,
    left: MockMotor,
    right: MockMotor,
    physics: Arc<Mutex<PhysicsState>>,
    shutdown: Arc<AtomicBool>,
    simulation_handle: Option<JoinHandle<()>>,
}

impl MockRobot {
    /// Create a robot at the configured start pose; call [`start`](Self::start) to run physics
    pub fn new(config: SimulationConfig) -> Self {
        let physics = Arc::new(Mutex::new(PhysicsState::new(&config)));
        Self {
            config,
            left: MockMotor::new("left"),
            right: MockMotor::new("right"),
            physics,
            shutdown: Arc::new(AtomicBool::new(false)),
            simulation_handle: None,
        }
    }

    pub fn left_motor(&self) -> MockMotor {
        self.left.clone()
    }

    pub fn right_motor(&self) -> MockMotor {
        self.right.clone()
    }

    /// New color sensor handle with its own noise stream
    pub fn color_sensor(&self) -> MockColorSensor {
        MockColorSensor::new(
            Arc::clone(&self.physics),
            self.config.color.clone(),
            self.config.tile,
            NoiseGenerator::for_stream(self.config.random_seed, NoiseStream::Color),
        )
    }

    /// New ultrasonic sensor handle with its own noise stream
    pub fn ultrasonic_sensor(&self) -> MockUltrasonicSensor {
        MockUltrasonicSensor::new(
            Arc::clone(&self.physics),
            self.config.ultrasonic.clone(),
            NoiseGenerator::for_stream(self.config.random_seed, NoiseStream::Ultrasonic),
        )
    }

    /// Ground-truth pose
    pub fn true_pose(&self) -> TruePose {
        self.physics.lock().pose()
    }

    /// Advance motors and physics by `dt` seconds
    pub fn step(&self, dt: f64) {
        step_once(&self.left, &self.right, &self.physics, dt);
    }

    /// Spawn the physics thread
    pub fn start(&mut self) -> Result<()> {
        if self.simulation_handle.is_some() {
            return Ok(());
        }
        self.shutdown.store(false, Ordering::Relaxed);

        let left = self.left.clone();
        let right = self.right.clone();
        let physics = Arc::clone(&self.physics);
        let shutdown = Arc::clone(&self.shutdown);
        let period = Duration::from_millis(self.config.physics_period_ms.max(1));

        let handle = thread::Builder::new()
            .name("mock-simulation".to_string())
            .spawn(move || simulation_loop(left, right, physics, shutdown, period))?;

        self.simulation_handle = Some(handle);
        log::info!(
            "Mock robot started at ({:.1}, {:.1}, {:.1}°)",
            self.config.start_x,
            self.config.start_y,
            self.config.start_theta
        );
        Ok(())
    }

    /// Stop the physics thread and wait for it
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.simulation_handle.take() {
            let _ = handle.join();
            log::info!(
                "Mock robot stopped ({} wall contacts)",
                self.physics.lock().collisions()
            );
        }
    }
}

impl Drop for MockRobot {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn step_once(left: &MockMotor, right: &MockMotor, physics: &Mutex<PhysicsState>, dt: f64) {
    let left_deg = left.advance(dt);
    let right_deg = right.advance(dt);
    physics.lock().update(left_deg, right_deg);
}

fn simulation_loop(
    left: MockMotor,
    right: MockMotor,
    physics: Arc<Mutex<PhysicsState>>,
    shutdown: Arc<AtomicBool>,
    period: Duration,
) {
    let mut last = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(period);
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        step_once(&left, &right, &physics, dt);
    }
}
