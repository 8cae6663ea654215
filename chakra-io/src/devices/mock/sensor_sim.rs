//! Simulated color and ultrasonic sensors
//!
//! Both read the ground-truth pose from the shared physics state.

use super::config::{ColorSensorConfig, UltrasonicConfig};
use super::noise::NoiseGenerator;
use super::physics::PhysicsState;
use crate::drivers::SampleSource;
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Downward color sensor mounted behind the centre of rotation
pub struct MockColorSensor {
    physics: Arc<Mutex<PhysicsState>>,
    config: ColorSensorConfig,
    tile: f64,
    noise: NoiseGenerator,
}

impl MockColorSensor {
    pub(super) fn new(
        physics: Arc<Mutex<PhysicsState>>,
        config: ColorSensorConfig,
        tile: f64,
        noise: NoiseGenerator,
    ) -> Self {
        Self {
            physics,
            config,
            tile,
            noise,
        }
    }

    /// Whether a point lies on a painted grid line
    fn on_line(&self, x: f64, y: f64) -> bool {
        let off_x = (x - (x / self.tile).round() * self.tile).abs();
        let off_y = (y - (y / self.tile).round() * self.tile).abs();
        off_x.min(off_y) <= self.config.line_width / 2.0
    }
}

impl SampleSource for MockColorSensor {
    fn fetch_sample(&mut self) -> Result<f32> {
        let (sx, sy) = {
            let physics = self.physics.lock();
            let (x, y) = physics.position();
            let theta = physics.theta();
            (
                x - self.config.offset * theta.sin(),
                y - self.config.offset * theta.cos(),
            )
        };

        let base = if self.on_line(sx, sy) {
            self.config.line_reflectance
        } else {
            self.config.floor_reflectance
        };
        let noisy = self.noise.perturb(base as f64, self.config.noise_stddev as f64) as f32;
        Ok(noisy.clamp(0.0, 100.0))
    }

    fn name(&self) -> &str {
        "color"
    }
}

/// Forward ultrasonic range sensor
pub struct MockUltrasonicSensor {
    physics: Arc<Mutex<PhysicsState>>,
    config: UltrasonicConfig,
    noise: NoiseGenerator,
}

impl MockUltrasonicSensor {
    pub(super) fn new(
        physics: Arc<Mutex<PhysicsState>>,
        config: UltrasonicConfig,
        noise: NoiseGenerator,
    ) -> Self {
        Self {
            physics,
            config,
            noise,
        }
    }
}

impl SampleSource for MockUltrasonicSensor {
    fn fetch_sample(&mut self) -> Result<f32> {
        let range = {
            let physics = self.physics.lock();
            let (x, y) = physics.position();
            let theta = physics.theta();
            let sx = x + self.config.mount_offset * theta.sin();
            let sy = y + self.config.mount_offset * theta.cos();
            physics.wall_distance(sx, sy)
        };

        let max = self.config.max_range as f64;
        if range >= max {
            return Ok(self.config.max_range);
        }
        let noisy = self.noise.perturb(range, self.config.noise_stddev as f64);
        Ok(noisy.clamp(0.0, max) as f32)
    }

    fn name(&self) -> &str {
        "ultrasonic"
    }
}
