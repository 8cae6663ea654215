//! Ground-truth kinematics for the simulated robot
//!
//! Heading convention matches the navigation core: 0 rad along +y,
//! increasing clockwise, so a forward step moves by (sin θ, cos θ).

use super::config::SimulationConfig;
use super::noise::{NoiseGenerator, NoiseStream};
use std::f64::consts::{PI, TAU};

/// Normalize angle to [0, 2π)
#[inline]
pub fn wrap_radians(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can return TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// True pose of the simulated robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruePose {
    /// X position (cm)
    pub x: f64,
    /// Y position (cm)
    pub y: f64,
    /// Heading (degrees, [0, 360))
    pub theta_deg: f64,
}

/// Physics state for the simulated robot
pub struct PhysicsState {
    x: f64,
    y: f64,
    /// Heading in radians, [0, 2π)
    theta: f64,
    wheel_radius: f64,
    track: f64,
    slip_stddev: f64,
    extent: f64,
    noise: NoiseGenerator,
    collisions: u64,
}

impl PhysicsState {
    /// Create physics state at the configured start pose
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            x: config.start_x,
            y: config.start_y,
            theta: wrap_radians(config.start_theta.to_radians()),
            wheel_radius: config.drive.wheel_radius,
            track: config.drive.track,
            slip_stddev: config.drive.slip_stddev,
            extent: config.board_extent(),
            noise: NoiseGenerator::for_stream(config.random_seed, NoiseStream::Drive),
            collisions: 0,
        }
    }

    /// Current true pose
    pub fn pose(&self) -> TruePose {
        TruePose {
            x: self.x,
            y: self.y,
            theta_deg: self.theta.to_degrees(),
        }
    }

    /// Heading in radians
    #[inline]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Position (cm)
    #[inline]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Number of steps refused because they would leave the board
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Apply one step of wheel rotation
    ///
    /// # Arguments
    /// * `left_deg` - Left wheel rotation over the step (degrees)
    /// * `right_deg` - Right wheel rotation over the step (degrees)
    pub fn update(&mut self, left_deg: f64, right_deg: f64) {
        if left_deg == 0.0 && right_deg == 0.0 {
            return;
        }

        let left_slip = self.noise.slip_factor(self.slip_stddev);
        let right_slip = self.noise.slip_factor(self.slip_stddev);
        let dist_left = PI * self.wheel_radius * left_deg / 180.0 * left_slip;
        let dist_right = PI * self.wheel_radius * right_deg / 180.0 * right_slip;

        let dist = 0.5 * (dist_left + dist_right);
        let dtheta = (dist_left - dist_right) / self.track;

        self.theta = wrap_radians(self.theta + dtheta);
        let new_x = self.x + dist * self.theta.sin();
        let new_y = self.y + dist * self.theta.cos();

        // Walls: refuse translation past the board border, keep rotation
        if new_x <= 0.0 || new_y <= 0.0 || new_x >= self.extent || new_y >= self.extent {
            self.collisions += 1;
            return;
        }
        self.x = new_x;
        self.y = new_y;
    }

    /// Distance along the current heading from `(x, y)` to the nearest wall
    pub fn wall_distance(&self, x: f64, y: f64) -> f64 {
        let (dx, dy) = (self.theta.sin(), self.theta.cos());
        let mut best = f64::INFINITY;

        for (origin, dir) in [(x, dx), (y, dy)] {
            if dir.abs() < 1e-12 {
                continue;
            }
            let wall = if dir > 0.0 { self.extent } else { 0.0 };
            let t = (wall - origin) / dir;
            if t >= 0.0 && t < best {
                best = t;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn still_config(x: f64, y: f64, theta: f64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.start_x = x;
        config.start_y = y;
        config.start_theta = theta;
        config.drive.slip_stddev = 0.0;
        config
    }

    #[test]
    fn test_straight_line_along_y() {
        let mut physics = PhysicsState::new(&still_config(50.0, 50.0, 0.0));
        // One full wheel turn travels 2πr
        physics.update(360.0, 360.0);
        let pose = physics.pose();
        assert_relative_eq!(pose.x, 50.0, epsilon = 1e-9);
        assert_relative_eq!(pose.y, 50.0 + TAU * 2.1, epsilon = 1e-9);
    }

    #[test]
    fn test_left_forward_turns_clockwise() {
        let mut physics = PhysicsState::new(&still_config(50.0, 50.0, 0.0));
        physics.update(10.0, -10.0);
        let theta = physics.pose().theta_deg;
        assert!(theta > 0.0 && theta < 90.0, "theta = {}", theta);
    }

    #[test]
    fn test_wall_blocks_translation() {
        let mut physics = PhysicsState::new(&still_config(1.0, 50.0, 270.0));
        physics.update(360.0, 360.0);
        assert_eq!(physics.collisions(), 1);
        assert_relative_eq!(physics.pose().x, 1.0);
    }

    #[test]
    fn test_wall_distance() {
        let physics = PhysicsState::new(&still_config(20.0, 20.0, 180.0));
        assert_relative_eq!(physics.wall_distance(20.0, 20.0), 20.0, epsilon = 1e-9);

        let physics = PhysicsState::new(&still_config(20.0, 30.0, 270.0));
        assert_relative_eq!(physics.wall_distance(20.0, 30.0), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_radians() {
        assert_relative_eq!(wrap_radians(-PI / 2.0), 1.5 * PI);
        assert_relative_eq!(wrap_radians(TAU + 0.5), 0.5, epsilon = 1e-12);
        assert!(wrap_radians(-1e-18) < TAU);
    }
}
