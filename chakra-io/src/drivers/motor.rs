//! Motor driver trait

use crate::error::Result;

/// Regulated wheel motor.
///
/// Speeds are in wheel degrees per second and the tachometer counts wheel
/// degrees. Commands take `&self` so a single motor can be shared between
/// the odometry thread (tachometer reads) and the thread driving the robot.
pub trait Motor: Send + Sync {
    /// Set the regulated speed used by subsequent motion commands
    fn set_speed(&self, degrees_per_sec: f64) -> Result<()>;

    /// Set the acceleration ramp
    fn set_acceleration(&self, degrees_per_sec2: f64) -> Result<()>;

    /// Spin forward until stopped
    fn forward(&self) -> Result<()>;

    /// Spin backward until stopped
    fn backward(&self) -> Result<()>;

    /// Stop the motor
    ///
    /// # Arguments
    /// * `return_immediately` - When false, wait until the wheel is at rest
    fn stop(&self, return_immediately: bool) -> Result<()>;

    /// Rotate by a relative number of wheel degrees
    ///
    /// # Arguments
    /// * `degrees` - Signed rotation; negative turns the wheel backward
    /// * `return_immediately` - When false, block until the rotation completes
    fn rotate(&self, degrees: i32, return_immediately: bool) -> Result<()>;

    /// Whether a motion command is still in progress
    fn is_moving(&self) -> Result<bool>;

    /// Accumulated wheel rotation in degrees
    fn tacho_count(&self) -> Result<i32>;

    /// Set motor speed and acceleration in one call
    fn configure(&self, degrees_per_sec: f64, degrees_per_sec2: f64) -> Result<()> {
        self.set_acceleration(degrees_per_sec2)?;
        self.set_speed(degrees_per_sec)
    }
}
