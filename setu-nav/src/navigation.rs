//! Point-to-point driver
//!
//! Turns to a bearing along the shorter direction, then drives straight.
//! Wheel commands are issued left first without blocking and right second,
//! so both wheels start together and the right wheel's command decides
//! whether the call waits.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chakra_io::Motor;
use parking_lot::Mutex;

use crate::config::RobotConfig;
use crate::error::Result;
use crate::odometer::Odometer;
use crate::utils::{bearing, normalize_degrees};

/// Legs shorter than this (cm) are not driven
const MIN_TRAVEL: f64 = 0.01;

/// Turns smaller than this (degrees) are not commanded
const MIN_TURN: f64 = 1e-6;

/// Rotation direction as seen from above
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    /// Heading increases
    Clockwise,
    /// Heading decreases
    CounterClockwise,
}

/// An in-place rotation chosen by [`plan_turn`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnPlan {
    pub direction: TurnDirection,
    /// Degrees, in [0, 180]
    pub magnitude: f64,
}

/// Shorter rotation from `current` to `target`
///
/// An exact half turn goes counter-clockwise.
pub fn plan_turn(current: f64, target: f64) -> TurnPlan {
    let cw = normalize_degrees(target - current);
    let ccw = normalize_degrees(current - target);
    if cw < ccw {
        TurnPlan {
            direction: TurnDirection::Clockwise,
            magnitude: cw,
        }
    } else {
        TurnPlan {
            direction: TurnDirection::CounterClockwise,
            magnitude: ccw,
        }
    }
}

/// Differential-drive motion commands against the shared pose
pub struct Navigation {
    odometer: Arc<Odometer>,
    left: Arc<dyn Motor>,
    right: Arc<dyn Motor>,
    robot: RobotConfig,
    /// Heading captured when the last leg was cancelled
    interrupted: Mutex<Option<f64>>,
}

impl Navigation {
    pub fn new(
        odometer: Arc<Odometer>,
        left: Arc<dyn Motor>,
        right: Arc<dyn Motor>,
        robot: RobotConfig,
    ) -> Self {
        Self {
            odometer,
            left,
            right,
            robot,
            interrupted: Mutex::new(None),
        }
    }

    pub fn odometer(&self) -> &Arc<Odometer> {
        &self.odometer
    }

    /// Wheel degrees that roll the robot `distance` cm
    pub fn convert_distance(&self, distance: f64) -> f64 {
        180.0 * distance / (std::f64::consts::PI * self.robot.wheel_radius)
    }

    /// Wheel degrees each wheel turns for an in-place rotation of `angle` degrees
    pub fn convert_angle(&self, angle: f64) -> f64 {
        self.convert_distance(std::f64::consts::PI * self.robot.track * angle / 360.0)
    }

    /// Turn toward (x, y) and drive there
    ///
    /// The turn always completes before the straight leg starts. With
    /// `blocking` false the call returns once the straight leg is issued.
    pub fn travel_to(&self, x: f64, y: f64, blocking: bool) -> Result<()> {
        let pose = self.odometer.pose();
        let distance = (x - pose.x).hypot(y - pose.y);
        if distance < MIN_TRAVEL {
            tracing::debug!("Already at ({:.1}, {:.1})", x, y);
            return Ok(());
        }

        let heading = bearing(pose.x, pose.y, x, y);
        tracing::debug!(
            "Travel ({:.1}, {:.1}) -> ({:.1}, {:.1}): {:.1} cm at {:.1}°",
            pose.x,
            pose.y,
            x,
            y,
            distance,
            heading
        );

        self.turn_to(heading)?;
        thread::sleep(Duration::from_millis(self.robot.turn_settle_ms));
        self.forward(distance, blocking)
    }

    /// Rotate in place to an absolute heading, blocking until done
    pub fn turn_to(&self, theta: f64) -> Result<()> {
        let plan = plan_turn(self.odometer.theta(), theta);
        if plan.magnitude < MIN_TURN {
            return Ok(());
        }

        self.configure(self.robot.rotate_speed, self.robot.slow_acceleration)?;
        let wheel = self.convert_angle(plan.magnitude).round() as i32;
        match plan.direction {
            TurnDirection::Clockwise => {
                self.left.rotate(wheel, true)?;
                self.right.rotate(-wheel, false)?;
            }
            TurnDirection::CounterClockwise => {
                self.left.rotate(-wheel, true)?;
                self.right.rotate(wheel, false)?;
            }
        }
        Ok(())
    }

    /// Drive straight along the current heading
    pub fn forward(&self, distance: f64, blocking: bool) -> Result<()> {
        self.configure(self.robot.forward_speed, self.robot.fast_acceleration)?;
        let wheel = self.convert_distance(distance).round() as i32;
        self.left.rotate(wheel, true)?;
        self.right.rotate(wheel, !blocking)?;
        Ok(())
    }

    /// Spin in place until stopped, as used by the localisation sweeps
    pub fn spin(&self, direction: TurnDirection, speed: f64) -> Result<()> {
        self.configure(speed, self.robot.slow_acceleration)?;
        match direction {
            TurnDirection::Clockwise => {
                self.left.forward()?;
                self.right.backward()?;
            }
            TurnDirection::CounterClockwise => {
                self.left.backward()?;
                self.right.forward()?;
            }
        }
        Ok(())
    }

    /// Stop both wheels, waiting for the right one to come to rest
    pub fn stop(&self) -> Result<()> {
        self.left.stop(true)?;
        self.right.stop(false)?;
        Ok(())
    }

    /// Stop the current leg and record the heading at the moment of the stop
    pub fn cancel_travel(&self) -> Result<f64> {
        let mut interrupted = self.interrupted.lock();
        self.stop()?;
        let theta = self.odometer.theta();
        *interrupted = Some(theta);
        tracing::info!("Travel cancelled at heading {:.1}°", theta);
        Ok(theta)
    }

    /// Heading of the last cancelled leg, cleared on read
    pub fn take_interrupted_heading(&self) -> Option<f64> {
        self.interrupted.lock().take()
    }

    /// Whether either wheel is still executing a command
    pub fn is_moving(&self) -> Result<bool> {
        Ok(self.left.is_moving()? || self.right.is_moving()?)
    }

    fn configure(&self, speed: f64, acceleration: f64) -> Result<()> {
        self.left.configure(speed, acceleration)?;
        self.right.configure(speed, acceleration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odometer::Pose;
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Rotate(i32, bool),
        Forward,
        Backward,
        Stop,
    }

    #[derive(Default)]
    struct RecordingMotor {
        commands: Mutex<Vec<Command>>,
    }

    impl RecordingMotor {
        fn take(&self) -> Vec<Command> {
            std::mem::take(&mut *self.commands.lock())
        }
    }

    impl Motor for RecordingMotor {
        fn set_speed(&self, _: f64) -> chakra_io::Result<()> {
            Ok(())
        }
        fn set_acceleration(&self, _: f64) -> chakra_io::Result<()> {
            Ok(())
        }
        fn forward(&self) -> chakra_io::Result<()> {
            self.commands.lock().push(Command::Forward);
            Ok(())
        }
        fn backward(&self) -> chakra_io::Result<()> {
            self.commands.lock().push(Command::Backward);
            Ok(())
        }
        fn stop(&self, _: bool) -> chakra_io::Result<()> {
            self.commands.lock().push(Command::Stop);
            Ok(())
        }
        fn rotate(&self, degrees: i32, immediate: bool) -> chakra_io::Result<()> {
            self.commands.lock().push(Command::Rotate(degrees, immediate));
            Ok(())
        }
        fn is_moving(&self) -> chakra_io::Result<bool> {
            Ok(false)
        }
        fn tacho_count(&self) -> chakra_io::Result<i32> {
            Ok(0)
        }
    }

    fn setup() -> (Navigation, Arc<RecordingMotor>, Arc<RecordingMotor>) {
        let left = Arc::new(RecordingMotor::default());
        let right = Arc::new(RecordingMotor::default());
        let robot = RobotConfig {
            turn_settle_ms: 0,
            ..RobotConfig::default()
        };
        let odometer = Arc::new(Odometer::new(
            left.clone(),
            right.clone(),
            robot.wheel_radius,
            robot.track,
            Duration::from_millis(15),
        ));
        let nav = Navigation::new(odometer, left.clone(), right.clone(), robot);
        (nav, left, right)
    }

    #[test]
    fn test_plan_turn_is_minimal() {
        for current in (0..360).step_by(7) {
            for target in (0..360).step_by(11) {
                let (current, target) = (current as f64, target as f64);
                let plan = plan_turn(current, target);
                assert!(plan.magnitude <= 180.0, "{} -> {}", current, target);

                let signed = match plan.direction {
                    TurnDirection::Clockwise => plan.magnitude,
                    TurnDirection::CounterClockwise => -plan.magnitude,
                };
                let reached = normalize_degrees(current + signed);
                let miss = normalize_degrees(reached - target);
                assert!(miss < 1e-9 || 360.0 - miss < 1e-9);
                assert_eq!(plan, plan_turn(current, target));
            }
        }
    }

    #[test]
    fn test_plan_turn_half_turn_tie() {
        let plan = plan_turn(10.0, 190.0);
        assert_eq!(plan.direction, TurnDirection::CounterClockwise);
        assert_relative_eq!(plan.magnitude, 180.0);

        let plan = plan_turn(350.0, 20.0);
        assert_eq!(plan.direction, TurnDirection::Clockwise);
        assert_relative_eq!(plan.magnitude, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wheel_conversions() {
        let (nav, _, _) = setup();
        let r = nav.robot.wheel_radius;
        let track = nav.robot.track;
        assert_relative_eq!(nav.convert_distance(std::f64::consts::TAU * r), 360.0, epsilon = 1e-9);
        assert_relative_eq!(nav.convert_angle(360.0), 180.0 * track / r, epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_turn_commands() {
        let (nav, left, right) = setup();
        nav.turn_to(90.0).unwrap();

        let wheel = nav.convert_angle(90.0).round() as i32;
        assert_eq!(left.take(), vec![Command::Rotate(wheel, true)]);
        assert_eq!(right.take(), vec![Command::Rotate(-wheel, false)]);
    }

    #[test]
    fn test_travel_turns_then_drives() {
        let (nav, left, right) = setup();
        nav.odometer().set_pose(Pose::new(10.0, 10.0, 0.0));
        nav.travel_to(10.0, 0.0, false).unwrap();

        // Straight behind: half turn, counter-clockwise, then 10 cm
        let turn = nav.convert_angle(180.0).round() as i32;
        let leg = nav.convert_distance(10.0).round() as i32;
        assert_eq!(
            left.take(),
            vec![Command::Rotate(-turn, true), Command::Rotate(leg, true)]
        );
        assert_eq!(
            right.take(),
            vec![Command::Rotate(turn, false), Command::Rotate(leg, true)]
        );
    }

    #[test]
    fn test_travel_to_current_position_is_noop() {
        let (nav, left, right) = setup();
        nav.odometer().set_pose(Pose::new(5.0, 5.0, 45.0));
        nav.travel_to(5.0, 5.001, true).unwrap();
        assert!(left.take().is_empty());
        assert!(right.take().is_empty());
    }

    #[test]
    fn test_spin_directions() {
        let (nav, left, right) = setup();
        nav.spin(TurnDirection::CounterClockwise, 150.0).unwrap();
        assert_eq!(left.take(), vec![Command::Backward]);
        assert_eq!(right.take(), vec![Command::Forward]);
    }

    #[test]
    fn test_cancel_captures_heading_once() {
        let (nav, left, right) = setup();
        nav.odometer().set_theta(123.0);

        assert_relative_eq!(nav.cancel_travel().unwrap(), 123.0);
        assert_eq!(left.take(), vec![Command::Stop]);
        assert_eq!(right.take(), vec![Command::Stop]);
        assert_eq!(nav.take_interrupted_heading(), Some(123.0));
        assert_eq!(nav.take_interrupted_heading(), None);
    }
}
