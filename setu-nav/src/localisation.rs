//! Sensor sweeps that correct the dead-reckoned pose
//!
//! Two procedures, both spinning the robot in place while a detector
//! reports boundary crossings through a capacity-1 channel:
//!
//! - **Ultrasonic alignment**: two wall edges fix the absolute heading.
//! - **Line-square fix**: four grid-line crossings around an intersection
//!   fix x, y and heading.
//!
//! Each wait is bounded by `event_timeout_ms`. A timeout stops the wheels
//! and the poller and reports [`NavError::MissedDetection`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chakra_io::SampleSource;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use crate::config::{BoardConfig, LocalisationConfig, SetuConfig};
use crate::detectors::{
    rendezvous, Detection, DetectionEvent, EdgeDetector, EdgeKind, LineDetector,
};
use crate::error::{NavError, Result};
use crate::geometry::Coordinate;
use crate::navigation::{Navigation, TurnDirection};
use crate::odometer::{Odometer, Pose};
use crate::pollers::{Poller, PollingMode};
use crate::utils::{closest_multiple, closest_reference, normalize_degrees, signed_degrees};

/// How much of the pose has been fixed by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalisationState {
    Unlocalised,
    HeadingLocalised,
    FullyLocalised,
}

/// A poller together with the receiving end of its detectors' rendezvous
pub struct SweepSensor {
    pub poller: Poller,
    pub events: Receiver<DetectionEvent>,
}

impl SweepSensor {
    /// Discard events left over from an aborted sweep
    fn drain(&self) -> usize {
        self.events.try_iter().count()
    }
}

/// Outcome of an ultrasonic alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFix {
    /// Direction of the first edge seen
    pub first: EdgeKind,
    /// Heading at the first edge, before correction
    pub theta1: f64,
    /// Heading at the second edge, before correction
    pub theta2: f64,
    /// Error subtracted from the heading
    pub correction: f64,
}

/// Outcome of a line-square fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFix {
    /// Headings at the four crossings, by slot
    pub headings: [f64; 4],
    /// Intersection the fix was taken around
    pub origin: Coordinate,
    pub x: f64,
    pub y: f64,
    /// Heading error removed from the estimate
    pub correction: f64,
}

/// Line-square geometry solved from the four slot headings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSolution {
    pub x: f64,
    pub y: f64,
    /// Signed heading error in degrees
    pub error: f64,
}

/// True heading at the second edge is this plus half the swept arc
pub fn alignment_base(corner: u8, first: EdgeKind) -> f64 {
    match (corner % 4, first) {
        (0, EdgeKind::Rising) => 225.0,
        (0, EdgeKind::Falling) => 45.0,
        (1, EdgeKind::Rising) => 135.0,
        (1, EdgeKind::Falling) => 315.0,
        (2, EdgeKind::Rising) => 45.0,
        (2, EdgeKind::Falling) => 225.0,
        (_, EdgeKind::Rising) => 315.0,
        (_, EdgeKind::Falling) => 135.0,
    }
}

/// Signed heading error from an edge pair recorded CCW then CW
pub fn edge_correction(corner: u8, first: EdgeKind, theta1: f64, theta2: f64) -> f64 {
    let arc = normalize_degrees(theta2 - theta1);
    signed_degrees(theta2 - (alignment_base(corner, first) + arc / 2.0))
}

/// Slot of the first crossing when sweeping counter-clockwise from `reference`
///
/// Slots 0 and 2 hold the vertical line's crossings, 1 and 3 the horizontal
/// line's.
pub fn first_slot(reference: f64) -> usize {
    match closest_reference(reference) as u32 {
        45 => 0,
        135 => 3,
        225 => 2,
        _ => 1,
    }
}

/// Solve position and heading error around the intersection `origin`
///
/// `offset` is the distance of the color sensor behind the centre of
/// rotation.
pub fn solve_line_fix(origin: Coordinate, headings: &[f64; 4], offset: f64) -> LineSolution {
    let delta_x = normalize_degrees(headings[2] - headings[0]);
    let delta_y = normalize_degrees(headings[3] - headings[1]);

    let x = origin.x + offset * (delta_x / 2.0).to_radians().cos();
    let y = origin.y + offset * (delta_y / 2.0).to_radians().cos();

    let from_x = signed_degrees(headings[0] + delta_x / 2.0 - 90.0);
    let from_y = signed_degrees(headings[3] - delta_y / 2.0);

    LineSolution {
        x,
        y,
        error: (from_x + from_y) / 2.0,
    }
}

/// Pose estimate for a robot placed `offset` from both walls of its corner
pub fn start_estimate(corner: u8, extent: f64, offset: f64) -> Coordinate {
    let far = extent - offset;
    match corner % 4 {
        0 => Coordinate::new(offset, offset),
        1 => Coordinate::new(far, offset),
        2 => Coordinate::new(far, far),
        _ => Coordinate::new(offset, far),
    }
}

/// Grid intersection one tile in from each wall of a corner
pub fn corner_intersection(corner: u8, tile: f64, size: u32) -> Coordinate {
    let far = (size.saturating_sub(1)) as f64 * tile;
    match corner % 4 {
        0 => Coordinate::new(tile, tile),
        1 => Coordinate::new(far, tile),
        2 => Coordinate::new(far, far),
        _ => Coordinate::new(tile, far),
    }
}

/// Localisation sweeps over injected motion, pose and sensors
pub struct Localisation {
    navigation: Arc<Navigation>,
    color: SweepSensor,
    ultrasonic: SweepSensor,
    config: LocalisationConfig,
    board: BoardConfig,
    state: Mutex<LocalisationState>,
}

impl Localisation {
    pub fn new(
        navigation: Arc<Navigation>,
        color: SweepSensor,
        ultrasonic: SweepSensor,
        config: LocalisationConfig,
        board: BoardConfig,
    ) -> Self {
        Self {
            navigation,
            color,
            ultrasonic,
            config,
            board,
            state: Mutex::new(LocalisationState::Unlocalised),
        }
    }

    /// Wire both sensors to their pollers and detectors
    pub fn from_sources(
        navigation: Arc<Navigation>,
        color: Box<dyn SampleSource>,
        ultrasonic: Box<dyn SampleSource>,
        config: &SetuConfig,
    ) -> Self {
        let (line_tx, line_rx) = rendezvous();
        let color_poller = Poller::new(
            "color",
            color,
            Duration::from_millis(config.pollers.color_period_ms),
        )
        .with_route(
            PollingMode::LineCrossing,
            Box::new(LineDetector::new(config.localisation.line.clone(), line_tx)),
        );

        let (edge_tx, edge_rx) = rendezvous();
        let ultrasonic_poller = Poller::new(
            "ultrasonic",
            ultrasonic,
            Duration::from_millis(config.pollers.ultrasonic_period_ms),
        )
        .with_route(
            PollingMode::EdgeDetection,
            Box::new(EdgeDetector::new(config.localisation.edge.clone(), edge_tx)),
        );

        Self::new(
            navigation,
            SweepSensor {
                poller: color_poller,
                events: line_rx,
            },
            SweepSensor {
                poller: ultrasonic_poller,
                events: edge_rx,
            },
            config.localisation.clone(),
            config.board.clone(),
        )
    }

    pub fn state(&self) -> LocalisationState {
        *self.state.lock()
    }

    /// Take a pose known from outside the sweeps as a full fix
    pub fn assume_localised(&self, pose: Pose) {
        self.odometer().set_pose(pose);
        self.odometer().mark_fixed();
        *self.state.lock() = LocalisationState::FullyLocalised;
        tracing::info!(
            "Pose assumed at ({:.1}, {:.1}, {:.1}°)",
            pose.x,
            pose.y,
            pose.theta
        );
    }

    fn odometer(&self) -> &Arc<Odometer> {
        self.navigation.odometer()
    }

    /// Full start-of-mission routine from the configured starting corner
    pub fn run_initial_localisation(&self) -> Result<()> {
        let corner = self.board.starting_corner;
        let extent = self.board.tile * self.board.size as f64;
        let estimate = start_estimate(corner, extent, self.config.start_offset);
        self.odometer().correct(|pose| {
            pose.x = estimate.x;
            pose.y = estimate.y;
        });
        tracing::info!("Initial localisation from corner {} at {}", corner, estimate);

        self.with_retries("ultrasonic", || self.align_heading())?;

        let target = corner_intersection(corner, self.board.tile, self.board.size);
        self.navigation.travel_to(target.x, target.y, true)?;

        self.fix_position_with_retries()?;

        let pose = self.odometer().pose();
        tracing::info!(
            "Localised at ({:.1}, {:.1}, {:.1}°)",
            pose.x,
            pose.y,
            pose.theta
        );
        Ok(())
    }

    /// Ultrasonic alignment: spin counter-clockwise to one wall edge, then
    /// back clockwise to the matching edge of the other wall
    pub fn align_heading(&self) -> Result<EdgeFix> {
        let stale = self.ultrasonic.drain();
        if stale > 0 {
            tracing::debug!("Dropped {} stale edge events", stale);
        }

        tracing::info!("Ultrasonic alignment started");
        self.ultrasonic.poller.start(PollingMode::EdgeDetection)?;
        self.navigation
            .spin(TurnDirection::CounterClockwise, self.config.rotation_speed)?;

        let mut first = None;
        let mut headings = [0.0; 2];
        let swept = self.collect(&self.ultrasonic, "ultrasonic", 2, |index, event, theta| {
            headings[index] = theta;
            if index == 0 {
                if let Detection::Edge(kind) = event.detection {
                    first = Some(kind);
                }
                self.navigation
                    .spin(TurnDirection::Clockwise, self.config.rotation_speed)?;
            }
            Ok(())
        });
        self.finish_sweep(&self.ultrasonic, swept)?;

        let first = first.ok_or(NavError::MissedDetection {
            sweep: "ultrasonic",
            received: 0,
            expected: 2,
        })?;
        let [theta1, theta2] = headings;
        let correction = edge_correction(self.board.starting_corner, first, theta1, theta2);
        let pose = self.odometer().correct(|pose| pose.theta -= correction);

        let mut state = self.state.lock();
        if *state == LocalisationState::Unlocalised {
            *state = LocalisationState::HeadingLocalised;
        }
        tracing::info!(
            "Ultrasonic alignment: {:?} edges at {:.1}° and {:.1}°, corrected by {:.1}° to {:.1}°",
            first,
            theta1,
            theta2,
            correction,
            pose.theta
        );

        Ok(EdgeFix {
            first,
            theta1,
            theta2,
            correction,
        })
    }

    /// Pre-turned line-square fix, repeated on a missed line up to
    /// `max_attempts` times
    pub fn fix_position_with_retries(&self) -> Result<LineFix> {
        self.with_retries("color", || self.fix_position(true))
    }

    /// Line-square fix around the nearest intersection
    ///
    /// With `pre_turn` the robot first faces the diagonal of its current
    /// quadrant, which keeps the first crossing away from a line.
    pub fn fix_position(&self, pre_turn: bool) -> Result<LineFix> {
        if pre_turn {
            let reference = closest_reference(self.odometer().theta());
            self.navigation.turn_to(reference)?;
        }

        let pose = self.odometer().pose();
        let tile = self.board.tile;
        let origin = Coordinate::new(
            closest_multiple(pose.x, tile),
            closest_multiple(pose.y, tile),
        );
        let start = first_slot(pose.theta);

        let stale = self.color.drain();
        if stale > 0 {
            tracing::debug!("Dropped {} stale line events", stale);
        }

        tracing::info!("Line-square fix started around {}", origin);
        self.color.poller.start(PollingMode::LineCrossing)?;
        self.navigation
            .spin(TurnDirection::CounterClockwise, self.config.rotation_speed)?;

        let mut headings = [0.0; 4];
        let swept = self.collect(&self.color, "color", 4, |index, _, theta| {
            headings[(start + index) % 4] = theta;
            Ok(())
        });
        self.finish_sweep(&self.color, swept)?;

        let solution = solve_line_fix(origin, &headings, self.config.color_sensor_offset);
        let bias = self.config.heading_bias_deg;
        let pose = self.odometer().correct(|pose| {
            pose.x = solution.x;
            pose.y = solution.y;
            pose.theta = pose.theta - solution.error + bias;
        });
        self.odometer().mark_fixed();
        *self.state.lock() = LocalisationState::FullyLocalised;

        tracing::info!(
            "Line-square fix: headings {:.1?}, pose ({:.1}, {:.1}, {:.1}°)",
            headings,
            pose.x,
            pose.y,
            pose.theta
        );

        Ok(LineFix {
            headings,
            origin,
            x: solution.x,
            y: solution.y,
            correction: solution.error,
        })
    }

    /// Wait for `expected` events, calling `on_event` with the heading at each
    ///
    /// The heading is read on receipt. The sweep is already blocked in
    /// `recv_timeout` when the detector fires, so the lag is one poller
    /// period at most and is logged.
    fn collect<F>(
        &self,
        sensor: &SweepSensor,
        sweep: &'static str,
        expected: usize,
        mut on_event: F,
    ) -> Result<()>
    where
        F: FnMut(usize, &DetectionEvent, f64) -> Result<()>,
    {
        let timeout = Duration::from_millis(self.config.event_timeout_ms);
        for index in 0..expected {
            match sensor.events.recv_timeout(timeout) {
                Ok(event) => {
                    let theta = self.odometer().theta();
                    tracing::debug!(
                        "{} event {}/{} at {:.1}°, {:?} after detection",
                        sweep,
                        index + 1,
                        expected,
                        theta,
                        event.at.elapsed()
                    );
                    on_event(index, &event, theta)?;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!(
                        "{} sweep: no detection after {:?} ({} of {})",
                        sweep,
                        timeout,
                        index,
                        expected
                    );
                    return Err(NavError::MissedDetection {
                        sweep,
                        received: index,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    /// Stop the wheels and the poller whatever the sweep's outcome
    fn finish_sweep(&self, sensor: &SweepSensor, swept: Result<()>) -> Result<()> {
        let stopped = self.navigation.stop();
        sensor.poller.stop();
        swept?;
        stopped?;
        thread::sleep(Duration::from_millis(self.config.settle_ms));
        Ok(())
    }

    fn with_retries<T, F>(&self, sweep: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut tries = 1;
        loop {
            match attempt() {
                Err(NavError::MissedDetection { received, .. })
                    if tries < self.config.max_attempts =>
                {
                    tracing::warn!(
                        "{} sweep attempt {}/{} saw {} events, retrying",
                        sweep,
                        tries,
                        self.config.max_attempts,
                        received
                    );
                    tries += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
