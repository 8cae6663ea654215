//! Configuration loading for SetuNav
//!
//! Board geometry (zones, towers, waypoints) is written in tiles and scaled
//! to centimetres by the components that consume it. Everything else is in
//! centimetres, degrees and milliseconds.

use crate::error::{NavError, Result};
use crate::geometry::{Coordinate, Rect};
use chakra_io::devices::mock::SimulationConfig;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SetuConfig {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub zones: ZoneConfig,
    #[serde(default)]
    pub localisation: LocalisationConfig,
    #[serde(default)]
    pub pollers: PollerConfig,
    #[serde(default)]
    pub odometer: OdometerConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub mission: MissionConfig,
}

/// Robot physical parameters and motion profile
#[derive(Clone, Debug, Deserialize)]
pub struct RobotConfig {
    /// Wheel radius in cm (default: 2.1)
    #[serde(default = "default_wheel_radius")]
    pub wheel_radius: f64,

    /// Distance between wheels in cm (default: 9.71)
    #[serde(default = "default_track")]
    pub track: f64,

    /// Wheel speed for straight legs, deg/s (default: 200)
    #[serde(default = "default_forward_speed")]
    pub forward_speed: f64,

    /// Wheel speed for in-place turns, deg/s (default: 150)
    #[serde(default = "default_rotate_speed")]
    pub rotate_speed: f64,

    /// Acceleration for turns, deg/s² (default: 200)
    #[serde(default = "default_slow_acceleration")]
    pub slow_acceleration: f64,

    /// Acceleration for straight legs, deg/s² (default: 300)
    #[serde(default = "default_fast_acceleration")]
    pub fast_acceleration: f64,

    /// Pause between the turn and the forward leg of a travel, ms (default: 200)
    #[serde(default = "default_turn_settle_ms")]
    pub turn_settle_ms: u64,
}

/// Which pair of symmetric zones belongs to us
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[default]
    Green,
    Red,
}

/// Board geometry
#[derive(Clone, Debug, Deserialize)]
pub struct BoardConfig {
    /// Tile edge in cm (default: 30.48)
    #[serde(default = "default_tile")]
    pub tile: f64,

    /// Board edge in tiles (default: 8)
    #[serde(default = "default_board_size")]
    pub size: u32,

    /// Starting corner, 0-3 counter-clockwise from lower-left (default: 0)
    #[serde(default)]
    pub starting_corner: u8,

    #[serde(default)]
    pub team: Team,
}

/// Static zone layout, in tiles
#[derive(Clone, Debug, Deserialize)]
pub struct ZoneConfig {
    #[serde(default = "default_green_zone")]
    pub green: Rect,

    #[serde(default = "default_red_zone")]
    pub red: Rect,

    /// Bridge segment spanning the river along x
    #[serde(default)]
    pub bridge_horizontal: Option<Rect>,

    /// Bridge segment spanning the river along y
    #[serde(default = "default_bridge_vertical")]
    pub bridge_vertical: Option<Rect>,

    #[serde(default = "default_green_tower")]
    pub green_tower: Coordinate,

    #[serde(default = "default_red_tower")]
    pub red_tower: Coordinate,

    /// Treat the span between the two towers as an obstacle (default: true)
    #[serde(default = "default_true")]
    pub zipline_blocks_legs: bool,
}

/// Ultrasonic edge detector tuning
#[derive(Clone, Debug, Deserialize)]
pub struct EdgeDetectorConfig {
    /// Moving-average length in samples (default: 3)
    #[serde(default = "default_edge_window")]
    pub window: usize,

    /// Distance threshold in cm (default: 50)
    #[serde(default = "default_edge_threshold")]
    pub threshold: f32,

    /// Readings above this are clamped, cm (default: 255)
    #[serde(default = "default_max_reading")]
    pub max_reading: f32,

    /// Samples absorbed after a detection, ms (default: 1000)
    #[serde(default = "default_edge_dead_time_ms")]
    pub dead_time_ms: u64,
}

/// Color line detector tuning
#[derive(Clone, Debug, Deserialize)]
pub struct LineDetectorConfig {
    /// Moving-average length in samples (default: 5)
    #[serde(default = "default_line_window")]
    pub window: usize,

    /// Gain applied to the first difference (default: 11)
    #[serde(default = "default_line_scale")]
    pub scale: f32,

    /// Scaled difference that counts as a dip or rise (default: 40)
    #[serde(default = "default_line_threshold")]
    pub threshold: f32,

    /// Ticks a dip stays armed waiting for the rise (default: 10)
    #[serde(default = "default_pulse_ticks")]
    pub pulse_ticks: u32,

    /// Samples absorbed after a detection, ms (default: 500)
    #[serde(default = "default_line_dead_time_ms")]
    pub dead_time_ms: u64,
}

/// Localisation sweeps
#[derive(Clone, Debug, Deserialize)]
pub struct LocalisationConfig {
    /// Wheel speed while sweeping, deg/s (default: 150)
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f64,

    /// Color sensor distance behind the centre of rotation, cm (default: 15)
    #[serde(default = "default_color_sensor_offset")]
    pub color_sensor_offset: f64,

    /// Constant added to the line-square heading estimate, degrees (default: 0)
    #[serde(default)]
    pub heading_bias_deg: f64,

    /// Longest wait for one detector event, ms (default: 20000)
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,

    /// Sweep attempts before a missed detection is reported (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial estimate: distance from both corner walls, cm (default: 20)
    #[serde(default = "default_start_offset")]
    pub start_offset: f64,

    /// Pause after a sweep before driving again, ms (default: 500)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default)]
    pub edge: EdgeDetectorConfig,

    #[serde(default)]
    pub line: LineDetectorConfig,
}

/// Sensor poller periods
#[derive(Clone, Debug, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_color_period_ms")]
    pub color_period_ms: u64,

    #[serde(default = "default_ultrasonic_period_ms")]
    pub ultrasonic_period_ms: u64,
}

/// Pose integration
#[derive(Clone, Debug, Deserialize)]
pub struct OdometerConfig {
    /// Integration period, ms (default: 15)
    #[serde(default = "default_odometer_period_ms")]
    pub period_ms: u64,
}

/// Travel loop and path search
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Tiles travelled between relocalisations (default: 4)
    #[serde(default = "default_relocalisation_tiles")]
    pub relocalisation_tiles: f64,

    /// Travel loop sleep, ms (default: 300)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Path search expansion budget (default: 20000)
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,

    /// Longest expanded path (default: 64)
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,

    /// Heading change, degrees, after which an avoided leg resumes (default: [165, 195])
    #[serde(default = "default_avoid_resume_window")]
    pub avoid_resume_window: [f64; 2],
}

/// Mission run by the binary
#[derive(Clone, Debug, Deserialize)]
pub struct MissionConfig {
    /// Goals in tiles
    #[serde(default = "default_waypoints")]
    pub waypoints: Vec<Coordinate>,

    /// Expand goals into axis-aligned legs (default: true)
    #[serde(default = "default_true")]
    pub rectangular: bool,
}

// Default value functions
fn default_wheel_radius() -> f64 {
    2.1
}
fn default_track() -> f64 {
    9.71
}
fn default_forward_speed() -> f64 {
    200.0
}
fn default_rotate_speed() -> f64 {
    150.0
}
fn default_slow_acceleration() -> f64 {
    200.0
}
fn default_fast_acceleration() -> f64 {
    300.0
}
fn default_turn_settle_ms() -> u64 {
    200
}
fn default_tile() -> f64 {
    30.48
}
fn default_board_size() -> u32 {
    8
}
fn default_true() -> bool {
    true
}

// Zone defaults: green south of the river, red north, one bridge
fn default_green_zone() -> Rect {
    Rect::new(Coordinate::new(0.0, 0.0), Coordinate::new(8.0, 3.0))
}
fn default_red_zone() -> Rect {
    Rect::new(Coordinate::new(0.0, 5.0), Coordinate::new(8.0, 8.0))
}
fn default_bridge_vertical() -> Option<Rect> {
    Some(Rect::new(Coordinate::new(3.0, 3.0), Coordinate::new(4.0, 5.0)))
}
fn default_green_tower() -> Coordinate {
    Coordinate::new(7.0, 1.0)
}
fn default_red_tower() -> Coordinate {
    Coordinate::new(7.0, 7.0)
}

fn default_edge_window() -> usize {
    3
}
fn default_edge_threshold() -> f32 {
    50.0
}
fn default_max_reading() -> f32 {
    255.0
}
fn default_edge_dead_time_ms() -> u64 {
    1000
}
fn default_line_window() -> usize {
    5
}
fn default_line_scale() -> f32 {
    11.0
}
fn default_line_threshold() -> f32 {
    40.0
}
fn default_pulse_ticks() -> u32 {
    10
}
fn default_line_dead_time_ms() -> u64 {
    500
}

fn default_rotation_speed() -> f64 {
    150.0
}
fn default_color_sensor_offset() -> f64 {
    15.0
}
fn default_event_timeout_ms() -> u64 {
    20_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_start_offset() -> f64 {
    20.0
}
fn default_settle_ms() -> u64 {
    500
}
fn default_color_period_ms() -> u64 {
    10
}
fn default_ultrasonic_period_ms() -> u64 {
    40
}
fn default_odometer_period_ms() -> u64 {
    15
}
fn default_relocalisation_tiles() -> f64 {
    4.0
}
fn default_poll_interval_ms() -> u64 {
    300
}
fn default_max_expansions() -> usize {
    20_000
}
fn default_max_path_len() -> usize {
    64
}
fn default_avoid_resume_window() -> [f64; 2] {
    [165.0, 195.0]
}
fn default_waypoints() -> Vec<Coordinate> {
    vec![Coordinate::new(6.0, 6.0)]
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_radius: default_wheel_radius(),
            track: default_track(),
            forward_speed: default_forward_speed(),
            rotate_speed: default_rotate_speed(),
            slow_acceleration: default_slow_acceleration(),
            fast_acceleration: default_fast_acceleration(),
            turn_settle_ms: default_turn_settle_ms(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            tile: default_tile(),
            size: default_board_size(),
            starting_corner: 0,
            team: Team::default(),
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            green: default_green_zone(),
            red: default_red_zone(),
            bridge_horizontal: None,
            bridge_vertical: default_bridge_vertical(),
            green_tower: default_green_tower(),
            red_tower: default_red_tower(),
            zipline_blocks_legs: true,
        }
    }
}

impl Default for EdgeDetectorConfig {
    fn default() -> Self {
        Self {
            window: default_edge_window(),
            threshold: default_edge_threshold(),
            max_reading: default_max_reading(),
            dead_time_ms: default_edge_dead_time_ms(),
        }
    }
}

impl Default for LineDetectorConfig {
    fn default() -> Self {
        Self {
            window: default_line_window(),
            scale: default_line_scale(),
            threshold: default_line_threshold(),
            pulse_ticks: default_pulse_ticks(),
            dead_time_ms: default_line_dead_time_ms(),
        }
    }
}

impl Default for LocalisationConfig {
    fn default() -> Self {
        Self {
            rotation_speed: default_rotation_speed(),
            color_sensor_offset: default_color_sensor_offset(),
            heading_bias_deg: 0.0,
            event_timeout_ms: default_event_timeout_ms(),
            max_attempts: default_max_attempts(),
            start_offset: default_start_offset(),
            settle_ms: default_settle_ms(),
            edge: EdgeDetectorConfig::default(),
            line: LineDetectorConfig::default(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            color_period_ms: default_color_period_ms(),
            ultrasonic_period_ms: default_ultrasonic_period_ms(),
        }
    }
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self {
            period_ms: default_odometer_period_ms(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            relocalisation_tiles: default_relocalisation_tiles(),
            poll_interval_ms: default_poll_interval_ms(),
            max_expansions: default_max_expansions(),
            max_path_len: default_max_path_len(),
            avoid_resume_window: default_avoid_resume_window(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            waypoints: default_waypoints(),
            rectangular: true,
        }
    }
}

impl SetuConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SetuConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.board.tile <= 0.0 || self.board.size < 2 {
            return Err(NavError::Config(format!(
                "board must have a positive tile and at least 2 tiles (tile {}, size {})",
                self.board.tile, self.board.size
            )));
        }
        if self.board.starting_corner > 3 {
            return Err(NavError::Config(format!(
                "starting_corner must be 0-3, got {}",
                self.board.starting_corner
            )));
        }
        if self.robot.wheel_radius <= 0.0 || self.robot.track <= 0.0 {
            return Err(NavError::Config(
                "wheel_radius and track must be positive".to_string(),
            ));
        }
        if self.zones.bridge_horizontal.is_none() && self.zones.bridge_vertical.is_none() {
            return Err(NavError::Config("at least one bridge is required".to_string()));
        }
        if self.localisation.edge.window == 0 || self.localisation.line.window == 0 {
            return Err(NavError::Config("detector windows must be non-empty".to_string()));
        }
        if self.localisation.max_attempts == 0 {
            return Err(NavError::Config("max_attempts must be at least 1".to_string()));
        }
        let [low, high] = self.navigation.avoid_resume_window;
        if low > high {
            return Err(NavError::Config(format!(
                "avoid_resume_window is reversed: [{}, {}]",
                low, high
            )));
        }
        Ok(())
    }

    /// Board edge length in cm
    pub fn board_extent(&self) -> f64 {
        self.board.tile * self.board.size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SetuConfig::from_toml("").unwrap();
        assert_eq!(config.board.size, 8);
        assert_eq!(config.pollers.color_period_ms, 10);
        assert_eq!(config.localisation.line.window, 5);
        assert_eq!(config.mission.waypoints, vec![Coordinate::new(6.0, 6.0)]);
        assert!(config.zones.bridge_vertical.is_some());
    }

    #[test]
    fn test_partial_sections() {
        let config = SetuConfig::from_toml(
            r#"
            [board]
            tile = 30.0
            starting_corner = 2
            team = "red"

            [zones]
            bridge_horizontal = { ll = [2, 3], ur = [6, 4] }
            bridge_vertical = { ll = [5, 4], ur = [6, 6] }

            [localisation.edge]
            threshold = 40.0

            [mission]
            waypoints = [[1, 6], [6, 1]]
            "#,
        )
        .unwrap();

        assert_eq!(config.board.team, Team::Red);
        assert_eq!(config.board.starting_corner, 2);
        assert_eq!(config.localisation.edge.threshold, 40.0);
        assert_eq!(config.localisation.edge.window, 3);
        assert_eq!(config.mission.waypoints.len(), 2);
        assert!(config.zones.bridge_horizontal.is_some());
    }

    #[test]
    fn test_invalid_corner_rejected() {
        let err = SetuConfig::from_toml("[board]\nstarting_corner = 4").unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = SetuConfig::from_toml("[board\n").unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }
}
