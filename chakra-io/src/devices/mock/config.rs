//! Mock robot simulation configuration
//!
//! Every parameter has a default matching the EV3 competition robot and the
//! standard 8x8 tile board, so an empty `[simulation]` table is valid.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! SimulationConfig
//! ├── tile, board_size               # Board geometry (cm, tiles)
//! ├── start_x/y/theta                # True starting pose (cm, degrees)
//! ├── physics_period_ms, random_seed # Simulation control
//! ├── DriveConfig                    # Wheel radius, track, slip
//! ├── ColorSensorConfig              # Downward reflectance sensor
//! └── UltrasonicConfig               # Forward range sensor
//! ```
//!
//! # Default Values
//!
//! | Parameter | Default | Source |
//! |-----------|---------|--------|
//! | tile | 30.48 cm | Competition board |
//! | board_size | 8 tiles | Competition board |
//! | wheel_radius | 2.1 cm | Measured |
//! | track | 9.71 cm | Calibrated |
//! | color offset | 15 cm | Sensor mount |
//! | line_width | 1.0 cm | Tape width |

use serde::Deserialize;

/// Drive train parameters
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Wheel radius (cm)
    #[serde(default = "default_wheel_radius")]
    pub wheel_radius: f64,

    /// Distance between wheel contact points (cm)
    #[serde(default = "default_track")]
    pub track: f64,

    /// Multiplicative wheel slip standard deviation (fraction)
    #[serde(default = "default_slip_stddev")]
    pub slip_stddev: f64,
}

fn default_wheel_radius() -> f64 {
    2.1
}
fn default_track() -> f64 {
    9.71
}
fn default_slip_stddev() -> f64 {
    0.01
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            wheel_radius: default_wheel_radius(),
            track: default_track(),
            slip_stddev: default_slip_stddev(),
        }
    }
}

/// Downward-facing color sensor
#[derive(Debug, Clone, Deserialize)]
pub struct ColorSensorConfig {
    /// Distance of the sensor behind the centre of rotation (cm)
    #[serde(default = "default_color_offset")]
    pub offset: f64,

    /// Width of the painted grid lines (cm)
    #[serde(default = "default_line_width")]
    pub line_width: f64,

    /// Reflectance over bare floor (percent)
    #[serde(default = "default_floor_reflectance")]
    pub floor_reflectance: f32,

    /// Reflectance over a grid line (percent)
    #[serde(default = "default_line_reflectance")]
    pub line_reflectance: f32,

    /// Reading noise standard deviation (percent)
    #[serde(default = "default_color_noise")]
    pub noise_stddev: f32,
}

fn default_color_offset() -> f64 {
    15.0
}
fn default_line_width() -> f64 {
    1.0
}
fn default_floor_reflectance() -> f32 {
    45.0
}
fn default_line_reflectance() -> f32 {
    8.0
}
fn default_color_noise() -> f32 {
    0.5
}

impl Default for ColorSensorConfig {
    fn default() -> Self {
        Self {
            offset: default_color_offset(),
            line_width: default_line_width(),
            floor_reflectance: default_floor_reflectance(),
            line_reflectance: default_line_reflectance(),
            noise_stddev: default_color_noise(),
        }
    }
}

/// Forward-facing ultrasonic range sensor
#[derive(Debug, Clone, Deserialize)]
pub struct UltrasonicConfig {
    /// Distance of the sensor ahead of the centre of rotation (cm)
    #[serde(default)]
    pub mount_offset: f64,

    /// Reading reported when no wall is in range (cm)
    #[serde(default = "default_max_range")]
    pub max_range: f32,

    /// Range noise standard deviation (cm)
    #[serde(default = "default_range_noise")]
    pub noise_stddev: f32,
}

fn default_max_range() -> f32 {
    255.0
}
fn default_range_noise() -> f32 {
    0.5
}

impl Default for UltrasonicConfig {
    fn default() -> Self {
        Self {
            mount_offset: 0.0,
            max_range: default_max_range(),
            noise_stddev: default_range_noise(),
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Tile edge length (cm)
    #[serde(default = "default_tile")]
    pub tile: f64,

    /// Board edge length in tiles; walls sit on the board border
    #[serde(default = "default_board_size")]
    pub board_size: u32,

    /// True starting X (cm)
    #[serde(default = "default_start")]
    pub start_x: f64,

    /// True starting Y (cm)
    #[serde(default = "default_start")]
    pub start_y: f64,

    /// True starting heading (degrees, 0 along +y, clockwise)
    #[serde(default = "default_start_theta")]
    pub start_theta: f64,

    /// Physics step period (milliseconds)
    #[serde(default = "default_physics_period")]
    pub physics_period_ms: u64,

    /// Noise seed, 0 = random each run
    #[serde(default = "default_seed")]
    pub random_seed: u64,

    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub color: ColorSensorConfig,

    #[serde(default)]
    pub ultrasonic: UltrasonicConfig,
}

fn default_tile() -> f64 {
    30.48
}
fn default_board_size() -> u32 {
    8
}
fn default_start() -> f64 {
    20.0
}
fn default_start_theta() -> f64 {
    160.0
}
fn default_physics_period() -> u64 {
    5
}
fn default_seed() -> u64 {
    42
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tile: default_tile(),
            board_size: default_board_size(),
            start_x: default_start(),
            start_y: default_start(),
            start_theta: default_start_theta(),
            physics_period_ms: default_physics_period(),
            random_seed: default_seed(),
            drive: DriveConfig::default(),
            color: ColorSensorConfig::default(),
            ultrasonic: UltrasonicConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Board edge length (cm)
    pub fn board_extent(&self) -> f64 {
        self.tile * self.board_size as f64
    }
}
