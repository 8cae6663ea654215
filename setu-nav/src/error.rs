//! Error types for SetuNav

use crate::geometry::Coordinate;
use crate::pollers::PollingMode;
use thiserror::Error;

/// SetuNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] chakra_io::Error),

    #[error("Thread error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A localisation sweep stopped waiting for its next detector event
    #[error("{sweep} sweep missed a detection: got {received} of {expected} events")]
    MissedDetection {
        sweep: &'static str,
        received: usize,
        expected: usize,
    },

    #[error("Routing failed: {0}")]
    Routing(#[from] RoutingError),

    /// A poller was started in a mode with no registered detector
    #[error("{poller} poller has no detector for mode {mode:?}")]
    UnroutedMode {
        poller: &'static str,
        mode: PollingMode,
    },

    #[error("Navigation requested before the robot was localised")]
    NotLocalised,
}

/// Waypoint expansion failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("start point {0} is not on passable ground")]
    StartUnreachable(Coordinate),

    #[error("waypoint {0} lies in the river or on a tower")]
    WaypointUnreachable(Coordinate),

    #[error("no obstacle-free route exists")]
    NoRoute,

    #[error("search budget exhausted after {expansions} expansions")]
    BudgetExhausted { expansions: usize },
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
