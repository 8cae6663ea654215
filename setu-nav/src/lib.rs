//! SetuNav - Pose estimation, localisation and route planning for a grid robot
//!
//! The robot drives on a tiled board split by a river into two land zones
//! joined by a bridge. This crate keeps its pose by dead reckoning, corrects
//! it with in-place sensor sweeps, and drives goal lists as axis-aligned legs
//! that never touch the river or a tower.
//!
//! ## Threads
//!
//! - **Odometer** (~15 ms): integrates wheel tachometers into the pose
//! - **Pollers** (10-40 ms, on demand): feed sensor samples to detectors
//! - **Caller**: localisation sweeps and the travel loop
//!
//! Hardware arrives through the [`chakra_io::Motor`] and
//! [`chakra_io::SampleSource`] traits; nothing is global.

pub mod config;
pub mod controller;
pub mod detectors;
pub mod error;
pub mod geometry;
pub mod localisation;
pub mod navigation;
pub mod odometer;
pub mod planning;
pub mod pollers;
pub mod utils;

// Re-export commonly used types
pub use config::SetuConfig;
pub use controller::{ControllerState, NavigationController};
pub use error::{NavError, Result, RoutingError};
pub use geometry::Coordinate;
pub use localisation::{Localisation, LocalisationState};
pub use navigation::Navigation;
pub use odometer::{Odometer, Pose};
pub use planning::{PathPlanner, PlannerConfig, Zone, ZoneMap};
pub use pollers::{Poller, PollingMode};
