//! Route planning over the zoned board.
//!
//! This module provides:
//! - Zone classification of board points and leg obstacle checks
//! - Recursive expansion of goal lists into axis-aligned legs

mod path;
mod zones;

pub use path::{
    close_shift, closest_intersection, remove_redundant_points, PathPlanner, PlannerConfig,
    RepeatWindow,
};
pub use zones::{Zone, ZoneMap};
