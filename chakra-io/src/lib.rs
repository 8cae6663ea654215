//! ChakraIO - Hardware abstraction library for the grid robot
//!
//! This library provides the motor and sensor seam used by the navigation
//! core, plus a simulated robot that implements it.
//!
//! ## Modules
//!
//! - [`drivers`]: `Motor` and `SampleSource` traits consumed by the core
//! - [`devices::mock`]: differential-drive simulation on a tiled board

pub mod devices;
pub mod drivers;
pub mod error;

// Re-export commonly used types
pub use drivers::{Motor, SampleSource};
pub use error::{Error, Result};
