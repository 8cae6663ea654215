//! Driver traits for the robot's actuators and sensors

mod motor;
mod sensor;

pub use motor::Motor;
pub use sensor::SampleSource;
