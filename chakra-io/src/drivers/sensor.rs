//! Sensor sampling trait

use crate::error::Result;

/// A sensor that yields one scalar reading per call.
///
/// Readings are already unit-scaled: percent reflectance for the color
/// sensor, centimetres for the ultrasonic sensor.
pub trait SampleSource: Send {
    /// Fetch the latest sample
    fn fetch_sample(&mut self) -> Result<f32>;

    /// Short name for logs
    fn name(&self) -> &str {
        "sensor"
    }
}
