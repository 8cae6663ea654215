//! Error types for ChakraIO

use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Thread spawn or device I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking rotate did not reach its target
    #[error("{motor}: rotation not finished within {limit:?}")]
    MotorTimeout {
        motor: &'static str,
        limit: Duration,
    },

    /// Command argument outside what the motor accepts
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
