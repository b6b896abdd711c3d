use thiserror::Error;

use crate::measurement::MeasurementError;

/// Errors raised at the edges of the core (config files, sensor packets).
///
/// Tracking and animation never fail; they return `Option` or neutral values.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("malformed heart rate measurement: {0}")]
    Measurement(#[from] MeasurementError),
}

pub type Result<T> = std::result::Result<T, Error>;
