//! Error types.
//!
//! Nothing the engine does at runtime is fatal. Sensor problems surface as
//! `SampleError` and are dropped by the caller; configuration problems are
//! caught once, when the engine is built.

use std::path::PathBuf;

use thiserror::Error;

/// A sensor sample that cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleError {
    /// The platform delivered the event without this axis.
    #[error("sample is missing axis `{0}`")]
    MissingAxis(&'static str),

    /// The axis is NaN or infinite.
    #[error("sample axis `{0}` is not finite")]
    NonFinite(&'static str),
}

/// An engine configuration that would break an invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{field}` must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("`{field}` must lie in the open interval (0, 1), got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("shake threshold {shake} must exceed movement threshold {movement}")]
    ThresholdOrder { movement: f32, shake: f32 },

    #[error("sleepy delay range [{min_ms}, {max_ms}) is empty")]
    EmptyDelayRange { min_ms: u64, max_ms: u64 },

    #[error("idle pattern catalog is empty")]
    EmptyCatalog,

    #[error("idle sequence `{0}` has no waypoints")]
    EmptySequence(String),

    #[error("waypoint {index} of `{sequence}` has a zero hold duration")]
    ZeroHold { sequence: String, index: usize },

    #[error("waypoint {index} of `{sequence}` lies outside ±{bound}")]
    WaypointOutOfBounds {
        sequence: String,
        index: usize,
        bound: f32,
    },
}

/// Top-level error for loading configuration and running the simulator.
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = GazeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_error_messages() {
        assert_eq!(
            SampleError::MissingAxis("x").to_string(),
            "sample is missing axis `x`"
        );
        assert_eq!(
            SampleError::NonFinite("gamma").to_string(),
            "sample axis `gamma` is not finite"
        );
    }

    #[test]
    fn test_config_error_wraps_into_gaze_error() {
        let err: GazeError = ConfigError::EmptyCatalog.into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: idle pattern catalog is empty"
        );
    }
}
