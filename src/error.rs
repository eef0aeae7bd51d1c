use thiserror::Error;

/// Rejected session parameters.
///
/// Raised when a filter, deduplicator or alert controller is constructed,
/// never while frames are being processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("alert interval must be at least 1 (got {0})")]
    InvalidAlertInterval(i64),
    #[error("distance threshold must be a positive finite number (got {0})")]
    InvalidDistanceThreshold(f64),
    #[error("minimum area must be a non-negative finite number (got {0})")]
    InvalidMinArea(f64),
    #[error("aspect bounds must satisfy 0 <= min <= max (got {min}..{max})")]
    InvalidAspectBounds { min: f64, max: f64 },
    #[error("confidence floor must lie in [0, 1] (got {0})")]
    InvalidConfidence(f32),
}
