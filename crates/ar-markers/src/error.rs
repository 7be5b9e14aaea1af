//! Error taxonomy for the facade.
//!
//! Only one error is fatal: a session cannot start without its dictionary.
//! Everything at marker granularity is recovered locally and surfaced
//! through the per-frame report instead of aborting the frame.

use ar_markers_pose::PoseError;
use thiserror::Error;

/// Errors that abort session construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("marker dictionary `{name}` is not available")]
    DictionaryUnavailable { name: String },
    #[error("marker side length {side_length} is not a positive finite value")]
    InvalidSideLength { side_length: f64 },
}

/// Per-marker failures; the frame keeps going past them.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MarkerError {
    #[error("marker corners are malformed")]
    MalformedCorners,
    #[error("marker pose solve failed")]
    PoseSolveFailed,
}

impl From<PoseError> for MarkerError {
    fn from(e: PoseError) -> Self {
        match e {
            PoseError::MalformedCorners => MarkerError::MalformedCorners,
            PoseError::SolveFailed => MarkerError::PoseSolveFailed,
        }
    }
}
