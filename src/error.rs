//! Errors that abort a trajectory compilation.
//!
//! Structural problems with the input and failures to persist the artifact are errors.
//! Numerical trouble (non-converging IK, large tracking errors) is never an error; it is
//! collected in the [`CompileReport`](crate::diagnostics::CompileReport) instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::parameter_error::ParameterError;

/// Result alias used across the crate.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Waypoint with wrong field count, non-positive duration or a duration too short
    /// to produce a single sample.
    #[error("malformed waypoint{}: {reason}", index_suffix(.index))]
    MalformedWaypoint {
        /// Index of the waypoint or input row, when known.
        index: Option<usize>,
        reason: String,
    },

    /// Orientation that is neither 3 Euler angles nor a 4 component quaternion, or a
    /// quaternion that cannot be normalized.
    #[error("invalid orientation: expected 3 (Euler) or 4 (quaternion) components, found {found}")]
    InvalidOrientation { found: usize },

    /// The trajectory artifact could not be written. No partial artifact is left behind.
    #[error("failed to write trajectory artifact {}: {source}", path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Geometry or configuration rejected before the run started.
    #[error("invalid configuration: {0}")]
    Parameter(#[from] ParameterError),

    /// The caller stopped the run between frames. Nothing has been written.
    #[error("compilation aborted before frame {frame}")]
    Aborted { frame: usize },
}

fn index_suffix(index: &Option<usize>) -> String {
    index.map(|i| format!(" {}", i)).unwrap_or_default()
}

impl CompileError {
    pub fn malformed(index: Option<usize>, reason: impl Into<String>) -> Self {
        CompileError::MalformedWaypoint { index, reason: reason.into() }
    }

    /// Attaches the waypoint index to a malformed waypoint error that does not have one yet.
    pub fn at_index(self, index: usize) -> Self {
        match self {
            CompileError::MalformedWaypoint { index: None, reason } =>
                CompileError::MalformedWaypoint { index: Some(index), reason },
            other => other,
        }
    }
}
