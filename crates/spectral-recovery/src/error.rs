//! Error types for recovery target and metric computation.

use thiserror::Error;

use crate::buffer::BufferPlan;

/// Errors that can occur while computing recovery targets or metrics.
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// A value object (window spec, site, config) was built with invalid input.
    #[error("invalid construction: {0}")]
    Construction(String),

    /// A raster stack violates its shape or coordinate invariants.
    #[error("invalid raster stack: {0}")]
    InvalidStack(String),

    /// The requested buffer does not fit inside the raster extent.
    #[error(
        "buffer of {radius} cells exceeds raster extent \
         (overshoot: back_y={}, front_y={}, back_x={}, front_x={})",
        plan.back_y, plan.front_y, plan.back_x, plan.front_x
    )]
    BufferExceeded {
        radius: usize,
        plan: BufferPlan,
    },

    /// A required exact coordinate is absent from the stack.
    #[error("{axis} coordinate {value} not found in stack")]
    CoordinateLookup {
        axis: &'static str,
        value: String,
    },

    /// An unsupported value for an enumerated option.
    #[error("unsupported value: {0}")]
    DomainValue(String),

    /// Two tensors that must share bands or grid do not.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: String,
        actual: String,
    },

    /// The site does not cover any cell of the raster.
    #[error("site does not intersect raster: {0}")]
    EmptyIntersection(String),
}

impl RecoveryError {
    /// Create a Construction error.
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    /// Create an InvalidStack error.
    pub fn invalid_stack(msg: impl Into<String>) -> Self {
        Self::InvalidStack(msg.into())
    }

    /// Create a CoordinateLookup error on the time axis.
    pub fn missing_time(year: i32) -> Self {
        Self::CoordinateLookup {
            axis: "time",
            value: year.to_string(),
        }
    }

    /// Create a DomainValue error.
    pub fn domain_value(msg: impl Into<String>) -> Self {
        Self::DomainValue(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<serde_json::Error> for RecoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Construction(err.to_string())
    }
}

/// Result type for recovery operations.
pub type Result<T> = std::result::Result<T, RecoveryError>;
