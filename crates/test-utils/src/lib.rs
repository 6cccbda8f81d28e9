//! Shared test utilities for the spectral-recovery workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic time axes, coordinates and stack arrays
//! - Canonical recovery series with known metric values
//! - NaN-aware float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{annual_dates, fixtures, assert_nan_eq};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Float equality where two NaNs compare equal.
pub fn nan_eq(left: f64, right: f64) -> bool {
    left == right || (left.is_nan() && right.is_nan())
}

/// Macro for float equality that treats NaN as equal to NaN.
///
/// Metric and target outputs mark "no value" with NaN, so plain `assert_eq!`
/// cannot compare them.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_nan_eq;
///
/// assert_nan_eq!(f64::NAN, f64::NAN); // passes
/// assert_nan_eq!(1.0, f64::NAN);      // fails
/// ```
#[macro_export]
macro_rules! assert_nan_eq {
    ($left:expr, $right:expr) => {{
        let left: f64 = $left;
        let right: f64 = $right;
        if !$crate::nan_eq(left, right) {
            panic!(
                "assertion failed: `(left == right)` (NaN-aware)\n  left: `{:?}`,\n right: `{:?}`",
                left, right
            );
        }
    }};
}

/// Macro for element-wise NaN-aware equality of two float sequences.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_all_nan_eq;
///
/// assert_all_nan_eq!(grid.iter().copied(), [1.0, f64::NAN]);
/// ```
#[macro_export]
macro_rules! assert_all_nan_eq {
    ($left:expr, $right:expr) => {{
        let left: Vec<f64> = $left.into_iter().collect();
        let right: Vec<f64> = $right.into_iter().collect();
        assert_eq!(left.len(), right.len(), "length mismatch: {:?} vs {:?}", left, right);
        for (i, (l, r)) in left.iter().zip(&right).enumerate() {
            if !$crate::nan_eq(*l, *r) {
                panic!(
                    "assertion failed at index {}: `(left == right)` (NaN-aware)\n  left: `{:?}`,\n right: `{:?}`",
                    i, left, right
                );
            }
        }
    }};
}
