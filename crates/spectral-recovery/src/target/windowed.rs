//! Windowed recovery target: time median followed by an N x N focal mean.

use ndarray::{s, Array3, Zip};
use serde::{Deserialize, Serialize};

use super::{median_over_time, reduce_pixel_polygons, RecoveryTarget};
use crate::buffer::buffer_radius;
use crate::error::{RecoveryError, Result};
use crate::mask::ReferenceStack;
use crate::stats::nan_mean_count;
use crate::types::{BandGrid, RasterStack};

/// Focal window size and missing-data tolerance.
///
/// `n` is odd and at least 1. With `na_rm = false` a window yields a value
/// only when all `n * n` cells hold data; with `na_rm = true` one valid cell
/// is enough and the mean runs over the valid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowSpec")]
pub struct WindowSpec {
    n: usize,
    na_rm: bool,
}

#[derive(Deserialize)]
struct RawWindowSpec {
    #[serde(default = "default_window_size")]
    n: i64,
    #[serde(default)]
    na_rm: bool,
}

fn default_window_size() -> i64 {
    3
}

impl TryFrom<RawWindowSpec> for WindowSpec {
    type Error = RecoveryError;

    fn try_from(raw: RawWindowSpec) -> Result<Self> {
        WindowSpec::new(raw.n, raw.na_rm)
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self { n: 3, na_rm: false }
    }
}

impl WindowSpec {
    /// Create a window spec, rejecting even or non-positive sizes.
    pub fn new(n: i64, na_rm: bool) -> Result<Self> {
        if n < 1 {
            return Err(RecoveryError::construction(format!(
                "window size N must be >= 1 ({} provided)",
                n
            )));
        }
        if n % 2 == 0 {
            return Err(RecoveryError::construction(format!(
                "window size N must be odd ({} provided)",
                n
            )));
        }
        let n = usize::try_from(n)
            .map_err(|_| RecoveryError::construction(format!("window size {} too large", n)))?;
        Ok(Self { n, na_rm })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn na_rm(&self) -> bool {
        self.na_rm
    }

    /// Cells of context needed on each side of a pixel.
    pub fn radius(&self) -> usize {
        buffer_radius(self.n)
    }

    /// Minimum number of valid cells for a window to yield a value.
    pub fn min_valid(&self) -> usize {
        if self.na_rm {
            1
        } else {
            self.n * self.n
        }
    }
}

/// Centred N x N moving-window mean over the spatial axes of a
/// (band, y, x) grid.
///
/// Cells beyond the grid edge count as missing, so without `na_rm` every
/// pixel closer than the radius to the edge is NaN.
pub fn focal_mean(grid: &Array3<f64>, spec: &WindowSpec) -> Array3<f64> {
    let (_, rows, cols) = grid.dim();
    let radius = spec.radius();
    let min_valid = spec.min_valid();
    let mut out = Array3::from_elem(grid.dim(), f64::NAN);

    Zip::indexed(&mut out).par_for_each(|(band, row, col), value| {
        let r0 = row.saturating_sub(radius);
        let r1 = (row + radius).min(rows - 1);
        let c0 = col.saturating_sub(radius);
        let c1 = (col + radius).min(cols - 1);

        let cells = grid.slice(s![band, r0..=r1, c0..=c1]);
        let (mean, count) = nan_mean_count(cells.iter().copied());
        if count > 0 && count >= min_valid {
            *value = mean;
        }
    });

    out
}

/// Median over the reference years followed by a focal mean.
///
/// Expects a reference buffered by the window radius and returns the target
/// over that whole buffered extent; clipping back to the site is left to the
/// caller (see [`super::compute_recovery_target`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowedTarget {
    spec: WindowSpec,
}

impl WindowedTarget {
    /// Create a windowed target, validating the window size.
    pub fn new(n: i64, na_rm: bool) -> Result<Self> {
        Ok(Self {
            spec: WindowSpec::new(n, na_rm)?,
        })
    }

    pub fn from_spec(spec: WindowSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Compute the target from a buffered reference stack.
    pub fn compute(&self, reference: &ReferenceStack) -> Result<RecoveryTarget> {
        tracing::debug!(
            n = self.spec.n,
            na_rm = self.spec.na_rm,
            poly_ids = ?reference.poly_ids(),
            "Windowed target"
        );

        let windowed = |stack: &RasterStack| focal_mean(&median_over_time(stack), &self.spec);

        match reference {
            ReferenceStack::Single(stack) => Ok(RecoveryTarget::Pixel(BandGrid::like_stack(
                stack,
                windowed(stack),
            ))),
            ReferenceStack::PerPolygon {
                clips,
                window,
                y,
                x,
            } => Ok(RecoveryTarget::Pixel(reduce_pixel_polygons(
                clips,
                *window,
                y,
                x,
                reference.bands(),
                reference.spatial_ref(),
                windowed,
            )?)),
        }
    }
}
