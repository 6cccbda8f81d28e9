//! Buffer planning for windowed statistics.
//!
//! A focal window of size N needs `(N - 1) / 2` cells of context around
//! every site cell. The planner grows the site's tight clip by that radius
//! and refuses, with per-edge overshoot magnitudes, when the grown window
//! leaves the raster. The window is never clamped to the raster extent.

use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result};
use crate::mask::{clip_to_mask, site_mask, Site};
use crate::types::{GridWindow, RasterStack};

/// Cells of padding each edge would need for a buffer to fit.
///
/// All zero means the buffer fits without padding. `back` is the
/// low-coordinate side of each axis: with `y` descending and `x` ascending,
/// `back_y` is past the last row and `back_x` before the first column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPlan {
    /// Overshoot past the last row.
    pub back_y: usize,
    /// Overshoot before the first row.
    pub front_y: usize,
    /// Overshoot before the first column.
    pub back_x: usize,
    /// Overshoot past the last column.
    pub front_x: usize,
}

impl BufferPlan {
    /// Check if the buffer fits inside the raster.
    pub fn fits(&self) -> bool {
        self.back_y == 0 && self.front_y == 0 && self.back_x == 0 && self.front_x == 0
    }
}

/// A buffered, time-restricted reference clip.
#[derive(Debug, Clone)]
pub struct BufferedClip {
    /// The tight clip window in the source grid.
    pub tight_window: GridWindow,
    /// The buffered window in the source grid.
    pub window: GridWindow,
    /// The buffered stack, restricted to the reference years.
    pub stack: RasterStack,
}

/// Buffer radius for a focal window of size `n`.
pub fn buffer_radius(n: usize) -> usize {
    n.saturating_sub(1) / 2
}

/// Locate a clip's coordinates within the full grid.
///
/// Uses coordinate search on the clip's first and last `y`/`x` labels rather
/// than polygon geometry, so the result is aligned to the source pixels.
pub fn locate_clip(full: &RasterStack, clip_y: &[f64], clip_x: &[f64]) -> Result<GridWindow> {
    let (Some(&y_first), Some(&y_last), Some(&x_first), Some(&x_last)) =
        (clip_y.first(), clip_y.last(), clip_x.first(), clip_x.last())
    else {
        return Err(RecoveryError::EmptyIntersection(
            "clip has no spatial cells".to_string(),
        ));
    };

    let row = |y: f64| {
        full.row_of(y).ok_or(RecoveryError::CoordinateLookup {
            axis: "y",
            value: y.to_string(),
        })
    };
    let col = |x: f64| {
        full.col_of(x).ok_or(RecoveryError::CoordinateLookup {
            axis: "x",
            value: x.to_string(),
        })
    };

    let (r0, r1) = (row(y_first)?, row(y_last)?);
    let (c0, c1) = (col(x_first)?, col(x_last)?);

    Ok(GridWindow::new(r0.min(r1), r0.max(r1), c0.min(c1), c0.max(c1)))
}

/// Grow `tight` by `radius` cells on every side within a `rows` x `cols` grid.
///
/// Fails with [`RecoveryError::BufferExceeded`] carrying the overshoot of
/// every edge when the grown window does not fit.
pub fn plan_buffer(
    tight: &GridWindow,
    rows: usize,
    cols: usize,
    radius: usize,
) -> Result<GridWindow> {
    let plan = BufferPlan {
        back_y: (tight.row_end + radius).saturating_sub(rows.saturating_sub(1)),
        front_y: radius.saturating_sub(tight.row_start),
        back_x: radius.saturating_sub(tight.col_start),
        front_x: (tight.col_end + radius).saturating_sub(cols.saturating_sub(1)),
    };

    if !plan.fits() {
        tracing::debug!(radius, plan = ?plan, "Buffer exceeds raster extent");
        return Err(RecoveryError::BufferExceeded { radius, plan });
    }

    Ok(GridWindow::new(
        tight.row_start - radius,
        tight.row_end + radius,
        tight.col_start - radius,
        tight.col_end + radius,
    ))
}

/// Clip `stack` to the site's polygons buffered by `radius` cells, then
/// restrict it to the site's reference window.
///
/// Cells in the buffer keep their observed values; only the spatial extent
/// grows. All polygons of a multi-polygon site share one buffered window.
pub fn buffered_reference_clip(
    stack: &RasterStack,
    site: &Site,
    radius: usize,
) -> Result<BufferedClip> {
    let mask = site_mask(stack, site);
    let (window, tight) = clip_to_mask(stack, &mask);
    if window.is_none() {
        return Err(RecoveryError::EmptyIntersection(format!(
            "{} polygon(s) cover no raster cells",
            site.polygons().len()
        )));
    }

    let tight_window = locate_clip(stack, tight.y(), tight.x())?;
    let (rows, cols) = stack.grid_shape();
    let buffered = plan_buffer(&tight_window, rows, cols, radius)?;

    tracing::debug!(
        radius,
        tight = ?tight_window,
        buffered = ?buffered,
        "Buffered reference clip"
    );

    Ok(BufferedClip {
        tight_window,
        window: buffered,
        stack: stack
            .subset(&buffered)
            .select_years(site.reference_start(), Some(site.reference_end())),
    })
}
