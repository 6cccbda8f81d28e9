//! Recovery targets: the value each band (and optionally each pixel) is
//! expected to recover toward.
//!
//! Three strategies are available behind [`TargetStrategy`]:
//!
//! - [`MedianTarget`]: median over the reference years, at polygon or
//!   pixel scale.
//! - [`WindowedTarget`]: median over the reference years followed by an
//!   N x N focal mean.
//! - [`HistoricAverageTarget`]: mean over the reference years and the whole
//!   clip, one value per band.
//!
//! # Example
//!
//! ```ignore
//! use spectral_recovery::{compute_recovery_target, MedianTarget, TargetScale, TargetStrategy};
//!
//! let strategy = TargetStrategy::Median(MedianTarget::new(TargetScale::Pixel));
//! let target = compute_recovery_target(&stack, &site, &strategy)?;
//! ```

mod historic;
mod median;
mod windowed;

pub use historic::HistoricAverageTarget;
pub use median::MedianTarget;
pub use windowed::{focal_mean, WindowSpec, WindowedTarget};

use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array1, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::buffer::buffered_reference_clip;
use crate::error::{RecoveryError, Result};
use crate::mask::{site_mask, tight_reference_clip, PolygonClip, ReferenceStack, Site};
use crate::stats::nan_median;
use crate::types::{coords_match, BandGrid, GridWindow, RasterStack, SpatialRef};

/// Spatial scale of a median target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScale {
    /// One value per band, the median over the whole polygon.
    #[default]
    Polygon,
    /// One value per band per pixel.
    Pixel,
}

impl FromStr for TargetScale {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "polygon" => Ok(Self::Polygon),
            "pixel" => Ok(Self::Pixel),
            _ => Err(RecoveryError::domain_value(format!(
                "scale must be 'polygon' or 'pixel' ('{}' provided)",
                s
            ))),
        }
    }
}

impl fmt::Display for TargetScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polygon => write!(f, "polygon"),
            Self::Pixel => write!(f, "pixel"),
        }
    }
}

/// A recovery target, per band or per band and pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryTarget {
    /// One value per band.
    Polygon {
        bands: Vec<String>,
        values: Array1<f64>,
        spatial_ref: SpatialRef,
    },
    /// One value per band per pixel.
    Pixel(BandGrid),
}

impl RecoveryTarget {
    /// Create a per-band target.
    pub fn per_band(bands: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if bands.len() != values.len() {
            return Err(RecoveryError::shape_mismatch(
                format!("{} band values", bands.len()),
                format!("{} values", values.len()),
            ));
        }
        Ok(Self::Polygon {
            bands,
            values: Array1::from(values),
            spatial_ref: SpatialRef::default(),
        })
    }

    pub fn bands(&self) -> &[String] {
        match self {
            Self::Polygon { bands, .. } => bands,
            Self::Pixel(grid) => grid.bands(),
        }
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        match self {
            Self::Polygon { spatial_ref, .. } => spatial_ref,
            Self::Pixel(grid) => grid.spatial_ref(),
        }
    }

    /// The per-pixel grid of a pixel-scale target.
    pub fn as_grid(&self) -> Option<&BandGrid> {
        match self {
            Self::Pixel(grid) => Some(grid),
            Self::Polygon { .. } => None,
        }
    }

    /// Target value for a band index at a grid cell.
    pub fn value(&self, band: usize, row: usize, col: usize) -> f64 {
        match self {
            Self::Polygon { values, .. } => values.get(band).copied().unwrap_or(f64::NAN),
            Self::Pixel(grid) => grid.get(band, row, col).unwrap_or(f64::NAN),
        }
    }

    /// Check that this target can be applied to `stack`.
    ///
    /// Bands must match by label and order; a pixel target must also share
    /// the stack's grid shape and `y`/`x` coordinates.
    pub fn check_compatible(&self, stack: &RasterStack) -> Result<()> {
        if self.bands() != stack.bands() {
            return Err(RecoveryError::shape_mismatch(
                format!("target bands {:?}", stack.bands()),
                format!("{:?}", self.bands()),
            ));
        }
        if let Self::Pixel(grid) = self {
            if grid.grid_shape() != stack.grid_shape() {
                return Err(RecoveryError::shape_mismatch(
                    format!("target grid {:?}", stack.grid_shape()),
                    format!("{:?}", grid.grid_shape()),
                ));
            }
            if !coords_match(grid.y(), stack.y()) {
                return Err(RecoveryError::shape_mismatch(
                    format!("target y {:?}", stack.y()),
                    format!("{:?}", grid.y()),
                ));
            }
            if !coords_match(grid.x(), stack.x()) {
                return Err(RecoveryError::shape_mismatch(
                    format!("target x {:?}", stack.x()),
                    format!("{:?}", grid.x()),
                ));
            }
        }
        Ok(())
    }
}

/// A recovery target strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStrategy {
    Median(MedianTarget),
    Windowed(WindowedTarget),
    HistoricAverage(HistoricAverageTarget),
}

impl TargetStrategy {
    /// Compute the target from a reference stack.
    pub fn compute(&self, reference: &ReferenceStack) -> Result<RecoveryTarget> {
        match self {
            Self::Median(method) => method.compute(reference),
            Self::Windowed(method) => method.compute(reference),
            Self::HistoricAverage(method) => method.compute(reference),
        }
    }

    /// Cells of spatial context the strategy needs around the site.
    pub fn buffer_radius(&self) -> usize {
        match self {
            Self::Median(_) | Self::HistoricAverage(_) => 0,
            Self::Windowed(method) => method.spec().radius(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Median(_) => "median",
            Self::Windowed(_) => "windowed",
            Self::HistoricAverage(_) => "mean",
        }
    }
}

/// Compute a site's recovery target from a full stack.
///
/// Fails with [`RecoveryError::CoordinateLookup`] on the `time` axis when
/// the stack has no observation in the reference window.
///
/// The median and historic-average strategies read a tight clip of the
/// site's polygons. The windowed strategy reads a clip buffered by the window radius (failing if
/// the buffer leaves the raster), then clips its result back to the site,
/// with cells outside every polygon set to NaN.
pub fn compute_recovery_target(
    stack: &RasterStack,
    site: &Site,
    strategy: &TargetStrategy,
) -> Result<RecoveryTarget> {
    tracing::debug!(
        strategy = strategy.name(),
        polygons = site.polygons().len(),
        reference_start = site.reference_start(),
        reference_end = site.reference_end(),
        "Computing recovery target"
    );

    if stack
        .year_range(site.reference_start(), Some(site.reference_end()))
        .is_empty()
    {
        return Err(RecoveryError::CoordinateLookup {
            axis: "time",
            value: format!("{}..={}", site.reference_start(), site.reference_end()),
        });
    }

    match strategy {
        TargetStrategy::Median(_) | TargetStrategy::HistoricAverage(_) => {
            strategy.compute(&tight_reference_clip(stack, site))
        }
        TargetStrategy::Windowed(_) => {
            let clip = buffered_reference_clip(stack, site, strategy.buffer_radius())?;
            let buffered = strategy.compute(&ReferenceStack::Single(clip.stack))?;
            let grid = match buffered {
                RecoveryTarget::Pixel(grid) => grid,
                other => return Ok(other),
            };

            let local = GridWindow::new(
                clip.tight_window.row_start - clip.window.row_start,
                clip.tight_window.row_end - clip.window.row_start,
                clip.tight_window.col_start - clip.window.col_start,
                clip.tight_window.col_end - clip.window.col_start,
            );
            let tight = grid.subset(&local);
            let (bands, y, x) = (tight.bands().to_vec(), tight.y().to_vec(), tight.x().to_vec());
            let spatial_ref = tight.spatial_ref().clone();
            let mask = site_mask(stack, site);
            let mut data = tight.into_data();
            for ((row, col), &covered) in mask
                .slice(s![clip.tight_window.row_range(), clip.tight_window.col_range()])
                .indexed_iter()
            {
                if !covered {
                    data.slice_mut(s![.., row, col]).fill(f64::NAN);
                }
            }

            Ok(RecoveryTarget::Pixel(BandGrid::new(
                data,
                bands,
                y,
                x,
                spatial_ref,
            )?))
        }
    }
}

/// NaN-ignoring median over the time axis, per (band, y, x).
pub(crate) fn median_over_time(stack: &RasterStack) -> Array3<f64> {
    Zip::from(stack.data().lanes(Axis(1)))
        .par_map_collect(|series| nan_median(series.iter().copied()))
}

/// NaN-ignoring median over the spatial axes, per band.
pub(crate) fn median_over_space(grid: &Array3<f64>) -> Array1<f64> {
    grid.outer_iter()
        .map(|band| nan_median(band.iter().copied()))
        .collect()
}

/// NaN-ignoring median across polygons, per band.
pub(crate) fn median_over_polygons(per_polygon: &[Array1<f64>], bands: usize) -> Array1<f64> {
    Array1::from_shape_fn(bands, |b| {
        nan_median(
            per_polygon
                .iter()
                .map(|values| values.get(b).copied().unwrap_or(f64::NAN)),
        )
    })
}

/// NaN-ignoring median across per-polygon grids aligned on a union window.
///
/// Each part covers its own window of the source grid. A union cell takes
/// the median of the parts covering it; cells no part covers are NaN.
pub(crate) fn align_and_median(
    parts: &[(GridWindow, Array3<f64>)],
    union: &GridWindow,
    bands: usize,
) -> Array3<f64> {
    let mut out = Array3::from_elem((bands, union.rows(), union.cols()), f64::NAN);

    Zip::indexed(&mut out).par_for_each(|(b, row, col), value| {
        let (src_row, src_col) = (union.row_start + row, union.col_start + col);
        *value = nan_median(parts.iter().filter_map(|(window, grid)| {
            window.contains(src_row, src_col).then(|| {
                grid[[b, src_row - window.row_start, src_col - window.col_start]]
            })
        }));
    });

    out
}

/// Reduce a per-polygon reference stack to a pixel grid on the union window,
/// applying `per_clip` to each polygon's stack first.
pub(crate) fn reduce_pixel_polygons<F>(
    clips: &[PolygonClip],
    window: Option<GridWindow>,
    y: &[f64],
    x: &[f64],
    bands: &[String],
    spatial_ref: SpatialRef,
    per_clip: F,
) -> Result<BandGrid>
where
    F: Fn(&RasterStack) -> Array3<f64>,
{
    let data = match window {
        Some(union) => {
            let parts: Vec<(GridWindow, Array3<f64>)> = clips
                .iter()
                .filter_map(|clip| clip.window.map(|w| (w, per_clip(&clip.stack))))
                .collect();
            align_and_median(&parts, &union, bands.len())
        }
        None => Array3::from_elem((bands.len(), 0, 0), f64::NAN),
    };

    BandGrid::new(data, bands.to_vec(), y.to_vec(), x.to_vec(), spatial_ref)
}
