//! Core types: the band x time x y x x raster stack and its 3-D results.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{Datelike, NaiveDate};
use ndarray::{s, Array3, Array4, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result};

/// Relative tolerance used when matching spatial coordinates.
const COORD_TOLERANCE: f64 = 1e-9;

/// Spatial reference metadata carried unchanged from inputs to results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialRef {
    /// CRS identifier (e.g. "EPSG:32610").
    pub crs: Option<String>,
}

impl SpatialRef {
    pub fn new(crs: impl Into<String>) -> Self {
        Self {
            crs: Some(crs.into()),
        }
    }
}

/// An inclusive rectangle of row/column indices in some parent grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl GridWindow {
    /// Create a window. `row_end` and `col_end` are inclusive.
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// Number of rows covered.
    pub fn rows(&self) -> usize {
        self.row_end - self.row_start + 1
    }

    /// Number of columns covered.
    pub fn cols(&self) -> usize {
        self.col_end - self.col_start + 1
    }

    pub fn row_range(&self) -> Range<usize> {
        self.row_start..self.row_end + 1
    }

    pub fn col_range(&self) -> Range<usize> {
        self.col_start..self.col_end + 1
    }

    /// Smallest window covering both windows.
    pub fn union(&self, other: &GridWindow) -> GridWindow {
        GridWindow {
            row_start: self.row_start.min(other.row_start),
            row_end: self.row_end.max(other.row_end),
            col_start: self.col_start.min(other.col_start),
            col_end: self.col_end.max(other.col_end),
        }
    }

    /// Check if a parent-grid cell lies in this window.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row <= self.row_end && col >= self.col_start && col <= self.col_end
    }
}

/// Find the index of `value` in a monotonic coordinate axis.
///
/// Works for ascending and descending axes (rasters usually store `y`
/// descending). Returns `None` when no coordinate matches within tolerance.
pub fn search_coord(coords: &[f64], value: f64) -> Option<usize> {
    if coords.is_empty() || value.is_nan() {
        return None;
    }

    let descending = coords.len() > 1 && coords[0] > coords[coords.len() - 1];
    let idx = if descending {
        coords.partition_point(|&c| c > value)
    } else {
        coords.partition_point(|&c| c < value)
    };

    let tolerance = COORD_TOLERANCE * value.abs().max(1.0);
    [idx.checked_sub(1), Some(idx)]
        .into_iter()
        .flatten()
        .filter(|&i| i < coords.len())
        .find(|&i| (coords[i] - value).abs() <= tolerance)
}

/// Check that two coordinate axes hold the same labels within tolerance.
pub fn coords_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(&u, &v)| {
            (u - v).abs() <= COORD_TOLERANCE * u.abs().max(v.abs()).max(1.0)
        })
}

/// A 4-D observation tensor indexed by (band, time, y, x).
///
/// Missing observations are NaN. The stack is read-only to every engine in
/// this crate; operations return freshly allocated stacks or grids.
#[derive(Debug, Clone)]
pub struct RasterStack {
    data: Array4<f64>,
    bands: Vec<String>,
    times: Vec<NaiveDate>,
    y: Vec<f64>,
    x: Vec<f64>,
    spatial_ref: SpatialRef,
}

impl RasterStack {
    /// Create a stack, validating shape and coordinate invariants.
    pub fn new(
        data: Array4<f64>,
        bands: Vec<String>,
        times: Vec<NaiveDate>,
        y: Vec<f64>,
        x: Vec<f64>,
    ) -> Result<Self> {
        let expected = (bands.len(), times.len(), y.len(), x.len());
        if data.dim() != expected {
            return Err(RecoveryError::invalid_stack(format!(
                "data shape {:?} does not match coordinates (band, time, y, x) = {:?}",
                data.dim(),
                expected
            )));
        }

        let mut seen = HashSet::with_capacity(bands.len());
        for band in &bands {
            if !seen.insert(band.as_str()) {
                return Err(RecoveryError::invalid_stack(format!(
                    "duplicate band label '{}'",
                    band
                )));
            }
        }

        if let Some(pair) = times.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(RecoveryError::invalid_stack(format!(
                "time axis must be strictly increasing ({} followed by {})",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            data,
            bands,
            times,
            y,
            x,
            spatial_ref: SpatialRef::default(),
        })
    }

    /// Attach spatial reference metadata.
    pub fn with_spatial_ref(mut self, spatial_ref: SpatialRef) -> Self {
        self.spatial_ref = spatial_ref;
        self
    }

    /// Build a stack from parts already known to be consistent.
    pub(crate) fn from_parts(
        data: Array4<f64>,
        bands: Vec<String>,
        times: Vec<NaiveDate>,
        y: Vec<f64>,
        x: Vec<f64>,
        spatial_ref: SpatialRef,
    ) -> Self {
        debug_assert_eq!(data.dim(), (bands.len(), times.len(), y.len(), x.len()));
        Self {
            data,
            bands,
            times,
            y,
            x,
            spatial_ref,
        }
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        &self.spatial_ref
    }

    /// Shape as (bands, times, rows, cols).
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    /// Number of (rows, cols) in the spatial grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// Check if the stack has no spatial cells.
    pub fn is_spatially_empty(&self) -> bool {
        self.y.is_empty() || self.x.is_empty()
    }

    /// Index of the single time coordinate falling in `year`.
    ///
    /// Fails with a coordinate lookup error if the year is absent or holds
    /// more than one observation.
    pub fn time_index(&self, year: i32) -> Result<usize> {
        let mut matches = self
            .times
            .iter()
            .enumerate()
            .filter(|(_, t)| t.year() == year)
            .map(|(i, _)| i);

        match (matches.next(), matches.next()) {
            (Some(idx), None) => Ok(idx),
            (Some(_), Some(_)) => Err(RecoveryError::CoordinateLookup {
                axis: "time",
                value: format!("{} (ambiguous: several observations)", year),
            }),
            (None, _) => Err(RecoveryError::missing_time(year)),
        }
    }

    /// Contiguous range of time indices whose year lies in `[start, end]`.
    ///
    /// `end = None` extends the range through the last observation.
    pub fn year_range(&self, start: i32, end: Option<i32>) -> Range<usize> {
        let first = self.times.partition_point(|t| t.year() < start);
        let last = match end {
            Some(end) => self.times.partition_point(|t| t.year() <= end),
            None => self.times.len(),
        };
        first..last.max(first)
    }

    /// Restrict the time axis to years in `[start, end]` inclusive.
    pub fn select_years(&self, start: i32, end: Option<i32>) -> RasterStack {
        let range = self.year_range(start, end);
        RasterStack::from_parts(
            self.data.slice(s![.., range.clone(), .., ..]).to_owned(),
            self.bands.clone(),
            self.times[range].to_vec(),
            self.y.clone(),
            self.x.clone(),
            self.spatial_ref.clone(),
        )
    }

    /// The (band, y, x) slice observed in `year`.
    pub fn year_slice(&self, year: i32) -> Result<ArrayView3<'_, f64>> {
        let idx = self.time_index(year)?;
        Ok(self.data.index_axis(Axis(1), idx))
    }

    /// Spatial subset covering `window` (indices relative to this stack).
    pub fn subset(&self, window: &GridWindow) -> RasterStack {
        let rows = window.row_range();
        let cols = window.col_range();
        RasterStack::from_parts(
            self.data
                .slice(s![.., .., rows.clone(), cols.clone()])
                .to_owned(),
            self.bands.clone(),
            self.times.clone(),
            self.y[rows].to_vec(),
            self.x[cols].to_vec(),
            self.spatial_ref.clone(),
        )
    }

    /// Row index of an exact `y` coordinate.
    pub fn row_of(&self, y: f64) -> Option<usize> {
        search_coord(&self.y, y)
    }

    /// Column index of an exact `x` coordinate.
    pub fn col_of(&self, x: f64) -> Option<usize> {
        search_coord(&self.x, x)
    }
}

/// A (band, y, x) raster: the shape of every metric result and of
/// pixel-scale recovery targets.
#[derive(Debug, Clone, PartialEq)]
pub struct BandGrid {
    data: Array3<f64>,
    bands: Vec<String>,
    y: Vec<f64>,
    x: Vec<f64>,
    spatial_ref: SpatialRef,
}

impl BandGrid {
    /// Create a grid, validating that data and coordinates agree.
    pub fn new(
        data: Array3<f64>,
        bands: Vec<String>,
        y: Vec<f64>,
        x: Vec<f64>,
        spatial_ref: SpatialRef,
    ) -> Result<Self> {
        let expected = (bands.len(), y.len(), x.len());
        if data.dim() != expected {
            return Err(RecoveryError::shape_mismatch(
                format!("{:?}", expected),
                format!("{:?}", data.dim()),
            ));
        }
        Ok(Self {
            data,
            bands,
            y,
            x,
            spatial_ref,
        })
    }

    /// Build a grid carrying the bands, coordinates and reference of `stack`.
    pub(crate) fn like_stack(stack: &RasterStack, data: Array3<f64>) -> Self {
        debug_assert_eq!(
            data.dim(),
            (stack.bands.len(), stack.y.len(), stack.x.len())
        );
        Self {
            data,
            bands: stack.bands.clone(),
            y: stack.y.clone(),
            x: stack.x.clone(),
            spatial_ref: stack.spatial_ref.clone(),
        }
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        &self.spatial_ref
    }

    /// Number of (rows, cols) in the spatial grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// Get the value at a band index and grid cell.
    pub fn get(&self, band: usize, row: usize, col: usize) -> Option<f64> {
        self.data.get((band, row, col)).copied()
    }

    /// The 2-D grid of a named band.
    pub fn band(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        let idx = self.bands.iter().position(|b| b == name)?;
        Some(self.data.index_axis(Axis(0), idx))
    }

    /// Spatial subset covering `window` (indices relative to this grid).
    pub fn subset(&self, window: &GridWindow) -> BandGrid {
        let rows = window.row_range();
        let cols = window.col_range();
        BandGrid {
            data: self.data.slice(s![.., rows.clone(), cols.clone()]).to_owned(),
            bands: self.bands.clone(),
            y: self.y[rows].to_vec(),
            x: self.x[cols].to_vec(),
            spatial_ref: self.spatial_ref.clone(),
        }
    }
}
