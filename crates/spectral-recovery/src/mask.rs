//! Spatial masking: resolving site polygons to the raster cells they cover.
//!
//! A cell belongs to a polygon when its centre coordinate lies inside the
//! polygon or on its boundary. Clipping crops the stack to the bounding
//! window of the covered cells and sets the uncovered cells of that window
//! to NaN, so the result's coordinates are a subset of the input's.

use std::collections::HashSet;

use geo::{BoundingRect, Intersects, Point, Polygon};
use ndarray::{s, Array2, Array4};

use crate::error::{RecoveryError, Result};
use crate::types::{GridWindow, RasterStack, SpatialRef};

/// A polygon with the identifier it carries along the `poly_id` axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePolygon {
    pub id: String,
    pub geometry: Polygon<f64>,
}

impl ReferencePolygon {
    pub fn new(id: impl Into<String>, geometry: Polygon<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// One or more polygons plus the inclusive reference window in years.
#[derive(Debug, Clone)]
pub struct Site {
    polygons: Vec<ReferencePolygon>,
    reference_start: i32,
    reference_end: i32,
}

impl Site {
    /// Create a site, validating the polygon set and reference window.
    pub fn new(
        polygons: Vec<ReferencePolygon>,
        reference_start: i32,
        reference_end: i32,
    ) -> Result<Self> {
        if polygons.is_empty() {
            return Err(RecoveryError::construction(
                "a site needs at least one polygon",
            ));
        }

        let mut ids = HashSet::with_capacity(polygons.len());
        for polygon in &polygons {
            if !ids.insert(polygon.id.as_str()) {
                return Err(RecoveryError::construction(format!(
                    "duplicate polygon id '{}'",
                    polygon.id
                )));
            }
        }

        if reference_start > reference_end {
            return Err(RecoveryError::construction(format!(
                "reference_start {} is after reference_end {}",
                reference_start, reference_end
            )));
        }

        Ok(Self {
            polygons,
            reference_start,
            reference_end,
        })
    }

    /// Create a single-polygon site.
    pub fn single(
        polygon: ReferencePolygon,
        reference_start: i32,
        reference_end: i32,
    ) -> Result<Self> {
        Self::new(vec![polygon], reference_start, reference_end)
    }

    pub fn polygons(&self) -> &[ReferencePolygon] {
        &self.polygons
    }

    pub fn reference_start(&self) -> i32 {
        self.reference_start
    }

    pub fn reference_end(&self) -> i32 {
        self.reference_end
    }

    /// Check if the site holds more than one polygon.
    pub fn is_multi(&self) -> bool {
        self.polygons.len() > 1
    }

    /// The polygon of a site that must hold exactly one.
    pub fn single_polygon(&self) -> Result<&ReferencePolygon> {
        match self.polygons.as_slice() {
            [only] => Ok(only),
            many => Err(RecoveryError::construction(format!(
                "expected a single polygon, site holds {}",
                many.len()
            ))),
        }
    }
}

/// A single polygon's clip of a stack.
#[derive(Debug, Clone)]
pub struct PolygonClip {
    /// Polygon identifier (`poly_id` coordinate).
    pub id: String,
    /// Clip window in the source grid, `None` when nothing is covered.
    pub window: Option<GridWindow>,
    /// The clipped, masked, time-restricted stack.
    pub stack: RasterStack,
}

/// A reference stack, possibly carrying a `poly_id` axis.
#[derive(Debug, Clone)]
pub enum ReferenceStack {
    /// A single clipped stack.
    Single(RasterStack),
    /// One clip per polygon. Entries may differ in extent; `window`, `y` and
    /// `x` describe the union grid the entries align on.
    PerPolygon {
        clips: Vec<PolygonClip>,
        window: Option<GridWindow>,
        y: Vec<f64>,
        x: Vec<f64>,
    },
}

impl ReferenceStack {
    /// Band labels shared by every entry.
    pub fn bands(&self) -> &[String] {
        match self {
            Self::Single(stack) => stack.bands(),
            Self::PerPolygon { clips, .. } => clips
                .first()
                .map(|clip| clip.stack.bands())
                .unwrap_or(&[]),
        }
    }

    /// Spatial reference of the source stack.
    pub fn spatial_ref(&self) -> SpatialRef {
        match self {
            Self::Single(stack) => stack.spatial_ref().clone(),
            Self::PerPolygon { clips, .. } => clips
                .first()
                .map(|clip| clip.stack.spatial_ref().clone())
                .unwrap_or_default(),
        }
    }

    /// Identifiers along the `poly_id` axis, if there is one.
    pub fn poly_ids(&self) -> Option<Vec<&str>> {
        match self {
            Self::Single(_) => None,
            Self::PerPolygon { clips, .. } => {
                Some(clips.iter().map(|clip| clip.id.as_str()).collect())
            }
        }
    }
}

/// Boolean mask over the full grid of the cells covered by `polygon`.
pub fn polygon_mask(stack: &RasterStack, polygon: &Polygon<f64>) -> Array2<bool> {
    let (rows, cols) = stack.grid_shape();
    let mut mask = Array2::from_elem((rows, cols), false);

    let Some(rect) = polygon.bounding_rect() else {
        return mask;
    };
    let (min, max) = (rect.min(), rect.max());

    for (row, &y) in stack.y().iter().enumerate() {
        if y < min.y || y > max.y {
            continue;
        }
        for (col, &x) in stack.x().iter().enumerate() {
            if x < min.x || x > max.x {
                continue;
            }
            mask[[row, col]] = polygon.intersects(&Point::new(x, y));
        }
    }

    mask
}

/// Boolean mask of the cells covered by any polygon of the site.
pub fn site_mask(stack: &RasterStack, site: &Site) -> Array2<bool> {
    let mut mask = Array2::from_elem(stack.grid_shape(), false);
    for polygon in site.polygons() {
        let covered = polygon_mask(stack, &polygon.geometry);
        mask.zip_mut_with(&covered, |m, &c| *m |= c);
    }
    mask
}

/// Bounding window of the `true` cells of a mask.
pub fn mask_window(mask: &Array2<bool>) -> Option<GridWindow> {
    let mut window: Option<GridWindow> = None;
    for ((row, col), &covered) in mask.indexed_iter() {
        if !covered {
            continue;
        }
        let cell = GridWindow::new(row, row, col, col);
        window = Some(match window {
            Some(w) => w.union(&cell),
            None => cell,
        });
    }
    window
}

/// Crop `stack` to `window` and set cells outside `mask` to NaN.
fn masked_subset(stack: &RasterStack, mask: &Array2<bool>, window: &GridWindow) -> RasterStack {
    let clipped = stack.subset(window);
    let mut data = clipped.data().clone();

    let local = mask.slice(s![window.row_range(), window.col_range()]);
    for ((row, col), &covered) in local.indexed_iter() {
        if !covered {
            data.slice_mut(s![.., .., row, col]).fill(f64::NAN);
        }
    }

    RasterStack::from_parts(
        data,
        clipped.bands().to_vec(),
        clipped.times().to_vec(),
        clipped.y().to_vec(),
        clipped.x().to_vec(),
        clipped.spatial_ref().clone(),
    )
}

/// A stack with the same bands and times as `stack` but no spatial cells.
fn spatially_empty(stack: &RasterStack) -> RasterStack {
    let (bands, times, _, _) = stack.shape();
    RasterStack::from_parts(
        Array4::zeros((bands, times, 0, 0)),
        stack.bands().to_vec(),
        stack.times().to_vec(),
        Vec::new(),
        Vec::new(),
        stack.spatial_ref().clone(),
    )
}

/// Clip a stack to the cells covered by `mask`.
///
/// Returns the clip window in the source grid alongside the clipped stack.
/// An empty mask yields `None` and a spatially empty stack.
pub fn clip_to_mask(stack: &RasterStack, mask: &Array2<bool>) -> (Option<GridWindow>, RasterStack) {
    match mask_window(mask) {
        Some(window) => (Some(window), masked_subset(stack, mask, &window)),
        None => (None, spatially_empty(stack)),
    }
}

/// Clip a stack to a single polygon.
pub fn clip_to_polygon(
    stack: &RasterStack,
    polygon: &Polygon<f64>,
) -> (Option<GridWindow>, RasterStack) {
    clip_to_mask(stack, &polygon_mask(stack, polygon))
}

/// Clip a stack to the site's polygons and restrict it to the reference window.
///
/// A single-polygon site yields [`ReferenceStack::Single`]; a multi-polygon
/// site yields one clip per polygon along the `poly_id` axis.
pub fn tight_reference_clip(stack: &RasterStack, site: &Site) -> ReferenceStack {
    let start = site.reference_start();
    let end = Some(site.reference_end());

    if !site.is_multi() {
        let polygon = &site.polygons()[0];
        let (window, clipped) = clip_to_polygon(stack, &polygon.geometry);
        if window.is_none() {
            tracing::warn!(poly_id = %polygon.id, "Polygon covers no raster cells");
        }
        tracing::debug!(
            poly_id = %polygon.id,
            window = ?window,
            reference_start = start,
            reference_end = site.reference_end(),
            "Tight reference clip"
        );
        return ReferenceStack::Single(clipped.select_years(start, end));
    }

    let clips: Vec<PolygonClip> = site
        .polygons()
        .iter()
        .map(|polygon| {
            let (window, clipped) = clip_to_polygon(stack, &polygon.geometry);
            if window.is_none() {
                tracing::warn!(poly_id = %polygon.id, "Polygon covers no raster cells");
            }
            PolygonClip {
                id: polygon.id.clone(),
                window,
                stack: clipped.select_years(start, end),
            }
        })
        .collect();

    let window = clips
        .iter()
        .filter_map(|clip| clip.window)
        .reduce(|a, b| a.union(&b));

    let (y, x) = match window {
        Some(w) => (
            stack.y()[w.row_range()].to_vec(),
            stack.x()[w.col_range()].to_vec(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    tracing::debug!(
        polygons = clips.len(),
        window = ?window,
        "Per-polygon reference clip"
    );

    ReferenceStack::PerPolygon {
        clips,
        window,
        y,
        x,
    }
}
