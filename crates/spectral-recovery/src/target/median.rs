//! Median recovery target.

use ndarray::Array1;

use super::{
    median_over_polygons, median_over_space, median_over_time, reduce_pixel_polygons,
    RecoveryTarget, TargetScale,
};
use crate::error::Result;
use crate::mask::ReferenceStack;
use crate::types::BandGrid;

/// Median over the reference years, optionally reduced over space.
///
/// Reductions run in order: time, then space (polygon scale only), then
/// `poly_id` when the reference has one. Every step ignores NaN, so the
/// result always holds a single target per band (polygon scale) or per band
/// and pixel (pixel scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MedianTarget {
    scale: TargetScale,
}

impl MedianTarget {
    pub fn new(scale: TargetScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> TargetScale {
        self.scale
    }

    /// Compute the target from a tight reference clip.
    pub fn compute(&self, reference: &ReferenceStack) -> Result<RecoveryTarget> {
        let bands = reference.bands().to_vec();
        let spatial_ref = reference.spatial_ref();

        tracing::debug!(
            scale = %self.scale,
            bands = bands.len(),
            poly_ids = ?reference.poly_ids(),
            "Median target"
        );

        match (reference, self.scale) {
            (ReferenceStack::Single(stack), TargetScale::Polygon) => {
                let values = median_over_space(&median_over_time(stack));
                Ok(RecoveryTarget::Polygon {
                    bands,
                    values,
                    spatial_ref,
                })
            }
            (ReferenceStack::Single(stack), TargetScale::Pixel) => Ok(RecoveryTarget::Pixel(
                BandGrid::like_stack(stack, median_over_time(stack)),
            )),
            (ReferenceStack::PerPolygon { clips, .. }, TargetScale::Polygon) => {
                let per_polygon: Vec<Array1<f64>> = clips
                    .iter()
                    .map(|clip| median_over_space(&median_over_time(&clip.stack)))
                    .collect();
                Ok(RecoveryTarget::Polygon {
                    values: median_over_polygons(&per_polygon, bands.len()),
                    bands,
                    spatial_ref,
                })
            }
            (
                ReferenceStack::PerPolygon {
                    clips,
                    window,
                    y,
                    x,
                },
                TargetScale::Pixel,
            ) => Ok(RecoveryTarget::Pixel(reduce_pixel_polygons(
                clips,
                *window,
                y,
                x,
                &bands,
                spatial_ref,
                median_over_time,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::PolygonClip;
    use crate::types::{GridWindow, RasterStack};
    use chrono::NaiveDate;
    use ndarray::{array, Array4};

    fn stack(data: Array4<f64>, y: Vec<f64>, x: Vec<f64>) -> RasterStack {
        let times = (0..data.dim().1)
            .map(|t| NaiveDate::from_ymd_opt(2000 + t as i32, 1, 1).unwrap())
            .collect();
        let bands = (0..data.dim().0).map(|b| format!("B{}", b)).collect();
        RasterStack::new(data, bands, times, y, x).unwrap()
    }

    /// 1 band, 3 years, 2x2 grid.
    fn reference() -> RasterStack {
        let data = array![[
            [[1.0, 2.0], [3.0, f64::NAN]],
            [[5.0, 6.0], [7.0, f64::NAN]],
            [[3.0, 4.0], [f64::NAN, f64::NAN]],
        ]];
        stack(data, vec![1.5, 0.5], vec![0.5, 1.5])
    }

    #[test]
    fn test_pixel_scale_is_time_median() {
        let target = MedianTarget::new(TargetScale::Pixel)
            .compute(&ReferenceStack::Single(reference()))
            .unwrap();
        let grid = target.as_grid().expect("pixel target");
        assert_eq!(grid.grid_shape(), (2, 2));
        assert_eq!(grid.get(0, 0, 0), Some(3.0));
        assert_eq!(grid.get(0, 0, 1), Some(4.0));
        // NaN skipped: median of 3 and 7.
        assert_eq!(grid.get(0, 1, 0), Some(5.0));
        // All NaN stays NaN.
        assert!(grid.get(0, 1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_polygon_scale_collapses_space() {
        let target = MedianTarget::new(TargetScale::Polygon)
            .compute(&ReferenceStack::Single(reference()))
            .unwrap();
        match target {
            RecoveryTarget::Polygon { bands, values, .. } => {
                assert_eq!(bands, vec!["B0".to_string()]);
                // Pixel medians 3, 4, 5 (and NaN): median 4.
                assert_eq!(values, array![4.0]);
            }
            other => panic!("expected polygon target, got {:?}", other),
        }
    }

    fn assert_same(a: &RecoveryTarget, b: &RecoveryTarget) {
        assert_eq!(a.bands(), b.bands());
        let (va, vb): (Vec<f64>, Vec<f64>) = match (a, b) {
            (RecoveryTarget::Pixel(ga), RecoveryTarget::Pixel(gb)) => (
                ga.data().iter().copied().collect(),
                gb.data().iter().copied().collect(),
            ),
            (
                RecoveryTarget::Polygon { values: pa, .. },
                RecoveryTarget::Polygon { values: pb, .. },
            ) => (pa.to_vec(), pb.to_vec()),
            _ => panic!("targets differ in scale: {:?} vs {:?}", a, b),
        };
        assert_eq!(va.len(), vb.len());
        for (x, y) in va.iter().zip(&vb) {
            assert!(x == y || (x.is_nan() && y.is_nan()), "{} != {}", x, y);
        }
    }

    #[test]
    fn test_duplicated_polygon_matches_single() {
        let clip = |id: &str| PolygonClip {
            id: id.to_string(),
            window: Some(GridWindow::new(0, 1, 0, 1)),
            stack: reference(),
        };
        let duplicated = ReferenceStack::PerPolygon {
            clips: vec![clip("a"), clip("b")],
            window: Some(GridWindow::new(0, 1, 0, 1)),
            y: vec![1.5, 0.5],
            x: vec![0.5, 1.5],
        };

        for scale in [TargetScale::Polygon, TargetScale::Pixel] {
            let method = MedianTarget::new(scale);
            let single = method.compute(&ReferenceStack::Single(reference())).unwrap();
            assert_same(&single, &method.compute(&duplicated).unwrap());
        }
    }

    #[test]
    fn test_multi_polygon_pixel_spans_union() {
        let west = stack(array![[[[1.0]], [[3.0]]]], vec![0.5], vec![0.5]);
        let east = stack(array![[[[10.0]], [[20.0]]]], vec![0.5], vec![2.5]);
        let multi = ReferenceStack::PerPolygon {
            clips: vec![
                PolygonClip {
                    id: "west".into(),
                    window: Some(GridWindow::new(0, 0, 0, 0)),
                    stack: west,
                },
                PolygonClip {
                    id: "east".into(),
                    window: Some(GridWindow::new(0, 0, 2, 2)),
                    stack: east,
                },
            ],
            window: Some(GridWindow::new(0, 0, 0, 2)),
            y: vec![0.5],
            x: vec![0.5, 1.5, 2.5],
        };

        let target = MedianTarget::new(TargetScale::Pixel).compute(&multi).unwrap();
        let grid = target.as_grid().unwrap();
        assert_eq!(grid.x(), &[0.5, 1.5, 2.5]);
        assert_eq!(grid.get(0, 0, 0), Some(2.0));
        assert!(grid.get(0, 0, 1).unwrap().is_nan());
        assert_eq!(grid.get(0, 0, 2), Some(15.0));

        let polygon = MedianTarget::new(TargetScale::Polygon).compute(&multi).unwrap();
        // Per-polygon medians 2 and 15: median 8.5.
        assert_eq!(polygon.value(0, 0, 0), 8.5);
    }
}
