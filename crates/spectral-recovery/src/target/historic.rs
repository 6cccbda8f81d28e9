//! Historic-average recovery target.

use ndarray::{Array1, Axis};

use super::RecoveryTarget;
use crate::error::Result;
use crate::mask::ReferenceStack;
use crate::stats::nan_mean_count;
use crate::types::RasterStack;

/// Mean over the reference years and the whole clip, per band.
///
/// Time and space are reduced together, so every valid observation weighs
/// the same. With several polygons each polygon is averaged on its own and
/// the per-polygon means are then averaged. NaN is skipped throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoricAverageTarget;

impl HistoricAverageTarget {
    pub fn new() -> Self {
        Self
    }

    /// Compute the target from a tight reference clip.
    pub fn compute(&self, reference: &ReferenceStack) -> Result<RecoveryTarget> {
        let bands = reference.bands().to_vec();
        let spatial_ref = reference.spatial_ref();

        let values = match reference {
            ReferenceStack::Single(stack) => band_means(stack),
            ReferenceStack::PerPolygon { clips, .. } => {
                let per_polygon: Vec<Array1<f64>> =
                    clips.iter().map(|clip| band_means(&clip.stack)).collect();
                Array1::from_shape_fn(bands.len(), |b| {
                    nan_mean_count(
                        per_polygon
                            .iter()
                            .map(|values| values.get(b).copied().unwrap_or(f64::NAN)),
                    )
                    .0
                })
            }
        };

        tracing::debug!(
            bands = bands.len(),
            poly_ids = ?reference.poly_ids(),
            values = ?values,
            "Historic average target"
        );

        Ok(RecoveryTarget::Polygon {
            bands,
            values,
            spatial_ref,
        })
    }
}

/// NaN-ignoring mean over (time, y, x), per band.
fn band_means(stack: &RasterStack) -> Array1<f64> {
    stack
        .data()
        .axis_iter(Axis(0))
        .map(|band| nan_mean_count(band.iter().copied()).0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::PolygonClip;
    use crate::types::GridWindow;
    use chrono::NaiveDate;
    use ndarray::{array, Array4};

    fn stack(data: Array4<f64>, x: Vec<f64>) -> RasterStack {
        let times = (0..data.dim().1)
            .map(|t| NaiveDate::from_ymd_opt(2000 + t as i32, 1, 1).unwrap())
            .collect();
        let bands = (0..data.dim().0).map(|b| format!("B{}", b)).collect();
        RasterStack::new(data, bands, times, vec![0.5], x).unwrap()
    }

    #[test]
    fn test_mean_over_time_and_space() {
        // 2 bands, 2 years, 1x2 grid.
        let data = array![
            [[[1.0, 2.0]], [[3.0, f64::NAN]]],
            [[[10.0, 10.0]], [[40.0, 40.0]]],
        ];
        let target = HistoricAverageTarget::new()
            .compute(&ReferenceStack::Single(stack(data, vec![0.5, 1.5])))
            .unwrap();

        match target {
            RecoveryTarget::Polygon { bands, values, .. } => {
                assert_eq!(bands, vec!["B0".to_string(), "B1".to_string()]);
                assert_eq!(values, array![2.0, 25.0]);
            }
            other => panic!("expected polygon target, got {:?}", other),
        }
    }

    #[test]
    fn test_weighs_observations_not_pixel_means() {
        // Pixel 0 has two observations, pixel 1 has one.
        let data = array![[[[0.0, 9.0]], [[3.0, f64::NAN]]]];
        let target = HistoricAverageTarget::new()
            .compute(&ReferenceStack::Single(stack(data, vec![0.5, 1.5])))
            .unwrap();
        assert_eq!(target.value(0, 0, 0), 4.0);
    }

    #[test]
    fn test_all_nan_reference_is_nan() {
        let data = Array4::from_elem((1, 2, 1, 1), f64::NAN);
        let target = HistoricAverageTarget::new()
            .compute(&ReferenceStack::Single(stack(data, vec![0.5])))
            .unwrap();
        assert!(target.value(0, 0, 0).is_nan());
    }

    #[test]
    fn test_multi_polygon_averages_polygon_means() {
        let clip = |id: &str, data: Array4<f64>, col: usize| PolygonClip {
            id: id.to_string(),
            window: Some(GridWindow::new(0, 0, col, col)),
            stack: stack(data, vec![col as f64 + 0.5]),
        };
        let multi = ReferenceStack::PerPolygon {
            clips: vec![
                clip("west", array![[[[1.0]], [[3.0]]]], 0),
                clip("east", array![[[[10.0]], [[f64::NAN]]]], 2),
            ],
            window: Some(GridWindow::new(0, 0, 0, 2)),
            y: vec![0.5],
            x: vec![0.5, 1.5, 2.5],
        };

        let target = HistoricAverageTarget::new().compute(&multi).unwrap();
        // Polygon means 2 and 10.
        assert_eq!(target.value(0, 0, 0), 6.0);
        assert!(target.as_grid().is_none());
    }
}
