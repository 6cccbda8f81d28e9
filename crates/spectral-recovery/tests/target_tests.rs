//! Integration tests for site-level recovery target computation.
//!
//! All stacks live on the 5x5 unit grid `grid::SMALL` with values
//! `time * 100 + row * 10 + col`, so the median of two consecutive years is
//! `row * 10 + col + 50`.

use geo::{LineString, Polygon};
use spectral_recovery::{
    compute_recovery_target, BufferPlan, HistoricAverageTarget, MedianTarget, RasterStack,
    RecoveryError, RecoveryTarget, ReferencePolygon, Site, TargetScale, TargetStrategy,
    WindowedTarget,
};
use test_utils::{annual_dates, assert_all_nan_eq, create_index_stack, grid::SMALL};

fn index_stack() -> RasterStack {
    RasterStack::new(
        create_index_stack(1, 3, SMALL.rows, SMALL.cols),
        vec!["NBR".to_string()],
        annual_dates(2000, 3),
        SMALL.y(),
        SMALL.x(),
    )
    .unwrap()
}

fn cells(id: &str, rows: (usize, usize), cols: (usize, usize)) -> ReferencePolygon {
    let ring = SMALL.cell_rect(rows, cols).to_vec();
    ReferencePolygon::new(id, Polygon::new(LineString::from(ring), vec![]))
}

fn site(polygons: Vec<ReferencePolygon>) -> Site {
    Site::new(polygons, 2000, 2001).unwrap()
}

fn median(scale: TargetScale) -> TargetStrategy {
    TargetStrategy::Median(MedianTarget::new(scale))
}

fn windowed(n: i64, na_rm: bool) -> TargetStrategy {
    TargetStrategy::Windowed(WindowedTarget::new(n, na_rm).unwrap())
}

// =============================================================================
// Median Target Tests
// =============================================================================

#[test]
fn test_median_polygon_target() {
    let site = site(vec![cells("a", (1, 2), (1, 2))]);
    let target = compute_recovery_target(&index_stack(), &site, &median(TargetScale::Polygon))
        .unwrap();

    // Pixel medians 61, 62, 71, 72.
    match target {
        RecoveryTarget::Polygon { bands, values, .. } => {
            assert_eq!(bands, vec!["NBR".to_string()]);
            assert_eq!(values[0], 66.5);
        }
        other => panic!("expected polygon target, got {:?}", other),
    }
}

#[test]
fn test_median_pixel_target_keeps_clip_coords() {
    let site = site(vec![cells("a", (1, 2), (1, 2))]);
    let target =
        compute_recovery_target(&index_stack(), &site, &median(TargetScale::Pixel)).unwrap();

    let grid = target.as_grid().expect("pixel target");
    assert_eq!(grid.y(), &[3.5, 2.5]);
    assert_eq!(grid.x(), &[1.5, 2.5]);
    assert_all_nan_eq!(grid.data().iter().copied(), [61.0, 62.0, 71.0, 72.0]);
}

#[test]
fn test_median_ignores_years_outside_reference() {
    // Reference 2002 only: median is the 2002 value.
    let site = Site::new(vec![cells("a", (0, 0), (0, 0))], 2002, 2002).unwrap();
    let target =
        compute_recovery_target(&index_stack(), &site, &median(TargetScale::Pixel)).unwrap();
    assert_eq!(target.value(0, 0, 0), 200.0);
}

#[test]
fn test_multi_polygon_median_polygon_target() {
    let site = site(vec![
        cells("north", (1, 1), (1, 1)),
        cells("south", (3, 3), (3, 3)),
    ]);
    let target = compute_recovery_target(&index_stack(), &site, &median(TargetScale::Polygon))
        .unwrap();
    // Per-polygon medians 61 and 83.
    assert_eq!(target.value(0, 0, 0), 72.0);
}

#[test]
fn test_multi_polygon_median_pixel_target_spans_union() {
    let site = site(vec![
        cells("north", (1, 1), (1, 1)),
        cells("south", (3, 3), (3, 3)),
    ]);
    let target =
        compute_recovery_target(&index_stack(), &site, &median(TargetScale::Pixel)).unwrap();

    let grid = target.as_grid().unwrap();
    assert_eq!(grid.grid_shape(), (3, 3));
    let nan = f64::NAN;
    assert_all_nan_eq!(
        grid.data().iter().copied(),
        [61.0, nan, nan, nan, nan, nan, nan, nan, 83.0]
    );
}

#[test]
fn test_median_outside_raster_is_nan() {
    let far = ReferencePolygon::new(
        "far",
        Polygon::new(
            LineString::from(vec![(50.0, 50.0), (51.0, 50.0), (51.0, 51.0), (50.0, 50.0)]),
            vec![],
        ),
    );
    let target =
        compute_recovery_target(&index_stack(), &site(vec![far]), &median(TargetScale::Polygon))
            .unwrap();
    assert!(target.value(0, 0, 0).is_nan());
}

#[test]
fn test_reference_window_without_observations() {
    let site = Site::new(vec![cells("a", (1, 2), (1, 2))], 1990, 1995).unwrap();

    for strategy in [
        median(TargetScale::Polygon),
        median(TargetScale::Pixel),
        windowed(3, true),
        TargetStrategy::HistoricAverage(HistoricAverageTarget::new()),
    ] {
        match compute_recovery_target(&index_stack(), &site, &strategy) {
            Err(RecoveryError::CoordinateLookup { axis, value }) => {
                assert_eq!(axis, "time");
                assert_eq!(value, "1990..=1995");
            }
            other => panic!("{}: expected CoordinateLookup, got {:?}", strategy.name(), other),
        }
    }

    // One observed year in the window is enough.
    let partial = Site::new(vec![cells("a", (1, 2), (1, 2))], 1990, 2000).unwrap();
    let target =
        compute_recovery_target(&index_stack(), &partial, &median(TargetScale::Pixel)).unwrap();
    assert_eq!(target.value(0, 0, 0), 11.0);
}

// =============================================================================
// Historic Average Target Tests
// =============================================================================

#[test]
fn test_historic_average_target() {
    let site = site(vec![cells("a", (1, 2), (1, 2))]);
    let strategy = TargetStrategy::HistoricAverage(HistoricAverageTarget::new());
    let target = compute_recovery_target(&index_stack(), &site, &strategy).unwrap();

    // Cells 11, 12, 21, 22 in 2000 and 111, 112, 121, 122 in 2001.
    match target {
        RecoveryTarget::Polygon { bands, values, .. } => {
            assert_eq!(bands, vec!["NBR".to_string()]);
            assert_eq!(values[0], 66.5);
        }
        other => panic!("expected polygon target, got {:?}", other),
    }
}

#[test]
fn test_historic_average_multi_polygon() {
    let site = site(vec![
        cells("north", (1, 1), (1, 1)),
        cells("south", (3, 3), (3, 3)),
    ]);
    let strategy = TargetStrategy::HistoricAverage(HistoricAverageTarget::new());
    let target = compute_recovery_target(&index_stack(), &site, &strategy).unwrap();
    // Polygon means 61 and 83.
    assert_eq!(target.value(0, 0, 0), 72.0);
}

// =============================================================================
// Windowed Target Tests
// =============================================================================

#[test]
fn test_windowed_target_inside_raster() {
    let site = site(vec![cells("a", (1, 3), (1, 3))]);
    let target = compute_recovery_target(&index_stack(), &site, &windowed(3, false)).unwrap();

    // A 3x3 mean of a linear field equals its centre value.
    let grid = target.as_grid().expect("pixel target");
    assert_eq!(grid.grid_shape(), (3, 3));
    assert_eq!(grid.y(), &[3.5, 2.5, 1.5]);
    assert_eq!(grid.get(0, 0, 0), Some(61.0));
    assert_eq!(grid.get(0, 1, 1), Some(72.0));
    assert_eq!(grid.get(0, 2, 2), Some(83.0));
}

#[test]
fn test_windowed_target_masks_outside_polygons() {
    let site = site(vec![
        cells("north", (1, 1), (1, 1)),
        cells("south", (3, 3), (3, 3)),
    ]);
    let target = compute_recovery_target(&index_stack(), &site, &windowed(3, false)).unwrap();

    let grid = target.as_grid().unwrap();
    let nan = f64::NAN;
    assert_all_nan_eq!(
        grid.data().iter().copied(),
        [61.0, nan, nan, nan, nan, nan, nan, nan, 83.0]
    );
}

#[test]
fn test_windowed_target_buffer_exceeded() {
    // Touches the top row: the overshoot is on the high-y (front) side.
    let site = site(vec![cells("edge", (0, 1), (2, 2))]);

    match compute_recovery_target(&index_stack(), &site, &windowed(3, false)) {
        Err(RecoveryError::BufferExceeded { radius, plan }) => {
            assert_eq!(radius, 1);
            assert_eq!(
                plan,
                BufferPlan {
                    back_y: 0,
                    front_y: 1,
                    back_x: 0,
                    front_x: 0,
                }
            );
        }
        other => panic!("expected BufferExceeded, got {:?}", other),
    }

    match compute_recovery_target(&index_stack(), &site, &windowed(7, false)) {
        Err(RecoveryError::BufferExceeded { radius, plan }) => {
            assert_eq!(radius, 3);
            assert_eq!(
                plan,
                BufferPlan {
                    back_y: 0,
                    front_y: 3,
                    back_x: 1,
                    front_x: 1,
                }
            );
        }
        other => panic!("expected BufferExceeded, got {:?}", other),
    }
}

#[test]
fn test_windowed_target_empty_site() {
    let far = ReferencePolygon::new(
        "far",
        Polygon::new(
            LineString::from(vec![(50.0, 50.0), (51.0, 50.0), (51.0, 51.0), (50.0, 50.0)]),
            vec![],
        ),
    );
    assert!(matches!(
        compute_recovery_target(&index_stack(), &site(vec![far]), &windowed(3, false)),
        Err(RecoveryError::EmptyIntersection(_))
    ));
}

#[test]
fn test_windowed_na_rm_fills_gaps() {
    let mut data = create_index_stack(1, 3, SMALL.rows, SMALL.cols);
    // Knock out the column left of the site in every year.
    data.slice_mut(ndarray::s![.., .., .., 0]).fill(f64::NAN);
    let stack = RasterStack::new(
        data,
        vec!["NBR".to_string()],
        annual_dates(2000, 3),
        SMALL.y(),
        SMALL.x(),
    )
    .unwrap();
    let site = site(vec![cells("a", (2, 2), (1, 1))]);

    let strict = compute_recovery_target(&stack, &site, &windowed(3, false)).unwrap();
    assert!(strict.value(0, 0, 0).is_nan());

    // Valid neighbours: columns 1 and 2 of rows 1..=3, mean of the centre
    // column (71) and the right column (72).
    let lenient = compute_recovery_target(&stack, &site, &windowed(3, true)).unwrap();
    assert_eq!(lenient.value(0, 0, 0), 71.5);
}
