//! Recovery metrics measured against a recovery target.

use ndarray::{s, Axis, Zip};

use crate::error::Result;
use crate::stats::nan_max;
use crate::target::RecoveryTarget;
use crate::types::{BandGrid, RasterStack};

/// Extent to which the trajectory reached `percent` of the target.
///
/// The maximum observation from `rest_start` onward, per pixel and band,
/// divided by `target * percent / 100`. A value of 1 means the threshold was
/// just reached.
pub fn r80p(
    stack: &RasterStack,
    rest_start: i32,
    target: &RecoveryTarget,
    percent: f64,
) -> Result<BandGrid> {
    target.check_compatible(stack)?;

    let range = stack.year_range(rest_start, None);
    tracing::debug!(rest_start, percent, observations = range.len(), "R80P");

    let scale = percent / 100.0;
    let post = stack.data().slice(s![.., range, .., ..]);
    let out = Zip::indexed(post.lanes(Axis(1))).par_map_collect(|(band, row, col), series| {
        nan_max(series.iter().copied()) / (target.value(band, row, col) * scale)
    });

    Ok(BandGrid::like_stack(stack, out))
}

/// Years to recovery: the number of steps after the first observation in
/// `[rest_start, rest_end]` at which a pixel first reaches
/// `target * percent / 100`.
///
/// Reaching the threshold exactly counts as recovered; recovering at the
/// first observation yields 0. Pixels that never reach it are NaN.
/// `rest_end = None` monitors through the last observation.
pub fn y2r(
    stack: &RasterStack,
    target: &RecoveryTarget,
    rest_start: i32,
    rest_end: Option<i32>,
    percent: f64,
) -> Result<BandGrid> {
    target.check_compatible(stack)?;

    let range = stack.year_range(rest_start, rest_end);
    tracing::debug!(
        rest_start,
        rest_end = ?rest_end,
        percent,
        observations = range.len(),
        "Y2R"
    );

    let scale = percent / 100.0;
    let window = stack.data().slice(s![.., range, .., ..]);
    let out = Zip::indexed(window.lanes(Axis(1))).par_map_collect(|(band, row, col), series| {
        let threshold = target.value(band, row, col) * scale;
        series
            .iter()
            .position(|&v| v >= threshold)
            .map_or(f64::NAN, |step| step as f64)
    });

    Ok(BandGrid::like_stack(stack, out))
}
