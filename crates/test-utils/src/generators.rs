//! Test data generators for creating synthetic spectral stacks.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite. Stacks are laid out as
//! (band, time, y, x) in row-major order.

use chrono::NaiveDate;
use ndarray::Array4;

/// Creates one date per year, on January 1st, starting at `first_year`.
///
/// # Example
///
/// ```
/// use test_utils::annual_dates;
///
/// let dates = annual_dates(2010, 3);
/// assert_eq!(dates.len(), 3);
/// assert_eq!(dates[2].to_string(), "2012-01-01");
/// ```
pub fn annual_dates(first_year: i32, n: usize) -> Vec<NaiveDate> {
    (0..n as i32)
        .filter_map(|i| NaiveDate::from_ymd_opt(first_year + i, 1, 1))
        .collect()
}

/// Creates `n` ascending cell-centre coordinates starting at `origin`.
///
/// With `origin = 0.0` and `step = 1.0` this gives `0.5, 1.5, ...`.
pub fn ascending_coords(n: usize, origin: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| origin + (i as f64 + 0.5) * step).collect()
}

/// Creates `n` descending cell-centre coordinates below `top`.
///
/// North-up rasters store `y` this way. With `top = 4.0` and `step = 1.0`
/// this gives `3.5, 2.5, ...`.
pub fn descending_coords(n: usize, top: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| top - (i as f64 + 0.5) * step).collect()
}

/// Creates a stack with predictable values.
///
/// Each cell value is calculated as: `band * 1000 + time * 100 + row * 10 + col`
///
/// This makes it easy to verify that slicing and clipping keep the right
/// cells, as long as every dimension stays below 10.
///
/// # Example
///
/// ```
/// use test_utils::create_index_stack;
///
/// let data = create_index_stack(2, 3, 4, 5);
/// assert_eq!(data.dim(), (2, 3, 4, 5));
/// assert_eq!(data[[1, 2, 3, 4]], 1234.0);
/// ```
pub fn create_index_stack(bands: usize, times: usize, rows: usize, cols: usize) -> Array4<f64> {
    Array4::from_shape_fn((bands, times, rows, cols), |(b, t, r, c)| {
        (b * 1000 + t * 100 + r * 10 + c) as f64
    })
}

/// Creates a stack where every pixel of every band follows `series`.
///
/// # Example
///
/// ```
/// use test_utils::create_series_stack;
///
/// let data = create_series_stack(&[1.0, 2.0, 3.0], 1, 2, 2);
/// assert_eq!(data.dim(), (1, 3, 2, 2));
/// assert_eq!(data[[0, 2, 1, 1]], 3.0);
/// ```
pub fn create_series_stack(series: &[f64], bands: usize, rows: usize, cols: usize) -> Array4<f64> {
    Array4::from_shape_fn((bands, series.len(), rows, cols), |(_, t, _, _)| series[t])
}

/// Creates a disturbance-and-recovery trajectory.
///
/// Values sit at `baseline` for `pre_years`, drop to `disturbed` for one
/// year, then climb linearly by `rate` per year for `post_years`.
///
/// # Example
///
/// ```
/// use test_utils::create_recovery_series;
///
/// let series = create_recovery_series(100.0, 2, 40.0, 10.0, 3);
/// assert_eq!(series, vec![100.0, 100.0, 40.0, 50.0, 60.0, 70.0]);
/// ```
pub fn create_recovery_series(
    baseline: f64,
    pre_years: usize,
    disturbed: f64,
    rate: f64,
    post_years: usize,
) -> Vec<f64> {
    let mut series = Vec::with_capacity(pre_years + 1 + post_years);
    series.extend(std::iter::repeat(baseline).take(pre_years));
    series.push(disturbed);
    series.extend((1..=post_years).map(|year| disturbed + rate * year as f64));
    series
}

/// Creates a stack whose values grow with distance from the grid centre.
///
/// Each pixel follows `create_recovery_series` with a recovery rate scaled
/// by its distance from the centre, so recovery metrics vary smoothly over
/// space. Useful for benchmarks and whole-pipeline tests.
pub fn create_radial_recovery_stack(
    bands: usize,
    pre_years: usize,
    post_years: usize,
    rows: usize,
    cols: usize,
) -> Array4<f64> {
    let times = pre_years + 1 + post_years;
    let center_row = rows as f64 / 2.0;
    let center_col = cols as f64 / 2.0;
    let max_dist = (center_row.powi(2) + center_col.powi(2)).sqrt().max(1.0);

    Array4::from_shape_fn((bands, times, rows, cols), |(b, t, r, c)| {
        let dist = ((r as f64 - center_row).powi(2) + (c as f64 - center_col).powi(2)).sqrt();
        let rate = 5.0 + 10.0 * (1.0 - dist / max_dist);
        let baseline = 100.0 + b as f64 * 10.0;
        let disturbed = baseline * 0.4;
        if t < pre_years {
            baseline
        } else {
            disturbed + rate * (t - pre_years) as f64
        }
    })
}
