//! NaN-aware reductions shared by the target and metric engines.
//!
//! Every reduction here skips NaN inputs. A reduction over an empty or
//! all-NaN input returns NaN.

use std::cmp::Ordering;

use num_traits::Float;

/// Median of the non-NaN values.
///
/// For an even number of valid values the two middle values are averaged.
pub fn nan_median<T, I>(values: I) -> T
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let mut valid: Vec<T> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return T::nan();
    }

    valid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / (T::one() + T::one())
    } else {
        valid[mid]
    }
}

/// Maximum of the non-NaN values.
pub fn nan_max<T, I>(values: I) -> T
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let mut max = T::neg_infinity();
    let mut has_valid = false;

    for v in values {
        if !v.is_nan() {
            has_valid = true;
            if v > max {
                max = v;
            }
        }
    }

    if has_valid {
        max
    } else {
        T::nan()
    }
}

/// Mean of the non-NaN values, together with how many values were valid.
pub fn nan_mean_count<T, I>(values: I) -> (T, usize)
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let mut sum = T::zero();
    let mut count = 0usize;

    for v in values {
        if !v.is_nan() {
            sum = sum + v;
            count += 1;
        }
    }

    if count == 0 {
        (T::nan(), 0)
    } else {
        let n = T::from(count).unwrap_or_else(T::nan);
        (sum / n, count)
    }
}
