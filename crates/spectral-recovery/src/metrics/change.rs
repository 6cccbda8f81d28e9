//! Change metrics: differences between exact observation years.

use crate::error::{RecoveryError, Result};
use crate::types::{BandGrid, RasterStack};

/// `year + offset`, failing as a missing time label when it overflows.
fn offset_year(year: i32, offset: i32) -> Result<i32> {
    year.checked_add(offset).ok_or_else(|| RecoveryError::CoordinateLookup {
        axis: "time",
        value: format!("{}{:+}", year, offset),
    })
}

/// Absolute change from `rest_start` to `rest_start + timestep`.
///
/// Both years must be present in the stack.
pub fn dnbr(stack: &RasterStack, rest_start: i32, timestep: i32) -> Result<BandGrid> {
    let start = stack.year_slice(rest_start)?;
    let post = stack.year_slice(offset_year(rest_start, timestep)?)?;

    tracing::debug!(rest_start, timestep, "dNBR");
    Ok(BandGrid::like_stack(stack, &post - &start))
}

/// Change over `timestep` years from the year before restoration started.
///
/// The disturbance is assumed to span the single year `rest_start - 1`.
pub fn yryr(stack: &RasterStack, rest_start: i32, timestep: i32) -> Result<BandGrid> {
    let dist_start = offset_year(rest_start, -1)?;
    let start = stack.year_slice(dist_start)?;
    let post = stack.year_slice(offset_year(dist_start, timestep)?)?;

    tracing::debug!(rest_start, timestep, "YrYr");
    Ok(BandGrid::like_stack(stack, &post - &start))
}

/// Relative recovery index: recovery over `timestep` years divided by the
/// magnitude of the disturbance.
///
/// A zero disturbance gives the IEEE quotient (±inf, or NaN for 0/0).
pub fn rri(stack: &RasterStack, rest_start: i32, timestep: i32) -> Result<BandGrid> {
    let dist_start = stack.year_slice(offset_year(rest_start, -1)?)?;
    let dist_end = stack.year_slice(rest_start)?;
    let post = stack.year_slice(offset_year(rest_start, timestep)?)?;

    tracing::debug!(rest_start, timestep, "RRI");
    let recovery = &post - &dist_end;
    let disturbance = &dist_start - &dist_end;
    Ok(BandGrid::like_stack(stack, recovery / disturbance))
}
