//! Recovery metrics over a raster stack.
//!
//! Each metric reduces the time axis of a [`RasterStack`] to one value per
//! band and pixel:
//!
//! | Metric | Meaning                                             | Needs target |
//! |--------|-----------------------------------------------------|--------------|
//! | dNBR   | change over `timestep` years from `rest_start`      | no           |
//! | YrYr   | change over `timestep` years from `rest_start - 1`  | no           |
//! | RRI    | recovery relative to the disturbance magnitude      | no           |
//! | R80P   | best post-restoration value relative to the target  | yes          |
//! | Y2R    | steps until the target threshold is first reached   | yes          |
//!
//! [`compute_metrics`] evaluates several metrics and stacks the results along
//! a leading `metric` axis.

mod change;
mod recovery;

pub use change::{dnbr, rri, yryr};
pub use recovery::{r80p, y2r};

use std::fmt;
use std::str::FromStr;

use ndarray::{Array4, ArrayView3, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result};
use crate::target::RecoveryTarget;
use crate::types::{BandGrid, RasterStack, SpatialRef};

/// Default number of years between the compared observations.
pub const DEFAULT_TIMESTEP: i32 = 5;

/// Default share of the target, in percent, that counts as recovered.
pub const DEFAULT_PERCENT: f64 = 80.0;

/// A recovery metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "dNBR")]
    Dnbr,
    #[serde(rename = "RRI")]
    Rri,
    #[serde(rename = "YrYr")]
    YrYr,
    #[serde(rename = "R80P")]
    R80P,
    #[serde(rename = "Y2R")]
    Y2R,
}

impl Metric {
    /// All metrics, in display order.
    pub const ALL: [Metric; 5] = [
        Metric::Dnbr,
        Metric::Rri,
        Metric::YrYr,
        Metric::R80P,
        Metric::Y2R,
    ];

    /// Conventional label of the metric.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dnbr => "dNBR",
            Self::Rri => "RRI",
            Self::YrYr => "YrYr",
            Self::R80P => "R80P",
            Self::Y2R => "Y2R",
        }
    }

    /// Whether the metric is measured against a recovery target.
    pub fn needs_target(&self) -> bool {
        matches!(self, Self::R80P | Self::Y2R)
    }
}

impl FromStr for Metric {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                RecoveryError::domain_value(format!(
                    "metric must be one of dNBR, RRI, YrYr, R80P, Y2R ('{}' provided)",
                    s
                ))
            })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Dates and thresholds shared by every metric in a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricParams {
    /// Year restoration started.
    pub rest_start: i32,
    /// Last year monitored by Y2R; `None` runs to the end of the stack.
    pub rest_end: Option<i32>,
    /// Years between compared observations (dNBR, YrYr, RRI).
    pub timestep: i32,
    /// Share of the target that counts as recovered (R80P, Y2R).
    pub percent: f64,
}

impl MetricParams {
    /// Parameters with the default timestep and percent.
    pub fn new(rest_start: i32) -> Self {
        Self {
            rest_start,
            rest_end: None,
            timestep: DEFAULT_TIMESTEP,
            percent: DEFAULT_PERCENT,
        }
    }

    pub fn with_rest_end(mut self, rest_end: i32) -> Self {
        self.rest_end = Some(rest_end);
        self
    }

    pub fn with_timestep(mut self, timestep: i32) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_percent(mut self, percent: f64) -> Self {
        self.percent = percent;
        self
    }

    /// Reject a non-finite or negative percent and an end before the start.
    pub fn validate(&self) -> Result<()> {
        if !self.percent.is_finite() || self.percent < 0.0 {
            return Err(RecoveryError::construction(format!(
                "percent must be a finite value >= 0 ({} provided)",
                self.percent
            )));
        }
        if let Some(end) = self.rest_end {
            if end < self.rest_start {
                return Err(RecoveryError::construction(format!(
                    "rest_end {} is before rest_start {}",
                    end, self.rest_start
                )));
            }
        }
        Ok(())
    }
}

/// Several metric results stacked as (metric, band, y, x).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricStack {
    metrics: Vec<Metric>,
    data: Array4<f64>,
    bands: Vec<String>,
    y: Vec<f64>,
    x: Vec<f64>,
    spatial_ref: SpatialRef,
}

impl MetricStack {
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
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

    /// The (band, y, x) result of one metric.
    pub fn metric(&self, metric: Metric) -> Option<ArrayView3<'_, f64>> {
        let index = self.metrics.iter().position(|&m| m == metric)?;
        Some(self.data.index_axis(Axis(0), index))
    }
}

/// Evaluate a single metric.
pub fn compute_metric(
    metric: Metric,
    stack: &RasterStack,
    target: Option<&RecoveryTarget>,
    params: &MetricParams,
) -> Result<BandGrid> {
    let required = || {
        target.ok_or_else(|| {
            RecoveryError::domain_value(format!("{} requires a recovery target", metric))
        })
    };

    match metric {
        Metric::Dnbr => dnbr(stack, params.rest_start, params.timestep),
        Metric::Rri => rri(stack, params.rest_start, params.timestep),
        Metric::YrYr => yryr(stack, params.rest_start, params.timestep),
        Metric::R80P => r80p(stack, params.rest_start, required()?, params.percent),
        Metric::Y2R => y2r(
            stack,
            required()?,
            params.rest_start,
            params.rest_end,
            params.percent,
        ),
    }
}

/// Evaluate `metrics` and stack the results along a leading `metric` axis.
///
/// Repeated metrics are evaluated once, keeping the first position. Without
/// a target, fails before evaluating anything if a requested metric needs
/// one. Otherwise fails on the first metric that errors.
pub fn compute_metrics(
    stack: &RasterStack,
    target: Option<&RecoveryTarget>,
    metrics: &[Metric],
    params: &MetricParams,
) -> Result<MetricStack> {
    params.validate()?;

    let mut requested: Vec<Metric> = Vec::with_capacity(metrics.len());
    for &metric in metrics {
        if !requested.contains(&metric) {
            requested.push(metric);
        }
    }
    if requested.is_empty() {
        return Err(RecoveryError::domain_value("no metrics requested"));
    }
    if target.is_none() {
        let missing: Vec<&str> = requested
            .iter()
            .filter(|metric| metric.needs_target())
            .map(|metric| metric.name())
            .collect();
        if !missing.is_empty() {
            return Err(RecoveryError::domain_value(format!(
                "{} require a recovery target",
                missing.join(", ")
            )));
        }
    }

    tracing::debug!(
        metrics = ?requested,
        rest_start = params.rest_start,
        rest_end = ?params.rest_end,
        timestep = params.timestep,
        percent = params.percent,
        "Computing metrics"
    );

    // Errors surface in request order.
    let results = requested
        .par_iter()
        .map(|&metric| compute_metric(metric, stack, target, params))
        .collect::<Vec<Result<BandGrid>>>()
        .into_iter()
        .collect::<Result<Vec<BandGrid>>>()?;

    let views: Vec<_> = results.iter().map(|grid| grid.data().view()).collect();
    let data = ndarray::stack(Axis(0), &views).map_err(|e| {
        RecoveryError::shape_mismatch("metric results on a shared grid", e.to_string())
    })?;

    Ok(MetricStack {
        metrics: requested,
        data,
        bands: stack.bands().to_vec(),
        y: stack.y().to_vec(),
        x: stack.x().to_vec(),
        spatial_ref: stack.spatial_ref().clone(),
    })
}
