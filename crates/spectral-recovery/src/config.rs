//! Configuration for recovery target and metric computation.

use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result};
use crate::metrics::{Metric, MetricParams, DEFAULT_PERCENT, DEFAULT_TIMESTEP};
use crate::target::{
    HistoricAverageTarget, MedianTarget, TargetScale, TargetStrategy, WindowSpec, WindowedTarget,
};

/// Configuration for a recovery assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// How the recovery target is derived from the reference years.
    pub target: TargetConfig,

    /// Metrics to evaluate, in output order.
    pub metrics: Vec<Metric>,

    /// Years between compared observations (dNBR, YrYr, RRI).
    pub timestep: i32,

    /// Share of the target, in percent, that counts as recovered.
    pub percent: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            metrics: Metric::ALL.to_vec(),
            timestep: DEFAULT_TIMESTEP,
            percent: DEFAULT_PERCENT,
        }
    }
}

impl RecoveryConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(RecoveryError::construction("metrics must not be empty"));
        }

        if self.timestep < 1 {
            return Err(RecoveryError::construction(format!(
                "timestep must be >= 1 ({} provided)",
                self.timestep
            )));
        }

        if !self.percent.is_finite() || self.percent < 0.0 {
            return Err(RecoveryError::construction(format!(
                "percent must be a finite value >= 0 ({} provided)",
                self.percent
            )));
        }

        Ok(())
    }

    /// The target strategy this configuration selects.
    pub fn strategy(&self) -> TargetStrategy {
        match self.target {
            TargetConfig::Median { scale } => TargetStrategy::Median(MedianTarget::new(scale)),
            TargetConfig::Windowed(spec) => {
                TargetStrategy::Windowed(WindowedTarget::from_spec(spec))
            }
            TargetConfig::Mean => TargetStrategy::HistoricAverage(HistoricAverageTarget::new()),
        }
    }

    /// Metric parameters for a restoration window.
    pub fn metric_params(&self, rest_start: i32, rest_end: Option<i32>) -> Result<MetricParams> {
        let params = MetricParams {
            rest_start,
            rest_end,
            timestep: self.timestep,
            percent: self.percent,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Recovery target method, tagged by `method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum TargetConfig {
    /// Median over the reference years.
    Median {
        #[serde(default)]
        scale: TargetScale,
    },
    /// Median over the reference years followed by a focal mean.
    Windowed(WindowSpec),
    /// Mean over the reference years and the whole clip.
    Mean,
}

impl From<TargetStrategy> for TargetConfig {
    fn from(strategy: TargetStrategy) -> Self {
        match strategy {
            TargetStrategy::Median(method) => Self::Median {
                scale: method.scale(),
            },
            TargetStrategy::Windowed(method) => Self::Windowed(*method.spec()),
            TargetStrategy::HistoricAverage(_) => Self::Mean,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::Median {
            scale: TargetScale::Polygon,
        }
    }
}
