//! Spectral Recovery Targets and Metrics
//!
//! This crate turns a band x time x y x x stack of spectral observations
//! over a restoration site into:
//!
//! - **Recovery targets**: the value each band (and optionally each pixel)
//!   is expected to recover toward, derived from reference years
//! - **Recovery metrics**: per-pixel scalars describing how far and how fast
//!   recovery proceeded (dNBR, RRI, YrYr, R80P, Y2R)
//!
//! # Architecture
//!
//! ```text
//! RasterStack + Site (reference polygons, reference years)
//!      │
//!      ├─► SpatialMask: clip to the polygons
//!      │         │
//!      │         └─► BufferPlanner: widen by the focal radius (windowed only)
//!      │
//!      ├─► TargetStrategy::compute
//!      │         │
//!      │         ├─► MedianTarget: median over time (and space)
//!      │         │
//!      │         ├─► HistoricAverageTarget: mean over time and space
//!      │         │
//!      │         └─► WindowedTarget: median over time, N x N focal mean
//!      │
//!      └─► compute_metrics(stack, target, metrics, params)
//!               │
//!               ▼
//!          MetricStack (metric, band, y, x)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spectral_recovery::{
//!     compute_metrics, compute_recovery_target, RecoveryConfig, ReferencePolygon, Site,
//! };
//!
//! let config = RecoveryConfig::from_json(r#"{"target": {"method": "median"}}"#)?;
//! let site = Site::single(ReferencePolygon::new("site", polygon), 2000, 2004)?;
//!
//! let target = compute_recovery_target(&stack, &site, &config.strategy())?;
//! let params = config.metric_params(2010, None)?;
//! let metrics = compute_metrics(&stack, Some(&target), &config.metrics, &params)?;
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod mask;
pub mod metrics;
pub mod stats;
pub mod target;
pub mod types;

// Re-export commonly used types at crate root
pub use buffer::{buffered_reference_clip, locate_clip, plan_buffer, BufferPlan, BufferedClip};
pub use config::{RecoveryConfig, TargetConfig};
pub use error::{RecoveryError, Result};
pub use mask::{
    clip_to_polygon, polygon_mask, site_mask, tight_reference_clip, ReferencePolygon,
    ReferenceStack, Site,
};
pub use metrics::{
    compute_metric, compute_metrics, dnbr, r80p, rri, y2r, yryr, Metric, MetricParams,
    MetricStack,
};
pub use target::{
    compute_recovery_target, focal_mean, HistoricAverageTarget, MedianTarget, RecoveryTarget,
    TargetScale, TargetStrategy, WindowSpec, WindowedTarget,
};
pub use types::{BandGrid, GridWindow, RasterStack, SpatialRef};
