//! Clamp bounds and normalisation.
//!
//! Resolution order for the `[low, high]` clamp window:
//!   1. `clampPercentiles` (both present) → linear-interpolation quantiles.
//!   2. `clampValues` (both finite) → used as is.
//!   3. metadata `min`/`max` when finite, else the observed extremes.
//!   4. Non-finite or inverted result → observed extremes.

use serde::Serialize;
use tracing::{debug, warn};

use crate::grid::TerrainGrid;

/// Smallest range used as a normalisation divisor.
pub const MIN_RANGE: f64 = 1e-6;

/// Linear-interpolation quantile over an ascending slice.
///
/// `index = (n - 1) * q`; `q <= 0` returns the first element, `q >= 1` the
/// last, anything between interpolates the floor/ceil neighbours. This is
/// not nearest-rank. Returns 0 for an empty slice.
pub fn quantile(sorted: &[f32], q: f64) -> f64 {
    let Some((&first, &last)) = sorted.first().zip(sorted.last()) else {
        return 0.0;
    };
    if q <= 0.0 {
        return first as f64;
    }
    if q >= 1.0 {
        return last as f64;
    }

    let index = (sorted.len() - 1) as f64 * q;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let t = index - lower as f64;

    if upper == lower {
        return sorted[lower] as f64;
    }
    sorted[lower] as f64 * (1.0 - t) + sorted[upper] as f64 * t
}

/// Which rule produced the final clamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampSource {
    Percentiles,
    ExplicitValues,
    MetadataRange,
    Observed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationBounds {
    pub clamp_low: f64,
    pub clamp_high: f64,
    /// `max(clamp_high - clamp_low, MIN_RANGE)`.
    pub range: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub source: ClampSource,
}

impl NormalizationBounds {
    /// Clamp `raw` into the window and map it to [0, 1].
    #[inline]
    pub fn normalize(&self, raw: f32) -> f64 {
        let clamped = (raw as f64).max(self.clamp_low).min(self.clamp_high);
        (clamped - self.clamp_low) / self.range
    }
}

/// Resolve clamp bounds for a loaded grid.
pub fn resolve_bounds(grid: &TerrainGrid) -> NormalizationBounds {
    let (min_f32, max_f32) = grid.observed_range();
    let (min_value, max_value) = (min_f32 as f64, max_f32 as f64);
    let meta = grid.meta();

    let (low, high, source) = if let Some((qlo, qhi)) =
        meta.clamp_percentiles.as_ref().and_then(|p| p.both())
    {
        let mut sorted = grid.values().to_vec();
        sorted.sort_by(f32::total_cmp);
        (quantile(&sorted, qlo), quantile(&sorted, qhi), ClampSource::Percentiles)
    } else {
        match meta.clamp_values.as_ref().and_then(|c| c.both()) {
            Some((lo, hi)) if lo.is_finite() && hi.is_finite() => {
                (lo, hi, ClampSource::ExplicitValues)
            }
            _ => metadata_or_observed(meta.min, meta.max, min_value, max_value),
        }
    };

    let (clamp_low, clamp_high, source) = if usable_window(low, high) {
        (low, high, source)
    } else {
        warn!(low, high, ?source, "clamp window unusable, falling back to observed range");
        (min_value, max_value, ClampSource::Observed)
    };

    let range = (clamp_high - clamp_low).max(MIN_RANGE);
    debug!(clamp_low, clamp_high, range, ?source, "resolved clamp bounds");

    NormalizationBounds { clamp_low, clamp_high, range, min_value, max_value, source }
}

/// Metadata `min`/`max` replace the observed extremes side by side when finite.
fn metadata_or_observed(
    meta_min: Option<f64>,
    meta_max: Option<f64>,
    observed_min: f64,
    observed_max: f64,
) -> (f64, f64, ClampSource) {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    match (finite(meta_min), finite(meta_max)) {
        (None, None) => (observed_min, observed_max, ClampSource::Observed),
        (lo, hi) => (
            lo.unwrap_or(observed_min),
            hi.unwrap_or(observed_max),
            ClampSource::MetadataRange,
        ),
    }
}

fn usable_window(low: f64, high: f64) -> bool {
    low.is_finite() && high.is_finite() && high > low
}
