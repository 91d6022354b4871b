use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LoadError;

/// Storage order of grid rows in `values.bin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    NorthToSouth,
    #[default]
    SouthToNorth,
}

/// Anything other than the literal `"north_to_south"` (including `null`)
/// reads as south-to-north.
fn row_order_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<RowOrder, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(match raw.as_deref() {
        Some("north_to_south") => RowOrder::NorthToSouth,
        _ => RowOrder::SouthToNorth,
    })
}

/// Physical extent of the grid in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtentMeters {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// A `{low, high}` pair where either side may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClampPair {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl ClampPair {
    pub fn both(&self) -> Option<(f64, f64)> {
        self.low.zip(self.high)
    }
}

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TerrainMeta {
    pub rows: usize,
    pub cols: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent_meters: Option<ExtentMeters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,
    #[serde(default, rename = "rowOrder", deserialize_with = "row_order_lenient")]
    pub row_order: RowOrder,
    #[serde(default, rename = "clampValues", skip_serializing_if = "Option::is_none")]
    pub clamp_values: Option<ClampPair>,
    #[serde(default, rename = "clampPercentiles", skip_serializing_if = "Option::is_none")]
    pub clamp_percentiles: Option<ClampPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TerrainMeta {
    /// Number of samples `values.bin` must hold. Fails when `rows * cols`
    /// does not fit in `usize`.
    pub fn expected_len(&self) -> Result<usize, LoadError> {
        self.rows
            .checked_mul(self.cols)
            .ok_or(LoadError::DimensionOverflow { rows: self.rows, cols: self.cols })
    }

    /// Cell spacing in metres. Explicit `dx`/`dy` win over the extent.
    pub fn cell_size_meters(&self) -> Result<(f64, f64), LoadError> {
        let extent = self.extent_meters.as_ref();
        let dx = self
            .dx
            .or_else(|| extent.map(|e| (e.xmax - e.xmin) / self.cols as f64))
            .ok_or(LoadError::MissingSpacing)?;
        let dy = self
            .dy
            .or_else(|| extent.map(|e| (e.ymax - e.ymin) / self.rows as f64))
            .ok_or(LoadError::MissingSpacing)?;
        Ok((dx, dy))
    }
}

/// A validated, immutable row-major scalar grid.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    meta: TerrainMeta,
    values: Vec<f32>,
    dx_m: f64,
    dy_m: f64,
}

impl TerrainGrid {
    /// Validate `values.len() == rows * cols` and resolve the cell spacing.
    pub fn new(meta: TerrainMeta, values: Vec<f32>) -> Result<Self, LoadError> {
        let expected = meta.expected_len()?;
        if values.len() != expected {
            return Err(LoadError::DimensionMismatch { expected, actual: values.len() });
        }
        let (dx_m, dy_m) = meta.cell_size_meters()?;
        Ok(Self { meta, values, dx_m, dy_m })
    }

    pub fn meta(&self) -> &TerrainMeta {
        &self.meta
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn rows(&self) -> usize {
        self.meta.rows
    }

    pub fn cols(&self) -> usize {
        self.meta.cols
    }

    pub fn row_order(&self) -> RowOrder {
        self.meta.row_order
    }

    /// Cell spacing `(dx, dy)` in metres.
    pub fn cell_size_meters(&self) -> (f64, f64) {
        (self.dx_m, self.dy_m)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.meta.cols + col]
    }

    /// Observed `(min, max)` over all values. NaN samples are skipped;
    /// an empty or all-NaN grid yields `(+inf, -inf)`.
    pub fn observed_range(&self) -> (f32, f32) {
        self.values.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (if v < lo { v } else { lo }, if v > hi { v } else { hi })
        })
    }
}
