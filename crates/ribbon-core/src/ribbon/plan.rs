//! Row/column sub-sampling: symmetric trim followed by a fixed stride.

use serde::Serialize;

use crate::error::GeometryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplingPlan {
    /// Grid rows that become ribbons, strictly increasing.
    pub row_indices: Vec<usize>,
    /// Grid columns sampled along every ribbon, strictly increasing.
    pub col_indices: Vec<usize>,
}

impl SamplingPlan {
    /// Trim is capped at `(len - 1) / 2` per axis so at least the centre
    /// line survives; steps below 1 are treated as 1.
    pub fn new(
        rows: usize,
        cols: usize,
        trim_rows: usize,
        trim_cols: usize,
        row_step: usize,
        col_step: usize,
    ) -> Result<Self, GeometryError> {
        let row_indices = axis_indices(rows, trim_rows, row_step);
        let col_indices = axis_indices(cols, trim_cols, col_step);
        if row_indices.is_empty() || col_indices.is_empty() {
            return Err(GeometryError::EmptySamplingPlan {
                used_rows: row_indices.len(),
                used_cols: col_indices.len(),
            });
        }
        Ok(Self { row_indices, col_indices })
    }

    pub fn used_rows(&self) -> usize {
        self.row_indices.len()
    }

    pub fn used_cols(&self) -> usize {
        self.col_indices.len()
    }
}

fn axis_indices(len: usize, trim: usize, step: usize) -> Vec<usize> {
    let trim = trim.min(len.saturating_sub(1) / 2);
    (trim..len - trim).step_by(step.max(1)).collect()
}
