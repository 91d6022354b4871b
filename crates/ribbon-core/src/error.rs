//! Error taxonomy for the ribbon pipeline.
//!
//! Load and geometry failures are terminal for the current attempt; nothing
//! in the core retries. Degenerate-but-usable inputs (inverted clamp bounds,
//! unsorted colour ramps) never reach this module: they are resolved by the
//! named fallback functions in `normalize` and `gradient`.

use std::path::PathBuf;

/// Failure to retrieve or validate a terrain dataset.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// `meta.json` could not be retrieved. `status` carries an HTTP-like code
    /// when the source has one.
    #[error("failed to load meta.json from {source_id}{}: {reason}", status_suffix(.status))]
    MetaFetch {
        source_id: String,
        status: Option<u16>,
        reason: String,
    },

    /// `values.bin` could not be retrieved.
    #[error("failed to load values.bin from {source_id}{}: {reason}", status_suffix(.status))]
    ValuesFetch {
        source_id: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("meta.json is not valid terrain metadata: {0}")]
    MetaParse(#[from] serde_json::Error),

    /// The binary payload is not a whole number of 32-bit floats.
    #[error("values.bin length {bytes} is not a multiple of 4 bytes")]
    MisalignedValues { bytes: usize },

    #[error("values.bin length mismatch (expected {expected}, got {actual})")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `rows * cols` overflows; no payload could match.
    #[error("meta.json dimensions {rows} x {cols} are too large")]
    DimensionOverflow { rows: usize, cols: usize },

    /// Neither `dx`/`dy` nor `extent_meters` describe the cell spacing.
    #[error("meta.json needs either dx/dy or extent_meters to derive cell spacing")]
    MissingSpacing,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

/// Failure to derive ribbon geometry from a valid grid.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("trim settings remove all rows or columns ({used_rows} rows, {used_cols} cols left)")]
    EmptySamplingPlan { used_rows: usize, used_cols: usize },
}

/// Failure to read or interpret a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error for callers that drive the whole pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
