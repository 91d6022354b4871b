//! Terrain dataset retrieval and shape validation.
//!
//! A dataset is a `meta.json` document plus `values.bin`, a flat array of
//! little-endian `f32` in row-major order. Sources only hand back bytes; all
//! decoding and validation happens in [`load_terrain`].

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::LoadError;
use crate::grid::{TerrainGrid, TerrainMeta};

pub const META_FILE: &str = "meta.json";
pub const VALUES_FILE: &str = "values.bin";

/// Somewhere a dataset can be fetched from. Both fetches are independent and
/// may run concurrently.
pub trait TerrainSource: Sync {
    /// Human-readable identifier used in error messages.
    fn id(&self) -> String;

    fn fetch_meta(&self) -> Result<Cow<'_, [u8]>, LoadError>;

    fn fetch_values(&self) -> Result<Cow<'_, [u8]>, LoadError>;
}

/// A directory holding `meta.json` and `values.bin`.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TerrainSource for DirSource {
    fn id(&self) -> String {
        self.root.display().to_string()
    }

    fn fetch_meta(&self) -> Result<Cow<'_, [u8]>, LoadError> {
        fs::read(self.root.join(META_FILE)).map(Cow::Owned).map_err(|e| LoadError::MetaFetch {
            source_id: self.id(),
            status: None,
            reason: e.to_string(),
        })
    }

    fn fetch_values(&self) -> Result<Cow<'_, [u8]>, LoadError> {
        fs::read(self.root.join(VALUES_FILE)).map(Cow::Owned).map_err(|e| LoadError::ValuesFetch {
            source_id: self.id(),
            status: None,
            reason: e.to_string(),
        })
    }
}

/// Bytes already in memory, e.g. handed over by an embedding host.
#[derive(Debug, Clone)]
pub struct MemorySource {
    id: String,
    meta: Vec<u8>,
    values: Vec<u8>,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, meta: impl Into<Vec<u8>>, values: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), meta: meta.into(), values: values.into() }
    }
}

impl TerrainSource for MemorySource {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn fetch_meta(&self) -> Result<Cow<'_, [u8]>, LoadError> {
        Ok(Cow::Borrowed(&self.meta))
    }

    fn fetch_values(&self) -> Result<Cow<'_, [u8]>, LoadError> {
        Ok(Cow::Borrowed(&self.values))
    }
}

/// Decode a little-endian `f32` payload.
pub fn decode_values(bytes: &[u8]) -> Result<Vec<f32>, LoadError> {
    if bytes.len() % 4 != 0 {
        return Err(LoadError::MisalignedValues { bytes: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Little-endian encoding of `values`, the inverse of [`decode_values`].
pub fn encode_values(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn parse_meta(bytes: &[u8]) -> Result<TerrainMeta, LoadError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Fetch both parts of a dataset and validate them into a grid. A metadata
/// failure is reported ahead of a values failure.
pub fn load_terrain<S: TerrainSource + ?Sized>(source: &S) -> Result<TerrainGrid, LoadError> {
    let (meta, values) = fetch_both(source);
    let meta = parse_meta(&meta?)?;
    let values = values?;
    debug!(source = %source.id(), bytes = values.len(), "terrain payload fetched");

    let grid = TerrainGrid::new(meta, decode_values(&values)?)?;
    let (dx, dy) = grid.cell_size_meters();
    info!(source = %source.id(), rows = grid.rows(), cols = grid.cols(), dx, dy, "terrain loaded");
    Ok(grid)
}

type Fetched<'a> = Result<Cow<'a, [u8]>, LoadError>;

#[cfg(feature = "threading")]
fn fetch_both<S: TerrainSource + ?Sized>(source: &S) -> (Fetched<'_>, Fetched<'_>) {
    rayon::join(|| source.fetch_meta(), || source.fetch_values())
}

#[cfg(not(feature = "threading"))]
fn fetch_both<S: TerrainSource + ?Sized>(source: &S) -> (Fetched<'_>, Fetched<'_>) {
    (source.fetch_meta(), source.fetch_values())
}
