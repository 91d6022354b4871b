//! Deterministic demo terrain: Perlin fBm ridges over a gentle tilt.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use noise::{NoiseFn, Perlin};
use ribbon_core::grid::{ClampPair, ExtentMeters, RowOrder, TerrainMeta};
use ribbon_core::loader::{encode_values, META_FILE, VALUES_FILE};

/// Sum of Perlin octaves, lacunarity 2, gain 0.5.
struct Fbm {
    octaves: u32,
    noise: Perlin,
}

impl Fbm {
    fn new(seed: u32, octaves: u32) -> Self {
        Self { octaves, noise: Perlin::new(seed) }
    }

    fn sample(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0;
        let mut amp = 1.0;
        let mut freq = 1.0;
        for _ in 0..self.octaves {
            value += amp * self.noise.get([x * freq, y * freq]);
            amp *= 0.5;
            freq *= 2.0;
        }
        value
    }
}

pub struct SynthParams {
    pub rows: usize,
    pub cols: usize,
    pub seed: u32,
    /// Cell size in metres.
    pub cell: f64,
}

/// Elevations in metres, row-major, first row northernmost.
pub fn synth_values(params: &SynthParams) -> Vec<f32> {
    let fbm = Fbm::new(params.seed, 6);
    let base_freq = 4.0;
    let mut values = Vec::with_capacity(params.rows * params.cols);
    for r in 0..params.rows {
        let v = r as f64 / params.rows.max(1) as f64;
        for c in 0..params.cols {
            let u = c as f64 / params.cols.max(1) as f64;
            let ridges = 1.0 - fbm.sample(u * base_freq, v * base_freq).abs();
            values.push((400.0 + 900.0 * ridges * ridges + 150.0 * v) as f32);
        }
    }
    values
}

pub fn synth_meta(params: &SynthParams) -> TerrainMeta {
    TerrainMeta {
        rows: params.rows,
        cols: params.cols,
        extent_meters: Some(ExtentMeters {
            xmin: 0.0,
            xmax: params.cols as f64 * params.cell,
            ymin: 0.0,
            ymax: params.rows as f64 * params.cell,
        }),
        row_order: RowOrder::NorthToSouth,
        clamp_percentiles: Some(ClampPair { low: Some(0.01), high: Some(0.99) }),
        ..TerrainMeta::default()
    }
}

/// Write `meta.json` and `values.bin` into `out`, creating it if needed.
pub fn write_dataset(out: &Path, params: &SynthParams) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Cannot create {}", out.display()))?;

    let meta = serde_json::to_string_pretty(&synth_meta(params)).context("Failed to encode meta.json")?;
    let meta_path = out.join(META_FILE);
    fs::write(&meta_path, meta).with_context(|| format!("Write failed: {}", meta_path.display()))?;

    let values_path = out.join(VALUES_FILE);
    fs::write(&values_path, encode_values(&synth_values(params)))
        .with_context(|| format!("Write failed: {}", values_path.display()))?;
    Ok(())
}
