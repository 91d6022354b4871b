//! Ribbon terrain command-line front end: build a scene from a dataset
//! directory, report its framing, export OBJ; or synthesize a demo dataset.
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ribbon_core::camera::CameraFraming;
use ribbon_core::normalize::NormalizationBounds;
use ribbon_core::ribbon::{BoundingSummary, RibbonLayout, SamplingPlan};
use ribbon_core::{DirSource, RibbonConfig, RibbonPipeline, RibbonScene, TerrainMeta, Viewport};

mod obj;
mod synth;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ribbonize", about = "Build ribbon terrain geometry from heightmap datasets")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline on a dataset directory
    Build {
        /// Directory holding meta.json and values.bin
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration (camelCase keys; omitted keys use defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Viewport in CSS pixels, e.g. 1280x720
        #[arg(long, default_value = "1280x720", value_parser = parse_viewport)]
        viewport: Viewport,

        /// Write ribbons and strokes as Wavefront OBJ
        #[arg(long)]
        obj: Option<PathBuf>,

        /// Write a JSON summary of bounds, layout and framing
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Write a deterministic fBm demo dataset
    Synth {
        /// Output directory (created if absent)
        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value = "256")]
        rows: usize,

        #[arg(long, default_value = "384")]
        cols: usize,

        #[arg(long, default_value = "42")]
        seed: u32,

        /// Cell size in metres
        #[arg(long, default_value = "30")]
        cell: f64,
    },
}

fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("viewport must be positive, got {s}"));
    }
    Ok(Viewport::new(width, height))
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Summary<'a> {
    meta: &'a TerrainMeta,
    normalization: &'a NormalizationBounds,
    plan: &'a SamplingPlan,
    layout: &'a RibbonLayout,
    bounds: &'a BoundingSummary,
    framing: &'a CameraFraming,
    strokes: usize,
}

impl<'a> Summary<'a> {
    fn new(scene: &'a RibbonScene) -> Self {
        Self {
            meta: &scene.meta,
            normalization: &scene.bounds,
            plan: &scene.ribbons.plan,
            layout: &scene.ribbons.layout,
            bounds: &scene.ribbons.bounds,
            framing: &scene.framing,
            strokes: scene.strokes.current().map_or(0, |s| s.len()),
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn build(
    data: PathBuf,
    config: Option<PathBuf>,
    viewport: Viewport,
    obj_path: Option<PathBuf>,
    summary_path: Option<PathBuf>,
) -> Result<()> {
    if !data.is_dir() {
        bail!("Dataset directory not found: {}", data.display());
    }
    let config = match config {
        Some(path) => RibbonConfig::from_path(&path)?,
        None => RibbonConfig::default(),
    };

    let scene = RibbonPipeline::new(config)
        .run(&DirSource::new(&data), viewport)
        .with_context(|| format!("Failed to build scene from {}", data.display()))?;

    let b = &scene.ribbons.bounds;
    info!(
        size = ?b.size.to_array(),
        center = ?b.center.to_array(),
        max_dim = b.max_dim,
        "bounding summary"
    );

    if let Some(path) = obj_path {
        let file = File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?;
        obj::write_obj(&scene, BufWriter::new(file))
            .with_context(|| format!("Write failed: {}", path.display()))?;
        info!(path = %path.display(), "wrote OBJ");
    }

    if let Some(path) = summary_path {
        let json = serde_json::to_string_pretty(&Summary::new(&scene)).context("Failed to encode summary")?;
        fs::write(&path, json).with_context(|| format!("Write failed: {}", path.display()))?;
        info!(path = %path.display(), "wrote summary");
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    match args.command {
        Command::Build { data, config, viewport, obj, summary } => build(data, config, viewport, obj, summary),
        Command::Synth { out, rows, cols, seed, cell } => {
            if rows == 0 || cols == 0 {
                bail!("rows and cols must be positive");
            }
            synth::write_dataset(&out, &synth::SynthParams { rows, cols, seed, cell })?;
            info!(out = %out.display(), rows, cols, seed, "wrote demo dataset");
            Ok(())
        }
    }
}
