//! Immutable pipeline configuration.
//!
//! One `RibbonConfig` is built up front (defaults, or a JSON document in the
//! same camelCase shape) and passed by reference to every stage.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gradient::{ColorStop, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Ortho,
    Perspective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Row,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeMode {
    #[default]
    Tube,
    Line2,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthoConfig {
    /// Frustum height as a multiple of the terrain depth.
    pub padding: f64,
    pub zoom: f64,
}

impl Default for OrthoConfig {
    fn default() -> Self {
        Self { padding: 1.15, zoom: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RibbonParams {
    pub opacity: f32,
    pub base_height: f32,
    pub row_step: usize,
    pub col_step: usize,
    /// Extra multiplier on inter-row spacing; purely visual.
    pub row_gap: f64,
}

impl Default for RibbonParams {
    fn default() -> Self {
        Self { opacity: 0.18, base_height: 0.0, row_step: 2, col_step: 1, row_gap: 2.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Fog start as a multiple of `maxDim`.
    pub near: f64,
    /// Fog end as a multiple of `maxDim`.
    pub far: f64,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self { near: 0.6, far: 2.2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualConfig {
    pub use_fog: bool,
    /// Lit shading; ribbons then carry vertex normals.
    pub use_lambert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TubeConfig {
    /// Perspective-mode radius as a fraction of the column spacing.
    pub radius: f32,
    pub radial_segments: u32,
    pub tubular_segments_scale: f32,
}

impl Default for TubeConfig {
    fn default() -> Self {
        Self { radius: 0.02, radial_segments: 6, tubular_segments_scale: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrokeConfig {
    pub enabled: bool,
    pub mode: StrokeMode,
    pub color: Rgb,
    pub opacity: f32,
    /// Lift of the outline above the ribbon top, in scene units.
    pub z_offset: f32,
    /// Pixels for `tube` (orthographic) and `line2`; best effort for `line`.
    pub width: f32,
    /// Rebuild tube strokes whenever an orthographic camera zooms.
    pub follow_zoom: bool,
    pub tube: TubeConfig,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: StrokeMode::Tube,
            color: Rgb::WHITE,
            opacity: 1.0,
            z_offset: 0.01,
            width: 1.0,
            follow_zoom: false,
            tube: TubeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self { rows: 10, cols: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightGradient {
    pub low: Rgb,
    pub high: Rgb,
}

impl Default for HeightGradient {
    fn default() -> Self {
        Self { low: Rgb::from_u8([0xFA, 0x4C, 0xFB]), high: Rgb::from_u8([0x93, 0xF3, 0xE9]) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RibbonConfig {
    pub meters_to_units: f64,
    pub depth_scale: f64,
    pub z_scale_factor: f64,
    pub camera_mode: CameraMode,
    pub ortho: OrthoConfig,
    pub ribbon: RibbonParams,
    pub fog: FogConfig,
    pub visual: VisualConfig,
    pub stroke: StrokeConfig,
    pub color_mode: ColorMode,
    pub trim: TrimConfig,
    pub row_gradient: Vec<ColorStop>,
    pub height_gradient: HeightGradient,
}

impl Default for RibbonConfig {
    fn default() -> Self {
        Self {
            meters_to_units: 1.0 / 1000.0,
            depth_scale: 1.0,
            z_scale_factor: 0.18,
            camera_mode: CameraMode::Ortho,
            ortho: OrthoConfig::default(),
            ribbon: RibbonParams::default(),
            fog: FogConfig::default(),
            visual: VisualConfig::default(),
            stroke: StrokeConfig::default(),
            color_mode: ColorMode::Row,
            trim: TrimConfig::default(),
            row_gradient: default_row_gradient(),
            height_gradient: HeightGradient::default(),
        }
    }
}

impl RibbonConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }
}

/// Twelve-stop row ramp: grey through indigo, magenta and amber to pale cyan.
pub fn default_row_gradient() -> Vec<ColorStop> {
    const STOPS: [(f32, [u8; 3]); 12] = [
        (0.00, [0x5C, 0x58, 0x5F]),
        (0.09, [0x2C, 0x21, 0x7E]),
        (0.18, [0x2B, 0x20, 0xC1]),
        (0.27, [0x7F, 0x21, 0xA3]),
        (0.36, [0x8A, 0x24, 0x84]),
        (0.45, [0xAE, 0x33, 0x8D]),
        (0.55, [0xC9, 0x4F, 0x75]),
        (0.64, [0xED, 0x87, 0x4F]),
        (0.73, [0xD1, 0xB8, 0x5C]),
        (0.82, [0x57, 0xCE, 0xC9]),
        (0.91, [0xAD, 0xE1, 0xDE]),
        (1.00, [0xE0, 0xE0, 0xDF]),
    ];
    STOPS.iter().map(|&(t, rgb)| ColorStop::new(t, Rgb::from_u8(rgb))).collect()
}
