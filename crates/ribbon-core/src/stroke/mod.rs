//! Outline strokes drawn along the top of every ribbon row.
//!
//! Three representations are supported: an extruded tube following a smooth
//! spline, screen-space-width line segments (`line2`) and a plain polyline.
//! Only the tube radius depends on the camera, so only tube strokes ever
//! need rebuilding when the view changes.

pub mod curve;
pub mod tube;

use serde::Serialize;
use tracing::debug;

use crate::camera::{CameraState, Viewport};
use crate::config::{StrokeConfig, StrokeMode};
use crate::gradient::Rgb;

pub use curve::CatmullRomCurve;
pub use tube::{extrude_tube, TubeMesh};

const EPS: f64 = 1e-6;

/// Shared appearance of every stroke in a set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrokeStyle {
    pub color: Rgb,
    pub opacity: f32,
    /// Pixels; ignored by most renderers for plain lines.
    pub width: f32,
    /// Tubes take part in scene fog.
    pub fog: bool,
    /// Drawing-buffer size `line2` widths are measured against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<[f64; 2]>,
}

impl StrokeStyle {
    pub const TRANSPARENT: bool = true;
    pub const DEPTH_WRITE: bool = false;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StrokePrimitive {
    Tube(TubeMesh),
    /// Consecutive outline points as independent start/end pairs.
    Line2 { segments: Vec<[[f32; 3]; 2]> },
    Line { points: Vec<[f32; 3]> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    /// Ribbon row this stroke outlines.
    pub row: usize,
    /// Drawn right after its own ribbon row.
    pub render_order: i32,
    pub primitive: StrokePrimitive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokeSet {
    pub mode: StrokeMode,
    pub style: StrokeStyle,
    /// Tube radius in scene units the set was built with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    pub strokes: Vec<Stroke>,
}

impl StrokeSet {
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

/// Turns outline polylines into a [`StrokeSet`] for the current camera.
#[derive(Debug, Clone, Copy)]
pub struct StrokeBuilder<'a> {
    config: &'a StrokeConfig,
    use_fog: bool,
    /// Scene-space column spacing of the ribbons.
    dx_step: f64,
}

impl<'a> StrokeBuilder<'a> {
    pub fn new(config: &'a StrokeConfig, use_fog: bool, dx_step: f64) -> Self {
        Self { config, use_fog, dx_step }
    }

    /// Tube radius: a constant pixel width under a parallel projection,
    /// otherwise a fixed fraction of the column spacing.
    pub fn tube_radius(&self, camera: &CameraState) -> f32 {
        match camera.pixels_per_unit() {
            Some(ppu) => (self.config.width as f64 / ppu.max(EPS)) as f32,
            None => (self.config.tube.radius as f64 * self.dx_step) as f32,
        }
    }

    /// True when the geometry depends on orthographic zoom and must be rebuilt
    /// after every view change.
    pub fn follows_zoom(&self, camera: &CameraState) -> bool {
        self.config.enabled
            && self.config.mode == StrokeMode::Tube
            && self.config.follow_zoom
            && camera.projection.is_parallel()
    }

    pub fn style(&self, viewport: &Viewport) -> StrokeStyle {
        StrokeStyle {
            color: self.config.color,
            opacity: self.config.opacity,
            width: self.config.width,
            fog: self.use_fog && self.config.mode == StrokeMode::Tube,
            resolution: (self.config.mode == StrokeMode::Line2).then(|| viewport.resolution()),
        }
    }

    /// One stroke per outline in row order, or `None` when strokes are off.
    /// Tube mode skips outlines with fewer than two points.
    pub fn build(&self, outlines: &[Vec<[f32; 3]>], camera: &CameraState) -> Option<StrokeSet> {
        if !self.config.enabled {
            return None;
        }

        let radius = (self.config.mode == StrokeMode::Tube).then(|| self.tube_radius(camera));
        let strokes = self.build_strokes(outlines, radius);
        debug!(
            mode = ?self.config.mode,
            strokes = strokes.len(),
            radius = radius.unwrap_or_default(),
            "strokes built"
        );

        Some(StrokeSet { mode: self.config.mode, style: self.style(&camera.viewport), radius, strokes })
    }

    #[cfg(feature = "threading")]
    fn build_strokes(&self, outlines: &[Vec<[f32; 3]>], radius: Option<f32>) -> Vec<Stroke> {
        use rayon::prelude::*;
        outlines
            .par_iter()
            .enumerate()
            .filter_map(|(row, points)| self.build_stroke(row, points, radius))
            .collect()
    }

    #[cfg(not(feature = "threading"))]
    fn build_strokes(&self, outlines: &[Vec<[f32; 3]>], radius: Option<f32>) -> Vec<Stroke> {
        self.build_strokes_sequential(outlines, radius)
    }

    #[cfg(any(test, not(feature = "threading")))]
    fn build_strokes_sequential(&self, outlines: &[Vec<[f32; 3]>], radius: Option<f32>) -> Vec<Stroke> {
        outlines
            .iter()
            .enumerate()
            .filter_map(|(row, points)| self.build_stroke(row, points, radius))
            .collect()
    }

    fn build_stroke(&self, row: usize, points: &[[f32; 3]], radius: Option<f32>) -> Option<Stroke> {
        let primitive = match self.config.mode {
            StrokeMode::Tube => {
                let curve = CatmullRomCurve::new(points)?;
                let tube = &self.config.tube;
                let scaled = ((points.len() - 1) as f32 * tube.tubular_segments_scale).floor();
                let tubular_segments = (scaled.max(0.0) as usize).max(2);
                StrokePrimitive::Tube(extrude_tube(
                    &curve,
                    tubular_segments,
                    radius.unwrap_or_default(),
                    tube.radial_segments,
                ))
            }
            StrokeMode::Line2 => StrokePrimitive::Line2 {
                segments: points.windows(2).map(|w| [w[0], w[1]]).collect(),
            },
            StrokeMode::Line => StrokePrimitive::Line { points: points.to_vec() },
        };
        Some(Stroke { row, render_order: row as i32 + 1, primitive })
    }
}

/// Holds the live stroke set. A rebuild always swaps in a complete new set;
/// strokes are never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrokeLayer {
    set: Option<StrokeSet>,
    generation: u64,
}

impl StrokeLayer {
    pub fn new(set: Option<StrokeSet>) -> Self {
        Self { set, generation: 0 }
    }

    pub fn current(&self) -> Option<&StrokeSet> {
        self.set.as_ref()
    }

    /// Bumped on every replacement so renderers can tell when to re-upload.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Install `next` and hand back the set it displaced.
    pub fn replace(&mut self, next: Option<StrokeSet>) -> Option<StrokeSet> {
        self.generation += 1;
        std::mem::replace(&mut self.set, next)
    }

    /// Keep `line2` widths in step with the drawing buffer.
    pub fn set_resolution(&mut self, viewport: &Viewport) -> bool {
        match self.set.as_mut() {
            Some(set) if set.mode == StrokeMode::Line2 => {
                set.style.resolution = Some(viewport.resolution());
                true
            }
            _ => false,
        }
    }
}
