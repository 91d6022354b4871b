//! Load → normalize → build ribbons → build strokes, and the live scene the
//! renderer keeps afterwards.

use serde::Serialize;
use tracing::{info, warn};

use crate::camera::{frame_camera, CameraFraming, CameraState, Viewport};
use crate::config::RibbonConfig;
use crate::error::Result;
use crate::gradient::is_ascending;
use crate::grid::{TerrainGrid, TerrainMeta};
use crate::loader::{load_terrain, TerrainSource};
use crate::normalize::{resolve_bounds, NormalizationBounds};
use crate::ribbon::{build_ribbons, RibbonSet};
use crate::stroke::{StrokeBuilder, StrokeLayer, StrokeSet};

/// Runs every stage with one immutable configuration.
#[derive(Debug, Clone, Default)]
pub struct RibbonPipeline {
    config: RibbonConfig,
}

impl RibbonPipeline {
    pub fn new(config: RibbonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RibbonConfig {
        &self.config
    }

    /// Fetch and validate the dataset, then build the scene around it.
    pub fn run<S: TerrainSource + ?Sized>(&self, source: &S, viewport: Viewport) -> Result<RibbonScene> {
        let grid = load_terrain(source)?;
        self.build(&grid, viewport)
    }

    /// Build a scene from an already validated grid.
    pub fn build(&self, grid: &TerrainGrid, viewport: Viewport) -> Result<RibbonScene> {
        let config = &self.config;
        if !is_ascending(&config.row_gradient) {
            warn!(stops = config.row_gradient.len(), "row gradient stops are not ascending");
        }

        let bounds = resolve_bounds(grid);
        let ribbons = build_ribbons(grid, &bounds, config)?;
        let framing = frame_camera(&ribbons.bounds, viewport, config);
        let strokes = stroke_builder(config, &ribbons).build(&ribbons.outlines(), &framing.camera);

        info!(
            rows = ribbons.rows.len(),
            strokes = strokes.as_ref().map_or(0, StrokeSet::len),
            "scene ready"
        );

        Ok(RibbonScene {
            meta: grid.meta().clone(),
            bounds,
            camera: framing.camera,
            framing,
            ribbons,
            strokes: StrokeLayer::new(strokes),
            config: config.clone(),
        })
    }
}

fn stroke_builder<'a>(config: &'a RibbonConfig, ribbons: &RibbonSet) -> StrokeBuilder<'a> {
    StrokeBuilder::new(&config.stroke, config.visual.use_fog, ribbons.layout.dx_step)
}

/// Everything the renderer needs for one dataset. Ribbons are fixed once
/// built; only the stroke layer is ever replaced.
#[derive(Debug, Clone, Serialize)]
pub struct RibbonScene {
    pub meta: TerrainMeta,
    pub bounds: NormalizationBounds,
    pub ribbons: RibbonSet,
    /// Initial camera placement.
    pub framing: CameraFraming,
    /// Camera as last reported by the renderer.
    pub camera: CameraState,
    pub strokes: StrokeLayer,
    #[serde(skip)]
    config: RibbonConfig,
}

impl RibbonScene {
    pub fn config(&self) -> &RibbonConfig {
        &self.config
    }

    /// Record a camera change. Returns true when the strokes were rebuilt,
    /// which only happens for zoom-following tubes under a parallel projection.
    pub fn on_view_change(&mut self, camera: CameraState) -> bool {
        self.camera = camera;
        self.rebuild_if_following_zoom()
    }

    /// Apply a new viewport: refit a parallel frustum, update `line2`
    /// resolution, and rebuild zoom-following tubes since their pixel scale
    /// moved with the viewport height.
    pub fn on_resize(&mut self, viewport: Viewport) -> bool {
        self.camera = self.camera.resized(viewport, &self.ribbons.bounds, &self.config);
        self.strokes.set_resolution(&viewport);
        self.rebuild_if_following_zoom()
    }

    fn rebuild_if_following_zoom(&mut self) -> bool {
        let builder = stroke_builder(&self.config, &self.ribbons);
        if !builder.follows_zoom(&self.camera) {
            return false;
        }
        let next = builder.build(&self.ribbons.outlines(), &self.camera);
        self.strokes.replace(next);
        true
    }
}
