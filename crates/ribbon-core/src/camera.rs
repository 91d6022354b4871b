//! Camera and viewport state supplied by the renderer, and the framing
//! derived from a ribbon set's bounding summary.
//!
//! The scene is Z-up: rows run along X, successive rows step along Y and
//! heights rise along Z.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::config::{CameraMode, RibbonConfig};
use crate::ribbon::BoundingSummary;

/// Vertical field of view used for perspective framing.
pub const PERSPECTIVE_FOV_DEG: f64 = 35.0;

const EPS: f64 = 1e-6;

fn unit_pixel_ratio() -> f64 {
    1.0
}

/// Canvas size in CSS pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default = "unit_pixel_ratio")]
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, pixel_ratio: 1.0 }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height.max(EPS)
    }

    /// Size of the drawing buffer in device pixels.
    pub fn resolution(&self) -> [f64; 2] {
        [self.width * self.pixel_ratio, self.height * self.pixel_ratio]
    }
}

/// Symmetric orthographic frustum in scene units, before zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrthoFrustum {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub zoom: f64,
}

impl OrthoFrustum {
    /// Fit the terrain depth (`size.y`) times `padding` into the view height.
    pub fn fit(size: DVec3, viewport: &Viewport, padding: f64, zoom: f64) -> Self {
        let height = size.y.max(EPS) * padding;
        let width = height * viewport.aspect();
        Self { left: -width / 2.0, right: width / 2.0, top: height / 2.0, bottom: -height / 2.0, zoom }
    }

    /// Scene units visible from bottom to top at the current zoom.
    pub fn visible_height(&self) -> f64 {
        (self.top - self.bottom) / self.zoom.max(EPS)
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    Parallel(OrthoFrustum),
    Perspective { fov_deg: f64 },
}

impl Projection {
    pub fn is_parallel(&self) -> bool {
        matches!(self, Projection::Parallel(_))
    }
}

/// What the stroke builder needs to know about the live camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub projection: Projection,
    pub viewport: Viewport,
}

impl CameraState {
    /// Scene-to-pixel scale for a parallel projection.
    pub fn pixels_per_unit(&self) -> Option<f64> {
        match self.projection {
            Projection::Parallel(frustum) => {
                Some(self.viewport.height / frustum.visible_height().max(EPS))
            }
            Projection::Perspective { .. } => None,
        }
    }

    /// Apply a new viewport. A parallel frustum is refitted to `bounds` and
    /// its zoom reset to the configured value.
    pub fn resized(&self, viewport: Viewport, bounds: &BoundingSummary, config: &RibbonConfig) -> Self {
        let projection = match self.projection {
            Projection::Parallel(_) => Projection::Parallel(OrthoFrustum::fit(
                bounds.size,
                &viewport,
                config.ortho.padding,
                config.ortho.zoom,
            )),
            other => other,
        };
        Self { projection, viewport }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogRange {
    pub near: f64,
    pub far: f64,
}

/// Initial camera placement for a ribbon set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraFraming {
    pub camera: CameraState,
    pub position: DVec3,
    pub target: DVec3,
    pub up: DVec3,
    pub near: f64,
    pub far: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fog: Option<FogRange>,
}

/// Frame the whole ribbon set: look at its centre from the front-right and
/// above, with clip planes scaled to `max_dim`.
pub fn frame_camera(bounds: &BoundingSummary, viewport: Viewport, config: &RibbonConfig) -> CameraFraming {
    let projection = match config.camera_mode {
        CameraMode::Ortho => Projection::Parallel(OrthoFrustum::fit(
            bounds.size,
            &viewport,
            config.ortho.padding,
            config.ortho.zoom,
        )),
        CameraMode::Perspective => Projection::Perspective { fov_deg: PERSPECTIVE_FOV_DEG },
    };

    let BoundingSummary { size, center, max_dim, .. } = *bounds;
    let position = center + DVec3::new(size.x * 0.2, -size.y * 1.2, size.z * 1.2);

    CameraFraming {
        camera: CameraState { projection, viewport },
        position,
        target: center,
        up: DVec3::Z,
        near: max_dim / 100.0,
        far: max_dim * 20.0,
        fog: fog_range(bounds, config),
    }
}

pub fn fog_range(bounds: &BoundingSummary, config: &RibbonConfig) -> Option<FogRange> {
    config.visual.use_fog.then(|| FogRange {
        near: bounds.max_dim * config.fog.near,
        far: bounds.max_dim * config.fog.far,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bounds(size: DVec3) -> BoundingSummary {
        let half = size * 0.5;
        BoundingSummary::from_points(&[(-half).as_vec3().to_array(), half.as_vec3().to_array()])
    }

    #[test]
    fn ortho_frustum_fits_depth_with_padding() {
        let f = OrthoFrustum::fit(DVec3::new(10.0, 4.0, 1.0), &Viewport::new(800.0, 400.0), 1.15, 1.0);
        assert_relative_eq!(f.top - f.bottom, 4.6);
        assert_relative_eq!(f.right - f.left, 9.2);
        assert_relative_eq!(f.visible_height(), 4.6);
        assert_relative_eq!(f.with_zoom(2.0).visible_height(), 2.3);
    }

    #[test]
    fn framing_scales_clip_planes() {
        let b = bounds(DVec3::new(10.0, 4.0, 2.0));
        let framing = frame_camera(&b, Viewport::new(800.0, 600.0), &RibbonConfig::default());
        assert_relative_eq!(framing.near, 0.1);
        assert_relative_eq!(framing.far, 200.0);
        assert_relative_eq!(framing.position.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(framing.position.y, -4.8, epsilon = 1e-6);
        assert_relative_eq!(framing.position.z, 2.4, epsilon = 1e-6);
        assert!(framing.camera.projection.is_parallel());
        assert!(framing.fog.is_none());
    }

    #[test]
    fn perspective_mode_and_fog() {
        let mut config = RibbonConfig::default();
        config.camera_mode = CameraMode::Perspective;
        config.visual.use_fog = true;
        let b = bounds(DVec3::new(5.0, 2.0, 1.0));
        let framing = frame_camera(&b, Viewport::new(100.0, 100.0), &config);
        assert_eq!(framing.camera.projection, Projection::Perspective { fov_deg: PERSPECTIVE_FOV_DEG });
        let fog = framing.fog.unwrap();
        assert_relative_eq!(fog.near, 3.0);
        assert_relative_eq!(fog.far, 11.0);
        assert_eq!(framing.camera.pixels_per_unit(), None);
    }

    #[test]
    fn pixels_per_unit_tracks_zoom() {
        let frustum = OrthoFrustum { left: -5.0, right: 5.0, top: 2.0, bottom: -2.0, zoom: 1.0 };
        let cam = CameraState { projection: Projection::Parallel(frustum), viewport: Viewport::new(400.0, 400.0) };
        assert_relative_eq!(cam.pixels_per_unit().unwrap(), 100.0);
        let zoomed = CameraState { projection: Projection::Parallel(frustum.with_zoom(2.0)), ..cam };
        assert_relative_eq!(zoomed.pixels_per_unit().unwrap(), 200.0);
    }

    #[test]
    fn resize_refits_parallel_frustum() {
        let config = RibbonConfig::default();
        let b = bounds(DVec3::new(10.0, 4.0, 1.0));
        let cam = frame_camera(&b, Viewport::new(400.0, 400.0), &config).camera;
        let resized = cam.resized(Viewport::new(800.0, 400.0), &b, &config);
        match resized.projection {
            Projection::Parallel(f) => assert_relative_eq!(f.right - f.left, 9.2, epsilon = 1e-9),
            other => panic!("expected parallel projection, got {other:?}"),
        }
        assert_eq!(resized.viewport.width, 800.0);
    }

    #[test]
    fn camera_state_parses_from_json() {
        let cam: CameraState = serde_json::from_str(
            r#"{"projection": {"kind": "parallel", "left": -1, "right": 1, "top": 1, "bottom": -1, "zoom": 3},
                "viewport": {"width": 640, "height": 480, "pixelRatio": 2}}"#,
        )
        .unwrap();
        assert!(cam.projection.is_parallel());
        assert_eq!(cam.viewport.resolution(), [1280.0, 960.0]);
        let cam: CameraState = serde_json::from_str(
            r#"{"projection": {"kind": "perspective", "fov_deg": 35}, "viewport": {"width": 10, "height": 10}}"#,
        )
        .unwrap();
        assert_eq!(cam.viewport.pixel_ratio, 1.0);
    }
}
