//! Browser bindings: the host fetches `meta.json` and `values.bin` itself and
//! hands the raw bytes over; geometry comes back as typed arrays ready for
//! GPU upload.

use js_sys::{Float32Array, Uint16Array, Uint32Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use ribbon_core::camera::{CameraState, Viewport};
use ribbon_core::ribbon::{IndexBuffer, RibbonRow};
use ribbon_core::stroke::{Stroke, StrokePrimitive};
use ribbon_core::{MemorySource, RibbonConfig, RibbonPipeline, RibbonScene};

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(to_js)
}

/// An empty document means defaults.
fn parse_config(json: &str) -> Result<RibbonConfig, ribbon_core::ConfigError> {
    if json.trim().is_empty() {
        Ok(RibbonConfig::default())
    } else {
        RibbonConfig::from_json_str(json)
    }
}

fn flatten(points: &[[f32; 3]]) -> Vec<f32> {
    points.iter().flatten().copied().collect()
}

fn index_array(indices: &IndexBuffer) -> JsValue {
    match indices {
        IndexBuffer::U16(v) => Uint16Array::from(v.as_slice()).into(),
        IndexBuffer::U32(v) => Uint32Array::from(v.as_slice()).into(),
    }
}

/// Flat vertex data for a stroke: tube vertices, `line2` segment endpoints
/// or the plain polyline.
fn stroke_vertices(stroke: &Stroke) -> Vec<f32> {
    match &stroke.primitive {
        StrokePrimitive::Tube(tube) => flatten(&tube.positions),
        StrokePrimitive::Line2 { segments } => segments.iter().flatten().flatten().copied().collect(),
        StrokePrimitive::Line { points } => flatten(points),
    }
}

fn stroke_kind(stroke: &Stroke) -> &'static str {
    match stroke.primitive {
        StrokePrimitive::Tube(_) => "tube",
        StrokePrimitive::Line2 { .. } => "line2",
        StrokePrimitive::Line { .. } => "line",
    }
}

fn build(meta_json: &str, values: &[u8], config_json: &str, viewport_json: &str) -> Result<RibbonScene, String> {
    let config = parse_config(config_json).map_err(|e| e.to_string())?;
    let viewport: Viewport = serde_json::from_str(viewport_json).map_err(|e| format!("invalid viewport: {e}"))?;
    let source = MemorySource::new("host", meta_json.as_bytes(), values);
    RibbonPipeline::new(config).run(&source, viewport).map_err(|e| e.to_string())
}

/// Build a complete scene. `viewport_json` is `{width, height, pixelRatio}`.
#[wasm_bindgen]
pub fn build_scene(
    meta_json: &str,
    values: &[u8],
    config_json: &str,
    viewport_json: &str,
) -> Result<WasmScene, JsValue> {
    build(meta_json, values, config_json, viewport_json).map(|scene| WasmScene { scene }).map_err(to_js)
}

#[wasm_bindgen]
pub struct WasmScene {
    scene: RibbonScene,
}

impl WasmScene {
    fn row(&self, index: usize) -> Result<&RibbonRow, JsValue> {
        self.scene
            .ribbons
            .rows
            .get(index)
            .ok_or_else(|| to_js(format!("row {index} out of range")))
    }

    fn stroke(&self, index: usize) -> Result<&Stroke, JsValue> {
        self.scene
            .strokes
            .current()
            .and_then(|set| set.strokes.get(index))
            .ok_or_else(|| to_js(format!("stroke {index} out of range")))
    }
}

#[wasm_bindgen]
impl WasmScene {
    pub fn row_count(&self) -> usize {
        self.scene.ribbons.rows.len()
    }

    pub fn row_positions(&self, index: usize) -> Result<Float32Array, JsValue> {
        Ok(Float32Array::from(flatten(&self.row(index)?.positions).as_slice()))
    }

    /// `Uint16Array` or `Uint32Array` depending on the row's vertex count.
    pub fn row_indices(&self, index: usize) -> Result<JsValue, JsValue> {
        Ok(index_array(&self.row(index)?.indices))
    }

    pub fn row_normals(&self, index: usize) -> Result<Option<Float32Array>, JsValue> {
        Ok(self.row(index)?.normals.as_deref().map(|n| Float32Array::from(flatten(n).as_slice())))
    }

    pub fn row_outline(&self, index: usize) -> Result<Float32Array, JsValue> {
        Ok(Float32Array::from(flatten(&self.row(index)?.outline).as_slice()))
    }

    pub fn row_material(&self, index: usize) -> Result<JsValue, JsValue> {
        to_value(&self.row(index)?.material)
    }

    pub fn row_render_order(&self, index: usize) -> Result<i32, JsValue> {
        Ok(self.row(index)?.render_order)
    }

    pub fn stroke_count(&self) -> usize {
        self.scene.strokes.current().map_or(0, |s| s.len())
    }

    /// Bumped whenever the stroke set is replaced.
    pub fn stroke_generation(&self) -> u64 {
        self.scene.strokes.generation()
    }

    pub fn stroke_kind(&self, index: usize) -> Result<String, JsValue> {
        Ok(stroke_kind(self.stroke(index)?).to_owned())
    }

    pub fn stroke_vertices(&self, index: usize) -> Result<Float32Array, JsValue> {
        Ok(Float32Array::from(stroke_vertices(self.stroke(index)?).as_slice()))
    }

    /// Triangle indices for tube strokes; `undefined` for line strokes.
    pub fn stroke_indices(&self, index: usize) -> Result<JsValue, JsValue> {
        Ok(match &self.stroke(index)?.primitive {
            StrokePrimitive::Tube(tube) => index_array(&tube.indices),
            _ => JsValue::UNDEFINED,
        })
    }

    pub fn stroke_render_order(&self, index: usize) -> Result<i32, JsValue> {
        Ok(self.stroke(index)?.render_order)
    }

    pub fn stroke_style(&self) -> Result<JsValue, JsValue> {
        match self.scene.strokes.current() {
            Some(set) => to_value(&set.style),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn bounds(&self) -> Result<JsValue, JsValue> {
        to_value(&self.scene.ribbons.bounds)
    }

    pub fn framing(&self) -> Result<JsValue, JsValue> {
        to_value(&self.scene.framing)
    }

    pub fn normalization(&self) -> Result<JsValue, JsValue> {
        to_value(&self.scene.bounds)
    }

    /// Report the live camera. Returns true when strokes were rebuilt and
    /// must be re-uploaded.
    pub fn rebuild_strokes(&mut self, camera_json: &str) -> Result<bool, JsValue> {
        let camera: CameraState = serde_json::from_str(camera_json).map_err(to_js)?;
        Ok(self.scene.on_view_change(camera))
    }

    pub fn resize(&mut self, viewport_json: &str) -> Result<bool, JsValue> {
        let viewport: Viewport = serde_json::from_str(viewport_json).map_err(to_js)?;
        Ok(self.scene.on_resize(viewport))
    }
}
