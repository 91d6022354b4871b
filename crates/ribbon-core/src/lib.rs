//! Ribbon terrain core: turns a gridded heightmap into per-row ribbon strip
//! meshes, outline strokes and the bounding data a renderer needs to frame
//! them.
//!
//! The stages run strictly in order: [`loader`] → [`normalize`] →
//! [`ribbon`] → [`stroke`]. [`pipeline::RibbonPipeline`] drives all of them.

pub mod camera;
pub mod config;
pub mod error;
pub mod gradient;
pub mod grid;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod ribbon;
pub mod stroke;

pub use camera::{CameraFraming, CameraState, OrthoFrustum, Projection, Viewport};
pub use config::RibbonConfig;
pub use error::{ConfigError, Error, GeometryError, LoadError, Result};
pub use grid::{TerrainGrid, TerrainMeta};
pub use loader::{load_terrain, DirSource, MemorySource, TerrainSource};
pub use pipeline::{RibbonPipeline, RibbonScene};
pub use ribbon::{build_ribbons, BoundingSummary, IndexBuffer, RibbonRow, RibbonSet};
pub use stroke::{StrokeBuilder, StrokeLayer, StrokePrimitive, StrokeSet};
