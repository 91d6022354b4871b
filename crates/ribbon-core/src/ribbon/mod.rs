//! Ribbon mesh construction.
//!
//! Every sampled grid row becomes an independent strip: a top vertex at the
//! scaled height and a base vertex at `ribbon.baseHeight` per sampled column,
//! joined by two triangles per column span. Rows only read the shared grid,
//! bounds and plan, so they are built independently (in parallel with the
//! `threading` feature) and collected in row order.

pub mod bounds;
pub mod buffers;
pub mod plan;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ColorMode, RibbonConfig};
use crate::error::GeometryError;
use crate::gradient::{sample_gradient, Rgb};
use crate::grid::{RowOrder, TerrainGrid};
use crate::normalize::NormalizationBounds;

pub use bounds::BoundingSummary;
pub use buffers::{compute_vertex_normals, IndexBuffer, IndexFormat};
pub use plan::SamplingPlan;

/// How a ribbon row is coloured.
///
/// Ribbon materials are always transparent, double-sided and do not write
/// depth; see [`RibbonMaterial::DOUBLE_SIDED`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RibbonMaterial {
    /// One colour for the whole row.
    RowColor { color: Rgb, opacity: f32, lit: bool },
    /// Colour follows vertex height between `z_min` and `z_max`, evaluated by
    /// the renderer per fragment.
    HeightRange { z_min: f32, z_max: f32, low: Rgb, high: Rgb, opacity: f32 },
}

impl RibbonMaterial {
    pub const DOUBLE_SIDED: bool = true;
    pub const TRANSPARENT: bool = true;
    pub const DEPTH_WRITE: bool = false;

    pub fn opacity(&self) -> f32 {
        match *self {
            RibbonMaterial::RowColor { opacity, .. } | RibbonMaterial::HeightRange { opacity, .. } => {
                opacity
            }
        }
    }

    /// Colour of a surface point at height `z`, for consumers that bake
    /// colours instead of shading per fragment.
    pub fn color_at(&self, z: f32) -> Rgb {
        match *self {
            RibbonMaterial::RowColor { color, .. } => color,
            RibbonMaterial::HeightRange { z_min, z_max, low, high, .. } => {
                let span = z_max - z_min;
                let t = if span > 0.0 { ((z - z_min) / span).clamp(0.0, 1.0) } else { 0.0 };
                low.lerp(high, t)
            }
        }
    }
}

/// One sampled grid row as a renderable strip plus its outline polyline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RibbonRow {
    /// Position in the sampled sequence (0-based).
    pub index: usize,
    /// Source row in the terrain grid.
    pub data_row: usize,
    /// Top/base vertex pairs, `2 * used_cols` entries.
    pub positions: Vec<[f32; 3]>,
    pub indices: IndexBuffer,
    /// Present only for lit shading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<[f32; 3]>>,
    /// Top surface lifted by `stroke.zOffset`, one point per sampled column.
    pub outline: Vec<[f32; 3]>,
    pub material: RibbonMaterial,
    /// Painter's order: farther rows (lower index) draw first.
    pub render_order: i32,
}

/// Scene-space layout shared by all rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RibbonLayout {
    pub dx_step: f64,
    pub dy_step: f64,
    pub used_rows: usize,
    pub used_cols: usize,
    pub x_offset: f64,
    pub y_offset: f64,
    /// Height of a fully normalised sample; `(used_cols - 1) * dx_step * zScaleFactor`.
    pub z_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RibbonSet {
    pub plan: SamplingPlan,
    pub layout: RibbonLayout,
    pub rows: Vec<RibbonRow>,
    pub bounds: BoundingSummary,
}

impl RibbonSet {
    /// Outline polylines in row order, as consumed by the stroke builder.
    pub fn outlines(&self) -> Vec<Vec<[f32; 3]>> {
        self.rows.iter().map(|r| r.outline.clone()).collect()
    }
}

struct RowContext<'a> {
    grid: &'a TerrainGrid,
    bounds: &'a NormalizationBounds,
    config: &'a RibbonConfig,
    plan: &'a SamplingPlan,
    layout: RibbonLayout,
    height_material: Option<RibbonMaterial>,
}

/// Build every ribbon row for a validated grid.
pub fn build_ribbons(
    grid: &TerrainGrid,
    bounds: &NormalizationBounds,
    config: &RibbonConfig,
) -> Result<RibbonSet, GeometryError> {
    let plan = SamplingPlan::new(
        grid.rows(),
        grid.cols(),
        config.trim.rows,
        config.trim.cols,
        config.ribbon.row_step,
        config.ribbon.col_step,
    )?;
    let layout = compute_layout(grid, config, &plan);
    debug!(
        used_rows = layout.used_rows,
        used_cols = layout.used_cols,
        dx_step = layout.dx_step,
        dy_step = layout.dy_step,
        z_scale = layout.z_scale,
        "sampling plan ready"
    );

    let height_material = match config.color_mode {
        ColorMode::Height => Some(RibbonMaterial::HeightRange {
            z_min: 0.0,
            z_max: layout.z_scale as f32,
            low: config.height_gradient.low,
            high: config.height_gradient.high,
            opacity: config.ribbon.opacity,
        }),
        ColorMode::Row => None,
    };

    let ctx = RowContext { grid, bounds, config, plan: &plan, layout, height_material };
    let rows = build_rows(&ctx);

    let summary = BoundingSummary::from_points(rows.iter().flat_map(|r| r.positions.iter()));
    info!(
        rows = rows.len(),
        cols = layout.used_cols,
        max_dim = summary.max_dim,
        "ribbons built"
    );

    Ok(RibbonSet { plan, layout, rows, bounds: summary })
}

fn compute_layout(grid: &TerrainGrid, config: &RibbonConfig, plan: &SamplingPlan) -> RibbonLayout {
    let (dx_m, dy_m) = grid.cell_size_meters();
    let row_step = config.ribbon.row_step.max(1) as f64;
    let col_step = config.ribbon.col_step.max(1) as f64;

    let dx = dx_m * config.meters_to_units;
    let dy = dy_m * config.meters_to_units * config.depth_scale;
    let dx_step = dx * col_step;
    let dy_step = dy * row_step * config.ribbon.row_gap;

    let used_rows = plan.used_rows();
    let used_cols = plan.used_cols();
    let width = (used_cols - 1) as f64 * dx_step;
    let depth = (used_rows - 1) as f64 * dy_step;

    RibbonLayout {
        dx_step,
        dy_step,
        used_rows,
        used_cols,
        x_offset: -width / 2.0,
        y_offset: -depth / 2.0,
        z_scale: width * config.z_scale_factor,
    }
}

#[cfg(feature = "threading")]
fn build_rows(ctx: &RowContext<'_>) -> Vec<RibbonRow> {
    use rayon::prelude::*;
    (0..ctx.layout.used_rows).into_par_iter().map(|r| build_row(ctx, r)).collect()
}

#[cfg(not(feature = "threading"))]
fn build_rows(ctx: &RowContext<'_>) -> Vec<RibbonRow> {
    build_rows_sequential(ctx)
}

#[cfg(any(test, not(feature = "threading")))]
fn build_rows_sequential(ctx: &RowContext<'_>) -> Vec<RibbonRow> {
    (0..ctx.layout.used_rows).map(|r| build_row(ctx, r)).collect()
}

fn build_row(ctx: &RowContext<'_>, r: usize) -> RibbonRow {
    let RibbonLayout { dx_step, dy_step, used_rows, used_cols, x_offset, y_offset, z_scale } =
        ctx.layout;
    let cols = ctx.grid.cols();
    let values = ctx.grid.values();
    let base_height = ctx.config.ribbon.base_height;
    let z_offset = ctx.config.stroke.z_offset as f64;
    let data_row = ctx.plan.row_indices[r];

    let y_index = match ctx.grid.row_order() {
        RowOrder::NorthToSouth => used_rows - 1 - r,
        RowOrder::SouthToNorth => r,
    };
    let y = y_offset + y_index as f64 * dy_step;

    let mut positions = Vec::with_capacity(used_cols * 2);
    let mut outline = Vec::with_capacity(used_cols);
    for (c, &data_col) in ctx.plan.col_indices.iter().enumerate() {
        let raw = values[data_row * cols + data_col];
        let z = ctx.bounds.normalize(raw) * z_scale;
        let x = x_offset + c as f64 * dx_step;

        positions.push([x as f32, y as f32, z as f32]);
        positions.push([x as f32, y as f32, base_height]);
        outline.push([x as f32, y as f32, (z + z_offset) as f32]);
    }

    let vertex_count = used_cols * 2;
    let indices = IndexBuffer::for_vertex_count(vertex_count, strip_indices(used_cols));

    let material = ctx.height_material.unwrap_or_else(|| {
        let t = if used_rows > 1 { r as f32 / (used_rows - 1) as f32 } else { 0.0 };
        RibbonMaterial::RowColor {
            color: sample_gradient(t, &ctx.config.row_gradient),
            opacity: ctx.config.ribbon.opacity,
            lit: ctx.config.visual.use_lambert,
        }
    });

    let normals = ctx
        .config
        .visual
        .use_lambert
        .then(|| compute_vertex_normals(&positions, &indices));

    RibbonRow {
        index: r,
        data_row,
        positions,
        indices,
        normals,
        outline,
        material,
        render_order: r as i32,
    }
}

/// Two triangles per span: (top0, base0, top1) and (base0, base1, top1).
fn strip_indices(used_cols: usize) -> impl Iterator<Item = u32> {
    (0..used_cols.saturating_sub(1) as u32).flat_map(|c| {
        let top0 = c * 2;
        let base0 = top0 + 1;
        let top1 = top0 + 2;
        let base1 = top0 + 3;
        [top0, base0, top1, base0, base1, top1]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrimConfig;
    use crate::gradient::ColorStop;
    use crate::grid::{ExtentMeters, TerrainMeta};
    use crate::normalize::resolve_bounds;
    use approx::assert_relative_eq;

    fn ramp_grid(rows: usize, cols: usize, order: RowOrder) -> TerrainGrid {
        let meta = TerrainMeta {
            rows,
            cols,
            extent_meters: Some(ExtentMeters {
                xmin: 0.0,
                xmax: cols as f64 * 1000.0,
                ymin: 0.0,
                ymax: rows as f64 * 1000.0,
            }),
            row_order: order,
            ..TerrainMeta::default()
        };
        let values = (0..rows * cols).map(|i| (i % cols) as f32).collect();
        TerrainGrid::new(meta, values).unwrap()
    }

    fn plain_config() -> RibbonConfig {
        let mut c = RibbonConfig::default();
        c.trim = TrimConfig { rows: 0, cols: 0 };
        c.ribbon.row_step = 1;
        c.ribbon.col_step = 1;
        c.ribbon.row_gap = 1.0;
        c
    }

    fn build(grid: &TerrainGrid, config: &RibbonConfig) -> RibbonSet {
        build_ribbons(grid, &resolve_bounds(grid), config).unwrap()
    }

    #[test]
    fn layout_uses_unit_conversion_and_self_relative_height() {
        let grid = ramp_grid(3, 5, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.ribbon.col_step = 2;
        config.ribbon.row_gap = 1.5;
        let set = build(&grid, &config);
        let l = set.layout;
        // 1000 m cells at 1/1000 → 1 unit, stride 2.
        assert_relative_eq!(l.dx_step, 2.0);
        assert_relative_eq!(l.dy_step, 1.5);
        assert_eq!((l.used_rows, l.used_cols), (3, 3));
        assert_relative_eq!(l.z_scale, 4.0 * 0.18);
        assert_relative_eq!(l.x_offset, -2.0);
        assert_relative_eq!(l.y_offset, -1.5);
    }

    #[test]
    fn vertices_pair_top_and_base() {
        let grid = ramp_grid(2, 4, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.ribbon.base_height = -0.25;
        let set = build(&grid, &config);
        let row = &set.rows[0];
        let z_scale = set.layout.z_scale as f32;
        assert_eq!(row.positions.len(), 8);
        // Ramp 0..3 across columns normalises to 0, 1/3, 2/3, 1.
        assert_relative_eq!(row.positions[0][2], 0.0);
        assert_relative_eq!(row.positions[6][2], z_scale, epsilon = 1e-6);
        for pair in row.positions.chunks_exact(2) {
            assert_eq!(pair[0][0], pair[1][0]);
            assert_eq!(pair[0][1], pair[1][1]);
            assert_eq!(pair[1][2], -0.25);
        }
    }

    #[test]
    fn strip_topology() {
        let grid = ramp_grid(1, 3, RowOrder::SouthToNorth);
        let set = build(&grid, &plain_config());
        assert_eq!(set.rows[0].indices, IndexBuffer::U16(vec![0, 1, 2, 1, 3, 2, 2, 3, 4, 3, 5, 4]));
    }

    #[test]
    fn outline_follows_top_plus_offset() {
        let grid = ramp_grid(2, 4, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.stroke.z_offset = 0.5;
        let set = build(&grid, &config);
        for row in &set.rows {
            assert_eq!(row.outline.len(), 4);
            for (c, p) in row.outline.iter().enumerate() {
                let top = row.positions[c * 2];
                assert_eq!((p[0], p[1]), (top[0], top[1]));
                assert_relative_eq!(p[2], top[2] + 0.5, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn north_to_south_reverses_lateral_order() {
        let config = plain_config();
        let s2n = build(&ramp_grid(4, 3, RowOrder::SouthToNorth), &config);
        let n2s = build(&ramp_grid(4, 3, RowOrder::NorthToSouth), &config);
        let y = |set: &RibbonSet, r: usize| set.rows[r].positions[0][1];
        assert!(y(&s2n, 0) < y(&s2n, 3));
        assert!(y(&n2s, 0) > y(&n2s, 3));
        assert_eq!(y(&s2n, 0), y(&n2s, 3));
        assert_eq!(n2s.rows[0].data_row, 0);
    }

    #[test]
    fn row_colors_span_the_gradient() {
        let grid = ramp_grid(3, 3, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.row_gradient = vec![ColorStop::new(0.0, Rgb::BLACK), ColorStop::new(1.0, Rgb::WHITE)];
        let set = build(&grid, &config);
        let colors: Vec<f32> = set
            .rows
            .iter()
            .map(|r| match r.material {
                RibbonMaterial::RowColor { color, .. } => color.r,
                other => panic!("unexpected material {other:?}"),
            })
            .collect();
        assert_eq!(colors, vec![0.0, 0.5, 1.0]);
        assert_eq!(set.rows[2].render_order, 2);
    }

    #[test]
    fn single_row_samples_gradient_start() {
        let grid = ramp_grid(1, 3, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.row_gradient = vec![ColorStop::new(0.0, Rgb::BLACK), ColorStop::new(1.0, Rgb::WHITE)];
        let set = build(&grid, &config);
        assert!(matches!(set.rows[0].material, RibbonMaterial::RowColor { color, .. } if color == Rgb::BLACK));
    }

    #[test]
    fn height_mode_exposes_range() {
        let grid = ramp_grid(2, 6, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.color_mode = ColorMode::Height;
        let set = build(&grid, &config);
        let z_scale = set.layout.z_scale as f32;
        for row in &set.rows {
            match row.material {
                RibbonMaterial::HeightRange { z_min, z_max, low, high, .. } => {
                    assert_eq!(z_min, 0.0);
                    assert_eq!(z_max, z_scale);
                    assert_eq!(low, config.height_gradient.low);
                    assert_eq!(high, config.height_gradient.high);
                }
                other => panic!("unexpected material {other:?}"),
            }
        }
        assert_eq!(set.rows[0].material.color_at(z_scale).to_u8(), config.height_gradient.high.to_u8());
        assert_eq!(set.rows[0].material.color_at(-1.0), config.height_gradient.low);
    }

    #[test]
    fn lambert_adds_normals() {
        let grid = ramp_grid(2, 3, RowOrder::SouthToNorth);
        let mut config = plain_config();
        assert!(build(&grid, &config).rows[0].normals.is_none());
        config.visual.use_lambert = true;
        let set = build(&grid, &config);
        assert_eq!(set.rows[0].normals.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn index_width_threshold() {
        let config = plain_config();
        let wide = build(&ramp_grid(1, 32768, RowOrder::SouthToNorth), &config);
        assert_eq!(wide.rows[0].indices.format(), IndexFormat::U32);
        let narrow = build(&ramp_grid(1, 32767, RowOrder::SouthToNorth), &config);
        assert_eq!(narrow.rows[0].indices.format(), IndexFormat::U16);
        assert_eq!(narrow.rows[0].indices.len(), 32766 * 6);
    }

    #[test]
    fn rebuild_is_deterministic() {
        let grid = ramp_grid(9, 17, RowOrder::NorthToSouth);
        let mut config = RibbonConfig::default();
        config.trim = TrimConfig { rows: 2, cols: 3 };
        let a = build(&grid, &config);
        let b = build(&grid, &config);
        assert_eq!(a, b);
        let bits = |s: &RibbonSet| -> Vec<u32> {
            s.rows.iter().flat_map(|r| r.positions.iter().flatten().map(|v| v.to_bits())).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[cfg(feature = "threading")]
    #[test]
    fn parallel_rows_match_sequential_rows() {
        let grid = ramp_grid(23, 41, RowOrder::NorthToSouth);
        let mut config = RibbonConfig::default();
        config.visual.use_lambert = true;
        let bounds = resolve_bounds(&grid);
        let plan = SamplingPlan::new(grid.rows(), grid.cols(), 1, 2, 2, 3).unwrap();
        let layout = compute_layout(&grid, &config, &plan);
        let ctx = RowContext {
            grid: &grid,
            bounds: &bounds,
            config: &config,
            plan: &plan,
            layout,
            height_material: None,
        };

        let parallel = build_rows(&ctx);
        let sequential = build_rows_sequential(&ctx);
        assert_eq!(parallel, sequential);
        let bits = |rows: &[RibbonRow]| -> Vec<u32> {
            rows.iter()
                .flat_map(|r| r.positions.iter().chain(r.normals.iter().flatten()).flatten().map(|v| v.to_bits()))
                .collect()
        };
        assert_eq!(bits(&parallel), bits(&sequential));
    }

    #[test]
    fn trim_that_empties_plan_fails_before_building() {
        let grid = ramp_grid(0, 4, RowOrder::SouthToNorth);
        let err = build_ribbons(&grid, &resolve_bounds(&grid), &plain_config()).unwrap_err();
        assert!(matches!(err, GeometryError::EmptySamplingPlan { .. }));
    }

    #[test]
    fn flat_single_column_terrain_frames_at_least_one_unit() {
        let meta = TerrainMeta { rows: 1, cols: 1, dx: Some(1.0), dy: Some(1.0), ..TerrainMeta::default() };
        let grid = TerrainGrid::new(meta, vec![3.0]).unwrap();
        let set = build(&grid, &plain_config());
        assert_eq!(set.layout.z_scale, 0.0);
        assert_eq!(set.bounds.max_dim, 1.0);
        assert!(set.rows[0].indices.is_empty());
    }

    #[test]
    fn bounds_ignore_outline_points() {
        let grid = ramp_grid(2, 4, RowOrder::SouthToNorth);
        let mut config = plain_config();
        config.stroke.z_offset = 100.0;
        let set = build(&grid, &config);
        assert_relative_eq!(set.bounds.max.z, set.layout.z_scale, epsilon = 1e-6);
    }
}
