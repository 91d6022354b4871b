//! Wavefront OBJ export: one object per ribbon row and per stroke.

use std::io::{self, Write};

use ribbon_core::ribbon::IndexBuffer;
use ribbon_core::stroke::StrokePrimitive;
use ribbon_core::RibbonScene;

/// OBJ indices are 1-based and global across objects.
struct ObjWriter<W: Write> {
    out: W,
    next_vertex: u32,
}

impl<W: Write> ObjWriter<W> {
    fn vertices(&mut self, points: &[[f32; 3]]) -> io::Result<u32> {
        let base = self.next_vertex;
        for [x, y, z] in points {
            writeln!(self.out, "v {x} {y} {z}")?;
        }
        self.next_vertex += points.len() as u32;
        Ok(base)
    }

    fn triangles(&mut self, base: u32, indices: &IndexBuffer) -> io::Result<()> {
        let idx: Vec<u32> = indices.iter().collect();
        for tri in idx.chunks_exact(3) {
            writeln!(self.out, "f {} {} {}", base + tri[0], base + tri[1], base + tri[2])?;
        }
        Ok(())
    }

    fn polyline(&mut self, base: u32, len: usize) -> io::Result<()> {
        if len < 2 {
            return Ok(());
        }
        write!(self.out, "l")?;
        for i in 0..len as u32 {
            write!(self.out, " {}", base + i)?;
        }
        writeln!(self.out)
    }
}

pub fn write_obj<W: Write>(scene: &RibbonScene, out: W) -> io::Result<()> {
    let mut obj = ObjWriter { out, next_vertex: 1 };
    writeln!(obj.out, "# ribbonize: {} rows", scene.ribbons.rows.len())?;

    for row in &scene.ribbons.rows {
        writeln!(obj.out, "o ribbon_{:04}", row.index)?;
        let base = obj.vertices(&row.positions)?;
        obj.triangles(base, &row.indices)?;
    }

    if let Some(set) = scene.strokes.current() {
        for stroke in &set.strokes {
            writeln!(obj.out, "o stroke_{:04}", stroke.row)?;
            match &stroke.primitive {
                StrokePrimitive::Tube(tube) => {
                    let base = obj.vertices(&tube.positions)?;
                    obj.triangles(base, &tube.indices)?;
                }
                StrokePrimitive::Line2 { segments } => {
                    for [a, b] in segments {
                        let base = obj.vertices(&[*a, *b])?;
                        obj.polyline(base, 2)?;
                    }
                }
                StrokePrimitive::Line { points } => {
                    let base = obj.vertices(points)?;
                    obj.polyline(base, points.len())?;
                }
            }
        }
    }

    obj.out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ribbon_core::config::{StrokeMode, TrimConfig};
    use ribbon_core::loader::encode_values;
    use ribbon_core::{MemorySource, RibbonConfig, RibbonPipeline, Viewport};

    fn scene(mode: StrokeMode) -> RibbonScene {
        let mut config = RibbonConfig::default();
        config.trim = TrimConfig { rows: 0, cols: 0 };
        config.stroke.mode = mode;
        let values: Vec<f32> = (0..12).map(|i| (i % 4) as f32).collect();
        let source = MemorySource::new("t", r#"{"rows": 3, "cols": 4, "dx": 10, "dy": 10}"#, encode_values(&values));
        RibbonPipeline::new(config).run(&source, Viewport::new(100.0, 100.0)).unwrap()
    }

    fn render(scene: &RibbonScene) -> String {
        let mut buf = Vec::new();
        write_obj(scene, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn ribbons_and_line_strokes() {
        // Rows 0 and 2; 8 vertices and 6 triangles each, then two 4-point lines.
        let text = render(&scene(StrokeMode::Line));
        assert_eq!(text.lines().filter(|l| l.starts_with("o ribbon_")).count(), 2);
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 2 * 8 + 2 * 4);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 2 * 6);
        assert!(text.contains("f 1 2 3\n"));
        assert!(text.contains("l 17 18 19 20\n"));
    }

    #[test]
    fn face_indices_stay_in_range() {
        let text = render(&scene(StrokeMode::Tube));
        let vertex_count = text.lines().filter(|l| l.starts_with("v ")).count();
        for line in text.lines().filter(|l| l.starts_with("f ")) {
            for idx in line[2..].split(' ') {
                let i: usize = idx.parse().unwrap();
                assert!(i >= 1 && i <= vertex_count, "{line}");
            }
        }
    }
}
