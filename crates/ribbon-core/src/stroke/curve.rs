//! Open centripetal Catmull-Rom spline through an outline polyline.

use glam::Vec3;

/// Number of samples used to approximate arc length.
pub const ARC_LENGTH_DIVISIONS: usize = 200;

const MIN_KNOT_SPACING: f32 = 1e-4;

/// Cubic `c0 + c1 t + c2 t² + c3 t³` for one axis of one segment.
#[derive(Debug, Clone, Copy)]
struct Cubic {
    c0: f32,
    c1: f32,
    c2: f32,
    c3: f32,
}

impl Cubic {
    fn hermite(x0: f32, x1: f32, t0: f32, t1: f32) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    /// Non-uniform Catmull-Rom with knot spacings `dt0..dt2`, reparameterised
    /// onto `[0, 1]` over the middle span.
    fn nonuniform(x: [f32; 4], dt0: f32, dt1: f32, dt2: f32) -> Self {
        let [x0, x1, x2, x3] = x;
        let t1 = (x1 - x0) / dt0 - (x2 - x0) / (dt0 + dt1) + (x2 - x1) / dt1;
        let t2 = (x2 - x1) / dt1 - (x3 - x1) / (dt1 + dt2) + (x3 - x2) / dt2;
        Self::hermite(x1, x2, t1 * dt1, t2 * dt1)
    }

    fn eval(&self, t: f32) -> f32 {
        let t2 = t * t;
        self.c0 + self.c1 * t + self.c2 * t2 + self.c3 * t2 * t
    }
}

#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    /// Cumulative chord length at `ARC_LENGTH_DIVISIONS + 1` even parameter steps.
    lengths: Vec<f32>,
}

impl CatmullRomCurve {
    /// Returns `None` for fewer than two points.
    pub fn new(points: &[[f32; 3]]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let mut curve = Self { points: points.iter().copied().map(Vec3::from).collect(), lengths: Vec::new() };
        curve.lengths = curve.arc_lengths(ARC_LENGTH_DIVISIONS);
        Some(curve)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at curve parameter `t` in `[0, 1]`, spread evenly across control
    /// point spans rather than by distance.
    pub fn point(&self, t: f32) -> Vec3 {
        let pts = &self.points;
        let l = pts.len();
        let p = (l - 1) as f32 * t.clamp(0.0, 1.0);
        let mut seg = p.floor() as usize;
        let mut weight = p - seg as f32;
        if seg >= l - 1 {
            seg = l - 2;
            weight = 1.0;
        }

        let p1 = pts[seg];
        let p2 = pts[seg + 1];
        let p0 = if seg > 0 { pts[seg - 1] } else { p1 * 2.0 - p2 };
        let p3 = if seg + 2 < l { pts[seg + 2] } else { p2 * 2.0 - p1 };

        let mut dt0 = p0.distance_squared(p1).powf(0.25);
        let mut dt1 = p1.distance_squared(p2).powf(0.25);
        let mut dt2 = p2.distance_squared(p3).powf(0.25);
        if dt1 < MIN_KNOT_SPACING {
            dt1 = 1.0;
        }
        if dt0 < MIN_KNOT_SPACING {
            dt0 = dt1;
        }
        if dt2 < MIN_KNOT_SPACING {
            dt2 = dt1;
        }

        let axis = |i: usize| {
            Cubic::nonuniform([p0[i], p1[i], p2[i], p3[i]], dt0, dt1, dt2).eval(weight)
        };
        Vec3::new(axis(0), axis(1), axis(2))
    }

    /// Point at fraction `u` of the total arc length.
    pub fn point_at(&self, u: f32) -> Vec3 {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at arc-length fraction `u`, by central difference.
    pub fn tangent_at(&self, u: f32) -> Vec3 {
        let t = self.u_to_t(u);
        let delta = 1e-4;
        let t1 = (t - delta).max(0.0);
        let t2 = (t + delta).min(1.0);
        (self.point(t2) - self.point(t1)).normalize_or_zero()
    }

    fn arc_lengths(&self, divisions: usize) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut last = self.point(0.0);
        let mut sum = 0.0;
        lengths.push(0.0);
        for d in 1..=divisions {
            let current = self.point(d as f32 / divisions as f32);
            sum += current.distance(last);
            lengths.push(sum);
            last = current;
        }
        lengths
    }

    /// Map an arc-length fraction to the curve parameter by binary search over
    /// the cumulative length table and linear interpolation within a sample.
    fn u_to_t(&self, u: f32) -> f32 {
        let lengths = &self.lengths;
        let n = lengths.len();
        let total = self.length();
        if total <= 0.0 {
            return u.clamp(0.0, 1.0);
        }
        let target = u.clamp(0.0, 1.0) * total;

        let i = lengths.partition_point(|&l| l < target).min(n - 1);
        if lengths[i] == target {
            return i as f32 / (n - 1) as f32;
        }
        let i = i.saturating_sub(1);
        let before = lengths[i];
        let after = lengths[(i + 1).min(n - 1)];
        let segment = after - before;
        let fraction = if segment > 0.0 { (target - before) / segment } else { 0.0 };
        (i as f32 + fraction) / (n - 1) as f32
    }
}
