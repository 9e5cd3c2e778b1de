//! Cubic Hermite spline through curve control points.
//!
//! Tangents are Catmull-Rom style (secant across the two neighbours),
//! one-sided at the first and last point.

/// A curve control point `(x, y)` in [0, 1]^2.
pub type CurvePoint = (f32, f32);

/// Identity curve.
pub const IDENTITY: [CurvePoint; 2] = [(0.0, 0.0), (1.0, 1.0)];

/// Points closer than this in x are merged.
const MIN_SPACING: f32 = 1e-4;

/// Cleans user points into a valid curve.
///
/// Drops non-finite points, clamps into the unit square, sorts by x,
/// merges near-duplicate x (last wins) and pins x = 0 and x = 1 using the
/// nearest point's y. Fewer than two usable points give the identity.
pub fn sanitize(points: &[CurvePoint]) -> Vec<CurvePoint> {
    let mut pts: Vec<CurvePoint> = points
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|&(x, y)| (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)))
        .collect();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out: Vec<CurvePoint> = Vec::with_capacity(pts.len() + 2);
    for p in pts {
        match out.last_mut() {
            Some(last) if p.0 - last.0 < MIN_SPACING => *last = p,
            _ => out.push(p),
        }
    }
    if out.is_empty() {
        return IDENTITY.to_vec();
    }
    if out[0].0 > 0.0 {
        let y = out[0].1;
        out.insert(0, (0.0, y));
    }
    let (last_x, last_y) = out[out.len() - 1];
    if last_x < 1.0 {
        out.push((1.0, last_y));
    }
    if out.len() < 2 {
        return IDENTITY.to_vec();
    }
    out
}

/// Hermite spline over sanitized points.
#[derive(Debug, Clone, PartialEq)]
pub struct HermiteSpline {
    points: Vec<CurvePoint>,
    tangents: Vec<f32>,
}

impl HermiteSpline {
    /// Builds a spline; points are sanitized first.
    pub fn new(points: &[CurvePoint]) -> Self {
        let points = sanitize(points);
        let tangents = tangents(&points);
        Self { points, tangents }
    }

    /// Control points after sanitizing.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Evaluates at `x`, clamped to [0, 1].
    pub fn evaluate(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let n = self.points.len();
        // segment whose right end is the first point with px >= x
        let k = self.points.partition_point(|p| p.0 < x).clamp(1, n - 1);
        let (x0, y0) = self.points[k - 1];
        let (x1, y1) = self.points[k];
        let h = x1 - x0;
        if h <= 0.0 {
            return y1;
        }
        let t = (x - x0) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * y0 + h10 * h * self.tangents[k - 1] + h01 * y1 + h11 * h * self.tangents[k]
    }
}

fn tangents(points: &[CurvePoint]) -> Vec<f32> {
    let n = points.len();
    let secant = |a: usize, b: usize| {
        let dx = points[b].0 - points[a].0;
        if dx > 0.0 { (points[b].1 - points[a].1) / dx } else { 0.0 }
    };
    (0..n)
        .map(|i| {
            if i == 0 {
                secant(0, 1)
            } else if i == n - 1 {
                secant(n - 2, n - 1)
            } else {
                secant(i - 1, i + 1)
            }
        })
        .collect()
}
