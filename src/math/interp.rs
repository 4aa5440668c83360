//! Interpolation and polyline helpers for sampled curves.

use crate::domain::Point;

/// Running maximum: removes local inversions so the result never decreases.
pub fn monotonize(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut current = f64::NEG_INFINITY;
    for &v in values {
        current = current.max(v);
        out.push(current);
    }
    out
}

/// Linear interpolation between `a` and `b` evaluated at `x`.
pub fn linear_interp(a: Point, b: Point, x: f64) -> f64 {
    let (x0, y0) = a;
    let (x1, y1) = b;
    if (x1 - x0).abs() < 1e-15 {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

/// First index in `values[..limit]` whose value is `>= level`.
pub fn first_at_or_above(values: &[f64], level: f64, limit: usize) -> Option<usize> {
    values[..limit.min(values.len())].iter().position(|&v| v >= level)
}

/// `x` at which the sampled curve `(x, y)` first reaches `level` in `y`,
/// searching `..limit`. Interpolates linearly between the bracketing samples.
pub fn x_at_level(x: &[f64], y: &[f64], level: f64, limit: usize) -> Option<f64> {
    let i = first_at_or_above(y, level, limit)?;
    if i == 0 {
        return Some(x[0]);
    }
    Some(linear_interp((y[i - 1], x[i - 1]), (y[i], x[i]), level))
}

/// `y` where the sampled curve first reaches `x_target` in `x`.
pub fn y_at_x(x: &[f64], y: &[f64], x_target: f64) -> Option<f64> {
    let i = x.iter().position(|&v| v >= x_target)?;
    if i == 0 {
        return y.first().copied();
    }
    Some(linear_interp((x[i - 1], y[i - 1]), (x[i], y[i]), x_target))
}

/// Proper intersection of segments `p1-p2` and `q1-q2`.
///
/// Parallel and collinear segments yield `None`.
pub fn segment_intersection(p1: Point, p2: Point, q1: Point, q2: Point) -> Option<Point> {
    let r = (p2.0 - p1.0, p2.1 - p1.1);
    let s = (q2.0 - q1.0, q2.1 - q1.1);
    let denom = r.0 * s.1 - r.1 * s.0;
    let scale = (r.0.hypot(r.1) * s.0.hypot(s.1)).max(f64::MIN_POSITIVE);
    if denom.abs() <= 1e-12 * scale {
        return None;
    }
    let qp = (q1.0 - p1.0, q1.1 - p1.1);
    let t = (qp.0 * s.1 - qp.1 * s.0) / denom;
    let u = (qp.0 * r.1 - qp.1 * r.0) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((p1.0 + t * r.0, p1.1 + t * r.1))
    } else {
        None
    }
}

/// All crossings between two polylines.
pub fn polyline_intersections(a: &[Point], b: &[Point]) -> Vec<Point> {
    let mut out = Vec::new();
    for sa in a.windows(2) {
        for sb in b.windows(2) {
            if let Some(p) = segment_intersection(sa[0], sa[1], sb[0], sb[1]) {
                out.push(p);
            }
        }
    }
    out
}
