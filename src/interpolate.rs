//! Scattered (x, y, z) samples onto a regular grid.
//!
//! Samples are normalised to the unit square before fitting so that axes with
//! very different magnitudes (line size in bytes against line count) weigh the
//! same. Grid nodes outside the convex hull of the samples are left as NaN,
//! which gnuplot leaves undrawn.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Interpolation needs a non-degenerate triangle of samples.
pub const MIN_POINTS: usize = 3;

const HULL_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Value of the closest sample
    Nearest,
    /// Thin plate spline, r² ln r
    ThinPlate,
    /// Polyharmonic cubic spline, r³
    #[default]
    Cubic,
}

/// Regular grid of interpolated values, stored row by row along y.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub values: Vec<f64>,
}

impl Grid {
    pub fn x_at(&self, i: usize) -> f64 {
        lerp(self.x_range, i as f64 / (self.nx - 1) as f64)
    }

    pub fn y_at(&self, j: usize) -> f64 {
        lerp(self.y_range, j as f64 / (self.ny - 1) as f64)
    }

    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.nx + i]
    }
}

/// Outcome of one interpolation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Interpolated(Grid),
    /// Fewer than [`MIN_POINTS`] distinct samples.
    InsufficientData { points: usize },
    /// Samples are collinear, share one x or y, or the fit is singular.
    Degenerate,
}

pub fn interpolate(
    samples: &[(f64, f64, f64)],
    resolution: usize,
    method: InterpolationMethod,
) -> Surface {
    if samples.len() < MIN_POINTS {
        return Surface::InsufficientData {
            points: samples.len(),
        };
    }

    let samples = merge_duplicates(samples);
    if samples.len() < MIN_POINTS {
        return Surface::InsufficientData {
            points: samples.len(),
        };
    }

    let x_range = bounds(samples.iter().map(|s| s.0));
    let y_range = bounds(samples.iter().map(|s| s.1));
    if x_range.0 == x_range.1 || y_range.0 == y_range.1 {
        return Surface::Degenerate;
    }

    let nodes: Vec<(f64, f64)> = samples
        .iter()
        .map(|s| (unlerp(x_range, s.0), unlerp(y_range, s.1)))
        .collect();
    let hull = convex_hull(&nodes);
    if hull.len() < 3 {
        return Surface::Degenerate;
    }

    let values: Vec<f64> = samples.iter().map(|s| s.2).collect();
    let model = match method {
        InterpolationMethod::Nearest => Model::Nearest,
        InterpolationMethod::ThinPlate | InterpolationMethod::Cubic => {
            match fit_polyharmonic(&nodes, &values, method) {
                Some(weights) => Model::Polyharmonic { method, weights },
                None => return Surface::Degenerate,
            }
        }
    };

    let n = resolution.max(2);
    let mut grid = Vec::with_capacity(n * n);
    for j in 0..n {
        let py = j as f64 / (n - 1) as f64;
        for i in 0..n {
            let px = i as f64 / (n - 1) as f64;
            if inside_hull(&hull, (px, py)) {
                grid.push(model.eval(&nodes, &values, (px, py)));
            } else {
                grid.push(f64::NAN);
            }
        }
    }

    Surface::Interpolated(Grid {
        nx: n,
        ny: n,
        x_range,
        y_range,
        values: grid,
    })
}

enum Model {
    Nearest,
    Polyharmonic {
        method: InterpolationMethod,
        weights: DVector<f64>,
    },
}

impl Model {
    fn eval(&self, nodes: &[(f64, f64)], values: &[f64], p: (f64, f64)) -> f64 {
        match self {
            Model::Nearest => nodes
                .iter()
                .zip(values)
                .min_by(|a, b| dist(*a.0, p).total_cmp(&dist(*b.0, p)))
                .map(|(_, v)| *v)
                .unwrap_or(f64::NAN),
            Model::Polyharmonic { method, weights } => {
                let n = nodes.len();
                let radial: f64 = nodes
                    .iter()
                    .zip(weights.iter())
                    .map(|(node, w)| w * kernel(*method, dist(*node, p)))
                    .sum();
                radial + weights[n] + weights[n + 1] * p.0 + weights[n + 2] * p.1
            }
        }
    }
}

fn kernel(method: InterpolationMethod, r: f64) -> f64 {
    match method {
        InterpolationMethod::Cubic => r * r * r,
        InterpolationMethod::ThinPlate if r > 0.0 => r * r * r.ln(),
        _ => 0.0,
    }
}

/// Solves the RBF system augmented with a linear polynomial:
/// `[A P; Pᵀ 0] [w; c] = [z; 0]`. `None` when the system is singular.
fn fit_polyharmonic(
    nodes: &[(f64, f64)],
    values: &[f64],
    method: InterpolationMethod,
) -> Option<DVector<f64>> {
    let n = nodes.len();
    let size = n + 3;
    let mut a = DMatrix::<f64>::zeros(size, size);
    let mut b = DVector::<f64>::zeros(size);

    for (i, &pi) in nodes.iter().enumerate() {
        for (j, &pj) in nodes.iter().enumerate() {
            a[(i, j)] = kernel(method, dist(pi, pj));
        }
        for (k, term) in [1.0, pi.0, pi.1].into_iter().enumerate() {
            a[(i, n + k)] = term;
            a[(n + k, i)] = term;
        }
        b[i] = values[i];
    }

    let weights = a.lu().solve(&b)?;
    weights.iter().all(|w| w.is_finite()).then_some(weights)
}

/// Averages z over samples sharing the same (x, y) and drops non-finite ones.
fn merge_duplicates(samples: &[(f64, f64, f64)]) -> Vec<(f64, f64, f64)> {
    let mut sorted: Vec<(f64, f64, f64)> = samples
        .iter()
        .copied()
        .filter(|s| s.0.is_finite() && s.1.is_finite() && s.2.is_finite())
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut merged: Vec<(f64, f64, f64)> = Vec::with_capacity(sorted.len());
    let mut count = 0usize;
    for s in sorted {
        match merged.last_mut() {
            Some(last) if last.0 == s.0 && last.1 == s.1 => {
                count += 1;
                last.2 += (s.2 - last.2) / count as f64;
            }
            _ => {
                merged.push(s);
                count = 1;
            }
        }
    }
    merged
}

/// Andrew's monotone chain, counter-clockwise, collinear points dropped.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.total_cmp(&b.1),
        o => o,
    });
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn inside_hull(hull: &[(f64, f64)], p: (f64, f64)) -> bool {
    (0..hull.len()).all(|i| cross(hull[i], hull[(i + 1) % hull.len()], p) >= -HULL_EPS)
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn bounds<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn lerp(range: (f64, f64), t: f64) -> f64 {
    range.0 + (range.1 - range.0) * t
}

fn unlerp(range: (f64, f64), v: f64) -> f64 {
    (v - range.0) / (range.1 - range.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn plane(x: f64, y: f64) -> f64 {
        3.0 + 2.0 * x - 0.5 * y
    }

    fn square_samples() -> Vec<(f64, f64, f64)> {
        let mut samples = Vec::new();
        for x in [16.0, 32.0, 64.0, 128.0] {
            for y in [1.0, 4.0, 16.0, 64.0] {
                samples.push((x, y, plane(x, y)));
            }
        }
        samples
    }

    #[test]
    fn too_few_points_are_insufficient() {
        let samples = [(1.0, 2.0, 3.0), (2.0, 3.0, 4.0)];
        assert_eq!(
            interpolate(&samples, 50, InterpolationMethod::Cubic),
            Surface::InsufficientData { points: 2 }
        );
    }

    #[test]
    fn duplicates_count_once() {
        let samples = [(1.0, 1.0, 1.0), (1.0, 1.0, 3.0), (2.0, 2.0, 4.0)];
        assert_eq!(
            interpolate(&samples, 10, InterpolationMethod::Cubic),
            Surface::InsufficientData { points: 2 }
        );
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let samples = [(1.0, 1.0, 1.0), (2.0, 2.0, 2.0), (3.0, 3.0, 3.0)];
        assert_eq!(
            interpolate(&samples, 10, InterpolationMethod::Cubic),
            Surface::Degenerate
        );
        let flat = [(1.0, 5.0, 1.0), (2.0, 5.0, 2.0), (3.0, 5.0, 3.0)];
        assert_eq!(
            interpolate(&flat, 10, InterpolationMethod::Nearest),
            Surface::Degenerate
        );
    }

    #[test]
    fn cubic_reproduces_linear_fields() {
        let Surface::Interpolated(grid) =
            interpolate(&square_samples(), 7, InterpolationMethod::Cubic)
        else {
            panic!("expected a grid");
        };
        assert_eq!((grid.nx, grid.ny), (7, 7));
        assert_eq!(grid.x_range, (16.0, 128.0));
        assert_eq!(grid.y_range, (1.0, 64.0));
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let expected = plane(grid.x_at(i), grid.y_at(j));
                assert_relative_eq!(grid.value(i, j), expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn thin_plate_passes_through_samples() {
        let samples = [
            (0.0, 0.0, 1.0),
            (1.0, 0.0, 5.0),
            (0.0, 1.0, -2.0),
            (1.0, 1.0, 7.0),
            (0.5, 0.5, 0.0),
        ];
        let Surface::Interpolated(grid) =
            interpolate(&samples, 3, InterpolationMethod::ThinPlate)
        else {
            panic!("expected a grid");
        };
        assert_abs_diff_eq!(grid.value(0, 0), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.value(2, 0), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.value(0, 2), -2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.value(2, 2), 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid.value(1, 1), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn nodes_outside_the_hull_are_nan() {
        let samples = [(0.0, 0.0, 1.0), (1.0, 0.0, 1.0), (0.0, 1.0, 1.0)];
        let Surface::Interpolated(grid) =
            interpolate(&samples, 3, InterpolationMethod::Nearest)
        else {
            panic!("expected a grid");
        };
        assert_eq!(grid.value(0, 0), 1.0);
        assert_eq!(grid.value(1, 1), 1.0);
        assert!(grid.value(2, 2).is_nan());
        assert!(grid.value(2, 1).is_nan());
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let hull = convex_hull(&[
            (0.0, 0.0),
            (0.5, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.5, 0.5),
        ]);
        assert_eq!(hull, vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    }
}
