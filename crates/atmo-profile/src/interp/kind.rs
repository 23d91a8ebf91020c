//! One-dimensional interpolation kinds.
//!
//! All kinds evaluate outside the sample range too: hold kinds repeat the
//! end value, polynomial kinds continue their end pieces. Bounds are
//! enforced by the caller.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// Interpolation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpKind {
    /// Piecewise linear.
    #[default]
    Linear,
    /// Nearest sample; ties go to the lower sample.
    Nearest,
    /// Nearest sample; ties go to the upper sample.
    NearestUp,
    /// Zeroth-order hold (same as `previous`).
    Zero,
    /// First-order spline (same as `linear`).
    Slinear,
    /// Interpolating quadratic B-spline, interior knots at sample midpoints.
    Quadratic,
    /// Interpolating not-a-knot cubic B-spline.
    Cubic,
    /// Value of the last sample at or below.
    Previous,
    /// Value of the first sample at or above.
    Next,
}

impl InterpKind {
    pub const ALL: [InterpKind; 9] = [
        InterpKind::Linear,
        InterpKind::Nearest,
        InterpKind::NearestUp,
        InterpKind::Zero,
        InterpKind::Slinear,
        InterpKind::Quadratic,
        InterpKind::Cubic,
        InterpKind::Previous,
        InterpKind::Next,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Nearest => "nearest",
            Self::NearestUp => "nearest-up",
            Self::Zero => "zero",
            Self::Slinear => "slinear",
            Self::Quadratic => "quadratic",
            Self::Cubic => "cubic",
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }

    /// Minimum number of samples this kind needs.
    pub fn min_points(&self) -> usize {
        match self {
            Self::Nearest | Self::NearestUp | Self::Zero | Self::Previous | Self::Next => 1,
            Self::Linear | Self::Slinear => 2,
            Self::Quadratic => 3,
            Self::Cubic => 4,
        }
    }

    /// Evaluate the interpolant through `(x, y)` at every `x_new`.
    ///
    /// `x` must be strictly increasing.
    pub fn evaluate(&self, x: &[f64], y: &[f64], x_new: &[f64]) -> Result<Vec<f64>> {
        if x.len() != y.len() {
            return Err(ProfileError::invalid_value(format!(
                "x and y lengths differ ({} != {})",
                x.len(),
                y.len()
            )));
        }
        if x.len() < self.min_points() {
            return Err(ProfileError::invalid_value(format!(
                "'{}' interpolation needs at least {} points, got {}",
                self,
                self.min_points(),
                x.len()
            )));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ProfileError::invalid_value(
                "interpolation abscissa must be strictly increasing",
            ));
        }

        let out = match self {
            Self::Linear | Self::Slinear => x_new.iter().map(|&v| linear(x, y, v)).collect(),
            Self::Nearest => {
                let mids = midpoints(x);
                x_new
                    .iter()
                    .map(|&v| y[mids.partition_point(|m| *m < v)])
                    .collect()
            }
            Self::NearestUp => {
                let mids = midpoints(x);
                x_new
                    .iter()
                    .map(|&v| y[mids.partition_point(|m| *m <= v)])
                    .collect()
            }
            Self::Zero | Self::Previous => x_new
                .iter()
                .map(|&v| y[x.partition_point(|xi| *xi <= v).saturating_sub(1)])
                .collect(),
            Self::Next => {
                let last = x.len() - 1;
                x_new
                    .iter()
                    .map(|&v| y[x.partition_point(|xi| *xi < v).min(last)])
                    .collect()
            }
            Self::Quadratic => {
                let spline = BSpline::interpolate(x, y, 2)?;
                x_new.iter().map(|&v| spline.eval(v)).collect()
            }
            Self::Cubic => {
                let spline = BSpline::interpolate(x, y, 3)?;
                x_new.iter().map(|&v| spline.eval(v)).collect()
            }
        };
        Ok(out)
    }
}

impl FromStr for InterpKind {
    type Err = ProfileError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|k| k.as_str() == s.trim())
            .copied()
            .ok_or_else(|| {
                ProfileError::invalid_value(format!(
                    "unknown interpolation kind '{}' (expected one of: {})",
                    s,
                    Self::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

impl fmt::Display for InterpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Evaluation helpers
// ============================================================================

/// Index `i` of the interval `[x[i], x[i + 1]]` used to evaluate at `v`.
///
/// Values outside the samples use the first or last interval.
fn interval(x: &[f64], v: f64) -> usize {
    x.partition_point(|xi| *xi <= v).clamp(1, x.len() - 1) - 1
}

fn linear(x: &[f64], y: &[f64], v: f64) -> f64 {
    let i = interval(x, v);
    let t = (v - x[i]) / (x[i + 1] - x[i]);
    y[i] + t * (y[i + 1] - y[i])
}

fn midpoints(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

// ============================================================================
// Interpolating B-splines
// ============================================================================

/// Interpolating B-spline of degree 2 or 3.
///
/// Degree 2 places the interior knots at the midpoints of the inner
/// samples; degree 3 uses the not-a-knot knots `x[2..n - 2]`. Both end
/// knots have multiplicity `degree + 1`. Outside the samples the end
/// polynomial pieces are continued.
struct BSpline {
    knots: Vec<f64>,
    coeffs: Vec<f64>,
    degree: usize,
}

impl BSpline {
    fn interpolate(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        let n = x.len();
        let knots = spline_knots(x, degree);

        let mut collocation = DMatrix::<f64>::zeros(n, n);
        for (row, &xi) in x.iter().enumerate() {
            let span = find_span(&knots, degree, n, xi);
            for (offset, b) in basis_functions(&knots, degree, span, xi).into_iter().enumerate() {
                collocation[(row, span - degree + offset)] = b;
            }
        }

        let rhs = DVector::from_column_slice(y);
        let coeffs = collocation.lu().solve(&rhs).ok_or_else(|| {
            ProfileError::invalid_value(format!(
                "singular collocation matrix for degree {} spline",
                degree
            ))
        })?;

        Ok(Self {
            knots,
            coeffs: coeffs.as_slice().to_vec(),
            degree,
        })
    }

    fn eval(&self, v: f64) -> f64 {
        let span = find_span(&self.knots, self.degree, self.coeffs.len(), v);
        basis_functions(&self.knots, self.degree, span, v)
            .iter()
            .zip(&self.coeffs[span - self.degree..=span])
            .map(|(b, c)| b * c)
            .sum()
    }
}

fn spline_knots(x: &[f64], degree: usize) -> Vec<f64> {
    let n = x.len();
    let interior: Vec<f64> = if degree == 2 {
        (1..n - 2).map(|i| 0.5 * (x[i] + x[i + 1])).collect()
    } else {
        x[2..n - 2].to_vec()
    };
    let mut knots = Vec::with_capacity(n + degree + 1);
    knots.extend(std::iter::repeat(x[0]).take(degree + 1));
    knots.extend(interior);
    knots.extend(std::iter::repeat(x[n - 1]).take(degree + 1));
    knots
}

/// Knot span `s` with `knots[s] <= v < knots[s + 1]`, clamped to the
/// first and last non-empty spans.
fn find_span(knots: &[f64], degree: usize, n_coeffs: usize, v: f64) -> usize {
    knots
        .partition_point(|t| *t <= v)
        .saturating_sub(1)
        .clamp(degree, n_coeffs - 1)
}

/// The `degree + 1` basis functions that are non-zero on `span`, at `v`.
fn basis_functions(knots: &[f64], degree: usize, span: usize, v: f64) -> Vec<f64> {
    let mut basis = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    basis[0] = 1.0;
    for j in 1..=degree {
        left[j] = v - knots[span + 1 - j];
        right[j] = knots[span + j] - v;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = basis[r] / (right[r + 1] + left[j - r]);
            basis[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        basis[j] = saved;
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    const X: [f64; 6] = [0.0, 1.0, 2.5, 3.0, 4.5, 6.0];

    fn sample(f: impl Fn(f64) -> f64) -> Vec<f64> {
        X.iter().map(|&v| f(v)).collect()
    }

    #[test]
    fn test_parse_kinds() {
        for kind in InterpKind::ALL {
            assert_eq!(kind.as_str().parse::<InterpKind>().unwrap(), kind);
        }
        assert!("spline".parse::<InterpKind>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&InterpKind::NearestUp).unwrap();
        assert_eq!(json, "\"nearest-up\"");
    }

    #[test]
    fn test_linear_reproduces_lines() {
        let y = sample(|v| 3.0 * v - 2.0);
        let out = InterpKind::Linear
            .evaluate(&X, &y, &[0.5, 2.75, 6.0, 7.0, -1.0])
            .unwrap();
        for (v, o) in [0.5, 2.75, 6.0, 7.0, -1.0].iter().zip(out) {
            assert_approx_eq!(o, 3.0 * v - 2.0, 1e-12);
        }
    }

    #[test]
    fn test_quadratic_reproduces_parabolas() {
        let f = |v: f64| 0.5 * v * v - v + 4.0;
        let y = sample(f);
        let x_new = [0.3, 1.7, 2.9, 4.0, 5.99];
        let out = InterpKind::Quadratic.evaluate(&X, &y, &x_new).unwrap();
        for (v, o) in x_new.iter().zip(out) {
            assert_approx_eq!(o, f(*v), 1e-9);
        }
    }

    #[test]
    fn test_cubic_reproduces_cubics() {
        let f = |v: f64| v * v * v - 2.0 * v * v + 0.5;
        let y = sample(f);
        let x_new = [0.2, 1.1, 2.6, 3.3, 5.5, 6.0];
        let out = InterpKind::Cubic.evaluate(&X, &y, &x_new).unwrap();
        for (v, o) in x_new.iter().zip(out) {
            assert_approx_eq!(o, f(*v), 1e-8);
        }
    }

    #[test]
    fn test_splines_pass_through_samples() {
        let y = sample(|v| (v * 0.7).sin());
        for kind in [InterpKind::Quadratic, InterpKind::Cubic] {
            let out = kind.evaluate(&X, &y, &X).unwrap();
            for (o, e) in out.iter().zip(&y) {
                assert_approx_eq!(*o, *e, 1e-12);
            }
        }
    }

    #[test]
    fn test_splines_settle_after_a_step() {
        let x: Vec<f64> = (0..30).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| if *v < 5.0 { 0.0 } else { 1.0 }).collect();
        let x_new: Vec<f64> = (20..29).map(|i| f64::from(i) + 0.5).collect();
        for kind in [InterpKind::Quadratic, InterpKind::Cubic] {
            let out = kind.evaluate(&x, &y, &x_new).unwrap();
            for o in out {
                assert_approx_eq!(o, 1.0, 1e-6);
            }
        }
    }

    #[test]
    fn test_splines_continue_end_pieces() {
        let f = |v: f64| 2.0 * v * v - 3.0;
        let y = sample(f);
        let out = InterpKind::Quadratic.evaluate(&X, &y, &[-1.0, 7.0]).unwrap();
        assert_approx_eq!(out[0], f(-1.0), 1e-9);
        assert_approx_eq!(out[1], f(7.0), 1e-9);
    }

    #[test]
    fn test_minimum_point_splines() {
        let quadratic = InterpKind::Quadratic
            .evaluate(&[0.0, 1.0, 3.0], &[1.0, 2.0, 10.0], &[2.0])
            .unwrap();
        // parabola through the samples: 1 + v^2
        assert_approx_eq!(quadratic[0], 5.0, 1e-12);
        let cubic = InterpKind::Cubic
            .evaluate(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 8.0, 27.0], &[1.5])
            .unwrap();
        assert_approx_eq!(cubic[0], 3.375, 1e-12);
    }

    #[test]
    fn test_nearest_tie_breaking() {
        let x = [0.0, 1.0, 2.0];
        let y = [10.0, 20.0, 30.0];
        let down = InterpKind::Nearest.evaluate(&x, &y, &[0.5, 0.6, 1.5]).unwrap();
        assert_eq!(down, vec![10.0, 20.0, 20.0]);
        let up = InterpKind::NearestUp.evaluate(&x, &y, &[0.5, 0.4, 1.5]).unwrap();
        assert_eq!(up, vec![20.0, 10.0, 30.0]);
    }

    #[test]
    fn test_previous_and_next() {
        let x = [0.0, 1.0, 2.0];
        let y = [10.0, 20.0, 30.0];
        let prev = InterpKind::Previous.evaluate(&x, &y, &[0.0, 0.9, 1.0, 2.0]).unwrap();
        assert_eq!(prev, vec![10.0, 10.0, 20.0, 30.0]);
        let zero = InterpKind::Zero.evaluate(&x, &y, &[0.9]).unwrap();
        assert_eq!(zero, vec![10.0]);
        let next = InterpKind::Next.evaluate(&x, &y, &[0.0, 0.1, 1.0, 2.0]).unwrap();
        assert_eq!(next, vec![10.0, 20.0, 20.0, 30.0]);
    }

    #[test]
    fn test_hold_kinds_extend_end_values() {
        let x = [0.0, 1.0, 2.0];
        let y = [10.0, 20.0, 30.0];
        for kind in [InterpKind::Nearest, InterpKind::Previous, InterpKind::Next] {
            let out = kind.evaluate(&x, &y, &[-1.0, 3.0]).unwrap();
            assert_eq!(out, vec![10.0, 30.0], "{}", kind);
        }
    }

    #[test]
    fn test_too_few_points() {
        let err = InterpKind::Cubic
            .evaluate(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &[0.5])
            .unwrap_err();
        assert!(err.to_string().contains("at least 4"));
        assert!(InterpKind::Nearest.evaluate(&[1.0], &[5.0], &[3.0]).is_ok());
    }
}
