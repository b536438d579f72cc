//! Small least-squares helpers shared by the line and model fits.

use nalgebra::{DMatrix, DVector, Point2};

/// Least-squares polynomial, coefficients in increasing order of power.
pub(crate) fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    let n = xs.len();
    if n != ys.len() || n <= degree {
        return None;
    }
    let a = DMatrix::from_fn(n, degree + 1, |r, c| xs[r].powi(c as i32));
    let b = DVector::from_column_slice(ys);
    let sol = a.svd(true, true).solve(&b, 1e-12).ok()?;
    sol.iter().all(|v| v.is_finite()).then(|| sol.iter().copied().collect())
}

/// `v = slope * u + intercept`.
pub(crate) fn linear_fit(us: &[f64], vs: &[f64]) -> Option<(f64, f64)> {
    polyfit(us, vs, 1).map(|c| (c[1], c[0]))
}

/// `v = a u^2 + b u + c` along one grid line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parabola {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Parabola {
    pub fn fit(us: &[f64], vs: &[f64]) -> Option<Self> {
        let k = polyfit(us, vs, 2)?;
        Some(Self {
            a: k[2],
            b: k[1],
            c: k[0],
        })
    }

    #[inline]
    pub fn eval(&self, u: f64) -> f64 {
        (self.a * u + self.b) * u + self.c
    }
}

/// Swap x and y so vertical lines can reuse the horizontal code paths.
#[inline]
pub(crate) fn transpose(p: Point2<f64>) -> Point2<f64> {
    Point2::new(p.y, p.x)
}

pub(crate) fn transpose_lines(lines: &[Vec<Point2<f64>>]) -> Vec<Vec<Point2<f64>>> {
    lines
        .iter()
        .map(|l| l.iter().copied().map(transpose).collect())
        .collect()
}

pub(crate) fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    Some(if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    })
}
