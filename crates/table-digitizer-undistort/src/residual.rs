//! Straightness diagnostics.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::fit::{linear_fit, transpose};
use crate::grouping::DotLine;

/// Distance of one dot from the straight fit of its line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualPoint {
    /// Distance of the dot from the reference centre.
    pub radius: f64,
    pub residual: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
}

impl ResidualSummary {
    pub fn of(points: &[ResidualPoint]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let sum: f64 = points.iter().map(|p| p.residual).sum();
        Self {
            count: points.len(),
            mean: sum / points.len() as f64,
            max: points.iter().fold(0.0, |m, p| m.max(p.residual)),
        }
    }
}

fn residuals(lines: &[DotLine], center: Point2<f64>, flip: bool) -> Vec<ResidualPoint> {
    let mut out = Vec::new();
    for line in lines {
        let rel: Vec<Point2<f64>> = line
            .iter()
            .map(|&p| {
                let d = Point2::new(p.x - center.x, p.y - center.y);
                if flip {
                    transpose(d)
                } else {
                    d
                }
            })
            .collect();
        let (us, vs): (Vec<f64>, Vec<f64>) = rel.iter().map(|p| (p.x, p.y)).unzip();
        let Some((m, q)) = linear_fit(&us, &vs) else {
            continue;
        };
        let norm = (m * m + 1.0).sqrt();
        out.extend(rel.iter().map(|p| ResidualPoint {
            radius: p.coords.norm(),
            residual: (m * p.x - p.y + q).abs() / norm,
        }));
    }
    out.sort_by(|a, b| a.radius.total_cmp(&b.radius));
    out
}

/// Residuals of horizontal lines, sorted by radius from `(xcenter, ycenter)`.
pub fn calc_residual_hor(lines: &[DotLine], xcenter: f64, ycenter: f64) -> Vec<ResidualPoint> {
    residuals(lines, Point2::new(xcenter, ycenter), false)
}

/// Residuals of vertical lines, sorted by radius from `(xcenter, ycenter)`.
pub fn calc_residual_ver(lines: &[DotLine], xcenter: f64, ycenter: f64) -> Vec<ResidualPoint> {
    residuals(lines, Point2::new(xcenter, ycenter), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn straight_lines_have_zero_residual() {
        let line: DotLine = (0..6)
            .map(|i| Point2::new(i as f64 * 10.0, 3.0 + 0.1 * i as f64))
            .collect();
        let r = calc_residual_hor(&[line], 0.0, 0.0);
        assert_eq!(r.len(), 6);
        assert!(r.iter().all(|p| p.residual < 1e-9));
        assert!(r.windows(2).all(|w| w[0].radius <= w[1].radius));
    }

    #[test]
    fn bowed_vertical_line_has_residual() {
        let line: DotLine = (-3..=3)
            .map(|i| Point2::new(50.0 + 0.5 * (i * i) as f64, 100.0 + 10.0 * i as f64))
            .collect();
        let s = ResidualSummary::of(&calc_residual_ver(&[line], 50.0, 100.0));
        assert_eq!(s.count, 7);
        assert!(s.max > 1.0);
        assert_abs_diff_eq!(ResidualSummary::of(&[]).mean, 0.0);
    }
}
