//! Backward radial distortion model.
//!
//! For a corrected point at radius `ru` from the centre, the distorted source
//! point lies on the same ray at `rd = ru * sum_i k_i ru^i`. Mapping corrected
//! pixels to source pixels lets an image be resampled directly.

use image::RgbImage;
use nalgebra::{DMatrix, DVector, Point2};
use serde::{Deserialize, Serialize};
use table_digitizer_core::{
    sample_bilinear_rgb, sample_bilinear_u8, GrayImage, GrayImageView,
};

use crate::error::{LineAxis, UndistortError};
use crate::fit::{linear_fit, transpose, Parabola};
use crate::grouping::DotLine;
use crate::parabola::{fit_parabolas, require_lines};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistortionModel {
    pub xcenter: f64,
    pub ycenter: f64,
    /// `k_0, k_1, ...` of `rd / ru`.
    pub coefficients: Vec<f64>,
}

impl DistortionModel {
    pub fn identity(xcenter: f64, ycenter: f64) -> Self {
        Self {
            xcenter,
            ycenter,
            coefficients: vec![1.0],
        }
    }

    /// `rd / ru` at corrected radius `ru`.
    #[inline]
    pub fn factor(&self, ru: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, k| acc * ru + k)
    }

    /// Source (distorted) position of a corrected point.
    #[inline]
    pub fn distort(&self, p: Point2<f64>) -> Point2<f64> {
        let (dx, dy) = (p.x - self.xcenter, p.y - self.ycenter);
        let f = self.factor((dx * dx + dy * dy).sqrt());
        Point2::new(self.xcenter + dx * f, self.ycenter + dy * f)
    }

    /// Corrected position of a distorted point, by fixed-point iteration on
    /// `ru = rd / factor(ru)`.
    pub fn undistort(&self, p: Point2<f64>) -> Point2<f64> {
        let (dx, dy) = (p.x - self.xcenter, p.y - self.ycenter);
        let rd = (dx * dx + dy * dy).sqrt();
        if rd < 1e-12 {
            return p;
        }
        let mut ru = rd;
        for _ in 0..50 {
            let f = self.factor(ru);
            if f.abs() < 1e-12 {
                break;
            }
            let next = rd / f;
            let done = (next - ru).abs() < 1e-9;
            ru = next;
            if done {
                break;
            }
        }
        let s = ru / rd;
        Point2::new(self.xcenter + dx * s, self.ycenter + dy * s)
    }

    pub fn unwarp_gray(&self, src: &GrayImageView<'_>) -> GrayImage {
        let mut out = GrayImage::new(src.width, src.height);
        for y in 0..src.height {
            for x in 0..src.width {
                let s = self.distort(Point2::new(x as f64, y as f64));
                out.data[y * src.width + x] = sample_bilinear_u8(src, s.x as f32, s.y as f32);
            }
        }
        out
    }

    pub fn unwarp_rgb(&self, src: &RgbImage) -> RgbImage {
        RgbImage::from_fn(src.width(), src.height(), |x, y| {
            let s = self.distort(Point2::new(x as f64, y as f64));
            sample_bilinear_rgb(src, s.x as f32, s.y as f32)
        })
    }
}

/// Equation rows `([ru^0 .. ru^n], rd/ru)` from one family of lines.
///
/// Undistorted lines are straight, share the mean slope and are evenly spaced;
/// spacing comes from the lines nearest the centre, where distortion is
/// smallest. Each dot is pushed along its ray onto its straight line.
fn backward_samples(
    lines: &[DotLine],
    axis: LineAxis,
    center: Point2<f64>,
) -> Result<Vec<(f64, f64)>, UndistortError> {
    let coefs: Vec<Parabola> = fit_parabolas(lines, axis, center)?;
    let n = coefs.len();
    let mid = (0..n)
        .min_by(|&i, &j| coefs[i].c.abs().total_cmp(&coefs[j].c.abs()))
        .ok_or(UndistortError::TooFewLines { axis, found: 0, needed: 2 })?;
    let lo = mid.saturating_sub(1);
    let hi = (mid + 1).min(n - 1);
    let idx: Vec<f64> = (lo..=hi).map(|i| i as f64).collect();
    let cs: Vec<f64> = (lo..=hi).map(|i| coefs[i].c).collect();
    let (spacing, c0) = linear_fit(&idx, &cs).ok_or(UndistortError::SingularFit("line spacing"))?;
    let b = coefs.iter().map(|p| p.b).sum::<f64>() / n as f64;

    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let c_lin = c0 + spacing * i as f64;
        if c_lin.abs() < 0.5 * spacing.abs() {
            continue;
        }
        for &p in line {
            let rel = match axis {
                LineAxis::Horizontal => p - center,
                LineAxis::Vertical => transpose(p) - transpose(center),
            };
            let denom = rel.y - b * rel.x;
            if denom.abs() < 1e-9 {
                continue;
            }
            let t = c_lin / denom;
            let rd = rel.norm();
            if t <= 0.0 || rd < 1e-9 {
                continue;
            }
            out.push((t * rd, 1.0 / t));
        }
    }
    Ok(out)
}

/// Fit the backward radial polynomial with `num_coef` coefficients around
/// `(xcenter, ycenter)`.
pub fn calc_coef_backward(
    hor: &[DotLine],
    ver: &[DotLine],
    xcenter: f64,
    ycenter: f64,
    num_coef: usize,
) -> Result<DistortionModel, UndistortError> {
    require_lines(hor, LineAxis::Horizontal, 2)?;
    require_lines(ver, LineAxis::Vertical, 2)?;
    if num_coef == 0 {
        return Err(UndistortError::SingularFit("zero radial coefficients"));
    }
    let center = Point2::new(xcenter, ycenter);
    let mut samples = backward_samples(hor, LineAxis::Horizontal, center)?;
    samples.extend(backward_samples(ver, LineAxis::Vertical, center)?);
    if samples.len() < num_coef {
        return Err(UndistortError::SingularFit("not enough dots for the radial model"));
    }

    // Solve in units of the largest radius for conditioning.
    let r_max = samples.iter().fold(0.0f64, |m, s| m.max(s.0)).max(1.0);
    let a = DMatrix::from_fn(samples.len(), num_coef, |r, c| (samples[r].0 / r_max).powi(c as i32));
    let rhs = DVector::from_iterator(samples.len(), samples.iter().map(|s| s.1));
    let k = a
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|_| UndistortError::SingularFit("radial model"))?;
    let coefficients: Vec<f64> = k
        .iter()
        .enumerate()
        .map(|(i, v)| v / r_max.powi(i as i32))
        .collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(UndistortError::SingularFit("radial model"));
    }
    log::info!("radial coefficients {coefficients:?} from {} dots", samples.len());
    Ok(DistortionModel {
        xcenter,
        ycenter,
        coefficients,
    })
}

/// Map distorted line points to their corrected positions.
pub fn unwarp_line_backward(lines: &[DotLine], model: &DistortionModel) -> Vec<DotLine> {
    lines
        .iter()
        .map(|l| l.iter().map(|&p| model.undistort(p)).collect())
        .collect()
}

/// Resample a colour image through the backward model.
pub fn unwarp_image_backward(src: &RgbImage, model: &DistortionModel) -> RgbImage {
    model.unwarp_rgb(src)
}
