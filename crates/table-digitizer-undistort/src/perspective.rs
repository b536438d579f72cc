use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use table_digitizer_core::{
    estimate_homography, warp_perspective_gray, warp_perspective_rgb, GrayImage, GrayImageView,
    Homography,
};

use crate::error::{LineAxis, UndistortError};
use crate::fit::linear_fit;
use crate::grouping::DotLine;
use crate::parabola::require_lines;

/// Eight coefficients of a backward projective map (corrected pixel to
/// source pixel), see [`Homography::from_coefficients`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCoefficients(pub [f64; 8]);

impl PerspectiveCoefficients {
    pub fn homography(&self) -> Homography {
        Homography::from_coefficients(self.0)
    }
}

fn straight_fits(lines: &[DotLine], axis: LineAxis) -> Result<Vec<(f64, f64)>, UndistortError> {
    lines
        .iter()
        .map(|l| {
            let (us, vs): (Vec<f64>, Vec<f64>) = match axis {
                LineAxis::Horizontal => l.iter().map(|p| (p.x, p.y)).unzip(),
                LineAxis::Vertical => l.iter().map(|p| (p.y, p.x)).unzip(),
            };
            linear_fit(&us, &vs).ok_or(UndistortError::SingularFit("straight line"))
        })
        .collect()
}

/// Mean distance between horizontally and vertically adjacent points of a
/// row-major `nh x nv` grid.
fn mean_steps(points: &[Point2<f64>], nh: usize, nv: usize) -> Option<(f64, f64)> {
    let at = |i: usize, j: usize| points[i * nv + j];
    let (mut sx, mut nx, mut sy, mut ny) = (0.0, 0usize, 0.0, 0usize);
    for i in 0..nh {
        for j in 0..nv {
            if j > 0 {
                sx += (at(i, j) - at(i, j - 1)).norm();
                nx += 1;
            }
            if i > 0 {
                sy += (at(i, j) - at(i - 1, j)).norm();
                ny += 1;
            }
        }
    }
    (nx > 0 && ny > 0).then(|| (sx / nx as f64, sy / ny as f64))
}

/// Source points at the intersections of straight fits of the (radially
/// corrected) lines, and targets on an evenly spaced grid with the mean
/// spacing, centred on the source centroid. Both are row-major over
/// `(horizontal line, vertical line)`.
pub fn generate_source_target_perspective_points(
    hor: &[DotLine],
    ver: &[DotLine],
) -> Result<(Vec<Point2<f64>>, Vec<Point2<f64>>), UndistortError> {
    require_lines(hor, LineAxis::Horizontal, 2)?;
    require_lines(ver, LineAxis::Vertical, 2)?;
    let hf = straight_fits(hor, LineAxis::Horizontal)?;
    let vf = straight_fits(ver, LineAxis::Vertical)?;
    let (nh, nv) = (hf.len(), vf.len());

    let mut source = Vec::with_capacity(nh * nv);
    for &(mh, qh) in &hf {
        for &(mv, qv) in &vf {
            // y = mh x + qh, x = mv y + qv
            let det = 1.0 - mh * mv;
            if det.abs() < 1e-12 {
                return Err(UndistortError::SingularFit("parallel grid lines"));
            }
            let y = (mh * qv + qh) / det;
            source.push(Point2::new(mv * y + qv, y));
        }
    }

    let (step_x, step_y) =
        mean_steps(&source, nh, nv).ok_or(UndistortError::SingularFit("grid spacing"))?;
    let step = 0.5 * (step_x + step_y);

    let n = source.len() as f64;
    let cx = source.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = source.iter().map(|p| p.y).sum::<f64>() / n;
    let (ox, oy) = ((nv - 1) as f64 * 0.5, (nh - 1) as f64 * 0.5);
    let target = (0..nh)
        .flat_map(|i| {
            (0..nv).map(move |j| {
                Point2::new(cx + (j as f64 - ox) * step, cy + (i as f64 - oy) * step)
            })
        })
        .collect();
    Ok((source, target))
}

/// Backward coefficients: the projective map taking target points onto
/// source points.
pub fn calc_perspective_coefficients(
    source: &[Point2<f64>],
    target: &[Point2<f64>],
) -> Result<PerspectiveCoefficients, UndistortError> {
    let s: Vec<Point2<f32>> = source.iter().map(|p| Point2::new(p.x as f32, p.y as f32)).collect();
    let t: Vec<Point2<f32>> = target.iter().map(|p| Point2::new(p.x as f32, p.y as f32)).collect();
    let h = estimate_homography(&t, &s).ok_or(UndistortError::SingularFit("perspective"))?;
    let coef = h
        .to_coefficients()
        .ok_or(UndistortError::SingularFit("perspective"))?;
    log::debug!("perspective coefficients {coef:?}");
    Ok(PerspectiveCoefficients(coef))
}

/// Resample a colour image through backward perspective coefficients, keeping
/// its size.
pub fn correct_perspective_image(src: &RgbImage, coef: &PerspectiveCoefficients) -> RgbImage {
    warp_perspective_rgb(src, coef.homography(), src.width(), src.height())
}

pub fn correct_perspective_gray(
    src: &GrayImageView<'_>,
    coef: &PerspectiveCoefficients,
) -> GrayImage {
    warp_perspective_gray(src, coef.homography(), src.width, src.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix3;

    fn grid_through(h: &Homography) -> (Vec<DotLine>, Vec<DotLine>) {
        let at = |i: i32, j: i32| {
            let p = h.apply(Point2::new(60.0 + 20.0 * j as f32, 50.0 + 20.0 * i as f32));
            Point2::new(p.x as f64, p.y as f64)
        };
        let hor = (0..5).map(|i| (0..6).map(|j| at(i, j)).collect()).collect();
        let ver = (0..6).map(|j| (0..5).map(|i| at(i, j)).collect()).collect();
        (hor, ver)
    }

    #[test]
    fn targets_form_an_even_grid_around_the_sources() {
        let (hor, ver) = grid_through(&Homography::identity());
        let (src, dst) = generate_source_target_perspective_points(&hor, &ver).expect("points");
        assert_eq!(src.len(), 30);
        for (s, t) in src.iter().zip(&dst) {
            assert_abs_diff_eq!(s.x, t.x, epsilon = 1e-3);
            assert_abs_diff_eq!(s.y, t.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn backward_coefficients_map_targets_to_sources() {
        let skew = Homography::new(Matrix3::new(
            1.02, 0.04, 3.0, //
            -0.01, 0.97, 2.0, //
            0.0002, 0.0001, 1.0,
        ));
        let (hor, ver) = grid_through(&skew);
        let (src, dst) = generate_source_target_perspective_points(&hor, &ver).expect("points");
        let coef = calc_perspective_coefficients(&src, &dst).expect("coef");
        let h = coef.homography();
        for (s, t) in src.iter().zip(&dst) {
            let m = h.apply_f64(*t);
            assert_abs_diff_eq!(m.x, s.x, epsilon = 0.05);
            assert_abs_diff_eq!(m.y, s.y, epsilon = 0.05);
        }
    }
}
