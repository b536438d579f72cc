//! Parabola fits of grid lines, grid regeneration and the coarse centre of
//! distortion.
//!
//! Horizontal lines are fitted as `y = a x^2 + b x + c`, vertical lines as
//! `x = a y^2 + b y + c`, both in coordinates relative to a reference centre.

use nalgebra::Point2;

use crate::error::{LineAxis, UndistortError};
use crate::fit::{linear_fit, transpose, Parabola};
use crate::grouping::DotLine;

/// Mean of every point of every line.
pub fn lines_centroid(lines: &[DotLine]) -> Option<Point2<f64>> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for p in lines.iter().flatten() {
        sx += p.x;
        sy += p.y;
        n += 1;
    }
    (n > 0).then(|| Point2::new(sx / n as f64, sy / n as f64))
}

/// Parabola of every line relative to `center`; vertical lines are fitted in
/// transposed coordinates.
pub fn fit_parabolas(
    lines: &[DotLine],
    axis: LineAxis,
    center: Point2<f64>,
) -> Result<Vec<Parabola>, UndistortError> {
    lines
        .iter()
        .map(|line| {
            let (us, vs): (Vec<f64>, Vec<f64>) = line
                .iter()
                .map(|&p| {
                    let d = oriented(p, axis) - oriented(center, axis);
                    (d.x, d.y)
                })
                .unzip();
            Parabola::fit(&us, &vs).ok_or(UndistortError::SingularFit("line parabola"))
        })
        .collect()
}

#[inline]
fn oriented(p: Point2<f64>, axis: LineAxis) -> Point2<f64> {
    match axis {
        LineAxis::Horizontal => p,
        LineAxis::Vertical => transpose(p),
    }
}

pub(crate) fn require_lines(
    lines: &[DotLine],
    axis: LineAxis,
    needed: usize,
) -> Result<(), UndistortError> {
    if lines.len() < needed {
        return Err(UndistortError::TooFewLines {
            axis,
            found: lines.len(),
            needed,
        });
    }
    Ok(())
}

/// Replace per-line slopes by their mean and intercepts by a linear function
/// of the line index, keeping each curvature.
fn remove_perspective(coefs: &[Parabola]) -> Result<Vec<Parabola>, UndistortError> {
    let n = coefs.len() as f64;
    let b_mean = coefs.iter().map(|p| p.b).sum::<f64>() / n;
    let idx: Vec<f64> = (0..coefs.len()).map(|i| i as f64).collect();
    let cs: Vec<f64> = coefs.iter().map(|p| p.c).collect();
    let (step, c0) = linear_fit(&idx, &cs).ok_or(UndistortError::SingularFit("line spacing"))?;
    Ok(coefs
        .iter()
        .enumerate()
        .map(|(i, p)| Parabola {
            a: p.a,
            b: b_mean,
            c: c0 + step * i as f64,
        })
        .collect())
}

/// Intersection of `y = h(x)` and `x = v(y)` by fixed-point iteration.
fn intersect(h: &Parabola, v: &Parabola) -> Point2<f64> {
    let (mut x, mut y) = (v.c, h.c);
    for _ in 0..50 {
        let ny = h.eval(x);
        let nx = v.eval(ny);
        let done = (nx - x).abs() < 1e-9 && (ny - y).abs() < 1e-9;
        x = nx;
        y = ny;
        if done {
            break;
        }
    }
    Point2::new(x, y)
}

/// Fit parabolas to the grouped lines and rebuild every grid point as the
/// intersection of its horizontal and vertical parabola.
///
/// With `perspective = true` the slopes are unified and the intercepts evenly
/// spaced first, which removes the perspective part of the deformation.
pub fn regenerate_grid_points_parabola(
    hor: &[DotLine],
    ver: &[DotLine],
    perspective: bool,
) -> Result<(Vec<DotLine>, Vec<DotLine>), UndistortError> {
    require_lines(hor, LineAxis::Horizontal, 2)?;
    require_lines(ver, LineAxis::Vertical, 2)?;
    let center = lines_centroid(hor).ok_or(UndistortError::NoDots)?;

    let mut hc = fit_parabolas(hor, LineAxis::Horizontal, center)?;
    let mut vc = fit_parabolas(ver, LineAxis::Vertical, center)?;
    if perspective {
        hc = remove_perspective(&hc)?;
        vc = remove_perspective(&vc)?;
    }

    let mut new_hor: Vec<DotLine> = vec![Vec::with_capacity(vc.len()); hc.len()];
    let mut new_ver: Vec<DotLine> = vec![Vec::with_capacity(hc.len()); vc.len()];
    for (i, h) in hc.iter().enumerate() {
        for (j, v) in vc.iter().enumerate() {
            let d = intersect(h, v);
            let p = Point2::new(center.x + d.x, center.y + d.y);
            new_hor[i].push(p);
            new_ver[j].push(p);
        }
    }
    Ok((new_hor, new_ver))
}

/// Where the curvature of one line family crosses zero, as an intercept.
/// `None` when the curvature does not vary with the intercept.
fn zero_curvature_intercept(coefs: &[Parabola]) -> Option<f64> {
    let cs: Vec<f64> = coefs.iter().map(|p| p.c).collect();
    let as_: Vec<f64> = coefs.iter().map(|p| p.a).collect();
    let (slope, intercept) = linear_fit(&cs, &as_)?;
    let c_span = cs.iter().fold(0.0f64, |m, c| m.max(c.abs())).max(1.0);
    let a_span = as_.iter().fold(0.0f64, |m, a| m.max(a.abs()));
    if a_span < 1e-12 || (slope * c_span).abs() < 1e-3 * a_span {
        return None;
    }
    Some(-intercept / slope)
}

/// Coarse centre of distortion.
///
/// Curvature grows with the distance of a line from the centre and changes
/// sign across it; the zero crossing of curvature against intercept locates
/// the central row and column, which are then intersected using the mean line
/// slopes.
pub fn find_cod_coarse(hor: &[DotLine], ver: &[DotLine]) -> Result<(f64, f64), UndistortError> {
    require_lines(hor, LineAxis::Horizontal, 2)?;
    require_lines(ver, LineAxis::Vertical, 2)?;
    let center = lines_centroid(hor).ok_or(UndistortError::NoDots)?;

    let hc = fit_parabolas(hor, LineAxis::Horizontal, center)?;
    let vc = fit_parabolas(ver, LineAxis::Vertical, center)?;
    let ch = zero_curvature_intercept(&hc).unwrap_or(0.0);
    let cv = zero_curvature_intercept(&vc).unwrap_or(0.0);
    let bh = hc.iter().map(|p| p.b).sum::<f64>() / hc.len() as f64;
    let bv = vc.iter().map(|p| p.b).sum::<f64>() / vc.len() as f64;

    // y = ch + bh x and x = cv + bv y.
    let det = 1.0 - bh * bv;
    let (dx, dy) = if det.abs() > 1e-9 {
        let dx = (cv + bv * ch) / det;
        (dx, ch + bh * dx)
    } else {
        (cv, ch)
    };
    let (xc, yc) = (center.x + dx, center.y + dy);
    log::info!("coarse centre of distortion ({xc:.2}, {yc:.2})");
    Ok((xc, yc))
}
