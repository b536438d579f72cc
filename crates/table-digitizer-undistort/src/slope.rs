//! Orientation of the dot rows and columns.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point2;

use crate::dots::{Dot, DotStats};
use crate::fit::{linear_fit, transpose};

/// Slope `dy/dx` of the dot rows, measured around the most central dot.
pub fn calc_hor_slope(dots: &[Dot], stats: &DotStats, ratio: f64) -> f64 {
    let pts: Vec<Point2<f64>> = dots.iter().map(|d| d.center).collect();
    row_slope(&pts, stats.distance, ratio)
}

/// Slope `dx/dy` of the dot columns.
pub fn calc_ver_slope(dots: &[Dot], stats: &DotStats, ratio: f64) -> f64 {
    let pts: Vec<Point2<f64>> = dots.iter().map(|d| transpose(d.center)).collect();
    row_slope(&pts, stats.distance, ratio)
}

fn row_slope(pts: &[Point2<f64>], dot_dist: f64, ratio: f64) -> f64 {
    if pts.len() < 2 || dot_dist <= 0.0 {
        return 0.0;
    }
    let n = pts.len() as f64;
    let mid = Point2::new(
        pts.iter().map(|p| p.x).sum::<f64>() / n,
        pts.iter().map(|p| p.y).sum::<f64>() / n,
    );
    let coords: Vec<[f64; 2]> = pts.iter().map(|p| [p.x, p.y]).collect();
    let tree: KdTree<f64, 2> = (&coords).into();

    let Some(center_idx) = tree
        .nearest_n::<SquaredEuclidean>(&[mid.x, mid.y], 1)
        .first()
        .map(|nn| nn.item as usize)
    else {
        return 0.0;
    };
    let center = pts[center_idx];

    // Provisional slope: the flattest close neighbour.
    let mut slope = 0.0;
    let mut best = f64::INFINITY;
    for nn in tree.nearest_n::<SquaredEuclidean>(&coords[center_idx], 9) {
        let j = nn.item as usize;
        let d = pts[j] - center;
        let dist = nn.distance.sqrt();
        if j == center_idx || d.y.abs() >= d.x.abs() || dist > 1.5 * dot_dist {
            continue;
        }
        let s = d.y / d.x;
        if s.abs() < best {
            best = s.abs();
            slope = s;
        }
    }

    // Refine with every dot close to the provisional line.
    let tol = ratio * dot_dist;
    for _ in 0..2 {
        let norm = (1.0 + slope * slope).sqrt();
        let (xs, ys): (Vec<f64>, Vec<f64>) = pts
            .iter()
            .filter(|p| ((p.y - center.y) - slope * (p.x - center.x)).abs() / norm < tol)
            .map(|p| (p.x, p.y))
            .unzip();
        match linear_fit(&xs, &ys) {
            Some((s, _)) if s.is_finite() => slope = s,
            _ => break,
        }
    }
    log::debug!("line slope {slope:.5} around dot ({:.1}, {:.1})", center.x, center.y);
    slope
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tilted_grid(angle: f64) -> Vec<Dot> {
        let (s, c) = angle.sin_cos();
        (-4..=4)
            .flat_map(|j| {
                (-5..=5).map(move |i| {
                    let (u, v) = (i as f64 * 20.0, j as f64 * 20.0);
                    Dot {
                        center: Point2::new(200.0 + c * u - s * v, 150.0 + s * u + c * v),
                        area: 12,
                    }
                })
            })
            .collect()
    }

    #[test]
    fn slopes_of_a_rotated_grid() {
        let angle = 0.05f64;
        let dots = tilted_grid(angle);
        let stats = DotStats {
            count: dots.len(),
            size: 12.0,
            distance: 20.0,
        };
        assert_abs_diff_eq!(calc_hor_slope(&dots, &stats, 0.3), angle.tan(), epsilon = 1e-6);
        assert_abs_diff_eq!(calc_ver_slope(&dots, &stats, 0.3), -angle.tan(), epsilon = 1e-6);
    }
}
