//! Chaining dots into grid lines.

use nalgebra::Point2;

use crate::dots::Dot;
use crate::fit::{transpose, transpose_lines};

/// Ordered dot centres along one grid line.
pub type DotLine = Vec<Point2<f64>>;

/// Tolerances of the dot chaining.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupingParams {
    pub ratio: f64,
    pub num_dot_miss: usize,
    pub accepted_ratio: f64,
}

/// Group dots into horizontal lines, sorted top to bottom, each left to right.
pub fn group_dots_hor_lines(
    dots: &[Dot],
    slope: f64,
    dot_dist: f64,
    params: &GroupingParams,
) -> Vec<DotLine> {
    let pts: Vec<Point2<f64>> = dots.iter().map(|d| d.center).collect();
    group_rows(pts, slope, dot_dist, params)
}

/// Group dots into vertical lines, sorted left to right, each top to bottom.
pub fn group_dots_ver_lines(
    dots: &[Dot],
    slope: f64,
    dot_dist: f64,
    params: &GroupingParams,
) -> Vec<DotLine> {
    let pts: Vec<Point2<f64>> = dots.iter().map(|d| transpose(d.center)).collect();
    transpose_lines(&group_rows(pts, slope, dot_dist, params))
}

/// `dot2` continues a row ending at `dot1` when it lies ahead within the
/// allowed gap and close to the line predicted by `slope`.
fn continues_row(
    dot1: Point2<f64>,
    dot2: Point2<f64>,
    slope: f64,
    dot_dist: f64,
    params: &GroupingParams,
) -> bool {
    let dx = dot2.x - dot1.x;
    let max_gap = (params.num_dot_miss as f64 + 1.0 + params.ratio) * dot_dist;
    if dx <= params.ratio * dot_dist || dx > max_gap {
        return false;
    }
    let steps = (dx / dot_dist).round().max(1.0);
    let off = (dot2.y - dot1.y) - slope * dx;
    off.abs() < params.ratio * dot_dist * steps
}

fn group_rows(
    mut pts: Vec<Point2<f64>>,
    slope: f64,
    dot_dist: f64,
    params: &GroupingParams,
) -> Vec<DotLine> {
    pts.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut lines: Vec<DotLine> = Vec::new();
    while pts.len() > 1 {
        let mut last = pts[0];
        let mut line = vec![last];
        let mut rest = Vec::with_capacity(pts.len());
        for &p in &pts[1..] {
            if continues_row(last, p, slope, dot_dist, params) {
                line.push(p);
                last = p;
            } else {
                rest.push(p);
            }
        }
        pts = rest;
        if line.len() > 1 {
            lines.push(line);
        }
    }

    let longest = lines.iter().map(Vec::len).max().unwrap_or(0);
    let min_len = (params.accepted_ratio * longest as f64).floor() as usize;
    let mut lines: Vec<DotLine> = lines
        .into_iter()
        .filter(|l| l.len() > min_len && l.len() >= 3)
        .collect();
    lines.sort_by(|a, b| mean_y(a).total_cmp(&mean_y(b)));
    log::debug!(
        "grouped {} lines (longest {longest}, accepted > {min_len})",
        lines.len()
    );
    lines
}

fn mean_y(line: &[Point2<f64>]) -> f64 {
    line.iter().map(|p| p.y).sum::<f64>() / line.len().max(1) as f64
}
