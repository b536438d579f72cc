//! Four-point corner sets and their canonical ordering.
//!
//! Corners arrive in arbitrary order (mouse clicks, detector output). They are
//! ordered TL, TR, BR, BL with the sum/difference rule:
//!
//! - top-left minimizes `x + y`, bottom-right maximizes it;
//! - top-right minimizes `y - x`, bottom-left maximizes it.
//!
//! Ties resolve to the earliest point in input order. For nearly square point
//! sets rotated close to 45° the rule can give the same point two roles or swap
//! neighbours; this is a known degenerate case and is reported, not repaired.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CornerInputError {
    #[error("expected exactly 4 corner points, got {0}")]
    WrongCount(usize),
    #[error("corner coordinate is not finite")]
    NonFinite,
    #[error("malformed corner list at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}

/// Exactly four corner points in input order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    points: [Point2<f32>; 4],
}

/// Corners after canonical ordering.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderedCorners {
    pub top_left: Point2<f32>,
    pub top_right: Point2<f32>,
    pub bottom_right: Point2<f32>,
    pub bottom_left: Point2<f32>,
}

impl CornerSet {
    pub fn new(points: [Point2<f32>; 4]) -> Result<Self, CornerInputError> {
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(CornerInputError::NonFinite);
        }
        Ok(Self { points })
    }

    /// Build from any slice; anything other than four points is rejected.
    pub fn from_slice(points: &[Point2<f32>]) -> Result<Self, CornerInputError> {
        let arr: [Point2<f32>; 4] = points
            .try_into()
            .map_err(|_| CornerInputError::WrongCount(points.len()))?;
        Self::new(arr)
    }

    pub fn from_pairs(pairs: &[[f32; 2]]) -> Result<Self, CornerInputError> {
        let pts: Vec<Point2<f32>> = pairs.iter().map(|&[x, y]| Point2::new(x, y)).collect();
        Self::from_slice(&pts)
    }

    pub fn points(&self) -> &[Point2<f32>; 4] {
        &self.points
    }

    pub fn ordered(&self) -> OrderedCorners {
        let sum = |p: &Point2<f32>| p.x + p.y;
        let diff = |p: &Point2<f32>| p.y - p.x;
        OrderedCorners {
            top_left: self.points[argmin(&self.points, sum)],
            top_right: self.points[argmin(&self.points, diff)],
            bottom_right: self.points[argmax(&self.points, sum)],
            bottom_left: self.points[argmax(&self.points, diff)],
        }
    }
}

fn argmin(points: &[Point2<f32>; 4], key: impl Fn(&Point2<f32>) -> f32) -> usize {
    let mut best = 0;
    for i in 1..4 {
        if key(&points[i]) < key(&points[best]) {
            best = i;
        }
    }
    best
}

fn argmax(points: &[Point2<f32>; 4], key: impl Fn(&Point2<f32>) -> f32) -> usize {
    let mut best = 0;
    for i in 1..4 {
        if key(&points[i]) > key(&points[best]) {
            best = i;
        }
    }
    best
}

impl OrderedCorners {
    pub fn as_array(&self) -> [Point2<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// True when one input point was picked for two roles.
    pub fn has_repeated_corner(&self) -> bool {
        let pts = self.as_array();
        (0..4).any(|i| (i + 1..4).any(|j| pts[i] == pts[j]))
    }

    /// Mean of the top and bottom edge lengths.
    pub fn mean_width(&self) -> f32 {
        0.5 * ((self.top_right - self.top_left).norm()
            + (self.bottom_right - self.bottom_left).norm())
    }

    /// Mean of the left and right edge lengths.
    pub fn mean_height(&self) -> f32 {
        0.5 * ((self.bottom_left - self.top_left).norm()
            + (self.bottom_right - self.top_right).norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point2<f32> {
        Point2::new(x, y)
    }

    #[test]
    fn axis_aligned_rectangle_orders_tl_tr_br_bl() {
        let set = CornerSet::new([p(100.0, 50.0), p(0.0, 50.0), p(0.0, 0.0), p(100.0, 0.0)])
            .expect("finite");
        let o = set.ordered();
        assert_eq!(o.top_left, p(0.0, 0.0));
        assert_eq!(o.top_right, p(100.0, 0.0));
        assert_eq!(o.bottom_right, p(100.0, 50.0));
        assert_eq!(o.bottom_left, p(0.0, 50.0));
        assert!(!o.has_repeated_corner());
    }

    #[test]
    fn ordering_ignores_input_permutation() {
        let base = [p(12.0, 8.0), p(410.0, 30.0), p(395.0, 260.0), p(20.0, 240.0)];
        let expected = CornerSet::new(base).expect("finite").ordered();
        let perms = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1], [1, 0, 2, 3]];
        for perm in perms {
            let shuffled = perm.map(|i| base[i]);
            assert_eq!(CornerSet::new(shuffled).expect("finite").ordered(), expected);
        }
    }

    #[test]
    fn wrong_point_count_is_an_input_error() {
        let three = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        assert_eq!(
            CornerSet::from_slice(&three),
            Err(CornerInputError::WrongCount(3))
        );
    }

    #[test]
    fn diamond_layout_is_flagged_as_degenerate() {
        // Rotated 45°: the right-most point ties TR and BR candidates.
        let set = CornerSet::new([p(50.0, 0.0), p(100.0, 50.0), p(50.0, 100.0), p(0.0, 50.0)])
            .expect("finite");
        assert!(set.ordered().has_repeated_corner());
    }

    #[test]
    fn mean_sides_average_opposite_edges() {
        let o = CornerSet::new([p(0.0, 0.0), p(100.0, 0.0), p(110.0, 60.0), p(0.0, 60.0)])
            .expect("finite")
            .ordered();
        assert!((o.mean_width() - 105.0).abs() < 1e-3);
    }
}
