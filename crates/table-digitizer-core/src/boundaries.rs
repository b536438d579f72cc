use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("a boundary sequence needs at least 2 entries, got {0}")]
    TooShort(usize),
    #[error("boundaries must be strictly increasing (index {index}: {prev} -> {next})")]
    NotIncreasing { index: usize, prev: u32, next: u32 },
    #[error("last boundary {last} exceeds the axis extent {extent}")]
    BeyondExtent { last: u32, extent: u32 },
    #[error("cannot split an axis of {extent} px into {cells} non-empty cells")]
    TooManyCells { extent: u32, cells: usize },
}

/// Strictly increasing pixel coordinates along one axis; `N + 1` entries bound
/// `N` cells `[b[i], b[i+1])`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct BoundarySequence {
    bounds: Vec<u32>,
}

impl BoundarySequence {
    pub fn new(bounds: Vec<u32>) -> Result<Self, BoundaryError> {
        if bounds.len() < 2 {
            return Err(BoundaryError::TooShort(bounds.len()));
        }
        for (index, w) in bounds.windows(2).enumerate() {
            if w[1] <= w[0] {
                return Err(BoundaryError::NotIncreasing {
                    index: index + 1,
                    prev: w[0],
                    next: w[1],
                });
            }
        }
        Ok(Self { bounds })
    }

    /// Like [`BoundarySequence::new`], additionally requiring `last <= extent`.
    pub fn within(bounds: Vec<u32>, extent: u32) -> Result<Self, BoundaryError> {
        let seq = Self::new(bounds)?;
        if seq.last() > extent {
            return Err(BoundaryError::BeyondExtent {
                last: seq.last(),
                extent,
            });
        }
        Ok(seq)
    }

    /// Single cell covering the whole axis.
    pub fn whole(extent: u32) -> Result<Self, BoundaryError> {
        Self::new(vec![0, extent])
    }

    /// `cells` gapless integer cells by linear interpolation; the last boundary is
    /// exactly `extent`.
    pub fn uniform(extent: u32, cells: usize) -> Result<Self, BoundaryError> {
        if cells == 0 || cells as u64 > extent as u64 {
            return Err(BoundaryError::TooManyCells { extent, cells });
        }
        let step = extent as f64 / cells as f64;
        let bounds = (0..=cells)
            .map(|i| {
                if i == cells {
                    extent
                } else {
                    (i as f64 * step).round() as u32
                }
            })
            .collect();
        Self::new(bounds)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.bounds
    }

    pub fn first(&self) -> u32 {
        self.bounds[0]
    }

    pub fn last(&self) -> u32 {
        self.bounds[self.bounds.len() - 1]
    }

    pub fn cell_count(&self) -> usize {
        self.bounds.len() - 1
    }

    /// Half-open pixel ranges of each cell.
    pub fn cells(&self) -> impl Iterator<Item = Range<u32>> + '_ {
        self.bounds.windows(2).map(|w| w[0]..w[1])
    }

    /// True when the sequence tiles exactly `[0, extent]`.
    pub fn spans_extent(&self, extent: u32) -> bool {
        self.first() == 0 && self.last() == extent
    }
}

impl TryFrom<Vec<u32>> for BoundarySequence {
    type Error = BoundaryError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoundarySequence> for Vec<u32> {
    fn from(value: BoundarySequence) -> Self {
        value.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_cells_tile_the_axis() {
        for (extent, n) in [(100, 3), (37, 37), (1000, 48), (5, 2)] {
            let seq = BoundarySequence::uniform(extent, n).expect("fits");
            assert_eq!(seq.cell_count(), n);
            assert!(seq.spans_extent(extent));
            let mut cursor = 0;
            for r in seq.cells() {
                assert_eq!(r.start, cursor, "gap or overlap");
                assert!(r.end > r.start);
                cursor = r.end;
            }
            assert_eq!(cursor, extent);
        }
    }

    #[test]
    fn rejects_non_increasing_and_short_sequences() {
        assert_eq!(
            BoundarySequence::new(vec![0, 5, 5, 9]),
            Err(BoundaryError::NotIncreasing {
                index: 2,
                prev: 5,
                next: 5
            })
        );
        assert_eq!(
            BoundarySequence::new(vec![3]),
            Err(BoundaryError::TooShort(1))
        );
    }

    #[test]
    fn more_cells_than_pixels_is_rejected() {
        assert!(matches!(
            BoundarySequence::uniform(3, 4),
            Err(BoundaryError::TooManyCells { .. })
        ));
    }

    #[test]
    fn within_checks_the_extent() {
        assert!(BoundarySequence::within(vec![0, 10, 21], 20).is_err());
        assert!(BoundarySequence::within(vec![0, 10, 20], 20).is_ok());
    }
}
