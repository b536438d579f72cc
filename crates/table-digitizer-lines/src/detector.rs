use serde::{Deserialize, Serialize};
use table_digitizer_core::{BoundarySequence, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::components::component_boxes;
use crate::error::GeometryError;
use crate::morphology::{open_directional, Axis};
use crate::params::LineDetectorParams;
use crate::threshold::binarize_ink;

/// Column and row boundaries of a detected table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub cols: BoundarySequence,
    pub rows: BoundarySequence,
    /// Number of ruled columns before sub-division.
    pub ruled_cols: usize,
}

impl GridGeometry {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.cell_count(), self.cols.cell_count())
    }

    /// True when an axis found no interior rule and fell back to `[0, extent]`.
    pub fn is_degenerate(&self) -> bool {
        self.ruled_cols <= 1 || self.rows.cell_count() <= 1
    }
}

/// Detection result with the raw rule candidates kept for diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineDetection {
    pub geometry: GridGeometry,
    /// Leading x of every accepted vertical component, sorted.
    pub vertical_candidates: Vec<u32>,
    /// Leading y of every accepted horizontal component, sorted.
    pub horizontal_candidates: Vec<u32>,
}

/// Ruled-table detector.
#[derive(Clone, Debug, Default)]
pub struct LineDetector {
    params: LineDetectorParams,
}

impl LineDetector {
    pub fn new(params: LineDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LineDetectorParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray), fields(w = gray.width, h = gray.height))
    )]
    pub fn detect(&self, gray: &GrayImageView<'_>) -> Result<LineDetection, GeometryError> {
        let (w, h) = (gray.width, gray.height);
        if w == 0 || h == 0 {
            return Err(GeometryError::EmptyImage { width: w, height: h });
        }
        let p = &self.params;

        let ink = binarize_ink(gray, p.blur_sigma, p.adaptive_sigma, p.adaptive_c);

        let vertical = open_directional(&ink, Axis::Vertical, p.vertical_kernel);
        let min_height = p.vertical_min_frac * h as f32;
        let mut vertical_candidates: Vec<u32> = component_boxes(&vertical)
            .into_iter()
            .filter(|b| b.height() as f32 > min_height)
            .map(|b| b.min_x)
            .collect();
        vertical_candidates.sort_unstable();

        let horizontal = open_directional(&ink, Axis::Horizontal, p.horizontal_kernel);
        let min_width = p.horizontal_min_frac * w as f32;
        let mut horizontal_candidates: Vec<u32> = component_boxes(&horizontal)
            .into_iter()
            .filter(|b| b.width() as f32 > min_width)
            .map(|b| b.min_y)
            .collect();
        horizontal_candidates.sort_unstable();

        log::debug!(
            "rule candidates: {} vertical {:?}, {} horizontal {:?}",
            vertical_candidates.len(),
            vertical_candidates,
            horizontal_candidates.len(),
            horizontal_candidates
        );

        let ruled = merge_boundaries(&vertical_candidates, w as u32, p.min_cell_px);
        let ruled_cols = ruled.len() - 1;
        let cols = BoundarySequence::within(subdivide(&ruled, p.subdivisions), w as u32)?;
        let rows = BoundarySequence::within(
            merge_boundaries(&horizontal_candidates, h as u32, p.min_cell_px),
            h as u32,
        )?;

        if let Some(expected) = p.expected_cols {
            if cols.cell_count() != expected {
                return Err(GeometryError::ColumnCountMismatch {
                    expected,
                    found: cols.cell_count(),
                });
            }
        }

        let geometry = GridGeometry {
            cols,
            rows,
            ruled_cols,
        };
        if geometry.is_degenerate() {
            log::warn!(
                "no interior rules on at least one axis (ruled cols {}, rows {})",
                geometry.ruled_cols,
                geometry.rows.cell_count()
            );
        }
        Ok(LineDetection {
            geometry,
            vertical_candidates,
            horizontal_candidates,
        })
    }
}

/// Add the image edges to sorted candidates and merge anything closer than
/// `min_gap` to the previous boundary. The result starts at 0 and ends at
/// `extent`.
pub fn merge_boundaries(candidates: &[u32], extent: u32, min_gap: u32) -> Vec<u32> {
    let min_gap = min_gap.max(1);
    let mut out = vec![0u32];
    for &c in candidates.iter().filter(|&&c| c < extent) {
        let last = out[out.len() - 1];
        if c >= last + min_gap {
            out.push(c);
        }
    }
    let last = out[out.len() - 1];
    if extent < last + min_gap && out.len() > 1 {
        out.pop();
    }
    out.push(extent);
    out
}

/// Split each cell into `n` sub-cells at `floor(start + k * width / n)`.
/// Coordinates that collapse onto each other are dropped.
pub fn subdivide(bounds: &[u32], n: usize) -> Vec<u32> {
    let n = n.max(1) as u64;
    let mut out: Vec<u32> = Vec::with_capacity(bounds.len() * n as usize);
    for w in bounds.windows(2) {
        let (start, width) = (w[0] as u64, (w[1] - w[0]) as u64);
        for k in 0..n {
            let b = (start + k * width / n) as u32;
            if out.last().is_none_or(|&l| b > l) {
                out.push(b);
            }
        }
    }
    if let Some(&end) = bounds.last() {
        if out.last().is_none_or(|&l| end > l) {
            out.push(end);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_edges_and_drops_slivers() {
        assert_eq!(merge_boundaries(&[0, 1, 50, 51, 99], 100, 2), vec![0, 50, 100]);
        assert_eq!(merge_boundaries(&[], 30, 2), vec![0, 30]);
    }

    #[test]
    fn subdivide_splits_every_column() {
        assert_eq!(subdivide(&[0, 8, 20], 4), vec![0, 2, 4, 6, 8, 11, 14, 17, 20]);
        assert_eq!(subdivide(&[0, 2], 4), vec![0, 1, 2]);
        assert_eq!(subdivide(&[0, 10], 1), vec![0, 10]);
    }

    #[test]
    fn geometry_with_single_row_is_degenerate() {
        let g = GridGeometry {
            cols: BoundarySequence::new(vec![0, 5, 10]).expect("valid"),
            rows: BoundarySequence::whole(10).expect("valid"),
            ruled_cols: 2,
        };
        assert!(g.is_degenerate());
        assert_eq!(g.shape(), (1, 2));
    }
}
