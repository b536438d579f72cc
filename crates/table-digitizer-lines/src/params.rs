use serde::{Deserialize, Serialize};

/// Thresholds and kernel sizes for ruled-table detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDetectorParams {
    /// Pre-blur sigma in pixels (roughly a 5x5 kernel).
    pub blur_sigma: f32,
    /// Sigma of the Gaussian-weighted local mean (block 15).
    pub adaptive_sigma: f32,
    /// A pixel is ink when `value <= local_mean - adaptive_c`.
    pub adaptive_c: f32,
    /// Length of the vertical structuring element.
    pub vertical_kernel: usize,
    /// Length of the horizontal structuring element.
    pub horizontal_kernel: usize,
    /// Vertical dividers must be taller than this fraction of the image height.
    pub vertical_min_frac: f32,
    /// Horizontal dividers must be wider than this fraction of the image width.
    pub horizontal_min_frac: f32,
    /// Each detected column is split into this many equal sub-columns.
    pub subdivisions: usize,
    /// Required number of columns after sub-division; `None` accepts any count.
    pub expected_cols: Option<usize>,
    /// Boundaries closer than this to the previous one are merged.
    pub min_cell_px: u32,
}

impl Default for LineDetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            adaptive_sigma: 2.6,
            adaptive_c: 3.0,
            vertical_kernel: 80,
            horizontal_kernel: 100,
            vertical_min_frac: 0.2,
            horizontal_min_frac: 0.5,
            subdivisions: 4,
            expected_cols: Some(40),
            min_cell_px: 2,
        }
    }
}
