use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use table_digitizer_core::Matrix;

use crate::grid::CellGrid;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("matrix is {matrix:?} (rows, cols) but the grid is {grid:?}")]
    ShapeMismatch {
        matrix: (usize, usize),
        grid: (usize, usize),
    },
    #[error("grid does not fit a {width}x{height} image")]
    OutOfBounds { width: u32, height: u32 },
}

/// Overlay colours and opacity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    /// Weight of the class colour in the blend.
    pub alpha: f32,
    pub shaded_color: [u8; 3],
    pub unshaded_color: [u8; 3],
    pub border_color: [u8; 3],
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            shaded_color: [0, 255, 0],
            unshaded_color: [255, 0, 0],
            border_color: [0, 0, 255],
        }
    }
}

#[inline]
fn blend(color: [u8; 3], px: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = alpha * color[c] as f32 + (1.0 - alpha) * px[c] as f32;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Paint the class colour of every cell over a copy of `image`, then draw
/// 1-px rules at every boundary. Boundaries on the far image edge are drawn
/// on the last pixel column/row.
pub fn render_overlay(
    image: &RgbImage,
    matrix: &Matrix,
    grid: &CellGrid,
    params: &OverlayParams,
) -> Result<RgbImage, OverlayError> {
    if matrix.shape() != grid.shape() {
        return Err(OverlayError::ShapeMismatch {
            matrix: matrix.shape(),
            grid: grid.shape(),
        });
    }
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || grid.check_fits(w, h).is_err() {
        return Err(OverlayError::OutOfBounds {
            width: w,
            height: h,
        });
    }

    let alpha = params.alpha.clamp(0.0, 1.0);
    let mut out = image.clone();
    for (r, ys) in grid.rows.cells().enumerate() {
        for (c, xs) in grid.cols.cells().enumerate() {
            let color = if matrix.get(r, c) == 1 {
                params.shaded_color
            } else {
                params.unshaded_color
            };
            for y in ys.clone() {
                for x in xs.clone() {
                    let px = *out.get_pixel(x, y);
                    out.put_pixel(x, y, blend(color, px, alpha));
                }
            }
        }
    }

    let border = Rgb(params.border_color);
    let (y0, y1) = (grid.rows.first(), grid.rows.last().min(h - 1));
    let (x0, x1) = (grid.cols.first(), grid.cols.last().min(w - 1));
    for &b in grid.cols.as_slice() {
        let x = b.min(w - 1);
        for y in y0..=y1 {
            out.put_pixel(x, y, border);
        }
    }
    for &b in grid.rows.as_slice() {
        let y = b.min(h - 1);
        for x in x0..=x1 {
            out.put_pixel(x, y, border);
        }
    }
    Ok(out)
}
