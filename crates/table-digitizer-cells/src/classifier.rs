use image::RgbImage;
use serde::{Deserialize, Serialize};
use table_digitizer_core::{saturation_value, Matrix};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::grid::{CellGrid, CellGridError};

/// Photometric shading rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Cells with mean saturation above this are shaded (0..255).
    pub saturation_threshold: f32,
    /// Cells with mean value below this are shaded (0..255).
    pub value_threshold: f32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            saturation_threshold: 35.0,
            value_threshold: 160.0,
        }
    }
}

impl ClassifierParams {
    pub fn is_shaded(&self, saturation: f32, value: f32) -> bool {
        saturation > self.saturation_threshold || value < self.value_threshold
    }
}

/// Mean colour statistics of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    pub row: usize,
    pub col: usize,
    pub saturation: f32,
    pub value: f32,
    pub shaded: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CellClassifier {
    params: ClassifierParams,
}

impl CellClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Classify every cell of `grid` into a row-major matrix.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image, grid), fields(shape = ?grid.shape()))
    )]
    pub fn classify(&self, image: &RgbImage, grid: &CellGrid) -> Result<Matrix, CellGridError> {
        let stats = self.classify_cell_stats(image, grid)?;
        let (rows, cols) = grid.shape();
        let mut matrix = Matrix::zeros(rows, cols);
        for s in &stats {
            matrix.set(s.row, s.col, s.shaded);
        }
        log::debug!(
            "classified {}x{} cells, {} shaded",
            rows,
            cols,
            matrix.count_shaded()
        );
        Ok(matrix)
    }

    /// Per-cell mean saturation / value and the resulting decision, row-major.
    pub fn classify_cell_stats(
        &self,
        image: &RgbImage,
        grid: &CellGrid,
    ) -> Result<Vec<CellStats>, CellGridError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(CellGridError::EmptyImage {
                width: w,
                height: h,
            });
        }
        grid.check_fits(w, h)?;

        let mut out = Vec::with_capacity(grid.rows.cell_count() * grid.cols.cell_count());
        for (row, ys) in grid.rows.cells().enumerate() {
            for (col, xs) in grid.cols.cells().enumerate() {
                let mut sum_s = 0.0f64;
                let mut sum_v = 0.0f64;
                for y in ys.clone() {
                    for x in xs.clone() {
                        let (s, v) = saturation_value(*image.get_pixel(x, y));
                        sum_s += s as f64;
                        sum_v += v as f64;
                    }
                }
                let n = (ys.len() * xs.len()) as f64;
                let saturation = (sum_s / n) as f32;
                let value = (sum_v / n) as f32;
                out.push(CellStats {
                    row,
                    col,
                    saturation,
                    value,
                    shaded: self.params.is_shaded(saturation, value),
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn uniform_gray_two_cells_are_unshaded() {
        let img = RgbImage::from_pixel(2, 2, Rgb([200, 200, 200]));
        let grid = CellGrid::uniform(2, 2, 2, Some(1)).expect("grid");
        let m = CellClassifier::default().classify(&img, &grid).expect("classify");
        assert_eq!(m, Matrix::from_rows(&[vec![0, 0]]).expect("valid"));
        assert_eq!(m.column_sums(), vec![0, 0]);
    }

    #[test]
    fn single_red_cell_is_the_only_one() {
        let mut img = RgbImage::from_pixel(40, 30, WHITE);
        for y in 10..20 {
            for x in 20..30 {
                img.put_pixel(x, y, Rgb([220, 20, 20]));
            }
        }
        let grid = CellGrid::uniform(40, 30, 4, Some(3)).expect("grid");
        let m = CellClassifier::default().classify(&img, &grid).expect("classify");
        assert_eq!(m.count_shaded(), 1);
        assert_eq!(m.get(1, 2), 1);
        assert_eq!(m.column_sums(), vec![0, 0, 1, 0]);
    }

    #[test]
    fn dark_gray_is_shaded_by_value() {
        let img = RgbImage::from_pixel(4, 4, Rgb([90, 90, 90]));
        let grid = CellGrid::uniform(4, 4, 1, Some(1)).expect("grid");
        let stats = CellClassifier::default()
            .classify_cell_stats(&img, &grid)
            .expect("stats");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].saturation, 0.0);
        assert!(stats[0].shaded);
    }

    #[test]
    fn cell_means_average_every_pixel() {
        // Half pure red (S = 255, V = 255), half black (S = 0, V = 0).
        let img = RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let grid = CellGrid::uniform(4, 2, 1, Some(1)).expect("grid");
        let stats = CellClassifier::default()
            .classify_cell_stats(&img, &grid)
            .expect("stats");
        assert_relative_eq!(stats[0].saturation, 127.5, epsilon = 1e-4);
        assert_relative_eq!(stats[0].value, 127.5, epsilon = 1e-4);
        assert!(stats[0].shaded);
    }

    #[test]
    fn thresholds_load_from_partial_json() {
        let params: ClassifierParams =
            serde_json::from_str(r#"{ "saturation_threshold": 50.0 }"#).expect("parse");
        assert_eq!(params.saturation_threshold, 50.0);
        assert_eq!(params.value_threshold, 160.0);
        assert!(!params.is_shaded(50.0, 200.0));
        assert!(params.is_shaded(50.5, 200.0));
        assert!(params.is_shaded(0.0, 159.0));
    }

    #[test]
    fn classification_is_deterministic() {
        let img = RgbImage::from_fn(48, 24, |x, y| Rgb([(x * 5) as u8, (y * 9) as u8, 180]));
        let grid = CellGrid::uniform(48, 24, 12, None).expect("grid");
        let c = CellClassifier::default();
        assert_eq!(
            c.classify(&img, &grid).expect("a"),
            c.classify(&img, &grid).expect("b")
        );
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let img = RgbImage::from_pixel(10, 10, WHITE);
        let grid = CellGrid::uniform(20, 10, 2, Some(1)).expect("grid");
        assert!(matches!(
            CellClassifier::default().classify(&img, &grid),
            Err(CellGridError::OutOfBounds { .. })
        ));
    }
}
