use serde::{Deserialize, Serialize};
use table_digitizer_core::{BoundaryError, BoundarySequence};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CellGridError {
    #[error("a grid needs at least one column")]
    ZeroColumns,
    #[error("a grid needs at least one row")]
    ZeroRows,
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("grid spans {grid_w}x{grid_h} px but the image is {width}x{height}")]
    OutOfBounds {
        grid_w: u32,
        grid_h: u32,
        width: u32,
        height: u32,
    },
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
}

/// Row and column boundaries the classifier and overlay iterate over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellGrid {
    pub rows: BoundarySequence,
    pub cols: BoundarySequence,
}

impl CellGrid {
    pub fn new(rows: BoundarySequence, cols: BoundarySequence) -> Self {
        Self { rows, cols }
    }

    /// Gapless uniform grid over a `width x height` image.
    ///
    /// Without `rows` the row count assumes square cells:
    /// `round(height / (width / cols))`, at least 1.
    pub fn uniform(
        width: u32,
        height: u32,
        cols: usize,
        rows: Option<usize>,
    ) -> Result<Self, CellGridError> {
        if width == 0 || height == 0 {
            return Err(CellGridError::EmptyImage { width, height });
        }
        if cols == 0 {
            return Err(CellGridError::ZeroColumns);
        }
        let rows = match rows {
            Some(0) => return Err(CellGridError::ZeroRows),
            Some(r) => r,
            None => infer_rows(width, height, cols),
        };
        Ok(Self {
            rows: BoundarySequence::uniform(height, rows)?,
            cols: BoundarySequence::uniform(width, cols)?,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.cell_count(), self.cols.cell_count())
    }

    /// Error unless every boundary lies inside a `width x height` image.
    pub fn check_fits(&self, width: u32, height: u32) -> Result<(), CellGridError> {
        if self.cols.last() > width || self.rows.last() > height {
            return Err(CellGridError::OutOfBounds {
                grid_w: self.cols.last(),
                grid_h: self.rows.last(),
                width,
                height,
            });
        }
        Ok(())
    }
}

/// Square-cell row count for a uniform grid.
pub fn infer_rows(width: u32, height: u32, cols: usize) -> usize {
    let cell = width as f64 / cols.max(1) as f64;
    ((height as f64 / cell).round() as usize).max(1)
}
