use table_digitizer_cells::{CellGridError, OverlayError};
use table_digitizer_core::{CornerInputError, MatrixError, RectifyError};
use table_digitizer_lines::GeometryError;
use table_digitizer_undistort::UndistortError;

/// Errors produced by the end-to-end pipeline and its file helpers.
///
/// Every variant is recoverable at the caller; nothing is written to disk when
/// one is returned.
#[derive(thiserror::Error, Debug)]
pub enum DigitizeError {
    #[error("input is not a decodable image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    CornerInput(#[from] CornerInputError),

    #[error(transparent)]
    Rectify(#[from] RectifyError),

    #[error(transparent)]
    Undistort(#[from] UndistortError),

    #[error(transparent)]
    CellGrid(#[from] CellGridError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
