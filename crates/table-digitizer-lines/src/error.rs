use table_digitizer_core::BoundaryError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("grid detection failed: expected {expected} columns, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: usize, height: usize },
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
}
