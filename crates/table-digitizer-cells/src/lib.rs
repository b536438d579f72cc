//! Cell classification and verification overlays.
//!
//! A cell is shaded when its mean HSV saturation is high or its mean value is
//! low. [`render_overlay`] tints each cell with its class colour so a human can
//! check the matrix against the photo.

mod classifier;
mod grid;
mod overlay;

pub use classifier::{CellClassifier, CellStats, ClassifierParams};
pub use grid::{infer_rows, CellGrid, CellGridError};
pub use overlay::{render_overlay, OverlayError, OverlayParams};
