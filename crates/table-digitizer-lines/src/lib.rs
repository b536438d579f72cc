//! Geometry detection for photographed ruled tables.
//!
//! The detector binarizes the image with an inverted adaptive threshold, keeps
//! long vertical and horizontal strokes with directional openings, and turns the
//! leading edge of every sufficiently long stroke into a boundary. Columns can be
//! sub-divided into equal parts when the ruling only marks groups of cells.
//!
//! ```no_run
//! use table_digitizer_core::GrayImage;
//! use table_digitizer_lines::{LineDetector, LineDetectorParams};
//!
//! let gray = GrayImage::new(800, 600);
//! let detector = LineDetector::new(LineDetectorParams {
//!     expected_cols: None,
//!     ..LineDetectorParams::default()
//! });
//! let detection = detector.detect(&gray.view()).unwrap();
//! println!("{:?}", detection.geometry.shape());
//! ```

mod components;
mod detector;
mod error;
mod morphology;
mod params;
mod threshold;

pub use components::{component_boxes, ComponentBox};
pub use detector::{merge_boundaries, subdivide, GridGeometry, LineDetection, LineDetector};
pub use error::GeometryError;
pub use morphology::{open_directional, Axis};
pub use params::LineDetectorParams;
pub use threshold::{adaptive_threshold_inv, binarize_ink, INK};
