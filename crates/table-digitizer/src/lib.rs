//! Digitize a photographed table into a binary occupancy matrix.
//!
//! This crate provides:
//! - re-exports of the stage crates
//! - [`digitize`], the end-to-end pipeline driven by an explicit
//!   [`DigitizeContext`]
//! - artifact helpers (CSV, PNG, JSON) and the strict corner-list parser
//! - the `table-digitizer` command-line tool (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use table_digitizer::{digitize, io::parse_corners, DigitizeConfig, DigitizeContext};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("table.jpg")?;
//! let corners = parse_corners("[[12,8],[410,30],[395,260],[20,240]]")?;
//! let ctx = DigitizeContext::new(DigitizeConfig::default());
//!
//! let result = digitize(&bytes, Some(&corners), &ctx)?;
//! println!("column sums: {:?}", result.column_sums());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `table_digitizer::core`: images, homographies, corner ordering,
//!   boundaries, the occupancy matrix.
//! - `table_digitizer::lines`: grid geometry detection from ruled lines.
//! - `table_digitizer::undistort`: lens calibration from a dot grid.
//! - `table_digitizer::cells`: cell classification and overlays.

pub use table_digitizer_cells as cells;
pub use table_digitizer_core as core;
pub use table_digitizer_lines as lines;
pub use table_digitizer_undistort as undistort;

pub use table_digitizer_cells::{CellGrid, ClassifierParams, OverlayParams};
pub use table_digitizer_core::{CornerSet, Matrix, OrderedCorners};
pub use table_digitizer_lines::LineDetectorParams;
pub use table_digitizer_undistort::{DistortionModel, PerspectiveCoefficients, UndistortParams};

mod config;
mod error;
pub mod io;
mod pipeline;

pub use config::DigitizeConfig;
pub use error::DigitizeError;
pub use pipeline::{
    decode_image, digitize, digitize_image, Calibration, DigitizeContext, DigitizeReport,
    Digitization, GridSource,
};
