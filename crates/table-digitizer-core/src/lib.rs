//! Core types for table digitization.
//!
//! Pixel buffers and sampling, homographies, corner ordering, boundary
//! sequences and the binary occupancy matrix. Detection and classification
//! live in the sibling crates.

mod boundaries;
mod color;
mod corners;
mod homography;
mod logger;
mod matrix;
mod raster;
mod rectify;

pub use boundaries::{BoundaryError, BoundarySequence};
pub use color::saturation_value;
pub use corners::{CornerInputError, CornerSet, OrderedCorners};
pub use homography::{
    estimate_homography, homography_from_4pt, warp_perspective_gray, warp_perspective_rgb,
    Homography,
};
pub use matrix::{column_sums_csv, Matrix, MatrixError};
pub use raster::{
    blur_gray_f32, blur_plane_f32, gray_view, sample_bilinear, sample_bilinear_rgb,
    sample_bilinear_u8, to_gray, GrayImage, GrayImageView,
};
pub use rectify::{
    rectification_for, rectify_gray, rectify_rgb, RectifyError, Rectified, MAX_RECTIFIED_PIXELS,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
