//! Adaptive binarization of ruled tables.

use table_digitizer_core::{blur_gray_f32, GrayImage, GrayImageView};

pub const INK: u8 = 255;

/// Inverted adaptive threshold against a Gaussian-weighted local mean.
///
/// A pixel becomes [`INK`] when `value <= mean - c`, everything else is 0.
pub fn adaptive_threshold_inv(src: &GrayImageView<'_>, sigma: f32, c: f32) -> GrayImage {
    let mean = blur_gray_f32(src, sigma);
    let mut out = GrayImage::new(src.width, src.height);
    for (dst, (&v, &m)) in out.data.iter_mut().zip(src.data.iter().zip(&mean)) {
        if v as f32 <= m - c {
            *dst = INK;
        }
    }
    out
}

/// Pre-blur followed by [`adaptive_threshold_inv`].
pub fn binarize_ink(
    src: &GrayImageView<'_>,
    blur_sigma: f32,
    adaptive_sigma: f32,
    c: f32,
) -> GrayImage {
    let blurred: Vec<u8> = blur_gray_f32(src, blur_sigma)
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    let view = GrayImageView {
        width: src.width,
        height: src.height,
        data: &blurred,
    };
    adaptive_threshold_inv(&view, adaptive_sigma, c)
}
