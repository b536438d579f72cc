//! HSV saturation/value in the 0–255 convention used by the cell classifier.

use image::Rgb;

/// Saturation and value of one pixel.
///
/// `V = max(r, g, b)`, `S = 255 * (max - min) / max` (0 for black).
#[inline]
pub fn saturation_value(px: Rgb<u8>) -> (f32, f32) {
    let [r, g, b] = px.0;
    let max = r.max(g).max(b) as f32;
    let min = r.min(g).min(b) as f32;
    let s = if max > 0.0 {
        255.0 * (max - min) / max
    } else {
        0.0
    };
    (s, max)
}
