//! Background flattening and dot segmentation.

use table_digitizer_core::{blur_plane_f32, GrayImage, GrayImageView};

use crate::dots::remove_border_and_specks;
use crate::fit::linear_fit;
use crate::params::Background;

/// Row-major `f32` image used between flattening and thresholding.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatPlane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl FloatPlane {
    pub fn from_gray(src: &GrayImageView<'_>) -> Self {
        Self {
            width: src.width,
            height: src.height,
            data: src.data.iter().map(|&v| v as f32).collect(),
        }
    }

    /// Clamp to 0..255 for viewing.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|v| v.round().clamp(0.0, 255.0) as u8)
                .collect(),
        }
    }
}

/// Divide out a low-pass background estimate and rescale by its mean.
///
/// A Gaussian window of width `sigma` in the frequency domain of an `N`-pixel
/// image is a spatial Gaussian of `N / (2 pi sigma)` pixels; `N` is taken as
/// `sqrt(w * h)`.
pub fn normalize_background(src: &GrayImageView<'_>, sigma: f32) -> FloatPlane {
    let plane = FloatPlane::from_gray(src);
    if sigma <= 0.0 || src.width == 0 || src.height == 0 {
        return plane;
    }
    let n = ((src.width * src.height) as f32).sqrt();
    let spatial = n / (2.0 * std::f32::consts::PI * sigma);
    let background = blur_plane_f32(&plane.data, src.width, src.height, spatial);
    let mean = background.iter().map(|&v| v as f64).sum::<f64>() / background.len() as f64;
    log::debug!("background flattening: spatial sigma {spatial:.2} px, mean {mean:.1}");

    let data = plane
        .data
        .iter()
        .zip(&background)
        .map(|(&v, &bg)| v / bg.max(1e-3) * mean as f32)
        .collect();
    FloatPlane {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Dot threshold from the sorted intensity profile.
///
/// The sorted values are resampled to `max(w, h)` points and a line is fitted
/// over the middle half; its rise is the noise level. Falls back to Otsu when
/// the profile is too short to fit.
pub fn calculate_threshold(plane: &FloatPlane, background: Background, snr: f32) -> f32 {
    let mut sorted = plane.data.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let size = plane.width.max(plane.height);
    if sorted.is_empty() || size == 0 {
        return 0.0;
    }
    let profile: Vec<f64> = (0..size)
        .map(|k| sorted[(k * sorted.len() / size).min(sorted.len() - 1)] as f64)
        .collect();

    let ndrop = size / 4;
    let end = size.saturating_sub(ndrop + 1);
    if end <= ndrop + 1 {
        return otsu_threshold(plane);
    }
    let xs: Vec<f64> = (ndrop..end).map(|v| v as f64).collect();
    let Some((slope, intercept)) = linear_fit(&xs, &profile[ndrop..end]) else {
        return otsu_threshold(plane);
    };
    let y_end = intercept + slope * (size - 1) as f64;
    let noise = (y_end - intercept).abs();
    let snr = snr as f64;
    let t = match background {
        Background::Bright => intercept - noise * snr * 0.5,
        Background::Dark => y_end + noise * snr * 0.5,
    };
    log::debug!("dot threshold {t:.2} (noise {noise:.2})");
    t as f32
}

/// Segment dots against `threshold`: dark dots on bright paper are the
/// pixels below it, bright dots the pixels above. If that yields a majority
/// the mask is inverted. Border-touching components and specks are removed.
pub fn binarize(plane: &FloatPlane, threshold: f32, background: Background) -> GrayImage {
    let mut mask = GrayImage::new(plane.width, plane.height);
    let mut fg = 0usize;
    for (m, &v) in mask.data.iter_mut().zip(&plane.data) {
        let is_dot = match background {
            Background::Bright => v < threshold,
            Background::Dark => v > threshold,
        };
        if is_dot {
            *m = 255;
            fg += 1;
        }
    }
    if 2 * fg > mask.data.len() {
        for m in &mut mask.data {
            *m = 255 - *m;
        }
    }
    remove_border_and_specks(&mask)
}

/// Otsu threshold of a float plane, quantized to 256 bins over its range.
pub fn otsu_threshold(plane: &FloatPlane) -> f32 {
    let (lo, hi) = plane
        .data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(hi > lo) {
        return lo;
    }
    let scale = 255.0 / (hi - lo);
    let mut hist = [0u32; 256];
    for &v in &plane.data {
        hist[((v - lo) * scale).round().clamp(0.0, 255.0) as usize] += 1;
    }
    lo + otsu_bin(&hist) as f32 / scale
}

/// Bin that maximizes the between-class variance of a 256-bin histogram.
///
/// Planes with at most two populated levels split halfway between them.
pub(crate) fn otsu_bin(hist: &[u32; 256]) -> u8 {
    let populated: Vec<usize> = (0..256).filter(|&i| hist[i] > 0).collect();
    match populated.as_slice() {
        [] => return 127,
        [only] => return *only as u8,
        [a, b] => return ((a + b) / 2) as u8,
        _ => {}
    }

    let n: f64 = hist.iter().map(|&h| h as f64).sum();
    let mass: f64 = hist.iter().enumerate().map(|(i, &h)| i as f64 * h as f64).sum();

    // Running count and mass of the dark class.
    let (mut count, mut dark_mass) = (0f64, 0f64);
    let mut best = (f64::NEG_INFINITY, 127u8);
    for (level, &h) in hist.iter().enumerate() {
        count += h as f64;
        dark_mass += level as f64 * h as f64;
        let bright = n - count;
        if count == 0.0 {
            continue;
        }
        if bright == 0.0 {
            break;
        }
        let gap = dark_mass / count - (mass - dark_mass) / bright;
        let between = count * bright * gap * gap;
        if between > best.0 {
            best = (between, level as u8);
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_separates_dots_from_paper() {
        let mut hist = [0u32; 256];
        hist[20] = 100;
        hist[21] = 1;
        hist[22] = 1;
        hist[199] = 1;
        hist[200] = 300;
        let t = otsu_bin(&hist);
        assert!((22..199).contains(&t), "t = {t}");

        let mut two_levels = [0u32; 256];
        two_levels[40] = 5;
        two_levels[60] = 9;
        assert_eq!(otsu_bin(&two_levels), 50);
    }

    #[test]
    fn flattening_keeps_flat_images_flat() {
        let img = GrayImage {
            width: 40,
            height: 30,
            data: vec![180; 1200],
        };
        let plane = normalize_background(&img.view(), 20.0);
        assert!(plane.data.iter().all(|v| (v - 180.0).abs() < 1.0));
    }

    #[test]
    fn dark_dots_on_bright_paper_become_foreground() {
        let mut img = GrayImage {
            width: 60,
            height: 60,
            data: vec![230; 3600],
        };
        for (cx, cy) in [(20usize, 20usize), (40, 40)] {
            for y in cy - 3..=cy + 3 {
                for x in cx - 3..=cx + 3 {
                    img.set(x, y, 15);
                }
            }
        }
        let plane = FloatPlane::from_gray(&img.view());
        let t = calculate_threshold(&plane, Background::Bright, 1.5);
        assert!(t > 15.0 && t <= 230.0, "t = {t}");
        let mask = binarize(&plane, t, Background::Bright);
        assert_eq!(mask.get(20, 20), 255);
        assert_eq!(mask.get(5, 5), 0);
    }
}
