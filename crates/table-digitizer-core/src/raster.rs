use image::{ImageBuffer, Luma, Rgb, RgbImage};

/// Borrowed row-major grayscale buffer.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned row-major grayscale buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Convert into an `image::GrayImage` for encoding.
    pub fn to_luma8(&self) -> image::GrayImage {
        image::GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .unwrap_or_else(|| image::GrayImage::new(self.width as u32, self.height as u32))
    }
}

impl From<&image::GrayImage> for GrayImage {
    fn from(img: &image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }
}

/// Borrow an `image::GrayImage` as a lightweight view.
pub fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Luma conversion used by every grayscale stage (Rec. 709 weights via `image`).
pub fn to_gray(img: &RgbImage) -> GrayImage {
    let luma = image::DynamicImage::ImageRgb8(img.clone()).to_luma8();
    GrayImage::from(&luma)
}

/// Gaussian blur of a grayscale view through `imageproc`, as `f32` in 0..255.
///
/// `sigma <= 0` returns the input unchanged.
pub fn blur_gray_f32(src: &GrayImageView<'_>, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 || src.width == 0 || src.height == 0 {
        return src.data.iter().map(|&v| v as f32).collect();
    }
    let (w, h) = (src.width as u32, src.height as u32);
    let f = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(w, h, |x, y| {
        Luma([src.data[y as usize * src.width + x as usize] as f32 / 255.0])
    });
    blur_unit_f32(f, sigma)
}

/// Gaussian blur of an arbitrary-scale float plane (row-major).
pub fn blur_plane_f32(data: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 || width == 0 || height == 0 {
        return data.to_vec();
    }
    let max = data.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
    if max == 0.0 {
        return data.to_vec();
    }
    let f = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(width as u32, height as u32, |x, y| {
        Luma([data[y as usize * width + x as usize] / max])
    });
    blur_unit_f32(f, sigma)
        .into_iter()
        .map(|v| v / 255.0 * max)
        .collect()
}

fn blur_unit_f32(f: ImageBuffer<Luma<f32>, Vec<f32>>, sigma: f32) -> Vec<f32> {
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    blurred.pixels().map(|p| p[0] * 255.0).collect()
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn get_rgb(src: &RgbImage, x: i32, y: i32) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width() as i32 || y >= src.height() as i32 {
        return [0.0; 3];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

/// Bilinear colour sample; out-of-bounds neighbours read as black.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage {
            width: 2,
            height: 1,
            data: vec![0, 100],
        };
        let v = sample_bilinear(&img.view(), 0.5, 0.0);
        assert!((v - 50.0).abs() < 1e-4);
    }

    #[test]
    fn rgb_sample_on_integer_grid_returns_pixel() {
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(1, 2, Rgb([10, 20, 30]));
        assert_eq!(sample_bilinear_rgb(&img, 1.0, 2.0), Rgb([10, 20, 30]));
    }

    #[test]
    fn blur_keeps_flat_images_flat() {
        let img = GrayImage {
            width: 8,
            height: 6,
            data: vec![120; 48],
        };
        let out = blur_gray_f32(&img.view(), 2.0);
        assert!(out.iter().all(|v| (v - 120.0).abs() < 0.5));
    }

    #[test]
    fn outside_samples_are_black() {
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        assert_eq!(sample_bilinear_rgb(&img, -5.0, -5.0), Rgb([0, 0, 0]));
    }
}
