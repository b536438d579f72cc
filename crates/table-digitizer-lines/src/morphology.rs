//! Directional opening with line-shaped structuring elements.
//!
//! Opening a binary mask with a `1 x len` element keeps exactly the foreground
//! runs along that axis that are at least `len` long, so it is computed per
//! scanline from run lengths.

use table_digitizer_core::GrayImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Runs along x (horizontal rules).
    Horizontal,
    /// Runs along y (vertical rules).
    Vertical,
}

/// Opening of `mask` (non-zero = foreground) with a line element of `len`
/// pixels along `axis`. Lengths beyond the image extent are clamped to it.
pub fn open_directional(mask: &GrayImage, axis: Axis, len: usize) -> GrayImage {
    let (w, h) = (mask.width, mask.height);
    let mut out = GrayImage::new(w, h);
    let (lines, extent) = match axis {
        Axis::Horizontal => (h, w),
        Axis::Vertical => (w, h),
    };
    let len = len.clamp(1, extent.max(1));
    let index = |line: usize, t: usize| match axis {
        Axis::Horizontal => line * w + t,
        Axis::Vertical => t * w + line,
    };

    for line in 0..lines {
        let mut t = 0;
        while t < extent {
            if mask.data[index(line, t)] == 0 {
                t += 1;
                continue;
            }
            let start = t;
            while t < extent && mask.data[index(line, t)] != 0 {
                t += 1;
            }
            if t - start >= len {
                for s in start..t {
                    out.data[index(line, s)] = mask.data[index(line, s)];
                }
            }
        }
    }
    out
}
