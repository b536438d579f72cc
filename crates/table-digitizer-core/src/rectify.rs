use crate::corners::{CornerSet, OrderedCorners};
use crate::homography::{
    homography_from_4pt, warp_perspective_gray, warp_perspective_rgb, Homography,
};
use crate::raster::{GrayImage, GrayImageView};
use image::RgbImage;
use nalgebra::Point2;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    #[error("degenerate geometry: rectified size would be {width}x{height}")]
    DegenerateGeometry { width: i64, height: i64 },
    #[error("degenerate geometry: corners do not define a homography")]
    SingularHomography,
    #[error("rectified size {width}x{height} exceeds the pixel limit")]
    TooLarge { width: i64, height: i64 },
}

/// Upper bound on `width * height` of a rectified image.
pub const MAX_RECTIFIED_PIXELS: u64 = 1 << 28;

/// Output of [`rectify_rgb`] / [`rectify_gray`].
#[derive(Clone, Debug)]
pub struct Rectified<I> {
    pub image: I,
    pub corners: OrderedCorners,
    /// Maps rectified pixels back into the source image.
    pub h_src_from_rect: Homography,
    pub width: u32,
    pub height: u32,
}

/// Rectangle size and backward homography for a corner set.
///
/// The output rectangle `(0,0), (w-1,0), (w-1,h-1), (0,h-1)` is mapped onto the
/// ordered source corners.
pub fn rectification_for(
    corners: &CornerSet,
) -> Result<(OrderedCorners, Homography, u32, u32), RectifyError> {
    let ordered = corners.ordered();
    if ordered.has_repeated_corner() {
        log::warn!("corner ordering assigned one point to two roles: {ordered:?}");
    }

    let w = ordered.mean_width().round() as i64;
    let h = ordered.mean_height().round() as i64;
    if w <= 0 || h <= 0 {
        return Err(RectifyError::DegenerateGeometry { width: w, height: h });
    }
    let (w, h) = match (u32::try_from(w), u32::try_from(h)) {
        (Ok(w32), Ok(h32)) if u64::from(w32) * u64::from(h32) <= MAX_RECTIFIED_PIXELS => {
            (w32, h32)
        }
        _ => return Err(RectifyError::TooLarge { width: w, height: h }),
    };

    let rect = [
        Point2::new(0.0, 0.0),
        Point2::new((w - 1) as f32, 0.0),
        Point2::new((w - 1) as f32, (h - 1) as f32),
        Point2::new(0.0, (h - 1) as f32),
    ];
    let h_src_from_rect = if w == 1 || h == 1 {
        // The rectangle collapses to a line; map it with a plain translation.
        Homography::from_coefficients([
            1.0,
            0.0,
            ordered.top_left.x as f64,
            0.0,
            1.0,
            ordered.top_left.y as f64,
            0.0,
            0.0,
        ])
    } else {
        homography_from_4pt(&rect, &ordered.as_array()).ok_or(RectifyError::SingularHomography)?
    };
    log::debug!("rectified size {w}x{h}");
    Ok((ordered, h_src_from_rect, w, h))
}

/// Remove perspective skew from a colour image.
pub fn rectify_rgb(
    src: &RgbImage,
    corners: &CornerSet,
) -> Result<Rectified<RgbImage>, RectifyError> {
    let (ordered, h_src_from_rect, width, height) = rectification_for(corners)?;
    let image = warp_perspective_rgb(src, h_src_from_rect, width, height);
    Ok(Rectified {
        image,
        corners: ordered,
        h_src_from_rect,
        width,
        height,
    })
}

pub fn rectify_gray(
    src: &GrayImageView<'_>,
    corners: &CornerSet,
) -> Result<Rectified<GrayImage>, RectifyError> {
    let (ordered, h_src_from_rect, width, height) = rectification_for(corners)?;
    let image = warp_perspective_gray(src, h_src_from_rect, width as usize, height as usize);
    Ok(Rectified {
        image,
        corners: ordered,
        h_src_from_rect,
        width,
        height,
    })
}
