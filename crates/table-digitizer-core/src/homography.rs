use crate::raster::{sample_bilinear_rgb, sample_bilinear_u8, GrayImage, GrayImageView};
use image::RgbImage;
use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Projective map `dst ~ H * src` between two pixel planes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Build from the eight free coefficients `[c0..c7]` with `h33 = 1`:
    ///
    /// ```text
    /// x' = (c0 x + c1 y + c2) / (c6 x + c7 y + 1)
    /// y' = (c3 x + c4 y + c5) / (c6 x + c7 y + 1)
    /// ```
    pub fn from_coefficients(c: [f64; 8]) -> Self {
        Self::new(Matrix3::new(
            c[0], c[1], c[2], //
            c[3], c[4], c[5], //
            c[6], c[7], 1.0,
        ))
    }

    /// Inverse of [`Homography::from_coefficients`]. Returns `None` when `h33` vanishes.
    pub fn to_coefficients(&self) -> Option<[f64; 8]> {
        let h = normalize_scale(self.h)?;
        Some([
            h[(0, 0)],
            h[(0, 1)],
            h[(0, 2)],
            h[(1, 0)],
            h[(1, 1)],
            h[(1, 2)],
            h[(2, 0)],
            h[(2, 1)],
        ])
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let q = self.apply_f64(Point2::new(p.x as f64, p.y as f64));
        Point2::new(q.x as f32, q.y as f32)
    }

    #[inline]
    pub fn apply_f64(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Hartley conditioning: centroid to the origin, mean distance `sqrt(2)`.
fn conditioning(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len().max(1) as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_scale(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

/// Undo conditioning: `H = T_dst^-1 * Hn * T_src`, scaled so `h33 = 1`.
fn uncondition(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Homography> {
    let h = t_dst.try_inverse()? * hn * t_src;
    normalize_scale(h).map(Homography::new)
}

/// Least-squares homography such that `dst ~ H * src`.
///
/// Four correspondences are solved exactly, more go through the normalized DLT.
pub fn estimate_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if src.len() == 4 {
        let s: &[Point2<f32>; 4] = src.try_into().ok()?;
        let d: &[Point2<f32>; 4] = dst.try_into().ok()?;
        return homography_from_4pt(s, d);
    }

    let (s, ts) = conditioning(src);
    let (d, td) = conditioning(dst);

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (k, (p, q)) in s.iter().zip(d.iter()).enumerate() {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let r0 = 2 * k;
        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // Null vector of A: last row of V^T.
    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let last = vt.nrows().checked_sub(1)?;
    let h = vt.row(last);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    uncondition(hn, ts, td)
}

/// Exact homography from four correspondences, `dst ~ H * src`.
///
/// Corner order must agree between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let (s, ts) = conditioning(src);
    let (d, td) = conditioning(dst);

    // Unknowns [h11 h12 h13 h21 h22 h23 h31 h32], h33 = 1.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y, u, v) = (s[k].x, s[k].y, d[k].x, d[k].y);
        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    uncondition(hn, ts, td)
}

/// Backward warp of a grayscale image: every output pixel `(x, y)` samples the
/// source at `h_src_from_dst * (x, y)`.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
            out.data[y * out_w + x] = sample_bilinear_u8(src, p.x, p.y);
        }
    }
    out
}

/// Colour counterpart of [`warp_perspective_gray`].
pub fn warp_perspective_rgb(
    src: &RgbImage,
    h_src_from_dst: Homography,
    out_w: u32,
    out_h: u32,
) -> RgbImage {
    RgbImage::from_fn(out_w, out_h, |x, y| {
        let p = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
        sample_bilinear_rgb(src, p.x, p.y)
    })
}
