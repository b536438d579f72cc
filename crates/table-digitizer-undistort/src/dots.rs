use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use table_digitizer_core::GrayImage;

use crate::error::UndistortError;
use crate::fit::median;

/// Centroid and pixel area of one segmented dot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    pub center: Point2<f64>,
    pub area: u32,
}

/// Median dot area and median nearest-neighbour spacing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotStats {
    pub count: usize,
    pub size: f64,
    pub distance: f64,
}

#[derive(Clone, Copy, Debug)]
struct Blob {
    area: u32,
    sum_x: f64,
    sum_y: f64,
    touches_border: bool,
}

fn label_blobs(mask: &GrayImage) -> (image::ImageBuffer<Luma<u32>, Vec<u32>>, Vec<Blob>) {
    let labels = connected_components(&mask.to_luma8(), Connectivity::Eight, Luma([0u8]));
    let (w, h) = (mask.width as u32, mask.height as u32);
    let mut blobs: Vec<Blob> = Vec::new();
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label == 0 {
            continue;
        }
        if blobs.len() < label {
            blobs.resize(
                label,
                Blob {
                    area: 0,
                    sum_x: 0.0,
                    sum_y: 0.0,
                    touches_border: false,
                },
            );
        }
        let b = &mut blobs[label - 1];
        b.area += 1;
        b.sum_x += x as f64;
        b.sum_y += y as f64;
        b.touches_border |= x == 0 || y == 0 || x + 1 == w || y + 1 == h;
    }
    (labels, blobs)
}

/// Drop components touching the image border and those smaller than an
/// eighth of the median component area.
pub fn remove_border_and_specks(mask: &GrayImage) -> GrayImage {
    let (labels, blobs) = label_blobs(mask);
    let mut areas: Vec<f64> = blobs
        .iter()
        .filter(|b| b.area > 0 && !b.touches_border)
        .map(|b| b.area as f64)
        .collect();
    let min_area = median(&mut areas).map_or(0.0, |m| m / 8.0);

    let keep: Vec<bool> = blobs
        .iter()
        .map(|b| b.area > 0 && !b.touches_border && b.area as f64 >= min_area)
        .collect();
    let mut out = GrayImage::new(mask.width, mask.height);
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label > 0 && keep[label - 1] {
            out.set(x as usize, y as usize, 255);
        }
    }
    out
}

/// Centroids of all foreground components, in label order.
pub fn extract_dots(mask: &GrayImage) -> Vec<Dot> {
    let (_, blobs) = label_blobs(mask);
    blobs
        .into_iter()
        .filter(|b| b.area > 0)
        .map(|b| Dot {
            center: Point2::new(b.sum_x / b.area as f64, b.sum_y / b.area as f64),
            area: b.area,
        })
        .collect()
}

/// Nearest-neighbour distance of every dot (k-d tree).
pub fn nearest_distances(dots: &[Dot]) -> Vec<f64> {
    if dots.len() < 2 {
        return Vec::new();
    }
    let coords: Vec<[f64; 2]> = dots.iter().map(|d| [d.center.x, d.center.y]).collect();
    let tree: KdTree<f64, 2> = (&coords).into();
    coords
        .iter()
        .enumerate()
        .filter_map(|(i, q)| {
            tree.nearest_n::<SquaredEuclidean>(q, 2)
                .into_iter()
                .find(|nn| nn.item as usize != i)
                .map(|nn| nn.distance.sqrt())
        })
        .collect()
}

/// Median dot size and spacing.
pub fn calc_size_distance(dots: &[Dot]) -> Result<DotStats, UndistortError> {
    if dots.len() < 2 {
        return Err(UndistortError::NoDots);
    }
    let mut areas: Vec<f64> = dots.iter().map(|d| d.area as f64).collect();
    let mut dists = nearest_distances(dots);
    let size = median(&mut areas).ok_or(UndistortError::NoDots)?;
    let distance = median(&mut dists).ok_or(UndistortError::NoDots)?;
    Ok(DotStats {
        count: dots.len(),
        size,
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(mask: &mut GrayImage, cx: usize, cy: usize, r: usize) {
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                mask.set(x, y, 255);
            }
        }
    }

    #[test]
    fn border_blobs_and_specks_are_removed() {
        let mut m = GrayImage::new(50, 50);
        square(&mut m, 10, 10, 3);
        square(&mut m, 30, 30, 3);
        square(&mut m, 2, 40, 2); // touches the border
        m.set(20, 40, 255); // speck
        let clean = remove_border_and_specks(&m);
        let dots = extract_dots(&clean);
        assert_eq!(dots.len(), 2);
        assert_relative_eq!(dots[0].center.x, 10.0);
    }

    #[test]
    fn grid_spacing_is_the_median_neighbour_distance() {
        let dots: Vec<Dot> = (0..4)
            .flat_map(|j| {
                (0..5).map(move |i| Dot {
                    center: Point2::new(10.0 + 20.0 * i as f64, 12.0 + 20.0 * j as f64),
                    area: 9,
                })
            })
            .collect();
        let stats = calc_size_distance(&dots).expect("stats");
        assert_relative_eq!(stats.distance, 20.0, epsilon = 1e-9);
        assert_relative_eq!(stats.size, 9.0);
        assert_eq!(stats.count, 20);
    }

    #[test]
    fn single_dot_has_no_statistics() {
        let d = [Dot {
            center: Point2::new(1.0, 1.0),
            area: 4,
        }];
        assert!(matches!(calc_size_distance(&d), Err(UndistortError::NoDots)));
    }
}
