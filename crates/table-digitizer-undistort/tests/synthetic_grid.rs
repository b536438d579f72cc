use image::{Rgb, RgbImage};
use nalgebra::Point2;
use table_digitizer_undistort::{
    calibrate, load_metadata_txt, save_metadata_txt, DistortionModel, UndistortError,
    UndistortParams,
};

const SIZE: u32 = 320;
const CENTER: f64 = 160.0;
const SPACING: f64 = 24.0;
const K2: f64 = -1.5e-6;

/// Barrel distortion applied to an ideal point: `rd = ru (1 + K2 ru^2)`.
fn barrel(p: Point2<f64>) -> Point2<f64> {
    let (dx, dy) = (p.x - CENTER, p.y - CENTER);
    let f = 1.0 + K2 * (dx * dx + dy * dy);
    Point2::new(CENTER + dx * f, CENTER + dy * f)
}

/// 11 x 11 dark dots on lightly textured paper.
fn dot_grid_image() -> RgbImage {
    let centers: Vec<Point2<f64>> = (-5..=5)
        .flat_map(|j| {
            (-5..=5).map(move |i| {
                barrel(Point2::new(
                    CENTER + SPACING * i as f64,
                    CENTER + SPACING * j as f64,
                ))
            })
        })
        .collect();
    RgbImage::from_fn(SIZE, SIZE, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        let in_dot = centers
            .iter()
            .any(|c| (fx - c.x).powi(2) + (fy - c.y).powi(2) <= 4.5 * 4.5);
        if in_dot {
            Rgb([25, 25, 25])
        } else {
            let v = 236 + ((x * 3 + y * 5) % 7) as u8;
            Rgb([v, v, v])
        }
    })
}

#[test]
fn barrel_grid_is_straightened() {
    let img = dot_grid_image();
    let result = calibrate(&img, &UndistortParams::default()).expect("calibrate");

    assert_eq!(result.dots.count, 121);
    assert!((result.dots.distance - SPACING).abs() < 2.0);
    assert_eq!(result.hor_lines.len(), 11);
    assert_eq!(result.ver_lines.len(), 11);
    assert!(result.hor_slope.abs() < 0.02);
    assert!(result.ver_slope.abs() < 0.02);

    let m = &result.model;
    assert!((m.xcenter - CENTER).abs() < 6.0, "xcenter {}", m.xcenter);
    assert!((m.ycenter - CENTER).abs() < 6.0, "ycenter {}", m.ycenter);
    assert_eq!(m.coefficients.len(), 4);
    assert!((m.factor(0.0) - 1.0).abs() < 0.02);
    assert!(m.factor(150.0) < m.factor(10.0), "barrel model shrinks outwards");

    let before = result.residuals_before.summary();
    let after = result.residuals_after.summary();
    assert!(after.mean < before.mean, "{after:?} vs {before:?}");
    assert!(after.mean < 0.5, "{after:?}");

    assert_eq!(result.radial_corrected.dimensions(), img.dimensions());
    assert_eq!(result.corrected.dimensions(), img.dimensions());

    let report = result.report();
    assert_eq!(report.hor_lines, 11);
}

#[test]
fn blank_page_has_no_dots() {
    let img = RgbImage::from_fn(120, 90, |x, y| {
        let v = 236 + ((x * 3 + y * 5) % 7) as u8;
        Rgb([v, v, v])
    });
    let err = calibrate(&img, &UndistortParams::default()).unwrap_err();
    assert!(
        matches!(err, UndistortError::NoDots | UndistortError::TooFewLines { .. }),
        "{err}"
    );
}

#[test]
fn fitted_model_survives_a_file_round_trip() {
    let result = calibrate(&dot_grid_image(), &UndistortParams::default()).expect("calibrate");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("coefficients_radial_distortion.txt");
    save_metadata_txt(&path, &result.model).expect("save");
    let loaded: DistortionModel = load_metadata_txt(&path).expect("load");
    assert_eq!(loaded, result.model);
}
