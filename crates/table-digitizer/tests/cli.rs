use std::fs;
use std::path::Path;

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("table-digitizer").expect("binary is built")
}

/// 100x50 white page with a red block covering cell (0, 2) of a 2x4 grid.
fn write_table(path: &Path) {
    let img = RgbImage::from_fn(100, 50, |x, y| {
        if (50..75).contains(&x) && y < 25 {
            Rgb([230, 20, 20])
        } else {
            Rgb([255, 255, 255])
        }
    });
    img.save(path).expect("save png");
}

#[test]
fn digitize_with_corners_writes_all_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("table.png");
    write_table(&image);
    let out = dir.path().join("out");

    cli()
        .args(["digitize", "--cols", "4", "--rows", "2"])
        .arg("--image")
        .arg(&image)
        .arg("--corners")
        .arg("[[100,50],[0,50],[0,0],[100,0]]")
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("2x4 cells, 1 shaded"));

    assert_eq!(
        fs::read_to_string(out.join("matrix.csv")).expect("matrix"),
        "0,0,1,0\n0,0,0,0\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("column_sums.csv")).expect("sums"),
        "index,sum\n0,0\n1,0\n2,1\n3,0\n"
    );
    let rectified = image::open(out.join("rectified.png")).expect("rectified");
    let overlay = image::open(out.join("overlay.png")).expect("overlay");
    assert_eq!((rectified.width(), rectified.height()), (100, 50));
    assert_eq!((overlay.width(), overlay.height()), (100, 50));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("report.json")).expect("report"))
            .expect("json");
    assert_eq!(report["source"], "corners");
    assert_eq!(report["column_sums"], serde_json::json!([0, 0, 1, 0]));
}

#[test]
fn malformed_corners_fail_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("table.png");
    write_table(&image);
    let out = dir.path().join("out");

    cli()
        .arg("digitize")
        .arg("--image")
        .arg(&image)
        .args(["--corners", "[[0,0],[100,0],[100,50]]"])
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WrongCount(3)"));

    cli()
        .arg("digitize")
        .arg("--image")
        .arg(&image)
        .args(["--corners", "[[0,0],[100,0],[100,50],[0,5*10]]"])
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed"));

    assert!(!out.exists());
}

#[test]
fn undecodable_input_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("table.png");
    fs::write(&image, b"not a png at all").expect("write");
    let out = dir.path().join("out");

    cli()
        .arg("digitize")
        .arg("--image")
        .arg(&image)
        .args(["--corners", "[[0,0],[10,0],[10,10],[0,10]]"])
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decode"));
    assert!(!out.exists());
}

#[test]
fn recompute_follows_the_edited_matrix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rectified = dir.path().join("rectified.png");
    RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]))
        .save(&rectified)
        .expect("save");
    let matrix = dir.path().join("matrix.csv");
    fs::write(&matrix, "1,0\n1,1\n").expect("write");
    let out = dir.path().join("out");

    cli()
        .arg("recompute")
        .arg("--rectified")
        .arg(&rectified)
        .arg("--matrix")
        .arg(&matrix)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("[2, 1]"));

    assert_eq!(
        fs::read_to_string(out.join("column_sums.csv")).expect("sums"),
        "index,sum\n0,2\n1,1\n"
    );
    let overlay = image::open(out.join("overlay.png"))
        .expect("overlay")
        .to_rgb8();
    assert_eq!(overlay.dimensions(), (40, 20));
    // Inner pixel of shaded cell (0, 0): green blended over white.
    let tint = ((1.0 - 0.3f32) * 255.0).round() as u8;
    assert_eq!(overlay.get_pixel(5, 5), &Rgb([tint, 255, tint]));
}

/// 400x300 page ruled at x = 60 and x = 300 and at y = 90.
fn write_ruled_page(path: &Path) {
    RgbImage::from_fn(400, 300, |x, y| {
        if [60, 61, 300, 301].contains(&x) || [90, 91].contains(&y) {
            Rgb([20, 20, 20])
        } else {
            Rgb([245, 245, 245])
        }
    })
    .save(path)
    .expect("save png");
}

fn index_of(bounds: &serde_json::Value, v: u64) -> usize {
    let b: Vec<u64> = bounds
        .as_array()
        .expect("bounds")
        .iter()
        .map(|b| b.as_u64().expect("u32"))
        .collect();
    b.windows(2).position(|w| w[0] <= v && v < w[1]).expect("inside")
}

#[test]
fn recompute_reuses_detected_boundaries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = dir.path().join("page.png");
    write_ruled_page(&page);
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{ "lines": { "subdivisions": 1, "expected_cols": 3 } }"#)
        .expect("write");
    let out = dir.path().join("out");

    cli()
        .arg("digitize")
        .arg("--image")
        .arg(&page)
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("report.json")).expect("report"))
            .expect("json");
    assert_eq!(report["source"], "detected");
    let (rows, cols) = (
        report["rows"].as_u64().expect("rows") as usize,
        report["cols"].as_u64().expect("cols") as usize,
    );
    assert_eq!(cols, 3);
    // x = 100 lies right of the first rule but inside the first third of the page.
    assert_eq!(index_of(&report["col_bounds"], 20), 0);
    assert_eq!(index_of(&report["col_bounds"], 100), 1);

    // Only the top-left cell is shaded.
    let csv: String = (0..rows)
        .map(|r| {
            let row: Vec<&str> = (0..cols)
                .map(|c| if r == 0 && c == 0 { "1" } else { "0" })
                .collect();
            row.join(",") + "\n"
        })
        .collect();
    let matrix = dir.path().join("edited.csv");
    fs::write(&matrix, csv).expect("write");

    let recomputed = dir.path().join("recomputed");
    cli()
        .arg("recompute")
        .arg("--rectified")
        .arg(out.join("rectified.png"))
        .arg("--matrix")
        .arg(&matrix)
        .arg("--report")
        .arg(out.join("report.json"))
        .arg("--out-dir")
        .arg(&recomputed)
        .assert()
        .success();
    let overlay = image::open(recomputed.join("overlay.png"))
        .expect("overlay")
        .to_rgb8();
    let shaded = overlay.get_pixel(20, 40);
    let unshaded = overlay.get_pixel(100, 40);
    assert!(shaded[1] > shaded[0], "green tint expected, got {shaded:?}");
    assert!(unshaded[0] > unshaded[1], "red tint expected, got {unshaded:?}");

    // Without a report the grid falls back to uniform thirds.
    let bare = dir.path().join("bare");
    fs::create_dir(&bare).expect("mkdir");
    fs::copy(out.join("rectified.png"), bare.join("rectified.png")).expect("copy");
    let uniform = dir.path().join("uniform");
    cli()
        .arg("recompute")
        .arg("--rectified")
        .arg(bare.join("rectified.png"))
        .arg("--matrix")
        .arg(&matrix)
        .arg("--out-dir")
        .arg(&uniform)
        .assert()
        .success();
    let overlay = image::open(uniform.join("overlay.png"))
        .expect("overlay")
        .to_rgb8();
    let px = overlay.get_pixel(100, 40);
    assert!(px[1] > px[0], "uniform grid puts x = 100 in the first column");
}

#[test]
fn recompute_rejects_a_ragged_matrix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rectified = dir.path().join("rectified.png");
    RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]))
        .save(&rectified)
        .expect("save");
    let matrix = dir.path().join("matrix.csv");
    fs::write(&matrix, "1,0\n1\n").expect("write");

    cli()
        .arg("recompute")
        .arg("--rectified")
        .arg(&rectified)
        .arg("--matrix")
        .arg(&matrix)
        .arg("--out-dir")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ragged"));
}

#[test]
fn help_lists_the_subcommands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("digitize"))
        .stdout(predicate::str::contains("recompute"))
        .stdout(predicate::str::contains("calibrate"));
}

/// 11 x 11 dark dots with mild barrel distortion around the image centre.
fn write_dot_grid(path: &Path) {
    let (size, center, spacing, k2) = (320u32, 160.0f64, 24.0f64, -1.5e-6f64);
    let centers: Vec<(f64, f64)> = (-5..=5)
        .flat_map(|j| (-5..=5).map(move |i| (spacing * i as f64, spacing * j as f64)))
        .map(|(dx, dy)| {
            let f = 1.0 + k2 * (dx * dx + dy * dy);
            (center + dx * f, center + dy * f)
        })
        .collect();
    RgbImage::from_fn(size, size, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        if centers
            .iter()
            .any(|&(cx, cy)| (fx - cx).powi(2) + (fy - cy).powi(2) <= 4.5 * 4.5)
        {
            Rgb([25, 25, 25])
        } else {
            let v = 236 + ((x * 3 + y * 5) % 7) as u8;
            Rgb([v, v, v])
        }
    })
    .save(path)
    .expect("save png");
}

#[test]
fn calibration_files_feed_back_into_digitize() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grid = dir.path().join("dots.png");
    write_dot_grid(&grid);
    let cal = dir.path().join("cal");

    cli()
        .arg("calibrate")
        .arg("--image")
        .arg(&grid)
        .arg("--out-dir")
        .arg(&cal)
        .args(["--num-coef", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 coefficients"));

    for name in [
        "coefficients_radial_distortion.txt",
        "perspective_coefficients.txt",
        "segmented_dots.png",
        "image_radial_corrected.png",
        "image_corrected.png",
        "horizontal_lines.png",
        "vertical_lines.png",
        "residual_hor_before_correction.png",
        "residual_ver_after_correction.png",
        "calibration_report.json",
    ] {
        assert!(cal.join(name).is_file(), "missing {name}");
    }
    let metadata =
        fs::read_to_string(cal.join("coefficients_radial_distortion.txt")).expect("metadata");
    assert!(metadata.starts_with("xcenter = "));
    assert!(metadata.contains("factor2 = "));

    let table = dir.path().join("table.png");
    write_table(&table);
    let out = dir.path().join("out");
    cli()
        .arg("digitize")
        .arg("--image")
        .arg(&table)
        .args(["--corners", "[[0,0],[100,0],[100,50],[0,50]]"])
        .args(["--cols", "4", "--rows", "2"])
        .arg("--distortion")
        .arg(cal.join("coefficients_radial_distortion.txt"))
        .arg("--perspective")
        .arg(cal.join("perspective_coefficients.txt"))
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success();
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("report.json")).expect("report"))
            .expect("json");
    assert_eq!(report["calibrated"], true);
}
