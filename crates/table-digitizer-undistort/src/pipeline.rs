use image::RgbImage;
use serde::{Deserialize, Serialize};
use table_digitizer_core::{to_gray, GrayImage};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::dots::{calc_size_distance, extract_dots, DotStats};
use crate::error::{LineAxis, UndistortError};
use crate::grouping::{group_dots_hor_lines, group_dots_ver_lines, DotLine, GroupingParams};
use crate::model::{
    calc_coef_backward, unwarp_image_backward, unwarp_line_backward, DistortionModel,
};
use crate::params::UndistortParams;
use crate::parabola::{find_cod_coarse, regenerate_grid_points_parabola, require_lines};
use crate::perspective::{
    calc_perspective_coefficients, correct_perspective_image,
    generate_source_target_perspective_points, PerspectiveCoefficients,
};
use crate::preprocess::{binarize, calculate_threshold, normalize_background};
use crate::residual::{calc_residual_hor, calc_residual_ver, ResidualPoint, ResidualSummary};
use crate::slope::{calc_hor_slope, calc_ver_slope};

/// Residuals of both line families at one stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Residuals {
    pub hor: Vec<ResidualPoint>,
    pub ver: Vec<ResidualPoint>,
}

impl Residuals {
    pub fn summary(&self) -> ResidualSummary {
        let all: Vec<ResidualPoint> = self.hor.iter().chain(&self.ver).copied().collect();
        ResidualSummary::of(&all)
    }
}

/// Everything the dot-grid calibration produces.
#[derive(Clone, Debug)]
pub struct CalibrationResult {
    pub model: DistortionModel,
    pub perspective: PerspectiveCoefficients,
    pub threshold: f32,
    pub dots: DotStats,
    pub hor_slope: f64,
    pub ver_slope: f64,
    /// Lines as grouped from the segmented dots.
    pub hor_lines: Vec<DotLine>,
    pub ver_lines: Vec<DotLine>,
    pub residuals_before: Residuals,
    pub residuals_after: Residuals,
    pub segmented: GrayImage,
    pub radial_corrected: RgbImage,
    pub corrected: RgbImage,
}

/// Serializable digest of a [`CalibrationResult`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub model: DistortionModel,
    pub perspective: PerspectiveCoefficients,
    pub threshold: f32,
    pub dots: DotStats,
    pub hor_slope: f64,
    pub ver_slope: f64,
    pub hor_lines: usize,
    pub ver_lines: usize,
    pub residual_before: ResidualSummary,
    pub residual_after: ResidualSummary,
}

impl CalibrationResult {
    pub fn report(&self) -> CalibrationReport {
        CalibrationReport {
            model: self.model.clone(),
            perspective: self.perspective,
            threshold: self.threshold,
            dots: self.dots,
            hor_slope: self.hor_slope,
            ver_slope: self.ver_slope,
            hor_lines: self.hor_lines.len(),
            ver_lines: self.ver_lines.len(),
            residual_before: self.residuals_before.summary(),
            residual_after: self.residuals_after.summary(),
        }
    }
}

/// Estimate radial distortion and perspective from a photographed dot grid
/// and correct the image with both.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(w = image.width(), h = image.height()))
)]
pub fn calibrate(
    image: &RgbImage,
    params: &UndistortParams,
) -> Result<CalibrationResult, UndistortError> {
    let gray = to_gray(image);
    let flat = normalize_background(&gray.view(), params.fft_sigma);
    let threshold = calculate_threshold(&flat, params.background, params.snr);
    let segmented = binarize(&flat, threshold, params.background);

    let dots = extract_dots(&segmented);
    let stats = calc_size_distance(&dots)?;
    log::info!(
        "{} dots, median size {:.1} px, spacing {:.2} px",
        stats.count,
        stats.size,
        stats.distance
    );

    let hor_slope = calc_hor_slope(&dots, &stats, params.ratio);
    let ver_slope = calc_ver_slope(&dots, &stats, params.ratio);
    log::info!("horizontal slope {hor_slope:.5}, vertical slope {ver_slope:.5}");

    let grouping = GroupingParams {
        ratio: params.ratio,
        num_dot_miss: params.num_dot_miss,
        accepted_ratio: params.accepted_ratio,
    };
    let hor_lines = group_dots_hor_lines(&dots, hor_slope, stats.distance, &grouping);
    let ver_lines = group_dots_ver_lines(&dots, ver_slope, stats.distance, &grouping);
    require_lines(&hor_lines, LineAxis::Horizontal, 3)?;
    require_lines(&ver_lines, LineAxis::Vertical, 3)?;

    let residuals_before = Residuals {
        hor: calc_residual_hor(&hor_lines, 0.0, 0.0),
        ver: calc_residual_ver(&ver_lines, 0.0, 0.0),
    };

    let (hor_flat, ver_flat) = regenerate_grid_points_parabola(&hor_lines, &ver_lines, true)?;
    let (xc, yc) = find_cod_coarse(&hor_flat, &ver_flat)?;
    let model = calc_coef_backward(&hor_flat, &ver_flat, xc, yc, params.num_coef)?;

    let (hor_smooth, ver_smooth) = regenerate_grid_points_parabola(&hor_lines, &ver_lines, false)?;
    let hor_u = unwarp_line_backward(&hor_smooth, &model);
    let ver_u = unwarp_line_backward(&ver_smooth, &model);
    let residuals_after = Residuals {
        hor: calc_residual_hor(&hor_u, xc, yc),
        ver: calc_residual_ver(&ver_u, xc, yc),
    };
    log::info!(
        "mean residual {:.3} px before, {:.3} px after radial correction",
        residuals_before.summary().mean,
        residuals_after.summary().mean
    );

    let radial_corrected = unwarp_image_backward(image, &model);
    let (source, target) = generate_source_target_perspective_points(&hor_u, &ver_u)?;
    let perspective = calc_perspective_coefficients(&source, &target)?;
    let corrected = correct_perspective_image(&radial_corrected, &perspective);

    Ok(CalibrationResult {
        model,
        perspective,
        threshold,
        dots: stats,
        hor_slope,
        ver_slope,
        hor_lines,
        ver_lines,
        residuals_before,
        residuals_after,
        segmented,
        radial_corrected,
        corrected,
    })
}
