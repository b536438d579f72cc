//! Lens distortion calibration from a photographed dot grid.
//!
//! The dots are segmented, grouped into horizontal and vertical lines, and the
//! bowing of those lines is explained by a backward radial polynomial around a
//! centre of distortion. A final projective correction makes the grid square.
//! [`calibrate`] runs the whole chain; every stage is also public so it can be
//! inspected on its own.

mod dots;
mod error;
mod fit;
mod grouping;
mod io;
mod model;
mod parabola;
mod params;
mod perspective;
mod pipeline;
mod plot;
mod preprocess;
mod residual;
mod slope;

pub use dots::{
    calc_size_distance, extract_dots, nearest_distances, remove_border_and_specks, Dot, DotStats,
};
pub use error::{LineAxis, UndistortError};
pub use fit::Parabola;
pub use grouping::{group_dots_hor_lines, group_dots_ver_lines, DotLine, GroupingParams};
pub use io::{
    load_metadata_txt, load_perspective_txt, metadata_to_string, parse_metadata, parse_perspective,
    perspective_to_string, save_metadata_txt, save_perspective_txt,
};
pub use model::{calc_coef_backward, unwarp_image_backward, unwarp_line_backward, DistortionModel};
pub use parabola::{find_cod_coarse, fit_parabolas, lines_centroid, regenerate_grid_points_parabola};
pub use params::{Background, UndistortParams};
pub use perspective::{
    calc_perspective_coefficients, correct_perspective_gray, correct_perspective_image,
    generate_source_target_perspective_points, PerspectiveCoefficients,
};
pub use pipeline::{calibrate, CalibrationReport, CalibrationResult, Residuals};
pub use plot::{render_line_plot, render_residual_plot, RESIDUAL_PLOT_SIZE};
pub use preprocess::{
    binarize, calculate_threshold, normalize_background, otsu_threshold, FloatPlane,
};
pub use residual::{calc_residual_hor, calc_residual_ver, ResidualPoint, ResidualSummary};
pub use slope::{calc_hor_slope, calc_ver_slope};
