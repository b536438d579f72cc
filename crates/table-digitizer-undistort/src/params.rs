use serde::{Deserialize, Serialize};

/// Polarity of the calibration sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Dark dots on bright paper.
    Bright,
    /// Bright dots on a dark background.
    Dark,
}

/// Parameters of the dot-grid calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndistortParams {
    /// Width of the low-pass window used for background flattening, in
    /// frequency units. Non-positive disables flattening.
    pub fft_sigma: f32,
    pub background: Background,
    /// Signal-to-noise factor of the dot threshold.
    pub snr: f32,
    /// Tolerance, as a fraction of the dot spacing, for a dot to sit on a line.
    pub ratio: f64,
    /// Consecutive dots a line may skip.
    pub num_dot_miss: usize,
    /// Lines shorter than this fraction of the longest line are dropped.
    pub accepted_ratio: f64,
    /// Number of radial polynomial coefficients.
    pub num_coef: usize,
}

impl Default for UndistortParams {
    fn default() -> Self {
        Self {
            fft_sigma: 20.0,
            background: Background::Bright,
            snr: 1.5,
            ratio: 0.3,
            num_dot_miss: 2,
            accepted_ratio: 0.6,
            num_coef: 4,
        }
    }
}
