use std::path::Path;

use serde::{Deserialize, Serialize};
use table_digitizer_cells::{ClassifierParams, OverlayParams};
use table_digitizer_lines::LineDetectorParams;
use table_digitizer_undistort::UndistortParams;

use crate::error::DigitizeError;

/// Every tunable of a digitization run. Missing JSON fields take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitizeConfig {
    /// Columns of the uniform grid laid over a corner-rectified image.
    pub cols: usize,
    /// Rows of the uniform grid; `None` assumes square cells.
    pub rows: Option<usize>,
    /// Automatic geometry detection, used when no corners are given.
    pub lines: LineDetectorParams,
    pub classifier: ClassifierParams,
    pub overlay: OverlayParams,
    /// Dot-grid calibration.
    pub undistort: UndistortParams,
}

impl Default for DigitizeConfig {
    fn default() -> Self {
        Self {
            cols: 48,
            rows: None,
            lines: LineDetectorParams::default(),
            classifier: ClassifierParams::default(),
            overlay: OverlayParams::default(),
            undistort: UndistortParams::default(),
        }
    }
}

impl DigitizeConfig {
    pub fn from_json_str(text: &str) -> Result<Self, DigitizeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DigitizeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, DigitizeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
