//! End-to-end digitization: decode, optional undistortion, grid, classify,
//! overlay.

use std::borrow::Cow;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use table_digitizer_cells::{
    render_overlay, CellClassifier, CellGrid, CellGridError, OverlayError, OverlayParams,
};
use table_digitizer_core::{
    rectify_rgb, to_gray, BoundarySequence, CornerSet, Matrix, OrderedCorners,
};
use table_digitizer_lines::LineDetector;
use table_digitizer_undistort::{
    correct_perspective_image, load_metadata_txt, load_perspective_txt, DistortionModel,
    PerspectiveCoefficients, UndistortError,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::DigitizeConfig;
use crate::error::DigitizeError;

/// Lens calibration applied to every input before the grid is located.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub model: DistortionModel,
    pub perspective: Option<PerspectiveCoefficients>,
}

impl Calibration {
    pub fn new(model: DistortionModel, perspective: Option<PerspectiveCoefficients>) -> Self {
        Self { model, perspective }
    }

    /// Read the text files written by the `calibrate` command.
    pub fn load(
        metadata: impl AsRef<Path>,
        perspective: Option<&Path>,
    ) -> Result<Self, UndistortError> {
        let model = load_metadata_txt(metadata)?;
        let perspective = perspective.map(load_perspective_txt).transpose()?;
        Ok(Self { model, perspective })
    }

    /// Radial unwarp, then the projective correction when present.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let radial = self.model.unwarp_rgb(image);
        match &self.perspective {
            Some(coef) => correct_perspective_image(&radial, coef),
            None => radial,
        }
    }
}

/// Explicit per-run state; there is no process-wide configuration.
#[derive(Clone, Debug, Default)]
pub struct DigitizeContext {
    pub config: DigitizeConfig,
    pub calibration: Option<Calibration>,
}

impl DigitizeContext {
    pub fn new(config: DigitizeConfig) -> Self {
        Self {
            config,
            calibration: None,
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }
}

/// Where the cell grid came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    /// Uniform grid over a corner-rectified image.
    Corners,
    /// Boundaries found by the line detector.
    Detected,
    /// Uniform grid matching a supplied matrix.
    Matrix,
}

/// Result of one run. The matrix can only be swapped as a whole, and the
/// overlay always reflects the current matrix.
#[derive(Clone, Debug)]
pub struct Digitization {
    rectified: RgbImage,
    grid: CellGrid,
    matrix: Matrix,
    overlay: RgbImage,
    overlay_params: OverlayParams,
    corners: Option<OrderedCorners>,
    source: GridSource,
    calibrated: bool,
}

/// Serializable summary written next to the artifacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigitizeReport {
    pub width: u32,
    pub height: u32,
    pub rows: usize,
    pub cols: usize,
    pub source: GridSource,
    pub calibrated: bool,
    pub corners: Option<OrderedCorners>,
    pub row_bounds: Vec<u32>,
    pub col_bounds: Vec<u32>,
    pub shaded: usize,
    pub column_sums: Vec<u32>,
}

impl DigitizeReport {
    /// The grid the matrix was classified on, checked against the recorded
    /// image size.
    pub fn cell_grid(&self) -> Result<CellGrid, CellGridError> {
        let rows = BoundarySequence::within(self.row_bounds.clone(), self.height)?;
        let cols = BoundarySequence::within(self.col_bounds.clone(), self.width)?;
        Ok(CellGrid::new(rows, cols))
    }
}

impl Digitization {
    /// Assemble a result from an existing rectified image and matrix, e.g. after
    /// a human edited the matrix offline.
    pub fn from_parts(
        rectified: RgbImage,
        grid: CellGrid,
        matrix: Matrix,
        overlay_params: OverlayParams,
    ) -> Result<Self, OverlayError> {
        let overlay = render_overlay(&rectified, &matrix, &grid, &overlay_params)?;
        Ok(Self {
            rectified,
            grid,
            matrix,
            overlay,
            overlay_params,
            corners: None,
            source: GridSource::Matrix,
            calibrated: false,
        })
    }

    pub fn rectified(&self) -> &RgbImage {
        &self.rectified
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn overlay(&self) -> &RgbImage {
        &self.overlay
    }

    pub fn corners(&self) -> Option<&OrderedCorners> {
        self.corners.as_ref()
    }

    pub fn source(&self) -> GridSource {
        self.source
    }

    /// Always derived from the current matrix.
    pub fn column_sums(&self) -> Vec<u32> {
        self.matrix.column_sums()
    }

    /// Replace the matrix wholesale and redraw the overlay.
    ///
    /// On a shape mismatch nothing changes.
    pub fn replace_matrix(&mut self, matrix: Matrix) -> Result<(), OverlayError> {
        let overlay = render_overlay(&self.rectified, &matrix, &self.grid, &self.overlay_params)?;
        self.matrix = matrix;
        self.overlay = overlay;
        Ok(())
    }

    pub fn report(&self) -> DigitizeReport {
        let (rows, cols) = self.matrix.shape();
        DigitizeReport {
            width: self.rectified.width(),
            height: self.rectified.height(),
            rows,
            cols,
            source: self.source,
            calibrated: self.calibrated,
            corners: self.corners,
            row_bounds: self.grid.rows.as_slice().to_vec(),
            col_bounds: self.grid.cols.as_slice().to_vec(),
            shaded: self.matrix.count_shaded(),
            column_sums: self.column_sums(),
        }
    }
}

/// Decode JPEG/PNG/... bytes into RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, DigitizeError> {
    let img = image::load_from_memory(bytes).map_err(DigitizeError::Decode)?;
    Ok(img.to_rgb8())
}

/// Digitize encoded image bytes.
///
/// With `corners` the image is rectified and covered by a uniform grid of
/// `config.cols` columns; without, the line detector locates the grid on the
/// (possibly undistorted) input.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(bytes, corners, ctx),
        fields(len = bytes.len(), corners = corners.is_some())
    )
)]
pub fn digitize(
    bytes: &[u8],
    corners: Option<&CornerSet>,
    ctx: &DigitizeContext,
) -> Result<Digitization, DigitizeError> {
    let image = decode_image(bytes)?;
    digitize_image(&image, corners, ctx)
}

/// [`digitize`] on an already decoded image.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(image, corners, ctx),
        fields(width = image.width(), height = image.height())
    )
)]
pub fn digitize_image(
    image: &RgbImage,
    corners: Option<&CornerSet>,
    ctx: &DigitizeContext,
) -> Result<Digitization, DigitizeError> {
    let cfg = &ctx.config;
    let input: Cow<'_, RgbImage> = match &ctx.calibration {
        Some(calibration) => Cow::Owned(calibration.apply(image)),
        None => Cow::Borrowed(image),
    };

    let (rectified, grid, ordered, source) = match corners {
        Some(corners) => {
            let rect = rectify_rgb(&input, corners)?;
            let grid = CellGrid::uniform(rect.width, rect.height, cfg.cols, cfg.rows)?;
            (rect.image, grid, Some(rect.corners), GridSource::Corners)
        }
        None => {
            let gray = to_gray(&input);
            let geometry = LineDetector::new(cfg.lines.clone())
                .detect(&gray.view())?
                .geometry;
            let grid = CellGrid::new(geometry.rows, geometry.cols);
            (input.into_owned(), grid, None, GridSource::Detected)
        }
    };

    let matrix = CellClassifier::new(cfg.classifier.clone()).classify(&rectified, &grid)?;
    let overlay = render_overlay(&rectified, &matrix, &grid, &cfg.overlay)?;
    log::info!(
        "digitized {}x{} image into {:?} cells, {} shaded",
        rectified.width(),
        rectified.height(),
        matrix.shape(),
        matrix.count_shaded()
    );

    Ok(Digitization {
        rectified,
        grid,
        matrix,
        overlay,
        overlay_params: cfg.overlay.clone(),
        corners: ordered,
        source,
        calibrated: ctx.calibration.is_some(),
    })
}
