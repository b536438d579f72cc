//! File formats and artifact writing.
//!
//! Artifacts are collected in memory first and written only once every
//! computation has succeeded. All files are staged as temporary siblings and
//! renamed into place only after every one of them was written.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{EncodableLayout, ImageBuffer, ImageFormat, PixelWithColorType, RgbImage};
use serde::Serialize;
use table_digitizer_core::{column_sums_csv, CornerInputError, CornerSet, Matrix};

use crate::error::DigitizeError;
use crate::pipeline::{DigitizeReport, Digitization};

/// Parse a corner list of exactly four `[x, y]` pairs, e.g.
/// `[[10,20],[30,40],[30,80],[10,80]]`.
///
/// The text is parsed as JSON data, never evaluated.
pub fn parse_corners(text: &str) -> Result<CornerSet, CornerInputError> {
    let pairs: Vec<[f32; 2]> =
        serde_json::from_str(text).map_err(|e| CornerInputError::Malformed {
            offset: byte_offset(text, e.line(), e.column()),
            reason: e.to_string(),
        })?;
    CornerSet::from_pairs(&pairs)
}

/// serde_json reports 1-based line / column; turn that into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let before: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (before + column.saturating_sub(1)).min(text.len())
}

pub fn encode_png<P>(img: &ImageBuffer<P, Vec<P::Subpixel>>) -> Result<Vec<u8>, DigitizeError>
where
    P: PixelWithColorType,
    [P::Subpixel]: EncodableLayout,
{
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(DigitizeError::Encode)?;
    Ok(buf)
}

pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, DigitizeError> {
    let bytes = fs::read(path)?;
    crate::pipeline::decode_image(&bytes)
}

pub fn load_matrix_csv(path: impl AsRef<Path>) -> Result<Matrix, DigitizeError> {
    let text = fs::read_to_string(path)?;
    Ok(Matrix::from_csv(&text)?)
}

pub fn load_report(path: impl AsRef<Path>) -> Result<DigitizeReport, DigitizeError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// `.name.tmp` next to `path`.
fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

/// Write `bytes` to a temporary file next to `path`, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = staging_path(path)?;
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Named files waiting to be written into one output directory.
#[derive(Debug)]
pub struct Artifacts {
    dir: PathBuf,
    files: Vec<(String, Vec<u8>)>,
}

impl Artifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, bytes: Vec<u8>) {
        self.files.push((name.to_string(), bytes));
    }

    pub fn push_text(&mut self, name: &str, text: String) {
        self.push(name, text.into_bytes());
    }

    pub fn push_png<P>(
        &mut self,
        name: &str,
        img: &ImageBuffer<P, Vec<P::Subpixel>>,
    ) -> Result<(), DigitizeError>
    where
        P: PixelWithColorType,
        [P::Subpixel]: EncodableLayout,
    {
        let bytes = encode_png(img)?;
        self.push(name, bytes);
        Ok(())
    }

    pub fn push_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), DigitizeError> {
        let mut text = serde_json::to_string_pretty(value)?;
        text.push('\n');
        self.push_text(name, text);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(n, _)| n.as_str())
    }

    /// Create the directory and write every file; returns the written paths.
    ///
    /// Every file is staged first. Nothing is renamed into place unless all
    /// staged writes succeeded, and staged files are removed on failure.
    pub fn write_all(self) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());
        for (name, bytes) in &self.files {
            let path = self.dir.join(name);
            if path.is_dir() {
                let e = io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a directory", path.display()),
                );
                return Err(discard(&staged, e));
            }
            let tmp = match staging_path(&path) {
                Ok(tmp) => tmp,
                Err(e) => return Err(discard(&staged, e)),
            };
            if let Err(e) = fs::write(&tmp, bytes) {
                let _ = fs::remove_file(&tmp);
                return Err(discard(&staged, e));
            }
            staged.push((tmp, path));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, path) {
                // Drop the part of the set that already landed.
                for done in &written {
                    let _ = fs::remove_file(done);
                }
                return Err(discard(&staged[i..], e));
            }
            log::debug!("wrote {}", path.display());
            written.push(path.clone());
        }
        Ok(written)
    }
}

/// Remove staged files and hand back the error that stopped the write.
fn discard(staged: &[(PathBuf, PathBuf)], err: io::Error) -> io::Error {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
    log::warn!("artifact write failed, nothing committed: {err}");
    err
}

pub const MATRIX_CSV: &str = "matrix.csv";
pub const COLUMN_SUMS_CSV: &str = "column_sums.csv";
pub const RECTIFIED_PNG: &str = "rectified.png";
pub const OVERLAY_PNG: &str = "overlay.png";
pub const REPORT_JSON: &str = "report.json";

/// Matrix, sums, rectified and overlay images, and the JSON report.
pub fn digitization_artifacts(
    result: &Digitization,
    dir: impl Into<PathBuf>,
) -> Result<Artifacts, DigitizeError> {
    let mut out = Artifacts::new(dir);
    out.push_text(MATRIX_CSV, result.matrix().to_csv());
    out.push_text(COLUMN_SUMS_CSV, column_sums_csv(&result.column_sums()));
    out.push_png(RECTIFIED_PNG, result.rectified())?;
    out.push_png(OVERLAY_PNG, result.overlay())?;
    out.push_json(REPORT_JSON, &result.report())?;
    Ok(out)
}
