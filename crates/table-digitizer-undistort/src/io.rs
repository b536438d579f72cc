//! Plain-text coefficient files.
//!
//! Radial metadata is written as `xcenter = ...`, `ycenter = ...` and
//! `factor{i} = ...` lines; perspective coefficients one value per line.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::UndistortError;
use crate::model::DistortionModel;
use crate::perspective::PerspectiveCoefficients;

pub fn metadata_to_string(model: &DistortionModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "xcenter = {}", model.xcenter);
    let _ = writeln!(out, "ycenter = {}", model.ycenter);
    for (i, k) in model.coefficients.iter().enumerate() {
        let _ = writeln!(out, "factor{i} = {k}");
    }
    out
}

fn parse_value(lineno: usize, raw: &str) -> Result<f64, UndistortError> {
    raw.trim().parse::<f64>().map_err(|e| UndistortError::Parse {
        line: lineno,
        reason: format!("{raw:?}: {e}"),
    })
}

pub fn parse_metadata(text: &str) -> Result<DistortionModel, UndistortError> {
    let (mut xc, mut yc) = (None, None);
    let mut factors: Vec<(usize, f64)> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let lineno = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| UndistortError::Parse {
            line: lineno,
            reason: "expected `key = value`".to_string(),
        })?;
        let value = parse_value(lineno, value)?;
        match key.trim() {
            "xcenter" => xc = Some(value),
            "ycenter" => yc = Some(value),
            k => {
                let idx = k
                    .strip_prefix("factor")
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| UndistortError::Parse {
                        line: lineno,
                        reason: format!("unknown key {k:?}"),
                    })?;
                factors.push((idx, value));
            }
        }
    }
    factors.sort_by_key(|f| f.0);
    if factors.iter().enumerate().any(|(i, f)| f.0 != i) || factors.is_empty() {
        return Err(UndistortError::Parse {
            line: 0,
            reason: "factors must be numbered 0.. without gaps".to_string(),
        });
    }
    let missing = |name: &str| UndistortError::Parse {
        line: 0,
        reason: format!("missing {name}"),
    };
    Ok(DistortionModel {
        xcenter: xc.ok_or_else(|| missing("xcenter"))?,
        ycenter: yc.ok_or_else(|| missing("ycenter"))?,
        coefficients: factors.into_iter().map(|f| f.1).collect(),
    })
}

pub fn perspective_to_string(coef: &PerspectiveCoefficients) -> String {
    coef.0.iter().fold(String::new(), |mut out, c| {
        let _ = writeln!(out, "{c:e}");
        out
    })
}

pub fn parse_perspective(text: &str) -> Result<PerspectiveCoefficients, UndistortError> {
    let values = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_value(i + 1, l))
        .collect::<Result<Vec<f64>, _>>()?;
    let arr: [f64; 8] = values.as_slice().try_into().map_err(|_| UndistortError::Parse {
        line: 0,
        reason: format!("expected 8 coefficients, got {}", values.len()),
    })?;
    Ok(PerspectiveCoefficients(arr))
}

pub fn save_metadata_txt(
    path: impl AsRef<Path>,
    model: &DistortionModel,
) -> Result<(), UndistortError> {
    std::fs::write(path, metadata_to_string(model))?;
    Ok(())
}

pub fn load_metadata_txt(path: impl AsRef<Path>) -> Result<DistortionModel, UndistortError> {
    parse_metadata(&std::fs::read_to_string(path)?)
}

pub fn save_perspective_txt(
    path: impl AsRef<Path>,
    coef: &PerspectiveCoefficients,
) -> Result<(), UndistortError> {
    std::fs::write(path, perspective_to_string(coef))?;
    Ok(())
}

pub fn load_perspective_txt(
    path: impl AsRef<Path>,
) -> Result<PerspectiveCoefficients, UndistortError> {
    parse_perspective(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coefficients_radial_distortion.txt");
        let model = DistortionModel {
            xcenter: 612.25,
            ycenter: 401.5,
            coefficients: vec![1.0003, -2.5e-5, 1.0e-8, -3.25e-12],
        };
        save_metadata_txt(&path, &model).expect("save");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("xcenter = 612.25\nycenter = 401.5\nfactor0 = "));
        assert_eq!(load_metadata_txt(&path).expect("load"), model);
    }

    #[test]
    fn perspective_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("perspective_coefficients.txt");
        let coef = PerspectiveCoefficients([1.01, 0.02, -3.5, -0.01, 0.99, 4.25, 1e-5, -2e-5]);
        save_perspective_txt(&path, &coef).expect("save");
        assert_eq!(load_perspective_txt(&path).expect("load"), coef);
    }

    #[test]
    fn malformed_files_report_the_line() {
        assert!(matches!(
            parse_metadata("xcenter = 1\nycenter: 2\n"),
            Err(UndistortError::Parse { line: 2, .. })
        ));
        assert!(parse_metadata("xcenter = 1\nycenter = 2\nfactor1 = 3\n").is_err());
        assert!(parse_perspective("1\n2\n3\n").is_err());
    }
}
