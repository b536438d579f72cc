use serde::{Deserialize, Serialize};

/// Which family of grid lines an error or a computation refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAxis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for LineAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineAxis::Horizontal => f.write_str("horizontal"),
            LineAxis::Vertical => f.write_str("vertical"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum UndistortError {
    #[error("no calibration dots found")]
    NoDots,
    #[error("too few {axis} lines: found {found}, need at least {needed}")]
    TooFewLines {
        axis: LineAxis,
        found: usize,
        needed: usize,
    },
    #[error("least-squares fit is singular: {0}")]
    SingularFit(&'static str),
    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
