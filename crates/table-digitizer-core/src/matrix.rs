use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("row {row} has {got} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("value {value:?} at row {row}, column {col} is not 0 or 1")]
    NotBinary {
        row: usize,
        col: usize,
        value: String,
    },
    #[error("matrix must have at least one row and one column")]
    Empty,
    #[error("{len} cells cannot fill a {rows}x{cols} matrix")]
    CellCount { rows: usize, cols: usize, len: usize },
}

/// Row-major binary occupancy matrix (1 = shaded).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

/// Unchecked wire form of [`Matrix`].
#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = MatrixError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        let RawMatrix { rows, cols, cells } = raw;
        if rows == 0 || cols == 0 {
            return Err(MatrixError::Empty);
        }
        if rows.checked_mul(cols) != Some(cells.len()) {
            return Err(MatrixError::CellCount {
                rows,
                cols,
                len: cells.len(),
            });
        }
        if let Some(i) = cells.iter().position(|&v| v > 1) {
            return Err(MatrixError::NotBinary {
                row: i / cols,
                col: i % cols,
                value: cells[i].to_string(),
            });
        }
        Ok(Self { rows, cols, cells })
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    /// Build from nested rows; values other than 0/1 and ragged rows are rejected.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, MatrixError> {
        let cols = rows.first().map(Vec::len).ok_or(MatrixError::Empty)?;
        if cols == 0 {
            return Err(MatrixError::Empty);
        }
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(MatrixError::Ragged {
                    row: r,
                    expected: cols,
                    got: row.len(),
                });
            }
            for (c, &v) in row.iter().enumerate() {
                if v > 1 {
                    return Err(MatrixError::NotBinary {
                        row: r,
                        col: c,
                        value: v.to_string(),
                    });
                }
                cells.push(v);
            }
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, shaded: bool) {
        self.cells[row * self.cols + col] = shaded as u8;
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Per-column totals, always recomputed from the cells.
    pub fn column_sums(&self) -> Vec<u32> {
        let mut sums = vec![0u32; self.cols];
        for row in self.iter_rows() {
            for (s, &v) in sums.iter_mut().zip(row) {
                *s += v as u32;
            }
        }
        sums
    }

    pub fn count_shaded(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 1).count()
    }

    /// Header-less, row-major CSV of 0/1.
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(self.rows * (2 * self.cols + 1));
        for row in self.iter_rows() {
            for (c, v) in row.iter().enumerate() {
                if c > 0 {
                    out.push(',');
                }
                out.push(if *v == 1 { '1' } else { '0' });
            }
            out.push('\n');
        }
        out
    }

    /// Parse the format written by [`Matrix::to_csv`]; blank lines are skipped.
    pub fn from_csv(text: &str) -> Result<Self, MatrixError> {
        let mut rows = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let r = rows.len();
            let mut row = Vec::new();
            for (c, field) in line.split(',').enumerate() {
                match field.trim() {
                    "0" => row.push(0),
                    "1" => row.push(1),
                    other => {
                        return Err(MatrixError::NotBinary {
                            row: r,
                            col: c,
                            value: other.to_string(),
                        })
                    }
                }
            }
            rows.push(row);
        }
        Self::from_rows(&rows)
    }
}

/// Column totals as a two-column `index,sum` table.
pub fn column_sums_csv(sums: &[u32]) -> String {
    let mut out = String::from("index,sum\n");
    for (i, s) in sums.iter().enumerate() {
        let _ = writeln!(out, "{i},{s}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_sums_follow_cells() {
        let m = Matrix::from_rows(&[vec![1, 0, 1], vec![1, 1, 0]]).expect("valid");
        assert_eq!(m.column_sums(), vec![2, 1, 1]);
        assert_eq!(m.count_shaded(), 4);
    }

    #[test]
    fn sums_after_replacement_match_fresh_computation() {
        let mut m = Matrix::zeros(3, 2);
        m.set(0, 1, true);
        let replacement = Matrix::from_rows(&[vec![0, 0], vec![1, 0], vec![1, 1]]).expect("valid");
        m = replacement.clone();
        assert_eq!(m.column_sums(), replacement.column_sums());
        assert_eq!(m.column_sums(), vec![2, 1]);
    }

    #[test]
    fn csv_is_header_less_row_major() {
        let m = Matrix::from_rows(&[vec![0, 1], vec![1, 0]]).expect("valid");
        assert_eq!(m.to_csv(), "0,1\n1,0\n");
        assert_eq!(Matrix::from_csv(&m.to_csv()).expect("parse"), m);
    }

    #[test]
    fn json_matrix_is_validated_on_load() {
        let m = Matrix::from_rows(&[vec![0, 1], vec![1, 1]]).expect("valid");
        let text = serde_json::to_string(&m).expect("serialize");
        assert_eq!(serde_json::from_str::<Matrix>(&text).expect("load"), m);

        for bad in [
            r#"{"rows":2,"cols":2,"cells":[0,1,1]}"#,
            r#"{"rows":0,"cols":3,"cells":[]}"#,
            r#"{"rows":1,"cols":2,"cells":[0,2]}"#,
        ] {
            assert!(serde_json::from_str::<Matrix>(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn ragged_or_non_binary_input_is_rejected() {
        assert!(matches!(
            Matrix::from_csv("0,1\n1\n"),
            Err(MatrixError::Ragged { row: 1, .. })
        ));
        assert!(matches!(
            Matrix::from_csv("0,2\n"),
            Err(MatrixError::NotBinary { col: 1, .. })
        ));
        assert_eq!(Matrix::from_csv(""), Err(MatrixError::Empty));
    }

    #[test]
    fn sums_table_has_index_column() {
        assert_eq!(column_sums_csv(&[0, 3]), "index,sum\n0,0\n1,3\n");
    }
}
