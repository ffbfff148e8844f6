//! Delimited numeric tables for recorded sessions
//!
//! Session logs are plain text rows separated by `;` or `,`, optionally
//! gzipped, with an optional header line naming the columns.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use ndarray::{Array2, ArrayView2};

use crate::error::{AlignError, AlignResult};
use crate::types::COL_TIME;

/// Parse a numeric table; the first line is treated as a header if it mentions "time"
pub fn parse_table<R: BufRead>(reader: R) -> AlignResult<Array2<f64>> {
    let mut values = Vec::new();
    let mut width: Option<usize> = None;
    let mut rows = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if idx == 0 && trimmed.to_ascii_lowercase().contains("time") {
            continue;
        }

        let line_no = idx + 1;
        let mut cells = 0;
        for cell in trimmed.split(&[';', ','][..]) {
            let cell = cell.trim();
            let value = cell.parse::<f64>().map_err(|e| AlignError::Parse {
                line: line_no,
                message: format!("{:?}: {}", cell, e),
            })?;
            values.push(value);
            cells += 1;
        }

        match width {
            None => width = Some(cells),
            Some(w) if w != cells => {
                return Err(AlignError::TableShape(format!(
                    "line {} has {} columns, expected {}",
                    line_no, cells, w
                )));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let shape = (rows, width.unwrap_or(0));
    Array2::from_shape_vec(shape, values).map_err(|e| AlignError::TableShape(e.to_string()))
}

/// Open and parse a table file, gunzipping `*.gz`
pub fn load_table<P: AsRef<Path>>(path: P) -> AlignResult<Array2<f64>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        parse_table(BufReader::new(GzDecoder::new(file)))?
    } else {
        parse_table(BufReader::new(file))?
    };
    log::debug!(
        "loaded {} rows x {} cols from {}",
        table.nrows(),
        table.ncols(),
        path.display()
    );
    Ok(table)
}

/// Row indices with `min_sec * 1000 <= time_ms < max_sec * 1000`
pub fn time_slice(table: ArrayView2<f64>, min_sec: f64, max_sec: f64) -> Vec<usize> {
    if table.ncols() <= COL_TIME {
        return Vec::new();
    }
    let (lo, hi) = (min_sec * 1000.0, max_sec * 1000.0);
    table
        .column(COL_TIME)
        .iter()
        .enumerate()
        .filter(|&(_, &t)| t >= lo && t < hi)
        .map(|(i, _)| i)
        .collect()
}

/// Accelerometer and GPS log paths for a recorded session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionFiles {
    pub accel: PathBuf,
    pub gps: PathBuf,
}

impl SessionFiles {
    /// `<dir>/accel.<date>.csv` and `<dir>/gps.<date>.csv`
    pub fn in_dir<P: AsRef<Path>>(dir: P, date: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            accel: dir.join(format!("accel.{}.csv", date)),
            gps: dir.join(format!("gps.{}.csv", date)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use ndarray::array;
    use std::io::{Cursor, Write};

    #[test]
    fn test_parse_with_header_and_semicolons() {
        let text = "time;ax;ay;az\n0;0.1;0.2;9.8\n20;0.3;-0.1;9.7\n";
        let table = parse_table(Cursor::new(text)).unwrap();
        assert_eq!(table, array![[0.0, 0.1, 0.2, 9.8], [20.0, 0.3, -0.1, 9.7]]);
    }

    #[test]
    fn test_parse_without_header_with_commas() {
        let text = "1000, 52.1, 4.3, 50.0, 90.0\n\n2000, 52.1, 4.3, 52.0, 91.5\n";
        let table = parse_table(Cursor::new(text)).unwrap();
        assert_eq!(table.dim(), (2, 5));
        assert_eq!(table[[1, 4]], 91.5);
    }

    #[test]
    fn test_parse_header_detection_is_case_insensitive() {
        let table = parse_table(Cursor::new("Time,X\n1,2\n")).unwrap();
        assert_eq!(table, array![[1.0, 2.0]]);
    }

    #[test]
    fn test_parse_empty_input() {
        let table = parse_table(Cursor::new("")).unwrap();
        assert_eq!(table.dim(), (0, 0));
    }

    #[test]
    fn test_parse_reports_bad_cell() {
        let err = parse_table(Cursor::new("time;x\n1;2\n3;oops\n")).unwrap_err();
        assert!(matches!(err, AlignError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let err = parse_table(Cursor::new("1;2;3\n4;5\n")).unwrap_err();
        assert!(matches!(err, AlignError::TableShape(_)));
    }

    #[test]
    fn test_load_gzipped_table() {
        let path = std::env::temp_dir().join(format!("accel_table_{}.csv.gz", std::process::id()));
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"time;ax;ay;az\n0;1;2;3\n").unwrap();
        encoder.finish().unwrap();

        let table = load_table(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(table, array![[0.0, 1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_table("/nonexistent/accel.csv"),
            Err(AlignError::Io(_))
        ));
    }

    #[test]
    fn test_time_slice_bounds() {
        let table = array![
            [0.0, 1.0],
            [999.0, 1.0],
            [1000.0, 1.0],
            [1999.0, 1.0],
            [2000.0, 1.0]
        ];
        assert_eq!(time_slice(table.view(), 1.0, 2.0), vec![2, 3]);
        assert_eq!(time_slice(table.view(), 0.0, 0.5), vec![0]);
        assert!(time_slice(table.view(), 5.0, 6.0).is_empty());
    }

    #[test]
    fn test_session_files() {
        let files = SessionFiles::in_dir("/data", "2024-05-01");
        assert_eq!(files.accel, PathBuf::from("/data/accel.2024-05-01.csv"));
        assert_eq!(files.gps, PathBuf::from("/data/gps.2024-05-01.csv"));
    }
}
