//! Horizon shading profile and its file validator.
//!
//! A horizon file is plain text, tab-delimited, two columns
//! (azimuth degrees, elevation degrees): at least two rows, first azimuth 0,
//! last azimuth 360, azimuths strictly ascending, every cell a finite float.
//!
//! Validation is pure: no caching here. The request builder memoizes
//! validated maps per path when several arrays share one file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HorizonFileError;

/// Ordered azimuth -> elevation shading profile (degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonMap {
    points: Vec<(f64, f64)>,
}

impl HorizonMap {
    /// Flat horizon, elevation 0 everywhere. The operative default when
    /// horizon correction is disabled for an array.
    pub fn no_shading() -> Self {
        Self {
            points: vec![(0.0, 0.0), (360.0, 0.0)],
        }
    }

    /// Fully obstructed horizon, elevation 90 everywhere. Exported as a named
    /// constant for callers that need an explicit "blocked" profile; never
    /// substituted silently on validation failure.
    pub fn full_shading() -> Self {
        Self {
            points: vec![(0.0, 90.0), (360.0, 90.0)],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Parse and validate horizon file contents.
    ///
    /// Returns the parsed (azimuth, elevation) pairs verbatim on success.
    pub fn parse(text: &str) -> Result<Self, HorizonFileError> {
        let mut points: Vec<(f64, f64)> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let cells: Vec<&str> = line.split('\t').collect();
            if cells.len() != 2 {
                return Err(HorizonFileError::Shape {
                    rows: text.lines().filter(|l| !l.trim().is_empty()).count(),
                    cols: cells.len(),
                });
            }

            let azimuth = parse_cell(cells[0], index + 1)?;
            let elevation = parse_cell(cells[1], index + 1)?;
            points.push((azimuth, elevation));
        }

        if points.len() < 2 {
            return Err(HorizonFileError::Shape {
                rows: points.len(),
                cols: 2,
            });
        }

        let first = points[0].0;
        let last = points[points.len() - 1].0;
        if first != 0.0 || last != 360.0 {
            return Err(HorizonFileError::Coverage { first, last });
        }

        for pair in points.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(HorizonFileError::NotAscending { azimuth: pair[0].0 });
            }
        }

        Ok(Self { points })
    }

    /// Read and validate a horizon file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HorizonFileError> {
        let path = path.as_ref();
        let text =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| HorizonFileError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::parse(&text)
    }
}

fn parse_cell(cell: &str, row: usize) -> Result<f64, HorizonFileError> {
    match cell.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(HorizonFileError::NonNumeric { row }),
    }
}
