//! Histogram densities over redshift bins.

use std::path::Path;

use clz_core::{create_parent_dir, ClzError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// A collection of densities sharing the same bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityEnsemble {
    edges: Vec<f64>,
    pdfs: Vec<Vec<f64>>,
}

impl DensityEnsemble {
    /// Normalises every row to integrate to one over `edges`.
    ///
    /// Rows whose integral is not a positive finite number carry no usable
    /// density and become all zero.
    pub fn from_rows(edges: Vec<f64>, rows: Vec<Vec<f64>>) -> Self {
        let widths: Vec<f64> = edges.windows(2).map(|pair| pair[1] - pair[0]).collect();
        let pdfs = rows
            .into_iter()
            .map(|row| {
                let norm = integrate(&row, &widths);
                if norm.is_finite() && norm > 0.0 {
                    row.into_iter().map(|value| value / norm).collect()
                } else {
                    vec![0.0; row.len()]
                }
            })
            .collect();
        Self { edges, pdfs }
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Density rows.
    pub fn pdfs(&self) -> &[Vec<f64>] {
        &self.pdfs
    }

    /// Number of densities.
    pub fn len(&self) -> usize {
        self.pdfs.len()
    }

    /// True if there are no densities.
    pub fn is_empty(&self) -> bool {
        self.pdfs.is_empty()
    }

    fn widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }

    /// Integral of row `idx` over the bin edges.
    pub fn integral(&self, idx: usize) -> f64 {
        integrate(&self.pdfs[idx], &self.widths())
    }

    /// Mean redshift of row `idx`; NaN for an all-zero row.
    pub fn mean(&self, idx: usize) -> f64 {
        let widths = self.widths();
        let weighted: f64 = self.edges
            .windows(2)
            .zip(&self.pdfs[idx])
            .zip(&widths)
            .map(|((pair, p), dz)| 0.5 * (pair[0] + pair[1]) * p * dz)
            .sum();
        weighted / integrate(&self.pdfs[idx], &widths)
    }

    /// Writes one line per bin: `z_low,z_high,pdf_0,pdf_1,...`.
    pub fn write_csv(&self, path: &Path) -> Result<(), ClzError> {
        create_parent_dir(path)?;
        let mut writer = csv::Writer::from_path(path).map_err(|err| csv_error("density-create", path, err))?;
        let mut header = vec!["z_low".to_string(), "z_high".to_string()];
        header.extend((0..self.pdfs.len()).map(|idx| format!("pdf_{idx}")));
        writer
            .write_record(&header)
            .map_err(|err| csv_error("density-write", path, err))?;
        for (bin, pair) in self.edges.windows(2).enumerate() {
            let mut record = vec![pair[0].to_string(), pair[1].to_string()];
            record.extend(self.pdfs.iter().map(|row| row[bin].to_string()));
            writer
                .write_record(&record)
                .map_err(|err| csv_error("density-write", path, err))?;
        }
        writer
            .flush()
            .map_err(|err| ClzError::from_io("density-flush", path, err))
    }

    /// Reads a file written by [`DensityEnsemble::write_csv`].
    pub fn read_csv(path: &Path) -> Result<Self, ClzError> {
        let mut reader = csv::Reader::from_path(path).map_err(|err| csv_error("density-open", path, err))?;
        let n_pdfs = reader
            .headers()
            .map_err(|err| csv_error("density-header", path, err))?
            .len()
            .saturating_sub(2);
        let mut edges = Vec::new();
        let mut pdfs = vec![Vec::new(); n_pdfs];
        for record in reader.records() {
            let record = record.map_err(|err| csv_error("density-record", path, err))?;
            let values = record
                .iter()
                .map(|field| field.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| {
                    ClzError::Serde(ErrorInfo::new("density-parse", err.to_string()).with_path(path))
                })?;
            if values.len() != n_pdfs + 2 {
                return Err(ClzError::Serde(
                    ErrorInfo::new("density-parse", "density row has the wrong number of fields")
                        .with_path(path),
                ));
            }
            if edges.is_empty() {
                edges.push(values[0]);
            }
            edges.push(values[1]);
            for (row, value) in pdfs.iter_mut().zip(&values[2..]) {
                row.push(*value);
            }
        }
        Ok(Self { edges, pdfs })
    }
}

fn integrate(row: &[f64], widths: &[f64]) -> f64 {
    row.iter().zip(widths).map(|(p, dz)| p * dz).sum()
}

fn csv_error(code: &str, path: &Path, err: csv::Error) -> ClzError {
    ClzError::Serde(ErrorInfo::new(code, err.to_string()).with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_integrate_to_one() {
        let ensemble = DensityEnsemble::from_rows(
            vec![0.0, 0.5, 1.5],
            vec![vec![1.0, 1.0], vec![0.0, 0.0], vec![4.0, 0.0]],
        );
        assert!((ensemble.integral(0) - 1.0).abs() < 1e-12);
        assert_eq!(ensemble.pdfs()[1], vec![0.0, 0.0]);
        assert!((ensemble.integral(2) - 1.0).abs() < 1e-12);
        assert!((ensemble.mean(2) - 0.25).abs() < 1e-12);
        assert!(ensemble.mean(1).is_nan());
    }

    #[test]
    fn rows_without_positive_integral_become_zero() {
        let ensemble = DensityEnsemble::from_rows(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                vec![1.0, -1.0, 0.0],
                vec![-1.0, -1.0, 0.0],
                vec![2.0, -1.0, 1.0],
                vec![1.0, f64::NAN, 1.0],
            ],
        );
        assert_eq!(ensemble.pdfs()[0], vec![0.0; 3]);
        assert_eq!(ensemble.pdfs()[1], vec![0.0; 3]);
        assert_eq!(ensemble.pdfs()[2], vec![1.0, -0.5, 0.5]);
        assert!((ensemble.integral(2) - 1.0).abs() < 1e-12);
        assert_eq!(ensemble.pdfs()[3], vec![0.0; 3]);
    }
}
