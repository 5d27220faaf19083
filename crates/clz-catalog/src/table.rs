//! Column oriented input tables and the sources they are read from.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use clz_core::{ClzError, CoordSky, ErrorInfo};
use serde::{Deserialize, Serialize};

/// In-memory table of floating point columns with equal length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: BTreeMap<String, Vec<f64>>,
    len: usize,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, values)` pairs.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, ClzError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    /// Adds or replaces a column; all columns must have the same length.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), ClzError> {
        let name = name.into();
        let replaces_only = self.columns.len() == 1 && self.columns.contains_key(&name);
        if !self.columns.is_empty() && !replaces_only && values.len() != self.len {
            return Err(ClzError::Config(
                ErrorInfo::new("table-length", "column length does not match table")
                    .with_context("column", name)
                    .with_context("expected", self.len.to_string())
                    .with_context("found", values.len().to_string()),
            ));
        }
        self.len = values.len();
        self.columns.insert(name, values);
        Ok(())
    }

    /// Returns the named column.
    pub fn column(&self, name: &str) -> Result<&[f64], ClzError> {
        self.columns.get(name).map(Vec::as_slice).ok_or_else(|| {
            ClzError::Config(
                ErrorInfo::new("missing-column", format!("column '{name}' not found"))
                    .with_context("available", self.column_names().join(",")),
            )
        })
    }

    /// Names of all columns in sorted order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads a CSV file with a header row; every field must parse as `f64`.
    pub fn read_csv(path: &Path) -> Result<Self, ClzError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .map_err(|err| csv_error("table-open", path, err))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| csv_error("table-header", path, err))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|err| csv_error("table-record", path, err))?;
            for (idx, field) in record.iter().enumerate() {
                let value: f64 = field.parse().map_err(|_| {
                    ClzError::Serde(
                        ErrorInfo::new("table-parse", format!("invalid number '{field}'"))
                            .with_path(path)
                            .with_context("row", (line + 1).to_string())
                            .with_context("column", headers[idx].clone()),
                    )
                })?;
                values[idx].push(value);
            }
        }
        Self::from_columns(headers.into_iter().zip(values))
    }

    /// Writes the table as CSV with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<(), ClzError> {
        let mut writer =
            csv::Writer::from_path(path).map_err(|err| csv_error("table-create", path, err))?;
        let names = self.column_names();
        writer
            .write_record(&names)
            .map_err(|err| csv_error("table-write", path, err))?;
        for row in 0..self.len {
            let record: Vec<String> = names
                .iter()
                .map(|name| self.columns[name][row].to_string())
                .collect();
            writer
                .write_record(&record)
                .map_err(|err| csv_error("table-write", path, err))?;
        }
        writer
            .flush()
            .map_err(|err| ClzError::from_io("table-flush", path, err))
    }
}

fn csv_error(code: &str, path: &Path, err: csv::Error) -> ClzError {
    if let csv::ErrorKind::Io(io_err) = err.kind() {
        if io_err.kind() == std::io::ErrorKind::NotFound {
            return ClzError::NotFound(ErrorInfo::new(code, err.to_string()).with_path(path));
        }
    }
    ClzError::Serde(ErrorInfo::new(code, err.to_string()).with_path(path))
}

/// Where catalog rows come from.
#[derive(Debug, Clone, Copy)]
pub enum DataSource<'a> {
    /// Rows already loaded in memory.
    Table(&'a Table),
    /// A CSV file that is read on demand.
    Path(&'a Path),
}

impl<'a> DataSource<'a> {
    /// Loads the rows; in-memory tables are borrowed, files are parsed.
    pub fn load(&self) -> Result<Cow<'a, Table>, ClzError> {
        match *self {
            DataSource::Table(table) => Ok(Cow::Borrowed(table)),
            DataSource::Path(path) => Table::read_csv(path).map(Cow::Owned),
        }
    }
}

impl<'a> From<&'a Table> for DataSource<'a> {
    fn from(table: &'a Table) -> Self {
        DataSource::Table(table)
    }
}

impl<'a> From<&'a Path> for DataSource<'a> {
    fn from(path: &'a Path) -> Self {
        DataSource::Path(path)
    }
}

/// Column names used to extract positions, redshifts and weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Right ascension column in degrees.
    pub ra: String,
    /// Declination column in degrees.
    pub dec: String,
    /// Optional redshift column.
    #[serde(default)]
    pub redshift: Option<String>,
    /// Optional per-object weight column.
    #[serde(default)]
    pub weight: Option<String>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            ra: "ra".to_string(),
            dec: "dec".to_string(),
            redshift: None,
            weight: None,
        }
    }
}

impl ColumnSpec {
    /// Sets the redshift column.
    pub fn with_redshift(mut self, name: impl Into<String>) -> Self {
        self.redshift = Some(name.into());
        self
    }

    /// Sets the weight column.
    pub fn with_weight(mut self, name: impl Into<String>) -> Self {
        self.weight = Some(name.into());
        self
    }

    /// Extracts the configured columns from `table`.
    pub fn extract(&self, table: &Table) -> Result<Records, ClzError> {
        let coords = CoordSky::from_degrees(table.column(&self.ra)?, table.column(&self.dec)?)?;
        let redshifts = match &self.redshift {
            Some(name) => Some(table.column(name)?.to_vec()),
            None => None,
        };
        let weights = match &self.weight {
            Some(name) => Some(table.column(name)?.to_vec()),
            None => None,
        };
        Ok(Records {
            coords,
            redshifts,
            weights,
        })
    }
}

/// Rows reduced to the quantities a catalog stores.
#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    /// Positions in radians.
    pub coords: CoordSky,
    /// Optional redshifts.
    pub redshifts: Option<Vec<f64>>,
    /// Optional weights.
    pub weights: Option<Vec<f64>>,
}

impl Records {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// True if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::from_columns([("ra", vec![1.0, 2.0]), ("dec", vec![1.0])]).unwrap_err();
        assert_eq!(err.info().code, "table-length");
    }

    #[test]
    fn csv_roundtrip_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table =
            Table::from_columns([("ra", vec![10.0, 20.5]), ("dec", vec![-1.0, 3.25])]).unwrap();
        table.write_csv(&path).unwrap();
        assert_eq!(Table::read_csv(&path).unwrap(), table);
    }

    #[test]
    fn missing_column_names_the_column() {
        let table = Table::from_columns([("ra", vec![1.0]), ("dec", vec![1.0])]).unwrap();
        let spec = ColumnSpec::default().with_redshift("z");
        let err = spec.extract(&table).unwrap_err();
        assert_eq!(err.info().code, "missing-column");
        assert!(err.info().message.contains("'z'"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Table::read_csv(Path::new("/nonexistent/table.csv")).unwrap_err();
        assert!(err.is_not_found());
    }
}
