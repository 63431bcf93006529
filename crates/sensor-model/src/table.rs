//! Column-keyed sample table loaded from delimited text.
//!
//! Every column is an ordered sequence of `f64` samples sharing one
//! implicit time index, so all columns have the same length.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use dispviz_common::error::{DispvizError, DispvizResult};

/// A table of displacement samples keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    /// Column names in header order.
    names: Vec<String>,

    /// Samples per column.
    columns: HashMap<String, Vec<f64>>,

    /// Number of data rows shared by every column.
    rows: usize,
}

impl SampleTable {
    /// Load a table from a CSV file with a header row.
    pub fn from_path(path: impl AsRef<Path>) -> DispvizResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DispvizError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => DispvizError::parse(format!("Failed to open {}: {e}", path.display())),
        })?;

        let table = Self::from_reader(file).map_err(|e| match e {
            DispvizError::Parse { message } => {
                DispvizError::parse(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            columns = table.names.len(),
            rows = table.rows,
            "Sample table loaded"
        );
        Ok(table)
    }

    /// Parse a table from any reader producing CSV text.
    ///
    /// Parsing is all-or-nothing: a ragged row or a non-numeric cell
    /// rejects the whole input.
    pub fn from_reader(reader: impl Read) -> DispvizResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let names: Vec<String> = rdr
            .headers()
            .map_err(|e| DispvizError::parse(format!("Failed to read header row: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        if names.is_empty() || names.iter().all(String::is_empty) {
            return Err(DispvizError::parse("Header row is empty"));
        }

        let mut samples: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for (row, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| DispvizError::parse(e.to_string()))?;
            for (col, field) in record.iter().enumerate() {
                let value = field.parse::<f64>().map_err(|e| {
                    DispvizError::parse(format!(
                        "row {}, column {:?}: cannot parse {:?} as a number ({e})",
                        row + 1,
                        names[col],
                        field
                    ))
                })?;
                samples[col].push(value);
            }
        }

        Self::from_columns(names.into_iter().zip(samples).collect())
    }

    /// Build a table from named columns. All columns must have the same
    /// length and names must be unique.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> DispvizResult<Self> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut map = HashMap::with_capacity(columns.len());

        for (name, values) in columns {
            if values.len() != rows {
                return Err(DispvizError::parse(format!(
                    "column {name:?} has {} samples, expected {rows}",
                    values.len()
                )));
            }
            if map.contains_key(&name) {
                return Err(DispvizError::parse(format!("duplicate column {name:?}")));
            }
            names.push(name.clone());
            map.insert(name, values);
        }

        Ok(Self {
            names,
            columns: map,
            rows,
        })
    }

    /// Samples of a named column.
    pub fn column(&self, name: &str) -> DispvizResult<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DispvizError::ChannelNotFound {
                name: name.to_string(),
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in header order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of data rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Name of the time column, if the table has one.
    pub fn time_column(&self) -> Option<&str> {
        self.names
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case("time"))
            .map(String::as_str)
    }

    /// Estimated acquisition rate in samples per second, from the time
    /// column.
    ///
    /// Counts the samples that fall within the first second of the
    /// recording. Recordings shorter than one second are extrapolated
    /// from their span.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        let times = self.columns.get(self.time_column()?)?;
        let (first, last) = (*times.first()?, *times.last()?);
        let span = last - first;

        if span >= 1.0 {
            let per_sec = times.iter().filter(|t| **t - first < 1.0).count();
            Some(per_sec as f64)
        } else if span > 0.0 && times.len() > 1 {
            Some((times.len() - 1) as f64 / span)
        } else {
            None
        }
    }

    /// A copy of the table with every non-time column shifted so its
    /// first sample is zero.
    pub fn normalized_to_baseline(&self) -> Self {
        let time = self.time_column().map(str::to_string);
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                if Some(name) == time.as_ref() {
                    return (name.clone(), values.clone());
                }
                let baseline = values.first().copied().unwrap_or(0.0);
                (name.clone(), values.iter().map(|v| v - baseline).collect())
            })
            .collect();

        Self {
            names: self.names.clone(),
            columns,
            rows: self.rows,
        }
    }
}
