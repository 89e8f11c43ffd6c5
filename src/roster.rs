//! Roster store
//!
//! Loads the raw activity dataset (one row per individual) and converts it into
//! typed roster records. Any unreadable or malformed input is a `Load` error and
//! no partial roster is ever returned.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::config::ColumnMapping;
use crate::error::PipelineError;
use crate::types::RosterRecord;

/// Tabular dataset held as column name -> column data
#[derive(Debug, Clone)]
pub struct RosterTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl RosterTable {
    /// Read a CSV dataset from a file
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)
            .map_err(|e| PipelineError::Load(format!("{}: {e}", path.display())))?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rows = table.row_count(),
            "loaded roster dataset"
        );
        Ok(table)
    }

    /// Read a CSV dataset from any reader. The first record is the header.
    ///
    /// Headers and values are kept verbatim; only numeric fields are trimmed
    /// when they are parsed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PipelineError::Load(format!("Failed to read header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(PipelineError::Load("Dataset has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| PipelineError::Load(format!("Malformed data row {idx}: {e}")))?;
            rows.push(record);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(""))
                .collect(),
        )
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Convert every row into a typed record using the given column names.
    pub fn records(&self, columns: &ColumnMapping) -> Result<Vec<RosterRecord>, PipelineError> {
        let missing: Vec<&str> = columns
            .required()
            .into_iter()
            .filter(|name| self.column_index(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Load(format!(
                "Dataset is missing required columns: {}",
                missing.join(", ")
            )));
        }

        // Presence was checked above
        let index = |name: &str| self.column_index(name).unwrap_or_default();
        let id_idx = index(&columns.identifier);
        let login_idx = index(&columns.login_time);
        let logout_idx = index(&columns.logout_time);
        let usage_idx = index(&columns.usage_minutes);
        let attempts_idx = index(&columns.survey_attempts);

        let mut seen = HashSet::with_capacity(self.rows.len());
        let mut records = Vec::with_capacity(self.rows.len());

        for (row_idx, row) in self.rows.iter().enumerate() {
            let field = move |idx: usize| row.get(idx).unwrap_or("");

            let identifier = field(id_idx);
            if identifier.is_empty() {
                return Err(PipelineError::Load(format!(
                    "Row {row_idx}: empty '{}' value",
                    columns.identifier
                )));
            }
            if !seen.insert(identifier) {
                return Err(PipelineError::Load(format!(
                    "Row {row_idx}: duplicate identifier '{identifier}'"
                )));
            }

            let usage_minutes = parse_usage(field(usage_idx)).ok_or_else(|| {
                PipelineError::Load(format!(
                    "Row {row_idx}: '{}' must be a non-negative number, got '{}'",
                    columns.usage_minutes,
                    field(usage_idx)
                ))
            })?;

            let survey_attempts = parse_count(field(attempts_idx)).ok_or_else(|| {
                PipelineError::Load(format!(
                    "Row {row_idx}: '{}' must be a non-negative integer, got '{}'",
                    columns.survey_attempts,
                    field(attempts_idx)
                ))
            })?;

            records.push(RosterRecord {
                identifier: identifier.to_string(),
                login_time: field(login_idx).to_string(),
                logout_time: field(logout_idx).to_string(),
                usage_minutes,
                survey_attempts,
            });
        }

        tracing::debug!(records = records.len(), "roster records validated");
        Ok(records)
    }
}

fn parse_usage(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Integer counter; accepts integral floats such as "3.0" as spreadsheets export them
fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
