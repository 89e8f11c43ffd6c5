//! Result filtering and export
//!
//! Keeps the rows the classifier labelled positive, projects them to their
//! identifier and serializes the result as a single-column CSV table that any
//! spreadsheet application opens directly.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::PipelineError;
use crate::types::{DerivedFeatureRow, Label};

/// Header of the single exported column
pub const IDENTIFIER_HEADER: &str = "identifier";

/// Serialized table of matching identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedTable {
    identifiers: Vec<String>,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl ExportedTable {
    /// Identifiers in input row order
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Always false: an empty selection is reported as `ExportOutcome::Empty`
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the table to `path` atomically: either the complete file appears
    /// or the destination is left untouched.
    pub fn persist(&self, path: &Path) -> Result<(), PipelineError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| PipelineError::Export(format!("{}: {e}", dir.display())))?;
        file.write_all(&self.bytes)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| PipelineError::Export(format!("{}: {e}", path.display())))?;
        file.persist(path)
            .map_err(|e| PipelineError::Export(format!("{}: {}", path.display(), e.error)))?;

        tracing::info!(path = %path.display(), rows = self.len(), "exported result table");
        Ok(())
    }
}

/// Outcome of the filter/export stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    /// At least one row matched
    Table(ExportedTable),
    /// No row matched; nothing was serialized
    Empty,
}

impl ExportOutcome {
    pub fn table(&self) -> Option<&ExportedTable> {
        match self {
            ExportOutcome::Table(t) => Some(t),
            ExportOutcome::Empty => None,
        }
    }

    pub fn match_count(&self) -> usize {
        self.table().map_or(0, ExportedTable::len)
    }
}

/// Keep rows labelled positive and serialize their identifiers.
pub fn filter_and_export(
    rows: &[DerivedFeatureRow],
    labels: &[Label],
) -> Result<ExportOutcome, PipelineError> {
    if rows.len() != labels.len() {
        return Err(PipelineError::Export(format!(
            "{} rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }

    let identifiers: Vec<String> = rows
        .iter()
        .zip(labels)
        .filter(|(_, label)| label.is_positive())
        .map(|(row, _)| row.identifier().to_string())
        .collect();

    if identifiers.is_empty() {
        return Ok(ExportOutcome::Empty);
    }

    let bytes = encode_identifiers(&identifiers)?;
    Ok(ExportOutcome::Table(ExportedTable { identifiers, bytes }))
}

fn encode_identifiers(identifiers: &[String]) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([IDENTIFIER_HEADER])
        .map_err(|e| PipelineError::Export(e.to_string()))?;
    for id in identifiers {
        writer
            .write_record([id])
            .map_err(|e| PipelineError::Export(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Export(e.to_string()))
}
