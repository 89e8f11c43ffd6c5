//! Pipeline orchestration
//!
//! This module provides the public API for survey-reach. It wires the stages
//! together: roster store → temporal feature derivation → feature contract →
//! prediction engine → result filter/exporter.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{ColumnMapping, PipelineConfig};
use crate::contract;
use crate::error::PipelineError;
use crate::export::{filter_and_export, ExportOutcome};
use crate::features::FeatureDeriver;
use crate::model::PredictionEngine;
use crate::roster::RosterTable;
use crate::temporal::{self, QueryTime};
use crate::types::RosterRow;

/// Summary of one prediction run
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub run_id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub query: QueryTime,
    /// Layout label, e.g. "extended@v1"
    pub layout: String,
    pub total_rows: usize,
    pub positive_count: usize,
    pub outcome: ExportOutcome,
}

impl PredictionReport {
    pub fn match_count(&self) -> usize {
        self.positive_count
    }
}

/// Everything a prediction needs, loaded once and then only read.
///
/// Build one per process (or per test fixture) and call [`PipelineContext::run`]
/// once per query. Derived features are recomputed on every call.
#[derive(Debug)]
pub struct PipelineContext {
    roster: Vec<RosterRow>,
    engine: PredictionEngine,
}

impl PipelineContext {
    /// Assemble a context from already-resolved parts
    pub fn new(roster: Vec<RosterRow>, engine: PredictionEngine) -> Self {
        Self { roster, engine }
    }

    /// Load the classifier and the roster named by `config`.
    ///
    /// The classifier is loaded first; a broken artifact aborts before the
    /// dataset is touched.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let engine = PredictionEngine::load(&config.model_path)?;
        let roster = load_roster(&config.dataset_path, &config.columns)?;
        Ok(Self::new(roster, engine))
    }

    pub fn roster(&self) -> &[RosterRow] {
        &self.roster
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    /// Check the classifier's declared layout against the derived feature
    /// columns without running inference.
    pub fn check_contract(&self) -> Result<(), PipelineError> {
        contract::validate(&[], self.engine.layout()).map(|_| ())
    }

    /// Run the full pipeline for one query time.
    pub fn run(&self, query: QueryTime) -> Result<PredictionReport, PipelineError> {
        let layout = self.engine.layout();
        tracing::info!(query = %query, layout = %layout.label(), "running prediction");

        let derived = FeatureDeriver::derive(&self.roster, query);
        tracing::debug!(rows = derived.len(), "derived temporal features");

        let features = contract::validate(&derived, layout)?;
        let labels = self.engine.predict(&derived, &features)?;
        let outcome = filter_and_export(&derived, &labels)?;

        match &outcome {
            ExportOutcome::Table(table) => {
                tracing::info!(matches = table.len(), "respondents likely at {query}")
            }
            ExportOutcome::Empty => tracing::info!("no respondents likely at {query}"),
        }

        Ok(PredictionReport {
            run_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            query,
            layout: layout.label(),
            total_rows: derived.len(),
            positive_count: outcome.match_count(),
            outcome,
        })
    }
}

/// Load a roster dataset and resolve its timestamps to minute-of-day.
pub fn load_roster(path: &Path, columns: &ColumnMapping) -> Result<Vec<RosterRow>, PipelineError> {
    let table = RosterTable::from_path(path)?;
    let records = table.records(columns)?;
    temporal::resolve_rows(&records, &columns.login_time, &columns.logout_time)
}

/// Load everything named by `config` and run a single query.
pub fn predict_once(
    config: &PipelineConfig,
    query: QueryTime,
) -> Result<PredictionReport, PipelineError> {
    PipelineContext::from_config(config)?.run(query)
}
