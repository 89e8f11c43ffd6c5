//! survey-reach - Predicts who is likely to answer a survey at a given time of day
//!
//! A roster of individuals with historical login/logout activity and engagement
//! counters is turned into a shortlist through a deterministic pipeline:
//! roster loading → temporal feature derivation → feature contract check →
//! classifier inference → result filtering and export.
//!
//! ## Inputs
//!
//! - **Roster dataset**: CSV, one row per individual (see [`config::ColumnMapping`])
//! - **Classifier artifact**: JSON model plus its declared feature layout
//!   (see [`model::ModelArtifact`])
//! - **Query**: a single time of day, no date and no timezone
//!
//! All timestamps and the query are assumed to be in one local zone already;
//! no timezone conversion is performed anywhere.

pub mod config;
pub mod contract;
pub mod error;
pub mod export;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod roster;
pub mod temporal;
pub mod types;

pub use config::{ColumnMapping, PipelineConfig};
pub use contract::FeatureLayout;
pub use error::{PipelineError, Stage};
pub use export::{filter_and_export, ExportOutcome, ExportedTable};
pub use features::{FeatureDeriver, FeatureName};
pub use model::{Classifier, FeatureMatrix, ModelArtifact, PredictionEngine};
pub use pipeline::{predict_once, PipelineContext, PredictionReport};
pub use temporal::QueryTime;

/// Crate version embedded in reports
pub const REACH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "survey-reach";
