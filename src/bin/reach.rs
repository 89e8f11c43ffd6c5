//! Reach CLI - Command-line interface for survey-reach
//!
//! Commands:
//! - predict: Shortlist roster members likely to respond at a time of day
//! - validate: Check dataset, classifier and feature contract without inference
//! - doctor: Diagnose configuration and input files
//! - layouts: Print the stock feature layouts

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use survey_reach::config::DEFAULT_CONFIG_FILE;
use survey_reach::pipeline::load_roster;
use survey_reach::{
    ExportOutcome, FeatureLayout, PipelineConfig, PipelineContext, PipelineError,
    PredictionEngine, QueryTime, PRODUCER_NAME, REACH_VERSION,
};

/// Reach - Predict who is likely to answer a survey at a given time
#[derive(Parser)]
#[command(name = "reach")]
#[command(author = "Synheart AI Inc")]
#[command(version = REACH_VERSION)]
#[command(about = "Shortlist survey respondents by time of day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict likely respondents for a time of day
    Predict {
        /// Time of day, e.g. "08:30" or "2:15 PM"
        #[arg(short, long)]
        time: String,

        #[command(flatten)]
        inputs: InputArgs,

        /// Output file path (use - for stdout); defaults to the configured file name
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check dataset, classifier and feature contract without running inference
    Validate {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and input files
    Doctor {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the stock feature layouts
    Layouts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Config file (JSON); survey-reach.json is used when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Roster dataset (CSV), overrides the config
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Classifier artifact (JSON), overrides the config
    #[arg(long)]
    model: Option<PathBuf>,
}

impl InputArgs {
    fn resolve(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
        };
        if let Some(dataset) = &self.dataset {
            config.dataset_path = dataset.clone();
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays usable for `--output -` and `--json`
fn init_tracing() {
    let filter = EnvFilter::try_from_env("REACH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("survey_reach=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ReachCliError> {
    match cli.command {
        Commands::Predict {
            time,
            inputs,
            output,
            json,
        } => cmd_predict(&time, &inputs, output.as_deref(), json),

        Commands::Validate { inputs, json } => cmd_validate(&inputs, json),

        Commands::Doctor { inputs, json } => cmd_doctor(&inputs, json),

        Commands::Layouts { json } => cmd_layouts(json),
    }
}

fn cmd_predict(
    time: &str,
    inputs: &InputArgs,
    output: Option<&Path>,
    json: bool,
) -> Result<(), ReachCliError> {
    // Reject a bad query before loading anything
    let query: QueryTime = time.parse()?;
    let config = inputs.resolve()?;
    let ctx = PipelineContext::from_config(&config)?;
    let report = ctx.run(query)?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.export_file_name));
    let to_stdout = output.to_string_lossy() == "-";

    if let ExportOutcome::Table(table) = &report.outcome {
        if to_stdout {
            // With --json the identifiers are already part of the report
            if !json {
                io::stdout().write_all(table.bytes())?;
                io::stdout().flush()?;
            }
        } else {
            table.persist(&output)?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if to_stdout {
        // Summary lines would corrupt the CSV stream
        if report.outcome == ExportOutcome::Empty {
            eprintln!("{}", no_matches_line(&report.query));
        }
        return Ok(());
    }

    match &report.outcome {
        ExportOutcome::Table(table) => {
            println!(
                "{} of {} roster members are likely to respond at {}.",
                table.len(),
                report.total_rows,
                report.query
            );
            println!("Saved: {}", output.display());
        }
        ExportOutcome::Empty => {
            println!("{}", no_matches_line(&report.query));
        }
    }

    Ok(())
}

fn no_matches_line(query: &QueryTime) -> String {
    format!("No roster members are likely to respond at {}.", query)
}

fn cmd_validate(inputs: &InputArgs, json: bool) -> Result<(), ReachCliError> {
    let config = inputs.resolve()?;
    let engine = PredictionEngine::load(&config.model_path)?;
    let roster = load_roster(&config.dataset_path, &config.columns)?;
    let ctx = PipelineContext::new(roster, engine);

    let contract = ctx.check_contract();
    let report = ValidationReport {
        dataset: config.dataset_path.display().to_string(),
        rows: ctx.roster().len(),
        model: config.model_path.display().to_string(),
        classifier: ctx.engine().classifier_kind().to_string(),
        layout: ctx.engine().layout().clone(),
        contract_error: contract.as_ref().err().map(|e| e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Dataset:    {} ({} rows)", report.dataset, report.rows);
        println!("Model:      {} ({})", report.model, report.classifier);
        println!(
            "Layout:     {}@v{} [{}]",
            report.layout.name,
            report.layout.version,
            report.layout.features.join(", ")
        );
        match &report.contract_error {
            None => println!("Contract:   OK"),
            Some(e) => println!("Contract:   FAILED - {}", e),
        }
    }

    contract.map_err(ReachCliError::from)
}

fn cmd_doctor(inputs: &InputArgs, json: bool) -> Result<(), ReachCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "reach_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("survey-reach version {}", REACH_VERSION),
    });

    let config = match inputs.resolve() {
        Ok(config) => {
            let source = inputs
                .config
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
            let (status, message) = if source.exists() {
                (CheckStatus::Ok, format!("Loaded {}", source.display()))
            } else {
                (
                    CheckStatus::Warning,
                    format!("{} not found, using defaults", source.display()),
                )
            };
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status,
                message,
            });
            Some(config)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    };

    if let Some(config) = config {
        let engine = match PredictionEngine::load(&config.model_path) {
            Ok(engine) => {
                checks.push(DoctorCheck {
                    name: "model".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "{} classifier, layout {} ({} features)",
                        engine.classifier_kind(),
                        engine.layout().label(),
                        engine.layout().width()
                    ),
                });
                Some(engine)
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "model".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                None
            }
        };

        match load_roster(&config.dataset_path, &config.columns) {
            Ok(roster) => {
                checks.push(DoctorCheck {
                    name: "dataset".to_string(),
                    status: if roster.is_empty() {
                        CheckStatus::Warning
                    } else {
                        CheckStatus::Ok
                    },
                    message: format!(
                        "{} ({} rows)",
                        config.dataset_path.display(),
                        roster.len()
                    ),
                });
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "dataset".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
            }
        }

        if let Some(engine) = engine {
            let ctx = PipelineContext::new(Vec::new(), engine);
            checks.push(match ctx.check_contract() {
                Ok(()) => DoctorCheck {
                    name: "feature_contract".to_string(),
                    status: CheckStatus::Ok,
                    message: "Declared features are all derivable".to_string(),
                },
                Err(e) => DoctorCheck {
                    name: "feature_contract".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            });
        }
    }

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a TTY (summary output)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a pipe (--output - streams CSV)".to_string(),
        }
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: REACH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Reach Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(ReachCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_layouts(json: bool) -> Result<(), ReachCliError> {
    let layouts = FeatureLayout::stock();

    if json {
        println!("{}", serde_json::to_string_pretty(&layouts)?);
    } else {
        for layout in &layouts {
            println!("{} ({} features)", layout.label(), layout.width());
            for (idx, feature) in layout.features.iter().enumerate() {
                println!("  {}. {}", idx + 1, feature);
            }
            println!();
        }
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum ReachCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for ReachCliError {
    fn from(e: io::Error) -> Self {
        ReachCliError::Io(e)
    }
}

impl From<PipelineError> for ReachCliError {
    fn from(e: PipelineError) -> Self {
        ReachCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for ReachCliError {
    fn from(e: serde_json::Error) -> Self {
        ReachCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    stage: Option<String>,
    message: String,
    hint: Option<String>,
}

impl From<ReachCliError> for CliError {
    fn from(e: ReachCliError) -> Self {
        match e {
            ReachCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                stage: None,
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ReachCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                stage: None,
                message: e.to_string(),
                hint: None,
            },
            ReachCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                stage: None,
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            ReachCliError::Pipeline(e) => {
                let (code, hint) = match &e {
                    PipelineError::Config(_) => ("CONFIG_ERROR", "Check the config file JSON"),
                    PipelineError::InvalidQuery(_) => {
                        ("INVALID_QUERY", "Pass the time as HH:MM, e.g. --time 08:30")
                    }
                    PipelineError::Load(_) => (
                        "LOAD_ERROR",
                        "Check the dataset path and column names in the config",
                    ),
                    PipelineError::ModelLoad(_) => (
                        "MODEL_LOAD_ERROR",
                        "Check the classifier artifact path and format_version",
                    ),
                    PipelineError::Parse(_) => (
                        "PARSE_ERROR",
                        "Fix the timestamp in the named row; expected a wall-clock time",
                    ),
                    PipelineError::MissingFeatures(_) => (
                        "MISSING_FEATURES",
                        "Run 'reach layouts' for the feature names this build derives",
                    ),
                    PipelineError::Inference(_) => (
                        "INFERENCE_ERROR",
                        "The classifier rejected the feature matrix; no results were written",
                    ),
                    PipelineError::Export(_) => (
                        "EXPORT_ERROR",
                        "Check the output path; no partial file was written",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    stage: Some(e.stage().to_string()),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    dataset: String,
    rows: usize,
    model: String,
    classifier: String,
    layout: FeatureLayout,
    contract_error: Option<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
