//! End-to-end tests: config → roster → features → contract → classifier → export

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use survey_reach::contract::FeatureLayout;
use survey_reach::error::ParseFailure;
use survey_reach::model::{DecisionTree, LogisticModel, ModelSpec, TreeEnsemble};
use survey_reach::pipeline::load_roster;
use survey_reach::features::FeatureName;
use survey_reach::types::Label;
use survey_reach::{
    predict_once, Classifier, ColumnMapping, ExportOutcome, FeatureMatrix, ModelArtifact,
    PipelineConfig, PipelineContext, PipelineError, PredictionEngine, QueryTime, Stage,
};

const ROSTER_CSV: &str = "\
NPI,Login Time,Logout Time,Usage Time (mins),Count of Survey Attempts
A,2024-03-01 08:00:00,2024-03-01 10:00:00,45,3
B,2024-03-01 08:20:00,2024-03-01 08:40:00,12,1
C,2024-03-01 11:40:00,2024-03-01 12:00:00,20,2
";

/// Positive exactly when the overlap flag is set
fn overlap_artifact() -> ModelArtifact {
    ModelArtifact {
        format_version: 1,
        layout: FeatureLayout::extended(),
        model: ModelSpec::Logistic(LogisticModel {
            weights: vec![0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0],
            intercept: -5.0,
        }),
    }
}

fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn fixture_config(dir: &Path, roster: &str, artifact: &ModelArtifact) -> PipelineConfig {
    PipelineConfig {
        dataset_path: write_fixture(dir, "roster.csv", roster),
        model_path: write_fixture(dir, "model.json", &artifact.to_json_pretty().unwrap()),
        ..PipelineConfig::default()
    }
}

/// Counts invocations and labels every row positive
struct Recording {
    calls: Arc<AtomicUsize>,
}

impl Classifier for Recording {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Label::Positive; matrix.n_rows()])
    }
}

#[test]
fn test_overlapping_rows_exported_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path(), ROSTER_CSV, &overlap_artifact());

    let report = predict_once(&config, "08:30".parse().unwrap()).unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.layout, "extended@v1");
    let table = report.outcome.table().unwrap();
    assert_eq!(
        String::from_utf8(table.bytes().to_vec()).unwrap(),
        "identifier\nA\nB\n"
    );

    let out = dir.path().join("likely_respondents.csv");
    table.persist(&out).unwrap();
    assert_eq!(std::fs::read_to_string(out).unwrap(), "identifier\nA\nB\n");
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path(), ROSTER_CSV, &overlap_artifact());
    let ctx = PipelineContext::from_config(&config).unwrap();
    let query = QueryTime::from_hm(8, 30).unwrap();

    let first = ctx.run(query).unwrap();
    let second = ctx.run(query).unwrap();

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.total_rows, second.total_rows);
}

#[test]
fn test_no_match_yields_empty_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path(), ROSTER_CSV, &overlap_artifact());

    let report = predict_once(&config, "23:00".parse().unwrap()).unwrap();

    assert_eq!(report.outcome, ExportOutcome::Empty);
    assert_eq!(report.match_count(), 0);
}

#[test]
fn test_missing_feature_never_reaches_classifier() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "roster.csv", ROSTER_CSV);
    let roster = load_roster(&path, &ColumnMapping::default()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let layout = FeatureLayout {
        name: "regional".to_string(),
        version: 2,
        features: vec!["login_minutes".to_string(), "region_code".to_string()],
    };
    let engine = PredictionEngine::new(
        Box::new(Recording {
            calls: Arc::clone(&calls),
        }),
        layout,
    );
    let ctx = PipelineContext::new(roster, engine);

    let err = ctx.run(QueryTime::from_hm(8, 30).unwrap()).unwrap_err();

    assert_eq!(err.stage(), Stage::FeatureContract);
    match err {
        PipelineError::MissingFeatures(missing) => {
            assert_eq!(missing.layout, "regional@v2");
            assert!(missing.missing.contains("region_code"));
            assert_eq!(missing.missing.len(), 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_bad_timestamp_aborts_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    let roster = "\
NPI,Login Time,Logout Time,Usage Time (mins),Count of Survey Attempts
A,08:00,10:00,45,3
B,not a time,08:40,12,1
";
    let config = fixture_config(dir.path(), roster, &overlap_artifact());

    let err = predict_once(&config, "08:30".parse().unwrap()).unwrap_err();

    match err {
        PipelineError::Parse(failure) => assert_eq!(
            failure,
            ParseFailure {
                row: 1,
                identifier: "B".to_string(),
                column: "Login Time".to_string(),
                value: "not a time".to_string(),
            }
        ),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_renamed_columns_rejected_with_names() {
    let dir = tempfile::tempdir().unwrap();
    let roster = "\
npi,Login Time,Logout Time,Usage Time (mins),Count of Survey Attempts
A,08:00,10:00,45,3
";
    let config = fixture_config(dir.path(), roster, &overlap_artifact());

    let err = predict_once(&config, "08:30".parse().unwrap()).unwrap_err();

    assert_eq!(err.stage(), Stage::RosterLoad);
    assert!(err.to_string().contains("NPI"));
}

#[test]
fn test_broken_artifact_fails_before_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        dataset_path: dir.path().join("absent.csv"),
        model_path: write_fixture(dir.path(), "model.json", "{ not json"),
        ..PipelineConfig::default()
    };

    let err = predict_once(&config, "08:30".parse().unwrap()).unwrap_err();
    assert_eq!(err.stage(), Stage::ModelLoad);
}

#[test]
fn test_empty_roster_is_empty_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let roster = "NPI,Login Time,Logout Time,Usage Time (mins),Count of Survey Attempts\n";
    let config = fixture_config(dir.path(), roster, &overlap_artifact());

    let report = predict_once(&config, "08:30".parse().unwrap()).unwrap();

    assert_eq!(report.total_rows, 0);
    assert_eq!(report.outcome, ExportOutcome::Empty);
}

#[test]
fn test_legacy_feature_names_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = ModelArtifact {
        format_version: 1,
        layout: FeatureLayout {
            name: "legacy".to_string(),
            version: 1,
            features: vec![
                "Login_Time_Minutes".to_string(),
                "Overlap_With_Input_Time".to_string(),
            ],
        },
        model: ModelSpec::Logistic(LogisticModel {
            weights: vec![0.0, 10.0],
            intercept: -5.0,
        }),
    };
    let config = fixture_config(dir.path(), ROSTER_CSV, &artifact);

    let report = predict_once(&config, "11:45".parse().unwrap()).unwrap();

    assert_eq!(
        report.outcome.table().unwrap().identifiers(),
        &["C".to_string()]
    );
}

#[test]
fn test_unchecked_tree_ensemble_is_inference_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "roster.csv", ROSTER_CSV);
    let roster = load_roster(&path, &ColumnMapping::default()).unwrap();

    // Splits on feature 1 while the layout only provides feature 0
    let ensemble = TreeEnsemble {
        trees: vec![DecisionTree {
            feature: vec![1, -1, -1],
            threshold: vec![0.5, 0.0, 0.0],
            left: vec![1, -1, -1],
            right: vec![2, -1, -1],
            value: vec![0.0, 0.1, 0.9],
        }],
    };
    let engine = PredictionEngine::new(
        Box::new(ensemble),
        FeatureLayout::new("one", 1, &[FeatureName::OverlapWithQuery]),
    );
    let ctx = PipelineContext::new(roster, engine);

    let err = ctx.run(QueryTime::from_hm(8, 30).unwrap()).unwrap_err();

    assert_eq!(err.stage(), Stage::Inference);
    assert!(matches!(err, PipelineError::Inference(_)));
}

#[test]
fn test_padded_identifier_exported_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let roster = "\
NPI,Login Time,Logout Time,Usage Time (mins),Count of Survey Attempts
 1000000001,08:00,10:00,45,3
1000000001 ,08:00,10:00,45,3
";
    let config = fixture_config(dir.path(), roster, &overlap_artifact());

    let report = predict_once(&config, "08:30".parse().unwrap()).unwrap();

    let table = report.outcome.table().unwrap();
    assert_eq!(
        table.identifiers(),
        &[" 1000000001".to_string(), "1000000001 ".to_string()]
    );
    assert_eq!(
        String::from_utf8(table.bytes().to_vec()).unwrap(),
        "identifier\n 1000000001\n1000000001 \n"
    );
}
