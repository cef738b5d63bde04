use std::fs;
use std::path::{Path, PathBuf};

use questionnaire_risk::workflows::questionnaire::{
    BatchDriver, BatchOptions, BatchSummary, InputFormat, ReferenceData, ReferenceDataError,
};

const BATCH: &str = "20240101_120000";

const FIELD_INFO: &str = r#"{
    "Text1": {"num": 0, "local": 0, "text": "BPID", "group": "General Information"},
    "Text2": {"num": 1, "local": 1, "text": "Organization Legal Name", "group": "General Information"},
    "Text3": {"num": 3, "local": 1, "text": "Do you keep audited accounts?", "group": "Finance", "id": 1.0},
    "RadioButton1": {"num": 4, "local": 2, "text": "Our board reviews risk", "group": "Governance", "id": 2.0}
}"#;

const RISK_PROFILE: &str = r#"{
    "1.0": {
        "yes": {"Response Weights": 0, "Risk Level": 3, "risk_score": 0},
        "no": {"Response Weights": 2, "Risk Level": 3, "risk_score": 6}
    },
    "2.0": {
        "strongly agree": {"Response Weights": 0, "Risk Level": 2, "risk_score": 0},
        "disagree": {"Response Weights": 1.5, "Risk Level": 2, "risk_score": 3}
    }
}"#;

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
    field_info: PathBuf,
    risk_profile: PathBuf,
}

fn fixture(documents: &[(&str, String)]) -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("input");
    fs::create_dir(&input).expect("input dir");
    for (name, contents) in documents {
        fs::write(input.join(name), contents).expect("write document");
    }

    let field_info = dir.path().join("field_info.json");
    fs::write(&field_info, FIELD_INFO).expect("write field info");
    let risk_profile = dir.path().join("risk_profile.json");
    fs::write(&risk_profile, RISK_PROFILE).expect("write risk profile");

    Fixture {
        output: dir.path().join("output"),
        _dir: dir,
        input,
        field_info,
        risk_profile,
    }
}

fn dump(identifier: &str, organization: &str, answer: &str, radio: &str) -> String {
    format!(
        r#"{{
            "Text1": {{"/V": "{identifier}"}},
            "Text2": {{"/V": "{organization}"}},
            "Text3": {{"/V": "{answer}"}},
            "RadioButton1": {{"/V": "{radio}"}}
        }}"#
    )
}

fn read_csv(path: &Path) -> String {
    let contents = fs::read_to_string(path).expect("csv exists");
    assert!(contents.starts_with('\u{feff}'), "{} lacks a BOM", path.display());
    contents.trim_start_matches('\u{feff}').to_string()
}

fn run(fixture: &Fixture) -> BatchSummary {
    let reference =
        ReferenceData::load(&fixture.field_info, &fixture.risk_profile).expect("reference loads");
    let source = InputFormat::FieldDump.source();
    let options = BatchOptions::new(&fixture.output).with_batch_timestamp(BATCH);
    BatchDriver::new(&reference, source.as_ref(), options)
        .run(&fixture.input)
        .expect("batch runs")
}

#[test]
fn two_documents_share_one_set_of_master_files() {
    let fixture = fixture(&[
        ("a.json", dump("BP-1", "Acme Health", "Yes", "/0")),
        ("b.json", dump("BP-2", "Beta/Care: Inc", "No", "/2")),
    ]);

    let summary = run(&fixture);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 2);
    assert!(summary.failed.is_empty());

    let scored = read_csv(&fixture.output.join(format!("response_master_{BATCH}.csv")));
    assert_eq!(
        scored,
        "Identifier,ID,Response,Response Weight,Risk Level,Risk Score\n\
BP-1,1.0,Yes,0.0,3.0,0.0\n\
BP-1,2.0,Strongly Agree,0.0,2.0,0.0\n\
BP-2,1.0,No,2.0,3.0,6.0\n\
BP-2,2.0,Disagree,1.5,2.0,3.0\n"
    );

    let raw = read_csv(&fixture.output.join(format!("response_raw_master_{BATCH}.csv")));
    assert_eq!(raw.matches("Identifier,Global Number").count(), 1);
    assert_eq!(raw.lines().count(), 1 + 2 * 4);
    assert!(raw.contains("BP-2,2,1,Finance,Do you keep audited accounts?,No\n"));

    let info = read_csv(&fixture.output.join(format!("info_{BATCH}.csv")));
    assert_eq!(info, "organization,identifier\nacme health,bp-1\nbeta-care- inc,bp-2\n");

    for name in [
        "responses_acme health_bp-1.csv",
        "responses_acme health_bp-1.xlsx",
        "responses_raw_beta-care- inc_bp-2.csv",
        "responses_raw_beta-care- inc_bp-2.xlsx",
        "response_master_20240101_120000.xlsx",
        "response_raw_master_20240101_120000.xlsx",
    ] {
        assert!(fixture.output.join(name).is_file(), "missing {name}");
    }
    assert!(!fixture
        .output
        .join(format!("not_processed_{BATCH}.csv"))
        .exists());
}

#[test]
fn per_document_tables_hold_only_that_document() {
    let fixture = fixture(&[
        ("a.json", dump("BP-1", "Acme Health", "Yes", "/0")),
        ("b.json", dump("BP-2", "Beta", "No", "/2")),
    ]);
    run(&fixture);

    let scored = read_csv(&fixture.output.join("responses_beta_bp-2.csv"));
    assert_eq!(scored.lines().count(), 3);
    assert!(scored.lines().skip(1).all(|line| line.starts_with("BP-2,")));
}

#[test]
fn unknown_radio_code_fails_only_that_document() {
    let fixture = fixture(&[
        ("a.json", dump("BP-1", "Acme Health", "Yes", "/0")),
        ("b.json", dump("BP-2", "Broken Form", "No", "/9")),
        ("c.json", dump("BP-3", "Gamma", "No", "/4")),
    ]);

    let summary = run(&fixture);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].path.ends_with("b.json"));
    assert!(summary.failed[0].reason.contains("RadioButton1"));

    let scored = read_csv(&fixture.output.join(format!("response_master_{BATCH}.csv")));
    assert!(!scored.contains("BP-2"));
    assert!(scored.contains("BP-3,2.0,Agree,,,\n"));
    assert!(!fixture.output.join("responses_broken form_bp-2.csv").exists());

    let not_processed = read_csv(&fixture.output.join(format!("not_processed_{BATCH}.csv")));
    let mut lines = not_processed.lines();
    assert_eq!(lines.next(), Some("file_name,reason"));
    assert!(lines.next().is_some_and(|line| line.starts_with("b.json,")));
    assert_eq!(lines.next(), None);
}

#[test]
fn untouched_fields_are_labelled_in_raw_master() {
    let fixture = fixture(&[(
        "a.json",
        r#"{"Text1": {"/V": "BP-1"}, "Text2": {"/V": "Acme"}, "Text3": {}}"#.to_string(),
    )]);
    run(&fixture);

    let raw = read_csv(&fixture.output.join(format!("response_raw_master_{BATCH}.csv")));
    assert!(raw.contains(
        "BP-1,2,1,Finance,Do you keep audited accounts?,Not Selected/ Not Answered\n"
    ));
    let scored = read_csv(&fixture.output.join(format!("response_master_{BATCH}.csv")));
    assert!(scored.contains("BP-1,1.0,,,,\n"));
}

#[test]
fn reference_load_failure_names_the_file() {
    let fixture = fixture(&[]);
    let broken = fixture.risk_profile.with_file_name("broken_profile.json");
    fs::write(&broken, r#"{"1.0": {"yes": {"Risk Level": 3}}}"#).expect("write");

    let err = ReferenceData::load(&fixture.field_info, &broken).expect_err("load fails");
    assert!(matches!(err, ReferenceDataError::RiskProfile { .. }));
    assert!(err.to_string().contains("broken_profile.json"));

    let missing = fixture.field_info.with_file_name("absent.json");
    let err = ReferenceData::load(&missing, &fixture.risk_profile).expect_err("load fails");
    assert!(matches!(err, ReferenceDataError::FieldMetadata { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn failed_export_leaves_no_trace_in_master_files() {
    let fixture = fixture(&[("a.json", dump("BP-1", "Acme Health", "No", "/2"))]);
    fs::create_dir_all(
        fixture
            .output
            .join(format!("response_raw_master_{BATCH}.csv")),
    )
    .expect("blocking directory");

    let summary = run(&fixture);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].path.ends_with("a.json"));

    for name in [
        format!("response_master_{BATCH}.csv"),
        format!("info_{BATCH}.csv"),
        "responses_acme health_bp-1.csv".to_string(),
        "responses_acme health_bp-1.xlsx".to_string(),
        "responses_raw_acme health_bp-1.csv".to_string(),
        "responses_raw_acme health_bp-1.xlsx".to_string(),
    ] {
        assert!(!fixture.output.join(&name).exists(), "{name} left behind");
    }
}
