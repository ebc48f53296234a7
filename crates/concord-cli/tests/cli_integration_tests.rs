//! CLI integration tests
//!
//! Each test runs the `concord` binary in its own temporary directory with
//! the `CONCORD_*` environment cleared.

use concord_core::model::{AnnotationInstance, AnnotationStore};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn command(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_concord"));
    cmd.current_dir(dir)
        .env("CONCORD_LOG_PROFILE", "test")
        .env_remove("CONCORD_CONFIG")
        .env_remove("CONCORD_DB")
        .env_remove("CONCORD_CAS");
    cmd
}

fn concord(dir: &Path, args: &[&str]) -> Output {
    command(dir).args(args).output().expect("Failed to execute CLI")
}

fn ok(dir: &Path, args: &[&str]) -> String {
    let output = concord(dir, args);
    assert!(
        output.status.success(),
        "concord {:?} failed. Stderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_set(dir: &Path, label: &str, entities: &[(usize, usize, &str)]) -> PathBuf {
    let mut store = AnnotationStore::new(label);
    for (begin, end, value) in entities {
        store.push(AnnotationInstance::span("Entity", *begin, *end).with_feature("value", *value));
    }
    let path = dir.join(format!("{}-{}.json", label, entities.len()));
    std::fs::write(&path, serde_json::to_string(&store).unwrap()).unwrap();
    path
}

fn import(dir: &Path, project: &str, document: &str, file: &Path) {
    ok(
        dir,
        &[
            "import",
            file.to_str().unwrap(),
            "--project",
            project,
            "--document",
            document,
        ],
    );
}

#[test]
fn test_init_creates_repository_in_default_location() {
    let tmp = TempDir::new().unwrap();
    let out = ok(tmp.path(), &["init"]);
    assert!(out.contains("Initialized"));
    assert!(tmp.path().join(".concord/concord.db").exists());
    assert!(tmp.path().join(".concord/cas").is_dir());
}

#[test]
fn test_import_status_and_diff() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    import(dir, "p1", "doc-1", &write_set(dir, "alice", &[(0, 4, "ORG")]));
    import(dir, "p1", "doc-1", &write_set(dir, "bob", &[(0, 4, "PERSON")]));

    let status = ok(dir, &["status", "--document", "doc-1"]);
    assert!(status.contains("alice"));
    assert!(status.contains("bob"));
    assert!(status.contains("finished"));

    let summary = ok(dir, &["diff", "--document", "doc-1", "--layer", "Entity"]);
    assert!(summary.contains("## Annotation Diff"));
    assert!(summary.contains("alice, bob"));

    let json = ok(
        dir,
        &["diff", "--document", "doc-1", "--layer", "Entity", "--json"],
    );
    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["document_id"], "doc-1");
    assert_eq!(report["diff"]["sources"].as_array().unwrap().len(), 2);
    assert!(report["excluded"].as_array().unwrap().is_empty());
}

#[test]
fn test_status_change_removes_source_from_diff() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    import(dir, "p1", "doc-1", &write_set(dir, "alice", &[(0, 4, "ORG")]));
    import(dir, "p1", "doc-1", &write_set(dir, "bob", &[(0, 4, "ORG")]));

    ok(
        dir,
        &["status", "--document", "doc-1", "--source", "bob", "--set", "in_progress"],
    );

    let json = ok(
        dir,
        &["diff", "--document", "doc-1", "--layer", "Entity", "--json"],
    );
    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["diff"]["sources"], serde_json::json!(["alice"]));
}

#[test]
fn test_agreement_percentage_two_of_three() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    import(
        dir,
        "p1",
        "doc-1",
        &write_set(dir, "alice", &[(0, 4, "ORG"), (5, 9, "ORG"), (10, 14, "PER")]),
    );
    import(
        dir,
        "p1",
        "doc-1",
        &write_set(dir, "bob", &[(0, 4, "ORG"), (5, 9, "ORG"), (10, 14, "ORG")]),
    );

    let csv = ok(
        dir,
        &[
            "agreement",
            "--project",
            "p1",
            "--feature",
            "Entity.value",
            "--measure",
            "percentage",
            "--layer",
            "Entity",
            "--csv",
        ],
    );
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("feature,measure,source_a,source_b,score,units,incomplete_units,stacked_units")
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",alice,bob,0.6667,3,"), "row was {}", row);
}

#[test]
fn test_agreement_rejects_kappa_with_incomplete_units() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    import(dir, "p1", "doc-1", &write_set(dir, "alice", &[(0, 4, "ORG")]));
    import(dir, "p1", "doc-1", &write_set(dir, "bob", &[(0, 4, "ORG")]));

    let output = concord(
        dir,
        &[
            "agreement",
            "--project",
            "p1",
            "--feature",
            "Entity.value",
            "--measure",
            "cohen_kappa",
            "--include-incomplete",
            "--layer",
            "Entity",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_UNSUPPORTED_MEASURE_CONFIGURATION"), "{}", stderr);
}

#[test]
fn test_merge_writes_finished_curation_set() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    import(dir, "p1", "doc-1", &write_set(dir, "alice", &[(0, 4, "ORG")]));
    import(dir, "p1", "doc-1", &write_set(dir, "bob", &[(0, 4, "ORG")]));

    let out = ok(dir, &["merge", "--document", "doc-1", "--layer", "Entity"]);
    assert!(out.contains("reference alice"), "{}", out);
    assert!(out.contains("status finished"), "{}", out);

    let status = ok(dir, &["status", "--document", "doc-1"]);
    assert!(status.contains("curation"));
}

#[test]
fn test_merge_leaves_disagreement_unresolved() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    import(dir, "p1", "doc-1", &write_set(dir, "alice", &[(0, 4, "ORG")]));
    import(dir, "p1", "doc-1", &write_set(dir, "bob", &[(0, 4, "PERSON")]));

    let out = ok(
        dir,
        &["merge", "--document", "doc-1", "--layer", "Entity", "--reference", "bob"],
    );
    assert!(out.contains("status in_progress"), "{}", out);
    assert!(out.contains("unresolved (differing): 1"), "{}", out);
}

#[test]
fn test_import_rejects_curation_label() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file = write_set(dir, "curation", &[(0, 4, "ORG")]);
    let output = concord(
        dir,
        &["import", file.to_str().unwrap(), "--project", "p1", "--document", "d"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_codebook_add_list_swap() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    ok(dir, &["codebook", "--project", "p1", "add", "sentiment"]);
    ok(dir, &["codebook", "--project", "p1", "add", "topic"]);

    let swapped = ok(dir, &["codebook", "--project", "p1", "swap", "sentiment", "topic"]);
    assert_eq!(swapped, "1 sentiment\n0 topic\n");

    let listed = ok(dir, &["codebook", "--project", "p1", "list"]);
    assert_eq!(listed, "0 topic\n1 sentiment\n");
}

#[test]
fn test_config_file_supplies_layers_and_measure() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(
        dir.join("concord.toml"),
        "db = \"data/repo.db\"\nmeasure = \"percentage\"\n\n[[layers]]\nname = \"Entity\"\n",
    )
    .unwrap();
    import(dir, "p1", "doc-1", &write_set(dir, "alice", &[(0, 4, "ORG")]));
    import(dir, "p1", "doc-1", &write_set(dir, "bob", &[(0, 4, "ORG")]));
    assert!(dir.join("data/repo.db").exists());

    let table = ok(
        dir,
        &["agreement", "--project", "p1", "--feature", "Entity.value"],
    );
    assert!(table.contains("percentage"), "{}", table);
    assert!(table.contains("1.0000"), "{}", table);
}

#[test]
fn test_db_flag_overrides_env() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let output = command(dir)
        .env("CONCORD_DB", dir.join("from-env.db"))
        .args(["init", "--db", "from-flag.db"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(dir.join("from-flag.db").exists());
    assert!(!dir.join("from-env.db").exists());
}

#[test]
fn test_unknown_document_reports_error() {
    let tmp = TempDir::new().unwrap();
    let output = concord(
        tmp.path(),
        &["diff", "--document", "missing", "--layer", "Entity"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}
