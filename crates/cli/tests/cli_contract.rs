use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use base64::Engine as _;
use pdf_engine::testing::{FixturePage, PdfFixture};
use pdf_engine::{LopdfEngine, PdfEngine, Rect};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `keymark` isolated from the user's configuration and environment.
fn keymark(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("keymark");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("KEYMARK_COLOR")
        .env_remove("KEYMARK_MIN_KEYWORD_CHARS")
        .env_remove("KEYMARK_STOP_WORDS")
        .env_remove("KEYMARK_CASE_SENSITIVE")
        .env_remove("KEYMARK_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_fixture(dir: &TempDir, name: &str, fixture: PdfFixture) -> PathBuf {
    let path = dir.path().join(name);
    let bytes = fixture.to_bytes().expect("fixture should serialize");
    fs::write(&path, bytes).expect("fixture should be written");
    path
}

fn sentence_fixture(dir: &TempDir) -> PathBuf {
    let fixture = PdfFixture::new()
        .page(FixturePage::new().text(72.0, 700.0, 12.0, "Systems are reliable."));
    write_fixture(dir, "sentence.pdf", fixture)
}

fn highlight_count(path: &Path) -> usize {
    let mut engine = LopdfEngine::new();
    let handle = engine.open(path.into()).expect("output should reopen");
    let pages = engine.page_count(handle).expect("page count");
    (0..pages)
        .map(|page| {
            let annotations = engine.annotations(handle, page).expect("annotations");
            annotations.iter().filter(|annotation| annotation.kind.is_highlight()).count()
        })
        .sum()
}

#[test]
fn highlight_writes_annotated_copy() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = sentence_fixture(&temp);
    let output = temp.path().join("out").join("annotated.pdf");

    keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--keyword", "Systems", "--keyword", "reliable", "--color", "red", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("annotated.pdf"));

    assert_eq!(highlight_count(&output), 2);
}

#[test]
fn highlight_from_summary_uses_default_output_and_reports() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = sentence_fixture(&temp);

    let stdout = keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--summary", "The systems are reliable", "--report"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value =
        serde_json::from_slice(&stdout).expect("stdout should contain a json report");
    assert_eq!(report["color"], "yellow");
    assert_eq!(report["keywords"], json!(["reliable", "systems"]));
    assert_eq!(report["pages"][0]["added"], 2);

    assert_eq!(highlight_count(&temp.path().join("sentence-highlighted.pdf")), 2);
}

#[test]
fn highlight_with_no_keywords_does_nothing() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = sentence_fixture(&temp);

    keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--summary", "it is of the"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no keywords found in summary; nothing to highlight"));

    assert!(!temp.path().join("sentence-highlighted.pdf").exists());
}

#[test]
fn highlight_prints_data_url() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = sentence_fixture(&temp);

    let stdout = keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--keyword", "reliable", "--data-url"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(stdout).expect("stdout should be utf-8");
    let encoded =
        stdout.trim().strip_prefix("data:application/pdf;base64,").expect("data url prefix");
    let document = base64::engine::general_purpose::STANDARD.decode(encoded).expect("valid base64");
    assert!(document.starts_with(b"%PDF"));
    assert!(!temp.path().join("sentence-highlighted.pdf").exists());
}

#[test]
fn data_url_cannot_be_combined_with_report() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = sentence_fixture(&temp);

    keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--keyword", "reliable", "--data-url", "--report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    assert!(!temp.path().join("sentence-highlighted.pdf").exists());
}

#[test]
fn highlight_reads_color_from_config_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = sentence_fixture(&temp);
    let config = temp.path().join("keymark.toml");
    fs::write(&config, "color = \"blue\"\nmin_keyword_chars = 8\n")
        .expect("config should be written");

    let stdout = keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--summary", "systems are reliable", "--report", "--config"])
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value =
        serde_json::from_slice(&stdout).expect("stdout should contain a json report");
    assert_eq!(report["color"], "blue");
    assert_eq!(report["keywords"], json!(["reliable"]));
}

#[test]
fn highlight_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = temp.path().join("invalid.pdf");
    fs::write(&input, b"this is not a pdf").expect("fixture should be written");

    keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--keyword", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to highlight PDF: invalid document"));

    assert!(!temp.path().join("invalid-highlighted.pdf").exists());
}

#[test]
fn highlight_failure_is_reported_once() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = temp.path().join("invalid.pdf");
    fs::write(&input, b"this is not a pdf").expect("fixture should be written");

    let stderr = keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--keyword", "anything"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();

    let stderr = String::from_utf8(stderr).expect("stderr should be utf-8");
    assert_eq!(stderr.matches("invalid document").count(), 1, "stderr: {stderr}");
    assert!(!stderr.contains("highlighting failed"), "stderr: {stderr}");
}

#[test]
fn highlight_fails_for_encrypted_marker_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let mut bytes = fs::read(sentence_fixture(&temp)).expect("fixture should be readable");
    bytes.extend_from_slice(b"\n% /Encrypt\n");
    let input = temp.path().join("encrypted.pdf");
    fs::write(&input, bytes).expect("fixture should be written");

    keymark(&temp)
        .arg("highlight")
        .arg(&input)
        .args(["--keyword", "systems"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn highlight_fails_for_missing_file_or_directory() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    keymark(&temp)
        .arg("highlight")
        .arg(temp.path().join("missing.pdf"))
        .args(["--keyword", "systems"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));

    keymark(&temp)
        .arg("inspect")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("path is not a file"));
}

#[test]
fn keywords_prints_sorted_json_array() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let summary = temp.path().join("summary.txt");
    fs::write(&summary, "Reliable systems, reliable نظام.").expect("summary should be written");

    let stdout = keymark(&temp)
        .arg("keywords")
        .arg("--summary-file")
        .arg(&summary)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let keywords: Value =
        serde_json::from_slice(&stdout).expect("stdout should contain valid json");
    assert_eq!(keywords, json!(["reliable", "systems", "نظام"]));
}

#[test]
fn inspect_emits_stable_json_contract() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let fixture = PdfFixture::new()
        .page(
            FixturePage::new()
                .text(72.0, 700.0, 12.0, "Systems are reliable.")
                .highlight(Rect::new(72.0, 697.0, 115.0, 709.0))
                .annotation("Square", Rect::new(10.0, 10.0, 50.0, 50.0)),
        )
        .page(FixturePage::new().media_box(Rect::new(0.0, 0.0, 595.0, 842.0)));
    let input = write_fixture(&temp, "inspect.pdf", fixture);

    let output =
        keymark(&temp).arg("inspect").arg(&input).assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");

    // Sizes are floats on the wire; snapshot them as whole points.
    let pages: Vec<Value> = value["pages"]
        .as_array()
        .expect("pages array")
        .iter()
        .map(|page| {
            json!({
                "annotations": page["annotations"],
                "height": page["height"].as_f64().map(f64::round).map(|v| v as i64),
                "highlights": page["highlights"],
                "page": page["page"],
                "width": page["width"].as_f64().map(f64::round).map(|v| v as i64),
            })
        })
        .collect();
    let summary = json!({ "page_count": value["page_count"], "pages": pages });

    insta::assert_json_snapshot!("inspect_two_pages", summary);
}

#[test]
fn version_prints_package_version() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    keymark(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
