use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("textlayer 0.1.0\n");
}

// Parse subcommand tests

#[test]
fn parse_alto_outputs_json() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args([
        "parse",
        "tests/fixtures/alto_mm10.xml",
        "--width",
        "1000",
        "--height",
        "1500",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"Call me\""))
        .stdout(predicate::str::contains("\"width\": 1000"));
}

#[test]
fn parse_hocr_as_text() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args([
        "parse",
        "tests/fixtures/hocr_page.html",
        "--format",
        "hocr",
        "--output",
        "text",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Call me\nIshmael.\nFigure 1: the whale"));
}

#[test]
fn parse_iiif_list_with_forced_format() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args([
        "parse",
        "tests/fixtures/iiif_list.json",
        "--format",
        "iiif",
        "--width",
        "1000",
        "--height",
        "1500",
        "--output",
        "text",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Some years ago never mind"));
}

#[test]
fn parse_rejects_unknown_format() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args(["parse", "tests/fixtures/alto_mm10.xml", "--format", "pdf"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("supported: auto, alto, hocr, iiif"));
}

#[test]
fn parse_rejects_unknown_output() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args(["parse", "tests/fixtures/alto_mm10.xml", "--output", "yaml"]);
    cmd.assert().failure();
}

#[test]
fn parse_missing_file_fails() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args(["parse", "tests/fixtures/does_not_exist.xml"]);
    cmd.assert().failure().stderr(predicate::str::contains("Error:"));
}

#[test]
fn parse_malformed_input_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let input = temp.path().join("broken.xml");
    std::fs::write(&input, "<alto><Layout>").expect("write input");

    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args(["parse", input.to_str().unwrap(), "--format", "alto"]);
    cmd.assert().failure();
}

// Settings

#[test]
fn invalid_config_file_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[overlay\nenabled = ").expect("write config");

    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args(["--config", config.to_str().unwrap()]);
    cmd.args(["parse", "tests/fixtures/alto_mm10.xml"]);
    cmd.assert().failure();
}

#[test]
fn config_sets_alto_fallback_dpi() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[alto]\nfallback_dpi = 254\n").expect("write config");

    // Without a canvas the page extent converts at the configured DPI,
    // which makes mm10 units map one-to-one.
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.env("TEXTLAYER_CONFIG", &config);
    cmd.args(["parse", "tests/fixtures/alto_mm10.xml"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"width\": 2000"));
}

#[test]
fn fetch_rejects_unknown_media_type() {
    let mut cmd = Command::cargo_bin("textlayer").unwrap();
    cmd.args([
        "fetch",
        "https://example.org/page.pdf",
        "--media-type",
        "application/pdf",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not a recognized text source"));
}
