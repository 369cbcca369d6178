use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture() -> PathBuf {
    let fixture = repo_root().join("fixtures").join("basic.json");
    assert!(fixture.exists(), "fixture missing: {}", fixture.display());
    fixture
}

fn run_json(args: &[&str]) -> Value {
    let exe = assert_cmd::cargo_bin!("clustermap-cli");
    let output = Command::new(exe)
        .args(args)
        .arg(fixture())
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn cli_renders_svg_to_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.svg");

    let exe = assert_cmd::cargo_bin!("clustermap-cli");
    Command::new(exe)
        .args([
            "render",
            "--id",
            "basic plot",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture().to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read svg");
    assert!(svg.starts_with("<svg"), "output is not an SVG");
    assert!(svg.contains(r#"id="basic-plot""#));
    assert_eq!(svg.matches("<polygon").count(), 8);
}

#[test]
fn cli_reads_stdin_by_default() {
    let exe = assert_cmd::cargo_bin!("clustermap-cli");
    let input = fs::read_to_string(fixture()).expect("read fixture");
    let output = assert_cmd::Command::new(exe)
        .write_stdin(input)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("<svg"));
}

#[test]
fn cli_prints_groups() {
    let groups = run_json(&["groups", "--pretty"]);
    let groups = groups.as_array().expect("array");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["label"], "Group 0");
    let genes: Vec<&str> = groups[0]["genes"]
        .as_array()
        .expect("genes")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(genes.contains(&"a1"));
    assert!(genes.contains(&"b1"));
    assert!(genes.contains(&"c1"));
}

#[test]
fn cli_prints_links_with_opacity() {
    let links = run_json(&["links"]);
    let links = links.as_array().expect("array");
    assert_eq!(links.len(), 5);
    let skip = links
        .iter()
        .find(|l| l["uid"] == "a1-c1")
        .expect("a1-c1 is listed");
    assert_eq!(skip["opacity"], 0.0);

    let strict = run_json(&["links", "--threshold", "0.55"]);
    let visible = strict
        .as_array()
        .expect("array")
        .iter()
        .filter(|l| l["opacity"].as_f64() != Some(0.0))
        .count();
    assert_eq!(visible, 3);
}

#[test]
fn cli_applies_config_file_and_overrides() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{ "link": { "show": false } }"#).expect("write config");

    let links = run_json(&["links", "--config", config.to_string_lossy().as_ref()]);
    assert!(
        links
            .as_array()
            .expect("array")
            .iter()
            .all(|l| l["opacity"] == 0.0)
    );

    let links = run_json(&["links", "--set", "link.show=true", "--best-only"]);
    assert!(links.as_array().expect("array").len() <= 5);
}

#[test]
fn cli_usage_errors_exit_with_2() {
    let exe = assert_cmd::cargo_bin!("clustermap-cli");
    Command::new(exe)
        .arg("--bogus")
        .assert()
        .failure()
        .code(2);

    let exe = assert_cmd::cargo_bin!("clustermap-cli");
    Command::new(exe)
        .args(["--threshold", "2"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn cli_reports_bad_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("bad.json");
    fs::write(
        &input,
        r#"{ "clusters": [], "links": [{ "query": { "uid": "x" }, "target": { "uid": "y" }, "identity": 0.5 }] }"#,
    )
    .expect("write input");

    let exe = assert_cmd::cargo_bin!("clustermap-cli");
    let output = Command::new(exe).arg(&input).output().expect("run cli");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown gene"));
}
