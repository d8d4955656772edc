use assert_cmd::cargo::cargo_bin_cmd;
use pageview_engine::{blank_pdf, PageSize};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn write_pdf(dir: &Path, name: &str, sizes: &[PageSize]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, blank_pdf(sizes).expect("fixture should build")).expect("fixture should be written");
    path
}

fn json_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout should contain valid json")
}

#[test]
fn info_emits_page_geometry() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "two.pdf", &[PageSize::LETTER, PageSize::new(842.0, 595.0)]);

    let output = cargo_bin_cmd!("pageview").arg("info").arg(&pdf).assert().success().get_output().stdout.clone();

    let value = json_stdout(&output);
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["pages"][0]["width"], 612.0);
    assert_eq!(value["pages"][1]["width"], 842.0);
    assert_eq!(value["pages"][1]["height"], 595.0);
}

#[test]
fn simulate_reports_each_step() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "ten.pdf", &[PageSize::new(500.0, 1000.0); 10]);

    let output = cargo_bin_cmd!("pageview")
        .arg("simulate")
        .arg(&pdf)
        .args(["--step", "page:7", "--step", "zoom:2", "--step", "rotate"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = json_stdout(&output);
    let steps = value["steps"].as_array().expect("steps should be an array");
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0]["action"], "open");
    assert_eq!(steps[0]["total_extent"], 10200.0);

    assert_eq!(steps[1]["current_page"], 7);
    assert_eq!(steps[1]["scroll_offset"], 6120.0);

    assert_eq!(steps[2]["zoom"], 2.0);
    assert_eq!(steps[2]["total_extent"], 20200.0);
    assert_eq!(steps[2]["current_page"], 7);

    assert_eq!(steps[3]["rotation"], 90);
    let faces: Vec<&str> = steps[3]["pages"]
        .as_array()
        .expect("pages should be an array")
        .iter()
        .filter_map(|page| page["face"].as_str())
        .collect();
    assert!(faces.iter().all(|face| *face == "live"));

    assert!(value["cache"]["snapshots"].as_u64().unwrap_or(0) > 0);
    assert_eq!(value["errors"].as_array().map(Vec::len), Some(0));
}

#[test]
fn simulate_rejects_unknown_steps() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "one.pdf", &[PageSize::LETTER]);

    cargo_bin_cmd!("pageview")
        .arg("simulate")
        .arg(&pdf)
        .args(["--step", "fly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown step"));
}

#[test]
fn simulate_honours_config_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "three.pdf", &[PageSize::new(500.0, 1000.0); 3]);
    let config = temp.path().join("config.toml");
    fs::write(&config, "page_margin = 0.0\n").expect("config should be written");

    let output = cargo_bin_cmd!("pageview")
        .arg("simulate")
        .arg(&pdf)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(json_stdout(&output)["steps"][0]["total_extent"], 3000.0);
}

#[test]
fn simulate_fails_for_invalid_config() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "one.pdf", &[PageSize::LETTER]);
    let config = temp.path().join("config.toml");
    fs::write(&config, "zoom_min = 4.0\nzoom_max = 2.0\n").expect("config should be written");

    cargo_bin_cmd!("pageview")
        .arg("simulate")
        .arg(&pdf)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn snapshot_writes_png_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "two.pdf", &[PageSize::LETTER, PageSize::new(200.0, 100.0)]);
    let output_path = temp.path().join("out").join("page.png");

    cargo_bin_cmd!("pageview")
        .arg("snapshot")
        .arg(&pdf)
        .args(["--page", "2", "--scale", "0.5", "--rotation", "90"])
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("snapshot should be readable image");
    assert_eq!((image.width(), image.height()), (50, 100));
}

#[test]
fn snapshot_rejects_odd_rotation() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "one.pdf", &[PageSize::LETTER]);

    cargo_bin_cmd!("pageview")
        .arg("snapshot")
        .arg(&pdf)
        .args(["--rotation", "45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--rotation must be"));
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("pageview")
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("invalid.pdf");
    fs::write(&path, b"not a pdf").expect("fixture should be written");

    cargo_bin_cmd!("pageview")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn simulate_fails_for_encrypted_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("encrypted.pdf");
    fs::write(&path, b"%PDF-1.4\n/Encrypt 5 0 R\n").expect("fixture should be written");

    cargo_bin_cmd!("pageview")
        .arg("simulate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}
