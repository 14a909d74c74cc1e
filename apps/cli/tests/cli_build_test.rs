//! Integration tests for the `strand build`, `cache` and `corpora` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, n: usize) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from("text,label\n");
    for i in 0..n {
        content.push_str(&format!("sentence number {i},{}\n", i % 2));
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn write_config(dir: &Path, corpus: &Path) -> PathBuf {
    let path = dir.join("dataset.toml");
    let content = format!(
        "paths = \"news\"\nlazy = true\nseq_length = 16\n\n[corpora.news]\npath = '{}'\n",
        corpus.display()
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_build_split_json() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "a.csv", 20);

    let output = Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("build")
        .arg("--path")
        .arg(&corpus)
        .arg("--split")
        .arg("0.8,0.1,0.1")
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["records"], 20);
    assert_eq!(report["sources"], 1);
    assert_eq!(report["tokenizer"], "CharacterLevelTokenizer");
    let records: Vec<u64> =
        report["slots"].as_array().unwrap().iter().map(|s| s["records"].as_u64().unwrap()).collect();
    assert_eq!(records, vec![16, 2, 2]);
}

#[test]
fn test_build_gpt2_human_output() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "a.csv", 10);

    Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("build")
        .arg("-p")
        .arg(&corpus)
        .arg("--ds-type")
        .arg("gpt2")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset built"))
        .stdout(predicate::str::contains("Task: gpt2"));
}

#[test]
fn test_build_absent_slot() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "a.csv", 10);

    let output = Command::cargo_bin("strand-cli")
        .unwrap()
        .args(["build", "--split", "0.9,0,0.1", "--json", "--path"])
        .arg(&corpus)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["slots"][0]["records"], 9);
    assert!(report["slots"][1].is_null());
    assert_eq!(report["slots"][2]["records"], 1);
}

#[test]
fn test_build_degenerate_split_reports_one_slot() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "a.csv", 10);

    let output = Command::cargo_bin("strand-cli")
        .unwrap()
        .args(["build", "--split", "1,0,0", "--json", "--path"])
        .arg(&corpus)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let slots = report["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["name"], "all");
    assert_eq!(slots[0]["records"], 10);
}

#[test]
fn test_build_unsupported_format_fails() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = temp_dir.path().join("data.parquet");
    std::fs::write(&corpus, "ignored").unwrap();

    Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("build")
        .arg("--path")
        .arg(&corpus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parquet"));
}

#[test]
fn test_build_unknown_task_fails() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "a.csv", 5);

    Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("build")
        .arg("--path")
        .arg(&corpus)
        .arg("--ds-type")
        .arg("t5")
        .assert()
        .failure();
}

#[test]
fn test_build_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();

    Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("build")
        .arg("--config")
        .arg(temp_dir.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_cache_created_then_reused() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "news.csv", 8);
    let config = write_config(temp_dir.path(), &corpus);

    Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("cache")
        .arg("news")
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\""))
        .stdout(predicate::str::contains("\"records\": 8"));
    assert!(temp_dir.path().join("news.csv.lazy").join("text").exists());

    Command::cargo_bin("strand-cli")
        .unwrap()
        .arg("cache")
        .arg("news")
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reused\""));
}

#[test]
fn test_cache_unknown_corpus_fails() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "news.csv", 4);
    let config = write_config(temp_dir.path(), &corpus);

    Command::cargo_bin("strand-cli")
        .unwrap()
        .args(["cache", "wiki", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not registered"));
}

#[test]
fn test_corpora_lists_cache_state() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = write_csv(temp_dir.path(), "news.csv", 4);
    let config = write_config(temp_dir.path(), &corpus);

    let listing = |expected: bool| {
        let output = Command::cargo_bin("strand-cli")
            .unwrap()
            .args(["corpora", "--json", "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success());
        let corpora: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(corpora[0]["name"], "news");
        assert_eq!(corpora[0]["cached"], expected);
    };

    listing(false);
    Command::cargo_bin("strand-cli").unwrap().args(["build", "--config"]).arg(&config).assert().success();
    listing(true);
}
