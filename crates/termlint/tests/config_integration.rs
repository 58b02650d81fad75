//! End-to-end checks that matching settings survive the full config stack.
//!
//! Every test reads the effective settings back through `info --json` (or
//! runs `suggest`), so a key only passes if it flows from the file, the
//! environment, or a flag all the way into the binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A scratch project tree.
struct Project {
    tmp: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn dir(&self, rel: &str) -> PathBuf {
        let dir = self.root().join(rel);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }
}

/// Effective config as reported by `info --json`, run from `dir`.
fn settings(dir: &Path, extra: &[&str], env: &[(&str, &str)]) -> Value {
    let mut command = cmd();
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command
        .args(["-C", dir.to_str().unwrap()])
        .args(extra)
        .args(["info", "--json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "info failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    json["config"].clone()
}

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-6)
}

#[test]
fn no_config_reports_matching_defaults() {
    let project = Project::new();
    let config = settings(project.root(), &[], &[]);

    assert!(config["config_file"].is_null());
    assert_eq!(config["max_ngram_size"], 4);
    assert!(approx(&config["lexical_threshold"], 0.5));
    assert!(approx(&config["semantic_threshold"], 0.9));
    assert_eq!(config["on_service_error"], "skip");
    assert!(config["phrases"].is_null());
}

#[test]
fn parent_project_config_applies_to_nested_drafts() {
    let project = Project::new();
    project.write(
        ".termlint.toml",
        r#"
max_ngram_size = 3
semantic_threshold = 0.85
phrases = "glossary/approved.csv"
on_service_error = "abort"
"#,
    );
    let drafts = project.dir("docs/drafts");

    let config = settings(&drafts, &[], &[]);
    assert_eq!(config["max_ngram_size"], 3);
    assert!(approx(&config["semantic_threshold"], 0.85));
    assert_eq!(config["phrases"], "glossary/approved.csv");
    assert_eq!(config["on_service_error"], "abort");
    assert!(
        config["config_file"]
            .as_str()
            .is_some_and(|f| f.ends_with(".termlint.toml"))
    );
}

#[test]
fn every_format_carries_matching_keys() {
    let cases = [
        (".termlint.toml", "max_ngram_size = 5\non_service_error = \"abort\"\n"),
        (".termlint.yaml", "max_ngram_size: 5\non_service_error: abort\n"),
        ("termlint.yml", "max_ngram_size: 5\non_service_error: abort\n"),
        (
            "termlint.json",
            r#"{"max_ngram_size": 5, "on_service_error": "abort"}"#,
        ),
    ];
    for (name, contents) in cases {
        let project = Project::new();
        project.write(name, contents);
        let config = settings(project.root(), &[], &[]);
        assert_eq!(config["max_ngram_size"], 5, "{name}");
        assert_eq!(config["on_service_error"], "abort", "{name}");
    }
}

#[test]
fn files_in_one_directory_merge_key_by_key() {
    let project = Project::new();
    project.write(
        ".terms.yaml",
        "phrases: terms.txt\nlexical_threshold: 0.4\nmax_ngram_size: 2\n",
    );
    project.write(".termlint.toml", "max_ngram_size = 6\n");
    project.write("termlint.json", r#"{"on_service_error": "abort"}"#);

    let config = settings(project.root(), &[], &[]);
    assert_eq!(config["phrases"], "terms.txt");
    assert!(approx(&config["lexical_threshold"], 0.4));
    assert_eq!(config["max_ngram_size"], 6);
    assert_eq!(config["on_service_error"], "abort");
    assert!(
        config["config_file"]
            .as_str()
            .is_some_and(|f| f.ends_with("termlint.json"))
    );
}

#[test]
fn closest_directory_replaces_outer_one() {
    let project = Project::new();
    project.write(".termlint.toml", "phrases = \"outer.csv\"\nworkers = 4\n");
    project.write("handbook/.termlint.toml", "semantic_threshold = 0.95\n");
    let handbook = project.dir("handbook");

    let config = settings(&handbook, &[], &[]);
    assert!(approx(&config["semantic_threshold"], 0.95));
    assert!(config["phrases"].is_null());
    assert_eq!(config["workers"], 0);
}

#[test]
fn git_boundary_keeps_outer_settings_out() {
    let project = Project::new();
    project.write(".termlint.toml", "on_service_error = \"abort\"\n");
    project.dir("repo/.git");
    let src = project.dir("repo/src");

    let config = settings(&src, &[], &[]);
    assert_eq!(config["on_service_error"], "skip");
    assert!(config["config_file"].is_null());

    project.write("repo/.termlint.toml", "max_ngram_size = 3\n");
    let config = settings(&src, &[], &[]);
    assert_eq!(config["max_ngram_size"], 3);
    assert_eq!(config["on_service_error"], "skip");
}

#[test]
fn explicit_config_then_env_override_project() {
    let project = Project::new();
    project.write(
        ".termlint.toml",
        "semantic_threshold = 0.8\nphrases = \"project.csv\"\n",
    );
    let explicit = project.write("ci/strict.toml", "semantic_threshold = 0.97\n");
    let explicit = explicit.to_str().unwrap();

    let config = settings(project.root(), &["--config", explicit], &[]);
    assert!(approx(&config["semantic_threshold"], 0.97));
    assert_eq!(config["phrases"], "project.csv");
    assert!(
        config["config_file"]
            .as_str()
            .is_some_and(|f| f.ends_with("strict.toml"))
    );

    let config = settings(
        project.root(),
        &["--config", explicit],
        &[
            ("TERMLINT_SEMANTIC_THRESHOLD", "0.7"),
            ("TERMLINT_ON_SERVICE_ERROR", "abort"),
        ],
    );
    assert!(approx(&config["semantic_threshold"], 0.7));
    assert_eq!(config["on_service_error"], "abort");
}

#[test]
fn suggest_flags_override_configured_thresholds() {
    let project = Project::new();
    project.write("notes.txt", "Our customer onboarding is slow.");
    project.write("terms.csv", "term\nCustomer onboarding\n");
    // Out of range on purpose: only the flag below makes the run valid.
    project.write(
        ".termlint.toml",
        "phrases = \"terms.csv\"\nsemantic_threshold = 1.5\n",
    );
    let root = project.root().to_str().unwrap();

    cmd()
        .args(["-C", root, "suggest", "notes.txt", "--stdout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("semantic_threshold"));

    cmd()
        .args([
            "-C",
            root,
            "suggest",
            "notes.txt",
            "--stdout",
            "--semantic-threshold",
            "0.9",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("customer onboarding"));
}

#[test]
fn unknown_keys_do_not_block_matching_keys() {
    let project = Project::new();
    project.write(
        ".termlint.toml",
        "max_ngram_size = 3\nmodel = \"large\"\n[extras]\nretries = 2\n",
    );
    let config = settings(project.root(), &[], &[]);
    assert_eq!(config["max_ngram_size"], 3);
}

#[test]
fn disabled_input_limit_is_reported() {
    let project = Project::new();
    project.write(".termlint.yaml", "disable_input_limit: true\nmax_input_bytes: 10\n");
    let config = settings(project.root(), &[], &[]);
    assert!(config["max_input_bytes"].is_null());
}

#[test]
fn malformed_matching_values_fail_to_load() {
    let cases = [
        (".termlint.toml", "on_service_error = \"retry\"\n"),
        (".termlint.toml", "max_ngram_size = \"four\"\n"),
        (".termlint.yaml", "semantic_threshold: [0.9\n"),
        (".termlint.json", "{\"workers\": }"),
    ];
    for (name, contents) in cases {
        let project = Project::new();
        project.write(name, contents);
        cmd()
            .args(["-C", project.root().to_str().unwrap(), "info"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("configuration"));
    }
}
