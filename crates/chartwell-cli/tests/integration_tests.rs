//! Integration tests for CLI commands
//!
//! Every test works on its own temporary repositories file and cache, with
//! `file://` repositories built from freshly packaged charts.

use chartwell_core::ChartMetadata;
use chartwell_core::archive::create_archive;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Env {
    root: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn config(&self) -> PathBuf {
        self.root.path().join("config").join("repositories.yaml")
    }

    fn cache(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    /// Run chartwell against this environment's config and cache
    fn chartwell(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_chartwell"))
            .arg("--repository-config")
            .arg(self.config())
            .arg("--repository-cache")
            .arg(self.cache())
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute chartwell")
    }

    /// Package the given charts into a directory and index it
    fn repository(&self, name: &str, charts: &[(&str, &str, &str)]) -> String {
        let dir = self.root.path().join("repos").join(name);
        for (chart, version, description) in charts {
            let mut metadata = ChartMetadata::new(*chart, *version);
            metadata.description = Some(description.to_string());
            metadata.app_version = Some("1.0".to_string());
            create_archive(&metadata, &dir).unwrap();
        }

        let output = self.chartwell(&["repo", "index", dir.to_str().unwrap()]);
        assert!(output.status.success(), "index failed: {}", stderr(&output));
        file_url(&dir)
    }
}

fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("Output should be valid JSON")
}

fn default_charts() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("nginx", "1.0.0", "NGINX web server"),
        ("nginx", "1.5.0", "NGINX web server"),
        ("nginx", "2.0.0-beta.1", "NGINX web server preview"),
        ("redis", "0.3.1", "In-memory cache"),
    ]
}

mod repo_add {
    use super::*;

    #[test]
    fn test_add_and_list() {
        let env = Env::new();
        let url = env.repository("local", &default_charts());

        let output = env.chartwell(&["repo", "add", "local", &url]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("\"local\" has been added to your repositories"));

        let listed = json(&env.chartwell(&["repo", "list", "-o", "json"]));
        assert_eq!(listed[0]["name"], "local");
        assert_eq!(listed[0]["url"], url.as_str());

        assert!(env.cache().join("local-index.yaml").exists());
    }

    #[test]
    fn test_identical_add_is_skipped() {
        let env = Env::new();
        let url = env.repository("local", &default_charts());

        assert!(env.chartwell(&["repo", "add", "local", &url]).status.success());
        let before = std::fs::read_to_string(env.config()).unwrap();

        let output = env.chartwell(&["repo", "add", "local", &url]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("already exists with the same configuration"));
        assert_eq!(std::fs::read_to_string(env.config()).unwrap(), before);
    }

    #[test]
    fn test_conflicting_add_needs_force_update() {
        let env = Env::new();
        let first = env.repository("first", &default_charts());
        let second = env.repository("second", &[("mysql", "8.0.0", "Database")]);

        assert!(env.chartwell(&["repo", "add", "local", &first]).status.success());

        let output = env.chartwell(&["repo", "add", "local", &second]);
        assert_eq!(output.status.code(), Some(7));
        assert!(stderr(&output).contains("--force-update"));

        let output = env.chartwell(&["repo", "add", "local", &second, "--force-update"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let listed = json(&env.chartwell(&["repo", "list", "-o", "json"]));
        assert_eq!(listed[0]["url"], second.as_str());
    }

    #[test]
    fn test_unreachable_repository_is_not_added() {
        let env = Env::new();
        let missing = file_url(&env.root.path().join("nowhere"));

        let output = env.chartwell(&["repo", "add", "broken", &missing]);
        assert_eq!(output.status.code(), Some(8));
        assert!(!env.config().exists());

        let output = env.chartwell(&["repo", "list"]);
        assert_eq!(output.status.code(), Some(6));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let env = Env::new();
        let output = env.chartwell(&["repo", "add", "oci", "oci://registry.example.com/charts"]);
        assert_eq!(output.status.code(), Some(2));
    }
}

mod repo_remove {
    use super::*;

    #[test]
    fn test_remove_deletes_cache() {
        let env = Env::new();
        let url = env.repository("local", &default_charts());
        assert!(env.chartwell(&["repo", "add", "local", &url]).status.success());

        let output = env.chartwell(&["repo", "remove", "local"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("\"local\" has been removed from your repositories"));
        assert!(!env.cache().join("local-index.yaml").exists());
    }

    #[test]
    fn test_remove_unknown_keeps_everything() {
        let env = Env::new();
        let url = env.repository("local", &default_charts());
        assert!(env.chartwell(&["repo", "add", "local", &url]).status.success());

        let output = env.chartwell(&["repo", "remove", "local", "unknown"]);
        assert_eq!(output.status.code(), Some(6));
        assert!(stderr(&output).contains("unknown"));

        let listed = json(&env.chartwell(&["repo", "list", "-o", "json"]));
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert!(env.cache().join("local-index.yaml").exists());
    }
}

mod repo_update {
    use super::*;

    #[test]
    fn test_update_reports_failures_without_failing() {
        let env = Env::new();
        let good = env.repository("good", &default_charts());
        let flaky = env.repository("flaky", &[("mysql", "8.0.0", "Database")]);

        assert!(env.chartwell(&["repo", "add", "good", &good]).status.success());
        assert!(env.chartwell(&["repo", "add", "flaky", &flaky]).status.success());

        std::fs::remove_file(env.root.path().join("repos/flaky/index.yaml")).unwrap();
        std::fs::remove_file(env.cache().join("good-index.yaml")).unwrap();

        let output = env.chartwell(&["repo", "update"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let out = stdout(&output);
        assert!(out.contains("Successfully got an update from the \"good\" chart repository"));
        assert!(out.contains("Unable to get an update from the \"flaky\" chart repository"));
        assert!(out.contains("Update Complete."));
        assert!(env.cache().join("good-index.yaml").exists());

        let err = stderr(&output);
        assert!(!err.contains("Successfully got an update"), "stderr: {err}");
        assert!(!err.contains("Unable to get an update"), "stderr: {err}");
    }

    #[test]
    fn test_update_unknown_name() {
        let env = Env::new();
        let url = env.repository("local", &default_charts());
        assert!(env.chartwell(&["repo", "add", "local", &url]).status.success());

        let output = env.chartwell(&["repo", "update", "missing"]);
        assert_eq!(output.status.code(), Some(6));
    }
}

mod repo_index {
    use super::*;

    #[test]
    fn test_index_with_base_url() {
        let env = Env::new();
        let dir = env.root.path().join("charts");
        create_archive(&ChartMetadata::new("alpine", "0.1.0"), &dir).unwrap();

        let output = env.chartwell(&[
            "repo",
            "index",
            dir.to_str().unwrap(),
            "--url",
            "https://charts.example.com",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let index = std::fs::read_to_string(dir.join("index.yaml")).unwrap();
        assert!(index.contains("https://charts.example.com/alpine-0.1.0.tgz"));
    }

    #[test]
    fn test_index_missing_directory() {
        let env = Env::new();
        let missing = env.root.path().join("missing");
        let output = env.chartwell(&["repo", "index", missing.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod search_repo {
    use super::*;

    fn env_with_repository() -> Env {
        let env = Env::new();
        let url = env.repository("local", &default_charts());
        assert!(env.chartwell(&["repo", "add", "local", &url]).status.success());
        env
    }

    fn versions(value: &serde_json::Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| format!("{} {}", r["name"].as_str().unwrap(), r["version"].as_str().unwrap()))
            .collect()
    }

    #[test]
    fn test_search_latest_stable_by_default() {
        let env = env_with_repository();
        let output = env.chartwell(&["search", "repo", "nginx", "-o", "json"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(versions(&json(&output)), vec!["local/nginx 1.5.0"]);
    }

    #[test]
    fn test_search_all_versions_and_devel() {
        let env = env_with_repository();

        let output = env.chartwell(&["search", "repo", "nginx", "-l", "-o", "json"]);
        assert_eq!(
            versions(&json(&output)),
            vec!["local/nginx 1.5.0", "local/nginx 1.0.0"]
        );

        let output = env.chartwell(&["search", "repo", "nginx", "--devel", "-o", "json"]);
        assert_eq!(versions(&json(&output)), vec!["local/nginx 2.0.0-beta.1"]);
    }

    #[test]
    fn test_search_version_constraint() {
        let env = env_with_repository();
        let output = env.chartwell(&[
            "search", "repo", "nginx", "-l", "--version", "<1.5.0", "-o", "json",
        ]);
        assert_eq!(versions(&json(&output)), vec!["local/nginx 1.0.0"]);
    }

    #[test]
    fn test_search_table_output() {
        let env = env_with_repository();
        let output = env.chartwell(&["search", "repo", "redis"]);
        let out = stdout(&output);
        assert!(out.starts_with("NAME"));
        assert!(out.contains("local/redis"));
        assert!(out.contains("In-memory cache"));
    }

    #[test]
    fn test_search_without_matches() {
        let env = env_with_repository();
        let output = env.chartwell(&["search", "repo", "zzz-no-such-chart"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("No results found"));
    }

    #[test]
    fn test_search_invalid_constraint() {
        let env = env_with_repository();
        let output = env.chartwell(&["search", "repo", "nginx", "--version", ">>>1"]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_missing_cache_is_reported_once() {
        let env = env_with_repository();
        let url = env.repository("stale", &[("mysql", "8.0.0", "Database")]);
        assert!(env.chartwell(&["repo", "add", "stale", &url]).status.success());
        std::fs::remove_file(env.cache().join("stale-index.yaml")).unwrap();

        let output = env.chartwell(&["search", "repo", "nginx"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("local/nginx"));

        let err = stderr(&output);
        assert_eq!(err.matches("corrupt or missing").count(), 1, "stderr: {err}");
        assert_eq!(err.matches("chartwell repo update").count(), 1, "stderr: {err}");
        assert!(err.contains("stale-index.yaml"), "stderr: {err}");
    }

    #[test]
    fn test_search_without_repositories() {
        let env = Env::new();
        let output = env.chartwell(&["search", "repo", "nginx"]);
        assert_eq!(output.status.code(), Some(6));
    }
}

#[test]
fn test_usage_error_exit_code() {
    let env = Env::new();
    let output = env.chartwell(&["repo", "add", "only-a-name"]);
    assert_eq!(output.status.code(), Some(64));
}
