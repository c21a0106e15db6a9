#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary config file
pub struct CliTestHarness {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with an empty config
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Create a harness whose `taskdesk.toml` holds `contents`
    pub fn with_config(contents: &str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("taskdesk.toml");
        std::fs::write(&config_path, contents).expect("Failed to write config");

        Self {
            temp_dir,
            config_path,
        }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskdesk").expect("Failed to find taskdesk binary");

        cmd.current_dir(self.temp_dir.path())
            .env("TASKDESK_CONFIG", &self.config_path)
            .env_remove("TASKDESK_API__BASE_URL")
            .env_remove("TASKDESK_API__TOKEN")
            .env_remove("TASKDESK_VIEWER__ROLE")
            .env_remove("TASKDESK_VIEWER__USER_ID")
            .env_remove("TASKDESK_LOG");

        cmd
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

/// Common config fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Admin config pointing at a port nothing listens on
    pub fn unreachable_admin_config() -> &'static str {
        r#"
[api]
base_url = "http://127.0.0.1:9/api/tasks"
company_id = "acme"

[viewer]
user_id = "boss"
role = "admin"
timezone = "UTC"
"#
    }

    pub fn employee_without_id_config() -> &'static str {
        r#"
[api]
base_url = "http://127.0.0.1:9/api/tasks"

[viewer]
role = "employee"
timezone = "UTC"
"#
    }

    pub fn bad_timezone_config() -> &'static str {
        r#"
[api]
base_url = "http://127.0.0.1:9/api/tasks"

[viewer]
role = "admin"
timezone = "Mars/Olympus_Mons"
"#
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check for error messages
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
