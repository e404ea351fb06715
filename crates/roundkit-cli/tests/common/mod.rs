//! Shared helpers for CLI end-to-end tests.

use std::path::Path;
use std::process::Command;

/// Output of one CLI invocation.
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Run the CLI with `home` as the user's home directory, so config files
/// land in a scratch location.
pub fn run_cli(home: &Path, args: &[&str]) -> CliOutput {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "roundkit-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env_remove("ROUNDKIT_ENV")
        .env_remove("ROUNDKIT_LOG")
        .output()
        .expect("Failed to execute CLI command");

    CliOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        code: output.status.code().unwrap_or(-1),
    }
}

/// The last non-empty stdout line parsed as JSON.
pub fn last_json_line(stdout: &str) -> serde_json::Value {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .expect("no output");
    serde_json::from_str(line).expect("last line is not JSON")
}
