use std::path::Path;
use std::process::{Command, Output};

use url::Url;

/// Convert a directory into a `file://` storage URL.
pub fn file_storage_url(path: &Path) -> String {
    Url::from_directory_path(path)
        .expect("Failed to convert path to file URL")
        .to_string()
}

/// Run the CLI binary against the given storage URL.
pub fn run_cli(args: &[&str], storage: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tabkit"));
    cmd.args(args);
    cmd.env("TABKIT_STORAGE", storage);
    cmd.env_remove("TABKIT_SAS");
    cmd.env_remove("TABKIT_TABLE");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], storage: &str) -> String {
    let output = run_cli(args, storage);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Parse every non-empty stdout line as a JSON object.
pub fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect()
}
