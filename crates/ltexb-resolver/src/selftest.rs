//! Empirical validation of a resolved server/runtime pair.
//!
//! The version handshake is a fragile but load-bearing contract: stdout
//! must contain the literal marker followed by a single-line JSON object
//! with the server's and the runtime's version strings. Keep the parsing
//! here and nowhere else.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::launch::ExecutableSpec;

pub const VERSION_MARKER: &str = "ltex-ls";
const SELF_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one self-test run. All failure modes are encoded here;
/// [`run`] never returns an error.
#[derive(Clone, Debug, Default)]
pub struct SelfTestResult {
    pub success: bool,
    pub bundle_version: Option<String>,
    pub runtime_version: Option<String>,
    pub runtime_major: Option<u64>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    /// Human-readable reason when `success` is false.
    pub failure: Option<String>,
}

impl SelfTestResult {
    fn failed(reason: impl Into<String>) -> Self {
        SelfTestResult {
            failure: Some(reason.into()),
            ..SelfTestResult::default()
        }
    }
}

/// Spawns the resolved executable with `--version` under a hard timeout
/// and checks that it reports both its own and its runtime's version.
pub async fn run(spec: &ExecutableSpec) -> SelfTestResult {
    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .arg("--version")
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    info!("Self-testing {} --version", spec.command.display());

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Self-test spawn failed: {e}");
            return SelfTestResult::failed(format!(
                "failed to spawn {}: {e}",
                spec.command.display()
            ));
        }
    };

    let output = match timeout(SELF_TEST_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return SelfTestResult::failed(format!("failed to collect self-test output: {e}"))
        }
        Err(_) => {
            // kill_on_drop reaps the child when the future is dropped.
            let mut result = SelfTestResult::failed(format!(
                "self-test did not finish within {}s",
                SELF_TEST_TIMEOUT.as_secs()
            ));
            result.timed_out = true;
            return result;
        }
    };

    let mut result = SelfTestResult {
        exit_code: output.status.code(),
        signal: status_signal(&output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        ..SelfTestResult::default()
    };

    if !output.status.success() {
        result.failure = Some(format!("self-test exited with {}", output.status));
        return result;
    }

    match parse_version_output(&result.stdout) {
        Some((bundle, runtime)) => {
            result.runtime_major = runtime_major(&runtime);
            if result.runtime_major.is_none() {
                result.failure = Some(format!("unparsable runtime version '{runtime}'"));
            } else {
                result.success = true;
            }
            result.bundle_version = Some(bundle);
            result.runtime_version = Some(runtime);
        }
        None => {
            result.failure = Some("version output did not match the expected format".to_string());
        }
    }

    result
}

/// Extracts (bundle version, runtime version) from `--version` stdout.
fn parse_version_output(stdout: &str) -> Option<(String, String)> {
    if !stdout.contains(VERSION_MARKER) {
        return None;
    }
    for line in stdout.lines() {
        let line = line.trim();
        if !line.starts_with('{') {
            continue;
        }
        let Ok(serde_json::Value::Object(doc)) = serde_json::from_str(line) else {
            continue;
        };
        let bundle = doc.get("ltex-ls").and_then(|v| v.as_str());
        let runtime = doc.get("java").and_then(|v| v.as_str());
        if let (Some(bundle), Some(runtime)) = (bundle, runtime) {
            return Some((bundle.to_string(), runtime.to_string()));
        }
    }
    None
}

/// Effective major version from a `major[.minor]` string. Legacy Java
/// numbering (leading `1`) uses the next component instead.
fn runtime_major(version: &str) -> Option<u64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^(\d+)(?:\.(\d+))?").expect("static pattern"));
    let caps = pattern.captures(version)?;
    let major: u64 = caps[1].parse().ok()?;
    if major == 1 {
        caps.get(2)?.as_str().parse().ok()
    } else {
        Some(major)
    }
}

#[cfg(unix)]
fn status_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn status_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_marker_plus_json_line() {
        let stdout = "ltex-ls\n{\"ltex-ls\":\"12.3.0\",\"java\":\"11.0.11\"}\n";
        let (bundle, runtime) = parse_version_output(stdout).unwrap();
        assert_eq!(bundle, "12.3.0");
        assert_eq!(runtime, "11.0.11");
        assert_eq!(runtime_major(&runtime), Some(11));
    }

    #[test]
    fn legacy_runtime_numbering_maps_to_minor() {
        assert_eq!(runtime_major("1.8.0"), Some(8));
        assert_eq!(runtime_major("17"), Some(17));
        assert_eq!(runtime_major("garbled"), None);
        // A bare legacy "1" has no usable major.
        assert_eq!(runtime_major("1"), None);
    }

    #[test]
    fn missing_marker_or_fields_fails_parse() {
        assert!(parse_version_output("{\"ltex-ls\":\"1.0\",\"java\":\"11\"}\n").is_some());
        assert!(parse_version_output("no marker here\n").is_none());
        assert!(parse_version_output("ltex-ls\n{\"ltex-ls\":\"1.0\"}\n").is_none());
    }

    #[cfg(unix)]
    mod spawn {
        use super::super::run;
        use crate::launch::ExecutableSpec;
        use std::collections::HashMap;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("ltex-ls");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn spec_for(command: PathBuf) -> ExecutableSpec {
            ExecutableSpec {
                command,
                args: Vec::new(),
                env: HashMap::new(),
                working_dir: None,
            }
        }

        #[tokio::test]
        async fn healthy_executable_passes() {
            let dir = tempfile::tempdir().unwrap();
            let command = script(
                dir.path(),
                "echo 'ltex-ls'\necho '{\"ltex-ls\":\"12.3.0\",\"java\":\"11.0.11\"}'",
            );
            let result = run(&spec_for(command)).await;
            assert!(result.success, "{:?}", result.failure);
            assert_eq!(result.bundle_version.as_deref(), Some("12.3.0"));
            assert_eq!(result.runtime_version.as_deref(), Some("11.0.11"));
            assert_eq!(result.runtime_major, Some(11));
            assert_eq!(result.exit_code, Some(0));
        }

        #[tokio::test]
        async fn nonzero_exit_fails_with_diagnostics() {
            let dir = tempfile::tempdir().unwrap();
            let command = script(dir.path(), "echo 'boom' >&2\nexit 3");
            let result = run(&spec_for(command)).await;
            assert!(!result.success);
            assert_eq!(result.exit_code, Some(3));
            assert!(result.stderr.contains("boom"));
        }

        #[tokio::test]
        async fn missing_executable_fails_without_panicking() {
            let result = run(&spec_for(PathBuf::from("/definitely/not/ltex-ls"))).await;
            assert!(!result.success);
            assert!(result.failure.is_some());
        }
    }
}
