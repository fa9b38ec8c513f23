//! Command-based collaborators
//!
//! These adapters hand UI work to external programs: a driver that performs
//! the actions, a screenshot tool, and a readiness probe. They only move data
//! in and out of those programs and enforce timeouts.

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::check::UiAction;
use crate::error::{AcceptanceError, AcceptanceResult};
use crate::ports::{ExecutionFailure, ExecutionOutcome, Screenshot, ScreenshotCapture, SessionGate, UiActionExecutor};
use crate::selector::slugify;

/// Placeholder replaced with the screenshot destination
pub const PATH_PLACEHOLDER: &str = "{path}";

/// JSON document handed to the driver program
#[derive(Serialize)]
struct ActionScript<'a> {
    name: &'a str,
    timeout_ms: u64,
    actions: &'a [UiAction],
}

/// Runs a driver program with the path of a JSON action script appended to
/// its arguments. Exit status 0 is success; stdout is kept as data when it
/// parses as JSON.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl UiActionExecutor for CommandExecutor {
    async fn execute(
        &self,
        name: &str,
        actions: &[UiAction],
        timeout: Duration,
    ) -> AcceptanceResult<ExecutionOutcome> {
        let start = Instant::now();
        let script = ActionScript {
            name,
            timeout_ms: timeout.as_millis() as u64,
            actions,
        };

        let mut file = tempfile::Builder::new()
            .prefix("uatkit-actions-")
            .suffix(".json")
            .tempfile()?;
        file.write_all(serde_json::to_string_pretty(&script)?.as_bytes())?;
        file.flush()?;

        debug!("Running {} for '{}' ({})", self.program, name, file.path().display());

        let output = TokioCommand::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, output).await {
            Err(_) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                return Ok(ExecutionOutcome::failed(
                    elapsed_ms,
                    format!("Timed out after {} ms", timeout.as_millis()),
                ));
            }
            Ok(Err(e)) => {
                return Err(AcceptanceError::Executor(format!(
                    "failed to launch '{}': {}",
                    self.program, e
                )))
            }
            Ok(Ok(output)) => output,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            return Ok(ExecutionOutcome {
                success: true,
                elapsed_ms,
                data: serde_json::from_str(&stdout).ok(),
                ..Default::default()
            });
        }

        let message = if !stderr.is_empty() {
            stderr.lines().last().unwrap_or_default().to_string()
        } else if !stdout.is_empty() {
            stdout.lines().last().unwrap_or_default().to_string()
        } else {
            format!("Driver exited with {}", output.status)
        };

        Ok(ExecutionOutcome {
            success: false,
            elapsed_ms,
            error: Some(ExecutionFailure {
                message,
                details: Some(format!("stdout:\n{}\nstderr:\n{}", stdout, stderr)),
            }),
            ..Default::default()
        })
    }
}

/// Runs a screenshot program, substituting `{path}` in its arguments with
/// `<dir>/<name>.png`. The path is appended when no argument mentions it.
#[derive(Debug, Clone)]
pub struct CommandScreenshotter {
    program: String,
    args: Vec<String>,
    dir: PathBuf,
}

impl CommandScreenshotter {
    pub fn new(program: impl Into<String>, args: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            dir: dir.into(),
        }
    }

    fn destination(&self, name: &str) -> PathBuf {
        let stem = slugify(name);
        let stem = if stem.is_empty() { "screenshot".to_string() } else { stem };
        self.dir.join(format!("{}.png", stem))
    }
}

#[async_trait]
impl ScreenshotCapture for CommandScreenshotter {
    async fn capture(&self, name: &str) -> AcceptanceResult<Screenshot> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.destination(name);
        let path_str = path.to_string_lossy();

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(PATH_PLACEHOLDER, &path_str))
            .collect();
        if !self.args.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
            args.push(path_str.to_string());
        }

        let output = TokioCommand::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| AcceptanceError::Screenshot(format!("failed to launch '{}': {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcceptanceError::Screenshot(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        debug!("Screenshot saved: {}", path.display());
        Ok(Screenshot { path })
    }
}

/// Default bound on how long the readiness probe may run
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Readiness probe: ready iff the program exits 0 within its timeout
#[derive(Debug, Clone)]
pub struct CommandGate {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGate {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SessionGate for CommandGate {
    async fn is_ready(&self) -> bool {
        let status = TokioCommand::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout, status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                warn!("Readiness probe '{}' failed to launch: {}", self.program, e);
                false
            }
            Err(_) => {
                warn!(
                    "Readiness probe '{}' timed out after {} ms",
                    self.program,
                    self.timeout.as_millis()
                );
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!(
            "readiness probe '{}' did not succeed within {} ms",
            self.program,
            self.timeout.as_millis()
        )
    }
}
