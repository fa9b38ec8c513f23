//! CLI configuration (`uatkit.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uatkit_core::{ConfidenceTable, ExecutionConfig, FlowOptions};

pub const DEFAULT_CONFIG_FILE: &str = "uatkit.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UatConfig {
    /// Reports are written to `<output_dir>/<session id>/`
    pub output_dir: PathBuf,

    /// UI driver program and execution timing
    pub executor: ExecutorConfig,

    /// Screenshot capture program
    pub screenshot: ScreenshotConfig,

    /// Session readiness probe
    pub readiness: ReadinessConfig,

    /// Flow execution defaults
    pub flows: FlowConfig,

    /// Mapping confidence per criterion type
    pub confidence: ConfidenceTable,
}

impl Default for UatConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("acceptance-reports"),
            executor: ExecutorConfig::default(),
            screenshot: ScreenshotConfig::default(),
            readiness: ReadinessConfig::default(),
            flows: FlowConfig::default(),
            confidence: ConfidenceTable::default(),
        }
    }
}

/// UI driver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Program that performs UI actions; receives the action file path last
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Arguments placed before the action file path
    pub args: Vec<String>,

    #[serde(flatten)]
    pub timing: ExecutionConfig,
}

/// Screenshot program configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Program that writes a PNG; `{path}` in args is the destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    pub args: Vec<String>,

    /// Directory screenshots are written to
    pub dir: PathBuf,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            dir: PathBuf::from("acceptance-reports/screenshots"),
        }
    }
}

/// Readiness probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Probe program; the session is ready when it exits 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    pub args: Vec<String>,

    /// A probe still running after this long counts as not ready
    pub timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_ms: 10_000,
        }
    }
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Flow defaults, overridable per run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub stop_on_failure: bool,
    pub screenshot_each_step: bool,
}

impl FlowConfig {
    pub fn options(&self) -> FlowOptions {
        FlowOptions {
            stop_on_failure: self.stop_on_failure,
            screenshot_each_step: self.screenshot_each_step,
        }
    }
}

impl UatConfig {
    /// Load configuration from file, or defaults when it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = UatConfig::load(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("acceptance-reports"));
        assert_eq!(config.executor.timing.criterion_timeout_ms, 30_000);
        assert_eq!(config.executor.timing.flow_step_timeout_ms, 15_000);
        assert!(config.executor.program.is_none());
        assert_eq!(config.readiness.timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
output_dir = "out"

[executor]
program = "maestro-driver"
args = ["--device", "emulator-5554"]
criterion_timeout_ms = 5000

[readiness]
program = "adb"
timeout_ms = 2500

[flows]
stop_on_failure = true

[confidence]
interaction = 0.5
"#,
        )
        .unwrap();

        let config = UatConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.executor.program.as_deref(), Some("maestro-driver"));
        assert_eq!(config.executor.args.len(), 2);
        assert_eq!(config.executor.timing.criterion_timeout_ms, 5000);
        assert_eq!(config.executor.timing.flow_step_timeout_ms, 15_000);
        assert_eq!(config.readiness.timeout(), Duration::from_millis(2500));
        assert!(config.flows.options().stop_on_failure);
        assert_eq!(config.confidence.interaction, 0.5);
        assert_eq!(config.confidence.modal, 0.8);
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(DEFAULT_CONFIG_FILE);
        let mut config = UatConfig::default();
        config.readiness.program = Some("adb".to_string());
        config.readiness.args = vec!["get-state".to_string()];
        config.save(&path).unwrap();

        let loaded = UatConfig::load(&path).unwrap();
        assert_eq!(loaded.readiness.program.as_deref(), Some("adb"));
        assert_eq!(loaded.readiness.args, vec!["get-state"]);
    }
}
