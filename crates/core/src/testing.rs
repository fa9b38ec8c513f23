//! Scripted collaborators for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::check::UiAction;
use crate::error::{AcceptanceError, AcceptanceResult};
use crate::ports::{ExecutionOutcome, Screenshot, ScreenshotCapture, UiActionExecutor};

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Pass,
    Fail(String),
    Broken(String),
}

/// Executor that replays a fixed outcome per check name
pub(crate) struct ScriptedExecutor {
    default: Script,
    by_name: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn with_default(default: Script) -> Self {
        Self {
            default,
            by_name: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn passing() -> Self {
        Self::with_default(Script::Pass)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_default(Script::Fail(message.to_string()))
    }

    pub fn broken(message: &str) -> Self {
        Self::with_default(Script::Broken(message.to_string()))
    }

    pub fn script(mut self, name: &str, script: Script) -> Self {
        self.by_name.insert(name.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UiActionExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        name: &str,
        _actions: &[UiAction],
        _timeout: Duration,
    ) -> AcceptanceResult<ExecutionOutcome> {
        self.calls.lock().unwrap().push(name.to_string());
        match self.by_name.get(name).unwrap_or(&self.default) {
            Script::Pass => Ok(ExecutionOutcome::passed(5)),
            Script::Fail(message) => Ok(ExecutionOutcome::failed(5, message.clone())),
            Script::Broken(message) => Err(AcceptanceError::Executor(message.clone())),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeScreenshots {
    broken: bool,
    captured: Mutex<Vec<String>>,
}

impl FakeScreenshots {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Default::default()
        }
    }

    pub fn captured(&self) -> Vec<String> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScreenshotCapture for FakeScreenshots {
    async fn capture(&self, name: &str) -> AcceptanceResult<Screenshot> {
        if self.broken {
            return Err(AcceptanceError::Screenshot("device disconnected".to_string()));
        }
        self.captured.lock().unwrap().push(name.to_string());
        Ok(Screenshot {
            path: PathBuf::from(format!("/tmp/uatkit-shots/{}.png", name)),
        })
    }
}
