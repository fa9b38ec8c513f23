//! Filesystem report sink

use std::path::PathBuf;
use tracing::debug;

use crate::error::{AcceptanceError, AcceptanceResult};
use crate::ports::{ArtifactPaths, ReportSink};

pub const MARKDOWN_FILE: &str = "acceptance-report.md";
pub const JSON_FILE: &str = "acceptance-report.json";

/// Writes reports to `<output_dir>/<session_id>/`
#[derive(Debug, Clone)]
pub struct FsReportSink {
    output_dir: PathBuf,
    session_id: String,
}

impl FsReportSink {
    pub fn new(output_dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            session_id: session_id.into(),
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_id)
    }
}

impl ReportSink for FsReportSink {
    fn persist(&self, markdown: &str, json: &str) -> AcceptanceResult<ArtifactPaths> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AcceptanceError::Report(format!("cannot create report directory {}: {}", dir.display(), e))
        })?;

        let markdown_path = dir.join(MARKDOWN_FILE);
        std::fs::write(&markdown_path, markdown)?;
        let json_path = dir.join(JSON_FILE);
        std::fs::write(&json_path, json)?;

        debug!("Wrote report files to {}", dir.display());
        Ok(ArtifactPaths {
            markdown: Some(markdown_path),
            json: Some(json_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_writes_session_scoped_files() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsReportSink::new(tmp.path(), "abc123");
        let paths = sink.persist("# Report", "{}").unwrap();

        let md = paths.markdown.unwrap();
        assert_eq!(md, tmp.path().join("abc123").join(MARKDOWN_FILE));
        assert_eq!(std::fs::read_to_string(&md).unwrap(), "# Report");
        assert_eq!(std::fs::read_to_string(paths.json.unwrap()).unwrap(), "{}");
    }

    #[test]
    fn test_persist_reports_unusable_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let sink = FsReportSink::new(&blocker, "abc123");
        let err = sink.persist("# Report", "{}").unwrap_err();
        assert!(matches!(err, AcceptanceError::Report(_)));
    }
}
