//! Legacy spreadsheet conversion through an office suite.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// How long a single conversion may run.
const CONVERT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("converter '{0}' not found in PATH")]
    ToolNotFound(String),
    #[error("failed to run converter: {0}")]
    Io(#[from] std::io::Error),
    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("converter produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("conversion timed out")]
    Timeout,
}

/// Best-effort format conversion of downloaded files.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Whether files with this extension should be converted.
    fn handles(&self, extension: &str) -> bool;

    /// Extension of converted files, without the dot.
    fn target_extension(&self) -> &str;

    /// Convert `input`, writing the result into `out_dir`.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// Converts `.xls` to `.xlsx` with a headless LibreOffice (`soffice`).
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    binary: String,
    sources: Vec<String>,
    target: String,
}

impl Default for OfficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl OfficeConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            sources: vec!["xls".to_string()],
            target: "xlsx".to_string(),
        }
    }

    /// Whether the converter binary can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}

#[async_trait]
impl Converter for OfficeConverter {
    fn handles(&self, extension: &str) -> bool {
        self.sources
            .iter()
            .any(|source| source.eq_ignore_ascii_case(extension))
    }

    fn target_extension(&self) -> &str {
        &self.target
    }

    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let binary =
            which::which(&self.binary).map_err(|_| ConvertError::ToolNotFound(self.binary.clone()))?;

        let mut cmd = Command::new(binary);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg(&self.target)
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(CONVERT_TIMEOUT, cmd.output())
            .await
            .map_err(|_| ConvertError::Timeout)??;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let converted = out_dir.join(format!("{}.{}", stem, self.target));
        if !converted.is_file() {
            return Err(ConvertError::MissingOutput(converted));
        }

        tracing::debug!("Converted {} to {}", input.display(), converted.display());
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_legacy_spreadsheets_only() {
        let converter = OfficeConverter::default();
        assert!(converter.handles("xls"));
        assert!(converter.handles("XLS"));
        assert!(!converter.handles("xlsx"));
        assert!(!converter.handles("pdf"));
        assert_eq!(converter.target_extension(), "xlsx");
    }

    #[tokio::test]
    async fn test_missing_tool_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.xls");
        std::fs::write(&input, b"legacy").unwrap();

        let converter = OfficeConverter::new("ttsync-no-such-office-binary");
        assert!(!converter.is_available());
        let result = converter.convert(&input, dir.path()).await;
        assert!(matches!(result, Err(ConvertError::ToolNotFound(_))));
    }
}
