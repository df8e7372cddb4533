//! Access to the recent output log of the host tool

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

use crate::error::Result;

#[async_trait]
pub trait LogSource: Send + Sync {
    /// The last `max_lines` lines of the log, joined with `\n`
    async fn recent_lines(&self, max_lines: usize) -> Result<String>;
}

/// Reads the tail of a log file. A missing file is an empty log; bytes
/// that are not UTF-8 become U+FFFD.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn recent_lines(&self, max_lines: usize) -> Result<String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Log file {} does not exist", self.path.display());
                return Ok(String::new());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(tail(&String::from_utf8_lossy(&bytes), max_lines))
    }
}

/// Serves fixed text
#[derive(Debug, Clone, Default)]
pub struct StaticLogSource {
    content: String,
}

impl StaticLogSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl LogSource for StaticLogSource {
    async fn recent_lines(&self, max_lines: usize) -> Result<String> {
        Ok(tail(&self.content, max_lines))
    }
}

pub(crate) fn tail(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
