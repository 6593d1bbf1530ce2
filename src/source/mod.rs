//! Trace sources.
//!
//! The timeline only needs one capability from the outside world: fetch the
//! trace document recorded for an evaluation. [`TraceSource`] is that seam;
//! [`FileTraceSource`] serves documents exported as JSON files.

pub mod loader;
pub mod watch;

pub use loader::{LoadOutcome, LoadTicket, TraceLoader};
pub use watch::TraceWatcher;

use crate::core::{HookscopeError, Result, TraceDocument};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque identifier of one recorded evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvaluationHandle(String);

impl EvaluationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The handle read as a file path, for file-backed sources
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Short name for lists: the file stem for paths, else the whole id
    pub fn label(&self) -> &str {
        self.as_path()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for EvaluationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for EvaluationHandle {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// Where trace documents come from.
#[async_trait]
pub trait TraceSource: Send + Sync {
    /// Evaluations available for selection, in display order
    async fn list(&self) -> Result<Vec<EvaluationHandle>>;

    /// Fetch the trace for `handle`. `Ok(None)` means the evaluation exists
    /// but recorded no trace.
    async fn fetch_trace(&self, handle: &EvaluationHandle) -> Result<Option<TraceDocument>>;
}

#[derive(Debug, Clone)]
enum Origin {
    Files(Vec<PathBuf>),
    Directory(PathBuf),
}

/// Serves trace documents stored as JSON files.
#[derive(Debug, Clone)]
pub struct FileTraceSource {
    origin: Origin,
}

impl FileTraceSource {
    /// A fixed set of files, listed in the given order.
    pub fn files(paths: Vec<PathBuf>) -> Self {
        Self {
            origin: Origin::Files(paths),
        }
    }

    /// Every `*.json` file in `dir`, listed by name.
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Directory(dir.into()),
        }
    }

    /// A directory source for directories, a single-file source otherwise.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)
            .map_err(|e| HookscopeError::fetch(path.display().to_string(), e.to_string()))?;
        Ok(if metadata.is_dir() {
            Self::directory(path)
        } else {
            Self::files(vec![path])
        })
    }

    /// Directory being watched for new evaluations, if any
    pub fn root(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Directory(dir) => Some(dir),
            Origin::Files(_) => None,
        }
    }
}

#[async_trait]
impl TraceSource for FileTraceSource {
    async fn list(&self) -> Result<Vec<EvaluationHandle>> {
        match &self.origin {
            Origin::Files(paths) => Ok(paths.iter().map(|p| EvaluationHandle::from(p.as_path())).collect()),
            Origin::Directory(dir) => {
                let mut entries = tokio::fs::read_dir(dir).await?;
                let mut paths = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                        paths.push(path);
                    }
                }
                paths.sort();
                tracing::debug!(dir = %dir.display(), count = paths.len(), "Listed trace files");
                Ok(paths.iter().map(|p| EvaluationHandle::from(p.as_path())).collect())
            },
        }
    }

    async fn fetch_trace(&self, handle: &EvaluationHandle) -> Result<Option<TraceDocument>> {
        let path = handle.as_path();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HookscopeError::TraceNotFound(handle.to_string()));
            },
            Err(e) => return Err(HookscopeError::fetch(handle.as_str(), e.to_string())),
        };
        parse_document(&content, handle)
    }
}

/// Parse a trace document; JSON `null` is a missing trace, not an error.
pub fn parse_document(content: &str, handle: &EvaluationHandle) -> Result<Option<TraceDocument>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| HookscopeError::fetch(handle.as_str(), format!("invalid JSON: {e}")))?;
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| HookscopeError::fetch(handle.as_str(), format!("not a trace document: {e}")))
}

/// Blocking read for one-shot commands.
pub fn read_document(path: &Path) -> Result<Option<TraceDocument>> {
    let handle = EvaluationHandle::from(path);
    let content = std::fs::read_to_string(path)
        .map_err(|e| HookscopeError::fetch(handle.as_str(), e.to_string()))?;
    parse_document(&content, &handle)
}
