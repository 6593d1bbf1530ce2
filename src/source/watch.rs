//! Reload-on-change for file-backed traces.
//!
//! Editors and exporters rarely write a file in one event, so raw
//! notifications are collected for a debounce window and each changed path
//! is reported once per burst.

use crate::core::{HookscopeError, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Watches trace files or directories and reports changed JSON files.
pub struct TraceWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl TraceWatcher {
    /// Start watching `targets`. A directory target reports every `*.json`
    /// inside it; a file target reports only that file.
    pub fn start(
        targets: &[PathBuf],
        debounce: Duration,
        changed: mpsc::UnboundedSender<PathBuf>,
    ) -> Result<Self> {
        let files: BTreeSet<PathBuf> = targets.iter().filter(|p| !p.is_dir()).cloned().collect();
        let dirs: BTreeSet<PathBuf> = targets.iter().filter(|p| p.is_dir()).cloned().collect();

        let wanted_files = files.clone();
        let wanted_dirs = dirs.clone();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            forward_changes(result, &wanted_files, &wanted_dirs, &changed);
        })
        .map_err(|e| HookscopeError::watch(format!("Failed to create file watcher: {}", e)))?;

        // Files are watched through their directory so atomic replace-by-rename
        // still reports.
        let mut watched = BTreeSet::new();
        for file in &files {
            let parent = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            watched.insert(parent.to_path_buf());
        }
        watched.extend(dirs);
        for dir in &watched {
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| HookscopeError::watch(format!("Failed to watch {}: {}", dir.display(), e)))?;
            tracing::info!("Watching traces in {:?}", dir);
        }

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

/// Send each wanted path of one debounced batch once. Returns false when
/// the receiving side is gone.
fn forward_changes(
    result: DebounceEventResult,
    files: &BTreeSet<PathBuf>,
    dirs: &BTreeSet<PathBuf>,
    out: &mpsc::UnboundedSender<PathBuf>,
) -> bool {
    let events = match result {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!("Trace watcher error: {}", e);
            return true;
        },
    };
    let batch: BTreeSet<PathBuf> = events
        .into_iter()
        .filter(|event| event.kind == DebouncedEventKind::Any)
        .map(|event| event.path)
        .filter(|path| is_wanted(path, files, dirs))
        .collect();
    if !batch.is_empty() {
        tracing::debug!(paths = batch.len(), "Trace files changed");
    }
    batch.into_iter().all(|path| out.send(path).is_ok())
}

fn is_wanted(path: &Path, files: &BTreeSet<PathBuf>, dirs: &BTreeSet<PathBuf>) -> bool {
    if files.iter().any(|f| same_file(f, path)) {
        return true;
    }
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    is_json && path.parent().is_some_and(|parent| dirs.iter().any(|d| same_file(d, parent)))
}

/// Event paths are absolute while targets may be relative.
pub(crate) fn same_file(target: &Path, event_path: &Path) -> bool {
    if target == event_path {
        return true;
    }
    match (target.canonicalize(), event_path.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => event_path.ends_with(target),
    }
}
