//! Persisted layout preferences.
//!
//! Only the split ratios between the timeline and the details panel survive
//! a restart. Zoom, scroll and selection are per trace and never written.

use crate::core::{HookscopeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MIN_RATIO: f32 = 0.1;
const MAX_RATIO: f32 = 0.9;

/// Share of the area given to the timeline in each arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Timeline width when the details panel sits beside it
    pub horizontal: f32,
    /// Timeline height when the details panel sits below it
    pub vertical: f32,
}

impl SplitRatios {
    pub fn uniform(ratio: f32) -> Self {
        Self {
            horizontal: ratio,
            vertical: ratio,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        let clamp = |r: f32| {
            if r.is_finite() {
                r.clamp(MIN_RATIO, MAX_RATIO)
            } else {
                0.5
            }
        };
        Self {
            horizontal: clamp(self.horizontal),
            vertical: clamp(self.vertical),
        }
    }
}

/// On-disk shape: split ratios keyed by layout identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPrefs {
    pub splits: BTreeMap<String, SplitRatios>,
}

/// Loads, updates and saves [`LayoutPrefs`].
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
    prefs: LayoutPrefs,
    dirty: bool,
}

impl PrefsStore {
    /// `<config_dir>/hookscope/layout.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hookscope").join("layout.json"))
    }

    /// Read preferences from `path`. A missing or unreadable file yields
    /// defaults; losing a split ratio is never worth failing startup.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<LayoutPrefs>(&content) {
                Ok(prefs) => prefs,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt layout preferences {:?}: {}", path, e);
                    LayoutPrefs::default()
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LayoutPrefs::default(),
            Err(e) => {
                tracing::warn!("Failed to read layout preferences {:?}: {}", path, e);
                LayoutPrefs::default()
            },
        };
        Self {
            path,
            prefs,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ratios stored under `layout_id`, or `fallback` on both axes.
    pub fn split(&self, layout_id: &str, fallback: f32) -> SplitRatios {
        self.prefs
            .splits
            .get(layout_id)
            .map(|r| r.clamped())
            .unwrap_or_else(|| SplitRatios::uniform(fallback))
    }

    pub fn set_split(&mut self, layout_id: &str, ratios: SplitRatios) {
        let ratios = ratios.clamped();
        if self.prefs.splits.get(layout_id) != Some(&ratios) {
            self.prefs.splits.insert(layout_id.to_string(), ratios);
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write to disk if anything changed. The file is replaced atomically.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.prefs)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            HookscopeError::prefs(format!("Failed to replace {:?}: {}", self.path, e))
        })?;
        self.dirty = false;
        tracing::debug!("Saved layout preferences to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let store = PrefsStore::load(dir.path().join("layout.json"));
        assert_eq!(store.split("timeline-details", 0.65), SplitRatios::uniform(0.65));
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("layout.json");

        let mut store = PrefsStore::load(&path);
        store.set_split(
            "timeline-details",
            SplitRatios {
                horizontal: 0.7,
                vertical: 0.4,
            },
        );
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());

        let reloaded = PrefsStore::load(&path);
        let split = reloaded.split("timeline-details", 0.5);
        assert_eq!(split.horizontal, 0.7);
        assert_eq!(split.vertical, 0.4);
        // Other layouts are independent
        assert_eq!(reloaded.split("other", 0.5), SplitRatios::uniform(0.5));
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = PrefsStore::load(&path);
        assert_eq!(store.split("timeline-details", 0.6), SplitRatios::uniform(0.6));
    }

    #[test]
    fn test_ratios_are_clamped() {
        let mut store = PrefsStore::load(PathBuf::from("/nonexistent/layout.json"));
        store.set_split(
            "x",
            SplitRatios {
                horizontal: 2.0,
                vertical: -1.0,
            },
        );
        let split = store.split("x", 0.5);
        assert_eq!(split.horizontal, MAX_RATIO);
        assert_eq!(split.vertical, MIN_RATIO);
    }
}
