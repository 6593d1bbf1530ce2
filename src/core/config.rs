//! Configuration management for hookscope.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable and CLI overrides (applied by `cli`)
//! - Validation and defaults

use crate::core::{HookscopeError, Result};
use crate::timeline::palette::{Palette, Rgb, Theme};
use crate::timeline::render::TimelineGeometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for hookscope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeline appearance and interaction
    pub ui: UiConfig,
    /// Pixel geometry used by image exports
    pub geometry: TimelineGeometry,
    /// Terminal host settings
    pub terminal: TerminalConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Persisted split ratios
    pub prefs: PrefsConfig,
    /// Re-fetch the selected evaluation when its file changes
    pub watch: WatchConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Timeline appearance and interaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Base theme
    pub theme: Theme,
    /// Full palette override; wins over `theme`
    pub palette: Option<Palette>,
    /// Per-service color overrides, e.g. `Signal-Block: "#ff0000"`
    pub service_colors: HashMap<String, Rgb>,
    /// Zoom bounds and step
    pub zoom: ZoomConfig,
    /// Minimum time between two redraws
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
}

/// Zoom configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    /// Factor applied per zoom step
    pub step: f64,
}

/// Terminal host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Width of the label gutter in columns
    pub label_width: u16,
    /// Capture mouse events
    pub mouse: bool,
    /// Fraction of the main area given to the timeline when no ratio is persisted
    pub timeline_ratio: f32,
    /// Width of the evaluation list in columns
    pub sidebar_width: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Log file path
    pub file: Option<PathBuf>,
}

/// Persisted layout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefsConfig {
    /// Override for the preferences file location
    pub path: Option<PathBuf>,
    /// Key the split ratios are stored under
    pub layout_id: String,
}

/// File watch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    /// Bursts of change events inside this window trigger one reload
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ui: UiConfig::default(),
            geometry: TimelineGeometry::default(),
            terminal: TerminalConfig::default(),
            logging: LoggingConfig::default(),
            prefs: PrefsConfig::default(),
            watch: WatchConfig::default(),
            debug: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            theme: Theme::Dark,
            palette: None,
            service_colors: HashMap::new(),
            zoom: ZoomConfig::default(),
            frame_interval: Duration::from_millis(16),
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        ZoomConfig {
            min: 1.0,
            max: 100.0,
            step: 1.25,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            label_width: 36,
            mouse: true,
            timeline_ratio: 0.65,
            sidebar_width: 28,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
        }
    }
}

impl Default for PrefsConfig {
    fn default() -> Self {
        PrefsConfig {
            path: None,
            layout_id: "timeline-details".to_string(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            enabled: false,
            debounce: Duration::from_millis(200),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let zoom = &self.ui.zoom;
        if zoom.min < 1.0 {
            return Err(HookscopeError::config(format!(
                "zoom.min must be at least 1, got {}",
                zoom.min
            )));
        }
        if zoom.max < zoom.min {
            return Err(HookscopeError::config(format!(
                "zoom.max ({}) must not be below zoom.min ({})",
                zoom.max, zoom.min
            )));
        }
        if zoom.step <= 1.0 {
            return Err(HookscopeError::config(format!(
                "zoom.step must be greater than 1, got {}",
                zoom.step
            )));
        }

        if self.ui.frame_interval.is_zero() {
            return Err(HookscopeError::config("frame_interval must be greater than 0"));
        }

        self.geometry.validate()?;

        if self.terminal.label_width == 0 {
            return Err(HookscopeError::config("terminal.label_width must be greater than 0"));
        }
        if !(0.1..=0.9).contains(&self.terminal.timeline_ratio) {
            return Err(HookscopeError::config(format!(
                "terminal.timeline_ratio must be between 0.1 and 0.9, got {}",
                self.terminal.timeline_ratio
            )));
        }

        if self.prefs.layout_id.trim().is_empty() {
            return Err(HookscopeError::config("prefs.layout_id must not be empty"));
        }

        Ok(())
    }

    /// Palette after applying the theme and any override
    pub fn palette(&self) -> Palette {
        self.ui.palette.unwrap_or_else(|| self.ui.theme.palette())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| HookscopeError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the theme
    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.ui.theme = theme;
        self
    }

    /// Set the terminal label gutter width
    pub fn label_width(mut self, columns: u16) -> Self {
        self.config.terminal.label_width = columns;
        self
    }

    /// Enable or disable mouse capture
    pub fn mouse(mut self, enable: bool) -> Self {
        self.config.terminal.mouse = enable;
        self
    }

    /// Enable or disable reload on file change
    pub fn watch(mut self, enable: bool) -> Self {
        self.config.watch.enabled = enable;
        self
    }

    /// Set the log file
    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.config.logging.file = Some(path);
        self
    }

    /// Set the preferences file
    pub fn prefs_path(mut self, path: PathBuf) -> Self {
        self.config.prefs.path = Some(path);
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
