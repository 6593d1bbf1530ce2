//! Command-line interface for hookscope.
//!
//! Run `hookscope <dir-or-file>` to browse recorded evaluations, or use the
//! one-shot `flatten` and `render` commands in scripts.

use crate::core::config::ConfigBuilder;
use crate::core::{Config, HookscopeError, Result};
use crate::prefs::PrefsStore;
use crate::source::{read_document, FileTraceSource};
use crate::timeline::palette::{ColorTable, Theme};
use crate::timeline::render::{TimelineRenderer, Viewport};
use crate::timeline::svg::to_svg;
use crate::trace::TracePipeline;
use crate::tui::{App, TerminalUI};
use crate::view::TimelineController;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Waterfall timelines for policy evaluation traces
#[derive(Parser, Debug)]
#[command(name = "hookscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path (default: ~/.config/hookscope/config.yaml)
    #[arg(short, long, global = true, env = "HOOKSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "HOOKSCOPE_DEBUG")]
    pub debug: bool,

    /// Color theme
    #[arg(long, global = true, env = "HOOKSCOPE_THEME")]
    pub theme: Option<Theme>,

    /// Do not capture the mouse
    #[arg(long, global = true, env = "HOOKSCOPE_NO_MOUSE")]
    pub no_mouse: bool,

    /// Reload evaluations when their files change
    #[arg(short, long, global = true, env = "HOOKSCOPE_WATCH")]
    pub watch: bool,

    /// Write logs to this file
    #[arg(long, global = true, env = "HOOKSCOPE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Browse evaluations interactively (default)
    View {
        /// A trace file or a directory of trace files
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the flattened spans of a trace as JSON
    Flatten {
        file: PathBuf,
        /// Print laid-out rows with depth instead of raw spans
        #[arg(long)]
        layout: bool,
    },
    /// Render a trace timeline to SVG
    Render {
        file: PathBuf,
        #[arg(long, default_value_t = 1200)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Zoom factor, clamped to the configured bounds
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
        /// Trace offset in microseconds kept in place while zooming
        #[arg(long, default_value_t = 0)]
        at: u64,
        /// Vertical scroll offset in pixels
        #[arg(long, default_value_t = 0.0)]
        scroll: f64,
        /// Highlight this span
        #[arg(long)]
        select: Option<String>,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration and exit
    CheckConfig,
}

/// Options of the `render` command.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub zoom: f64,
    pub at: u64,
    pub scroll: f64,
    pub select: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            zoom: 1.0,
            at: 0,
            scroll: 0.0,
            select: None,
        }
    }
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::View {
            path: PathBuf::from("."),
        })
    }

    fn is_interactive(&self) -> bool {
        matches!(self.command(), Command::View { .. })
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments and `HOOKSCOPE_*` environment variables
    /// 2. Config file
    /// 3. Defaults
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => return self.build_config_from_args(builder),
            },
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
            },
            Err(e) if self.config.is_some() => {
                return Err(HookscopeError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {},
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(theme) = self.theme {
            builder = builder.theme(theme);
        }
        if self.no_mouse {
            builder = builder.mouse(false);
        }
        if self.watch {
            builder = builder.watch(true);
        }
        if let Some(path) = &self.log_file {
            builder = builder.log_file(path.clone());
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging. The terminal UI owns the screen, so interactive
    /// runs always log to a file.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let level = if config.debug {
            "debug"
        } else {
            config.logging.level.as_str()
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let log_file = config
            .logging
            .file
            .clone()
            .or_else(|| self.is_interactive().then(default_log_path).flatten());

        let (stderr_layer, file_layer) = match log_file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?;
                let layer = tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .compact()
                    .with_writer(std::sync::Mutex::new(file));
                (None, Some(layer))
            },
            None => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(std::io::stderr);
                (Some(layer), None)
            },
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| HookscopeError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// `<config_dir>/hookscope/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hookscope").join("config.yaml"))
}

/// `<data_dir>/hookscope/hookscope.log`
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("hookscope").join("hookscope.log"))
}

/// Execute the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    match cli.command() {
        Command::View { path } => start_with_ui(config, &path).await,
        Command::Flatten { file, layout } => {
            println!("{}", flatten_json(&file, layout)?);
            Ok(())
        },
        Command::Render {
            file,
            width,
            height,
            zoom,
            at,
            scroll,
            select,
            output,
        } => {
            let options = RenderOptions {
                width,
                height,
                zoom,
                at,
                scroll,
                select,
            };
            let svg = render_svg(&config, &file, &options)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, svg)?;
                    tracing::info!("Wrote {:?}", path);
                },
                None => println!("{svg}"),
            }
            Ok(())
        },
        Command::CheckConfig => {
            println!("Configuration is valid!");
            println!("  Theme: {:?}", config.ui.theme);
            println!(
                "  Zoom: {}x to {}x, step {}",
                config.ui.zoom.min, config.ui.zoom.max, config.ui.zoom.step
            );
            println!("  Frame interval: {:?}", config.ui.frame_interval);
            println!("  Label width: {} columns", config.terminal.label_width);
            println!("  Watch: {}", config.watch.enabled);
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        },
    }
}

fn load_pipeline(file: &Path) -> Result<TracePipeline> {
    match read_document(file)? {
        Some(document) => Ok(TracePipeline::new(&document)),
        None => Err(HookscopeError::fetch(file.display().to_string(), "no trace recorded")),
    }
}

/// Flattened spans (or laid-out rows) of the trace in `file`, as pretty JSON.
pub fn flatten_json(file: &Path, layout: bool) -> Result<String> {
    let pipeline = load_pipeline(file)?;
    let json = if layout {
        serde_json::to_string_pretty(pipeline.rows())?
    } else {
        serde_json::to_string_pretty(pipeline.spans())?
    };
    Ok(json)
}

/// SVG timeline of the trace in `file`.
pub fn render_svg(config: &Config, file: &Path, options: &RenderOptions) -> Result<String> {
    let pipeline = load_pipeline(file)?;
    let renderer = TimelineRenderer::new(
        config.geometry,
        config.palette(),
        ColorTable::with_overrides(&config.ui.service_colors),
    );
    let mut controller = TimelineController::new(renderer, config.ui.zoom, config.ui.frame_interval);
    controller.resize(Viewport::new(f64::from(options.width), f64::from(options.height)));
    controller.load(pipeline.len(), pipeline.extent());

    if options.zoom != 1.0 {
        let anchor = controller.scale().apply(options.at as f64);
        controller.zoom_at(anchor, options.zoom);
    }
    controller.scroll_to(options.scroll);

    let scene = controller.render(pipeline.rows(), options.select.as_deref());
    Ok(to_svg(&scene))
}

async fn start_with_ui(config: Config, path: &Path) -> Result<()> {
    let source = FileTraceSource::from_path(path)?;
    let watch_target = path.to_path_buf();

    let prefs_path = config
        .prefs
        .path
        .clone()
        .or_else(PrefsStore::default_path)
        .unwrap_or_else(|| PathBuf::from("hookscope-layout.json"));
    let prefs = PrefsStore::load(prefs_path);

    let mouse = config.terminal.mouse;
    let watch = config.watch.enabled;
    let mut app = App::new(config, Arc::new(source), prefs);
    if watch {
        app.watch(&[watch_target])?;
    }

    tracing::info!("Starting hookscope on {:?}", path);
    let mut ui = TerminalUI::new(mouse)?;
    let result = ui.run(app).await;
    ui.restore()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const TRACE: &str = r#"{
        "spanId": "root",
        "startTimeUnixNano": 1000000,
        "endTimeUnixNano": 9000000,
        "phases": [{"name": "global", "startTimeUnixNano": 2000000, "endTimeUnixNano": 4000000}]
    }"#;

    fn write_trace(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("eval.json");
        std::fs::write(&path, TRACE).unwrap();
        path
    }

    #[test]
    fn test_default_command_is_view() {
        let cli = Cli::try_parse_from(["hookscope"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::View {
                path: PathBuf::from(".")
            }
        );
        assert!(cli.is_interactive());
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::try_parse_from([
            "hookscope", "render", "t.json", "--width", "800", "--zoom", "4", "--theme", "light", "-o", "out.svg",
        ])
        .unwrap();
        assert_eq!(cli.theme, Some(Theme::Light));
        match cli.command() {
            Command::Render {
                width, zoom, output, ..
            } => {
                assert_eq!(width, 800);
                assert_eq!(zoom, 4.0);
                assert_eq!(output, Some(PathBuf::from("out.svg")));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "ui:\n  theme: dark\nterminal:\n  mouse: true\n").unwrap();

        let cli = Cli::try_parse_from([
            "hookscope",
            "--config",
            config_path.to_str().unwrap(),
            "--theme",
            "light",
            "--no-mouse",
            "check-config",
        ])
        .unwrap();
        let config = cli.load_config().await.unwrap();
        assert_eq!(config.ui.theme, Theme::Light);
        assert!(!config.terminal.mouse);
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let cli = Cli::try_parse_from(["hookscope", "--config", "/nonexistent/hookscope.yaml"]).unwrap();
        let err = cli.load_config().await.unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_flatten_json() {
        let dir = TempDir::new().unwrap();
        let path = write_trace(&dir);

        let spans: serde_json::Value = serde_json::from_str(&flatten_json(&path, false).unwrap()).unwrap();
        let spans = spans.as_array().unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0]["spanId"], "root");
        assert_eq!(spans[1]["startTime"], 1000);

        let rows: serde_json::Value = serde_json::from_str(&flatten_json(&path, true).unwrap()).unwrap();
        assert_eq!(rows[1]["depth"], 1);
    }

    #[test]
    fn test_null_trace_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("null.json");
        std::fs::write(&path, "null").unwrap();
        let err = flatten_json(&path, false).unwrap_err();
        assert!(err.to_string().contains("no trace recorded"));
    }

    #[test]
    fn test_render_svg() {
        let dir = TempDir::new().unwrap();
        let path = write_trace(&dir);
        let options = RenderOptions {
            zoom: 2.0,
            select: Some("root".into()),
            ..Default::default()
        };
        let svg = render_svg(&Config::default(), &path, &options).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">global<"));
        assert!(svg.ends_with("</svg>"));
    }
}
