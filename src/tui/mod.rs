//! Terminal user interface.
//!
//! One screen: the evaluation list on the left, the waterfall timeline, and
//! the details of the selected span beside or below it. All timeline
//! gestures go through [`TimelineController`]; the view lifecycle lives in
//! [`ViewState`].

pub mod keybindings;
pub mod span_details;
pub mod timeline;
pub mod widgets;

use crate::core::{Config, HookscopeError, Result};
use crate::prefs::{PrefsStore, SplitRatios};
use crate::source::watch::same_file;
use crate::source::{EvaluationHandle, LoadOutcome, TraceLoader, TraceSource, TraceWatcher};
use crate::timeline::palette::ColorTable;
use crate::timeline::render::{TimelineGeometry, TimelineRenderer, Viewport};
use crate::view::{Modifiers, TimelineController, ViewState, WheelInput};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use keybindings::{handle_key, Action};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span as TextSpan},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Upper bound on how long the loop waits for input before checking
/// loader and watcher channels again.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Split ratio change per `[` or `]`
const SPLIT_STEP: f32 = 0.05;

/// Two presses on the same cell within this window count as a double click.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

/// Screen regions of the last layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Areas {
    pub sidebar: Rect,
    /// Bordered frame around the timeline
    pub timeline_frame: Rect,
    /// Where the scene is painted
    pub timeline: Rect,
    pub details: Rect,
    pub footer: Rect,
}

/// Split `area` into the application regions.
pub fn compute_areas(area: Rect, sidebar_width: u16, split: SplitRatios, details_below: bool) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(sidebar_width), Constraint::Min(10)])
        .split(rows[0]);

    let (direction, ratio) = if details_below {
        (Direction::Vertical, split.vertical)
    } else {
        (Direction::Horizontal, split.horizontal)
    };
    let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u16;
    let main = Layout::default()
        .direction(direction)
        .constraints([Constraint::Percentage(percent), Constraint::Min(3)])
        .split(columns[1]);

    let timeline_frame = main[0];
    Areas {
        sidebar: columns[0],
        timeline_frame,
        timeline: Block::default().borders(Borders::ALL).inner(timeline_frame),
        details: main[1],
        footer: rows[1],
    }
}

/// Application state.
pub struct App {
    config: Config,
    source: Arc<dyn TraceSource>,
    evaluations: Vec<EvaluationHandle>,
    list_state: ListState,
    view: ViewState,
    controller: TimelineController,
    loader: TraceLoader,
    outcomes: mpsc::UnboundedReceiver<LoadOutcome>,
    changes: Option<mpsc::UnboundedReceiver<PathBuf>>,
    _watcher: Option<TraceWatcher>,
    prefs: PrefsStore,
    split: SplitRatios,
    details_below: bool,
    details_scroll: u16,
    areas: Areas,
    last_click: Option<(Instant, u16, u16)>,
    /// Whether the help overlay is shown
    pub show_help: bool,
    /// Set once the user asked to quit
    pub should_quit: bool,
}

impl App {
    /// Create the application. Nothing is fetched until
    /// [`App::refresh_evaluations`] runs.
    pub fn new(config: Config, source: Arc<dyn TraceSource>, prefs: PrefsStore) -> Self {
        let geometry = TimelineGeometry::terminal(config.terminal.label_width);
        let renderer = TimelineRenderer::new(
            geometry,
            config.palette(),
            ColorTable::with_overrides(&config.ui.service_colors),
        );
        let controller = TimelineController::new(renderer, config.ui.zoom, config.ui.frame_interval);
        let (loader, outcomes) = TraceLoader::new(Arc::clone(&source));
        let split = prefs.split(&config.prefs.layout_id, config.terminal.timeline_ratio);

        Self {
            config,
            source,
            evaluations: Vec::new(),
            list_state: ListState::default(),
            view: ViewState::default(),
            controller,
            loader,
            outcomes,
            changes: None,
            _watcher: None,
            prefs,
            split,
            details_below: false,
            details_scroll: 0,
            areas: Areas::default(),
            last_click: None,
            show_help: false,
            should_quit: false,
        }
    }

    /// Reload evaluations whenever their files change.
    pub fn watch(&mut self, targets: &[PathBuf]) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self._watcher = Some(TraceWatcher::start(targets, self.config.watch.debounce, tx)?);
        self.changes = Some(rx);
        Ok(())
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn controller(&self) -> &TimelineController {
        &self.controller
    }

    pub fn evaluations(&self) -> &[EvaluationHandle] {
        &self.evaluations
    }

    pub fn areas(&self) -> Areas {
        self.areas
    }

    pub fn split(&self) -> SplitRatios {
        self.split
    }

    /// Re-list evaluations, keeping the current one selected when it is
    /// still there. The first evaluation is loaded if nothing was shown yet.
    pub async fn refresh_evaluations(&mut self) -> Result<()> {
        let handles = self.source.list().await?;
        let current = self.view.handle().cloned();
        self.evaluations = handles;

        match current {
            Some(handle) => match self.evaluations.iter().position(|h| *h == handle) {
                Some(index) => self.list_state.select(Some(index)),
                None => {
                    tracing::info!(handle = %handle, "Shown evaluation disappeared");
                    self.view.clear();
                    self.list_state.select(None);
                    if !self.evaluations.is_empty() {
                        self.select_evaluation(0);
                    }
                },
            },
            None if !self.evaluations.is_empty() => self.select_evaluation(0),
            None => self.list_state.select(None),
        }
        self.controller.request_redraw();
        Ok(())
    }

    /// Show the evaluation at `index`, superseding any load in flight.
    pub fn select_evaluation(&mut self, index: usize) {
        let Some(handle) = self.evaluations.get(index).cloned() else {
            return;
        };
        self.list_state.select(Some(index));
        self.load(handle);
    }

    fn load(&mut self, handle: EvaluationHandle) {
        let ticket = self.loader.request(handle.clone());
        self.view.begin_load(handle, ticket);
        self.details_scroll = 0;
        self.controller.request_redraw();
    }

    /// Fetch the current evaluation again.
    pub fn reload(&mut self) {
        if let Some(handle) = self.view.handle().cloned() {
            self.load(handle);
        }
    }

    /// Apply every finished load.
    pub fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.view.apply(outcome, &mut self.controller);
        }
    }

    /// Wait for the next load outcome and apply it.
    pub async fn next_outcome(&mut self) -> bool {
        match self.outcomes.recv().await {
            Some(outcome) => self.view.apply(outcome, &mut self.controller),
            None => false,
        }
    }

    async fn drain_changes(&mut self) {
        let mut changed = Vec::new();
        if let Some(rx) = self.changes.as_mut() {
            while let Ok(path) = rx.try_recv() {
                changed.push(path);
            }
        }
        for path in changed {
            self.on_file_changed(&path).await;
        }
    }

    /// A watched file changed: re-list if the set of evaluations may have
    /// changed, and re-fetch if it is the one on screen.
    pub async fn on_file_changed(&mut self, path: &Path) {
        let known = self.evaluations.iter().any(|h| same_file(h.as_path(), path));
        if !known || !path.exists() {
            if let Err(e) = self.refresh_evaluations().await {
                tracing::warn!("Failed to refresh evaluations: {}", e);
            }
        }
        let is_current = self
            .view
            .handle()
            .is_some_and(|h| same_file(h.as_path(), path));
        if is_current {
            tracing::info!("Reloading changed trace {:?}", path);
            self.reload();
        }
    }

    /// Lay the screen out for `area` and size the timeline to match.
    pub fn update_layout(&mut self, area: Rect) {
        self.areas = compute_areas(area, self.config.terminal.sidebar_width, self.split, self.details_below);
        let timeline = self.areas.timeline;
        self.controller
            .resize(Viewport::new(f64::from(timeline.width), f64::from(timeline.height)));
    }

    fn adjust_split(&mut self, delta: f32) {
        let mut split = self.split;
        if self.details_below {
            split.vertical += delta;
        } else {
            split.horizontal += delta;
        }
        self.split = split.clamped();
        self.prefs.set_split(&self.config.prefs.layout_id, self.split);
        self.save_prefs();
    }

    /// Persist split ratios; failures only cost the preference.
    pub fn save_prefs(&mut self) {
        if let Err(e) = self.prefs.save() {
            tracing::warn!("Failed to save layout preferences: {}", e);
        }
    }

    fn move_selection(&mut self, offset: isize) {
        let Some(trace) = self.view.rendered_mut() else {
            return;
        };
        if let Some(row) = trace.select_relative(offset) {
            self.controller.scroll_into_view(row);
            self.details_scroll = 0;
        }
    }

    fn cycle_evaluation(&mut self, forward: bool) {
        let count = self.evaluations.len();
        if count == 0 {
            return;
        }
        let next = match self.list_state.selected() {
            Some(i) if forward => (i + 1) % count,
            Some(i) => (i + count - 1) % count,
            None => 0,
        };
        self.select_evaluation(next);
    }

    /// Apply a key action.
    pub async fn handle_action(&mut self, action: Action) {
        if self.show_help && action != Action::None {
            self.show_help = false;
            self.controller.request_redraw();
            return;
        }
        match action {
            Action::Quit => self.should_quit = true,
            Action::MoveUp => self.move_selection(-1),
            Action::MoveDown => self.move_selection(1),
            Action::PageUp => {
                self.controller.page(-1.0);
            },
            Action::PageDown => {
                self.controller.page(1.0);
            },
            Action::DetailsUp => self.details_scroll = self.details_scroll.saturating_sub(1),
            Action::DetailsDown => self.details_scroll = self.details_scroll.saturating_add(1),
            Action::NextEvaluation => self.cycle_evaluation(true),
            Action::PrevEvaluation => self.cycle_evaluation(false),
            Action::ZoomIn => {
                self.controller.zoom_in();
            },
            Action::ZoomOut => {
                self.controller.zoom_out();
            },
            Action::PanLeft => {
                self.controller.pan_left();
            },
            Action::PanRight => {
                self.controller.pan_right();
            },
            Action::ResetZoom => {
                self.controller.reset_zoom();
            },
            Action::ShrinkTimeline => self.adjust_split(-SPLIT_STEP),
            Action::GrowTimeline => self.adjust_split(SPLIT_STEP),
            Action::ToggleSplit => self.details_below = !self.details_below,
            Action::Refresh => {
                if let Err(e) = self.refresh_evaluations().await {
                    tracing::warn!("Failed to refresh evaluations: {}", e);
                }
                self.reload();
            },
            Action::ToggleHelp => self.show_help = true,
            Action::None => return,
        }
        self.controller.request_redraw();
    }

    /// Position inside the timeline scene, if the cell is in it.
    fn timeline_point(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let area = self.areas.timeline;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        inside.then(|| {
            (
                f64::from(column - area.x) + 0.5,
                f64::from(row - area.y) + 0.5,
            )
        })
    }

    fn click_sidebar(&mut self, row: u16) {
        let inner = Block::default().borders(Borders::ALL).inner(self.areas.sidebar);
        if row < inner.y || row >= inner.y + inner.height {
            return;
        }
        let index = self.list_state.offset() + usize::from(row - inner.y);
        if index < self.evaluations.len() && self.list_state.selected() != Some(index) {
            self.select_evaluation(index);
        }
    }

    fn click_timeline(&mut self, x: f64, y: f64) {
        let Some(trace) = self.view.rendered_mut() else {
            return;
        };
        let mut picked = None;
        self.controller
            .click(x, y, trace.rows(), |layout| picked = Some(layout.span.span_id.clone()));
        if let Some(span_id) = picked {
            trace.select(span_id);
            self.details_scroll = 0;
        }
    }

    /// Route a mouse event to the sidebar or the timeline.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let modifiers = Modifiers {
            ctrl: mouse.modifiers.contains(KeyModifiers::CONTROL),
            meta: mouse.modifiers.contains(KeyModifiers::ALT),
            shift: mouse.modifiers.contains(KeyModifiers::SHIFT),
        };
        let point = self.timeline_point(mouse.column, mouse.row);
        let wheel = |delta_x: f64, delta_y: f64| {
            point.map(|(x, y)| WheelInput {
                x,
                y,
                delta_x,
                delta_y,
                modifiers,
            })
        };

        match mouse.kind {
            MouseEventKind::ScrollDown => {
                if let Some(input) = wheel(0.0, 1.0) {
                    self.controller.wheel(input);
                }
            },
            MouseEventKind::ScrollUp => {
                if let Some(input) = wheel(0.0, -1.0) {
                    self.controller.wheel(input);
                }
            },
            MouseEventKind::ScrollRight => {
                if let Some(input) = wheel(1.0, 0.0) {
                    self.controller.wheel(input);
                }
            },
            MouseEventKind::ScrollLeft => {
                if let Some(input) = wheel(-1.0, 0.0) {
                    self.controller.wheel(input);
                }
            },
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                let repeat = self.last_click.is_some_and(|(at, col, row)| {
                    col == mouse.column && row == mouse.row && now.duration_since(at) < DOUBLE_CLICK
                });
                self.last_click = Some((now, mouse.column, mouse.row));

                if let Some((x, y)) = point {
                    if repeat {
                        self.controller.double_click(x, y);
                    }
                    self.click_timeline(x, y);
                    self.controller.drag_start(x);
                } else if self.areas.sidebar.contains(Position::new(mouse.column, mouse.row)) {
                    self.click_sidebar(mouse.row);
                }
            },
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.controller.is_dragging() {
                    let area = self.areas.timeline;
                    let x = f64::from(mouse.column) - f64::from(area.x) + 0.5;
                    self.controller.drag_to(x);
                }
            },
            MouseEventKind::Up(MouseButton::Left) => self.controller.drag_end(),
            MouseEventKind::Moved => match point {
                Some((x, y)) => {
                    self.controller.hover(x, y);
                },
                None => {
                    self.controller.leave();
                },
            },
            _ => {},
        }
    }

    /// Handle one terminal event.
    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_action(handle_key(key)).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(..) => self.controller.request_redraw(),
            _ => {},
        }
    }
}

/// Terminal UI manager.
pub struct TerminalUI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mouse: bool,
}

impl TerminalUI {
    /// Take over the terminal.
    pub fn new(mouse: bool) -> Result<Self> {
        enable_raw_mode().map_err(|e| HookscopeError::terminal(format!("Failed to enable raw mode: {}", e)))?;

        let mut stdout = io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .map_err(|e| HookscopeError::terminal(format!("Failed to enter alternate screen: {}", e)))?;
        if mouse {
            stdout
                .execute(EnableMouseCapture)
                .map_err(|e| HookscopeError::terminal(format!("Failed to capture mouse: {}", e)))?;
        }

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)
            .map_err(|e| HookscopeError::terminal(format!("Failed to create terminal: {}", e)))?;

        Ok(Self { terminal, mouse })
    }

    /// Run the UI event loop until the user quits.
    pub async fn run(&mut self, mut app: App) -> Result<()> {
        app.refresh_evaluations().await?;

        loop {
            app.drain_outcomes();
            app.drain_changes().await;

            let size = self
                .terminal
                .size()
                .map_err(|e| HookscopeError::terminal(format!("Failed to read terminal size: {}", e)))?;
            app.update_layout(Rect::new(0, 0, size.width, size.height));

            if app.controller.begin_frame(Instant::now()) {
                self.terminal
                    .draw(|f| draw_ui(f, &mut app))
                    .map_err(|e| HookscopeError::terminal(format!("Failed to draw UI: {}", e)))?;
            }

            let timeout = app
                .controller
                .time_until_due(Instant::now())
                .map_or(IDLE_POLL, |due| due.min(IDLE_POLL));
            if event::poll(timeout)
                .map_err(|e| HookscopeError::terminal(format!("Failed to poll events: {}", e)))?
            {
                let event =
                    event::read().map_err(|e| HookscopeError::terminal(format!("Failed to read event: {}", e)))?;
                app.handle_event(event).await;
            }

            if app.should_quit {
                break;
            }
        }

        app.save_prefs();
        Ok(())
    }

    /// Restore terminal to original state.
    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode().map_err(|e| HookscopeError::terminal(format!("Failed to disable raw mode: {}", e)))?;

        if self.mouse {
            self.terminal
                .backend_mut()
                .execute(DisableMouseCapture)
                .map_err(|e| HookscopeError::terminal(format!("Failed to release mouse: {}", e)))?;
        }
        self.terminal
            .backend_mut()
            .execute(LeaveAlternateScreen)
            .map_err(|e| HookscopeError::terminal(format!("Failed to leave alternate screen: {}", e)))?;

        self.terminal
            .show_cursor()
            .map_err(|e| HookscopeError::terminal(format!("Failed to show cursor: {}", e)))?;

        Ok(())
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Draw the whole screen.
pub fn draw_ui(frame: &mut Frame, app: &mut App) {
    let areas = app.areas;

    draw_evaluations(frame, areas.sidebar, app);
    draw_timeline(frame, areas, app);
    let selected = app.view.rendered().and_then(|trace| trace.selected_span());
    span_details::draw_span_details(frame, areas.details, selected, app.details_scroll);
    draw_footer(frame, areas.footer, app);

    if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_evaluations(frame: &mut Frame, area: Rect, app: &mut App) {
    let items: Vec<ListItem> = app
        .evaluations
        .iter()
        .map(|handle| ListItem::new(handle.label().to_string()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" EVALUATIONS ({}) ", app.evaluations.len()))
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_timeline(frame: &mut Frame, areas: Areas, app: &App) {
    let started = app
        .view
        .rendered()
        .and_then(|trace| trace.pipeline.started_at())
        .map(|at| format!(" · {}", at.format("%Y-%m-%d %H:%M:%S%.3f UTC")))
        .unwrap_or_default();
    let title = match app.view.handle() {
        Some(handle) => format!(" TIMELINE · {}{} ", handle.label(), started),
        None => " TIMELINE ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(block, areas.timeline_frame);

    let scene = app.view.scene(&app.controller);
    frame.render_widget(timeline::TimelineView::new(&scene), areas.timeline);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let phase = app.view.phase(&app.controller);
    let mut spans = vec![
        TextSpan::styled(
            format!(" {} ", phase.as_str()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        TextSpan::raw(" "),
    ];
    if app.view.can_retry() {
        spans.push(TextSpan::styled("[r]etry ", Style::default().fg(Color::Red)));
    }
    if app.controller.is_zoomed() {
        spans.push(TextSpan::styled(
            format!("×{:.1} ", app.controller.transform().k),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(TextSpan::styled(
        "[q]uit [?]help [Tab]eval [j/k]span [+/-]zoom [h/l]pan [0]reset [v]split",
        Style::default().fg(Color::White),
    ));

    let footer = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(footer, area);
}

fn draw_help_overlay(frame: &mut Frame) {
    let size = frame.area();

    let help_width = 60.min(size.width);
    let help_height = 22.min(size.height);
    let x = (size.width.saturating_sub(help_width)) / 2;
    let y = (size.height.saturating_sub(help_height)) / 2;

    let help_area = Rect::new(x, y, help_width, help_height);

    let help_text = vec![
        Line::from(""),
        Line::from(vec![TextSpan::styled(
            "Keyboard Shortcuts",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(vec![TextSpan::raw("  q/Ctrl+C    Quit application")]),
        Line::from(vec![TextSpan::raw("  ↑/k ↓/j     Select previous/next span")]),
        Line::from(vec![TextSpan::raw("  PgUp/PgDn   Scroll rows by a page")]),
        Line::from(vec![TextSpan::raw("  K/J         Scroll span details")]),
        Line::from(vec![TextSpan::raw("  Tab/S-Tab   Next/previous evaluation")]),
        Line::from(vec![TextSpan::raw("  +/-         Zoom in/out")]),
        Line::from(vec![TextSpan::raw("  ←/h →/l     Pan the time window")]),
        Line::from(vec![TextSpan::raw("  0           Reset zoom")]),
        Line::from(vec![TextSpan::raw("  [ ]         Shrink/grow the timeline")]),
        Line::from(vec![TextSpan::raw("  v           Details beside/below")]),
        Line::from(vec![TextSpan::raw("  r           Reload evaluations")]),
        Line::from(vec![TextSpan::raw("  Ctrl+wheel  Zoom at pointer")]),
        Line::from(vec![TextSpan::raw("  Drag        Pan the time window")]),
        Line::from(vec![TextSpan::raw("  ?           Toggle this help")]),
        Line::from(""),
        Line::from(vec![TextSpan::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Left)
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PolicyPhase, TraceDocument};
    use crate::view::ViewPhase;
    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent};
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    struct MemorySource;

    #[async_trait]
    impl TraceSource for MemorySource {
        async fn list(&self) -> Result<Vec<EvaluationHandle>> {
            Ok(vec![EvaluationHandle::new("first.json"), EvaluationHandle::new("second.json")])
        }

        async fn fetch_trace(&self, handle: &EvaluationHandle) -> Result<Option<TraceDocument>> {
            if handle.as_str() == "second.json" {
                return Ok(None);
            }
            Ok(Some(TraceDocument {
                span_id: Some("root".into()),
                start_time_unix_nano: 1_000_000,
                end_time_unix_nano: 5_000_000,
                phases: vec![PolicyPhase {
                    name: "global".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }))
        }
    }

    fn app(dir: &TempDir) -> App {
        let prefs = PrefsStore::load(dir.path().join("layout.json"));
        let mut app = App::new(Config::default(), Arc::new(MemorySource), prefs);
        app.update_layout(Rect::new(0, 0, 120, 30));
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[tokio::test]
    async fn test_first_evaluation_loads() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.refresh_evaluations().await.unwrap();
        assert_eq!(app.evaluations().len(), 2);
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Loading);

        assert!(app.next_outcome().await);
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Rendered);
        assert_eq!(app.view().rendered().unwrap().rows().len(), 2);
    }

    #[tokio::test]
    async fn test_keys_drive_selection_and_zoom() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.refresh_evaluations().await.unwrap();
        app.next_outcome().await;

        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE)))
            .await;
        let selected = app.view().rendered().unwrap().selected.clone();
        assert_eq!(selected.as_deref(), Some("root"));

        app.handle_action(Action::ZoomIn).await;
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Zoomed);
        app.handle_action(Action::ResetZoom).await;
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Rendered);

        app.handle_action(Action::NextEvaluation).await;
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Loading);
        app.next_outcome().await;
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Failed);
    }

    #[tokio::test]
    async fn test_removed_evaluation_clears_the_view() {
        let prefs_dir = TempDir::new().unwrap();
        let traces = TempDir::new().unwrap();
        let file = traces.path().join("only.json");
        std::fs::write(&file, r#"{"spanId":"root","startTimeUnixNano":1000,"endTimeUnixNano":9000}"#).unwrap();

        let prefs = PrefsStore::load(prefs_dir.path().join("layout.json"));
        let source = Arc::new(crate::source::FileTraceSource::directory(traces.path()));
        let mut app = App::new(Config::default(), source, prefs);
        app.refresh_evaluations().await.unwrap();
        app.next_outcome().await;
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Rendered);

        std::fs::remove_file(&file).unwrap();
        app.refresh_evaluations().await.unwrap();
        assert!(app.evaluations().is_empty());
        assert_eq!(app.view().phase(app.controller()), ViewPhase::Empty);
    }

    #[tokio::test]
    async fn test_clicking_a_row_selects_it() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.refresh_evaluations().await.unwrap();
        app.next_outcome().await;

        let area = app.areas().timeline;
        // Header takes two rows; the second body row is the phase span
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), area.x + 5, area.y + 3));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), area.x + 5, area.y + 3));
        let trace = app.view().rendered().unwrap();
        assert_eq!(trace.selected_span().unwrap().row, 1);
    }

    #[tokio::test]
    async fn test_split_changes_are_persisted() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        let before = app.split().horizontal;
        app.handle_action(Action::GrowTimeline).await;
        assert!(app.split().horizontal > before);

        let reloaded = PrefsStore::load(dir.path().join("layout.json"));
        let stored = reloaded.split("timeline-details", 0.5);
        assert_eq!(stored.horizontal, app.split().horizontal);
    }

    #[tokio::test]
    async fn test_help_overlay_closes_on_any_key() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.handle_action(Action::ToggleHelp).await;
        assert!(app.show_help);
        app.handle_action(Action::Quit).await;
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_draws_full_screen() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.refresh_evaluations().await.unwrap();
        app.next_outcome().await;

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw_ui(f, &mut app)).unwrap();
        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("EVALUATIONS (2)"));
        assert!(screen.contains("TIMELINE · first"));
        assert!(screen.contains("rendered"));
    }
}
