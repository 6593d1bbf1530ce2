//! Pure timeline renderer.
//!
//! `(laid-out spans, scale, selection, viewport) → Scene`. Nothing here keeps
//! state between frames; hosts decide how to diff or repaint.

use crate::core::{HookscopeError, LayoutSpan, Result};
use crate::timeline::format::{format_duration, format_tick, truncate};
use crate::timeline::palette::{ColorTable, Palette, Rgb};
use crate::timeline::scale::TimeScale;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Text shown instead of a chart when a trace has no spans.
pub const EMPTY_PLACEHOLDER: &str = "No spans in trace";

/// Sizes used to lay the timeline out, in host units (pixels or cells).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineGeometry {
    pub row_height: f64,
    /// Sticky axis header above the rows
    pub header_height: f64,
    /// Fixed-width label column left of the bars
    pub label_gutter: f64,
    pub margin_right: f64,
    /// Bars never get narrower than this, so they stay clickable
    pub min_bar_width: f64,
    /// Label indentation per depth level
    pub indent: f64,
    pub dot_radius: f64,
    /// Vertical gap between a bar and its row edges
    pub bar_inset: f64,
    pub label_padding: f64,
    pub tick_length: f64,
    /// Average glyph advance, used to truncate labels
    pub char_width: f64,
    /// Target distance between axis ticks
    pub tick_spacing: f64,
    /// Horizontal pan per key press
    pub pan_step: f64,
    /// Draw a divider under every row
    pub row_dividers: bool,
}

impl Default for TimelineGeometry {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            header_height: 30.0,
            label_gutter: 200.0,
            margin_right: 16.0,
            min_bar_width: 3.0,
            indent: 12.0,
            dot_radius: 4.0,
            bar_inset: 5.0,
            label_padding: 8.0,
            tick_length: 6.0,
            char_width: 7.0,
            tick_spacing: 100.0,
            pan_step: 40.0,
            row_dividers: true,
        }
    }
}

impl TimelineGeometry {
    /// Cell-based geometry for a terminal with a `label_width` column gutter.
    pub fn terminal(label_width: u16) -> Self {
        Self {
            row_height: 1.0,
            header_height: 2.0,
            label_gutter: f64::from(label_width),
            margin_right: 1.0,
            min_bar_width: 1.0,
            indent: 2.0,
            dot_radius: 0.5,
            bar_inset: 0.0,
            label_padding: 1.0,
            tick_length: 1.0,
            char_width: 1.0,
            tick_spacing: 12.0,
            pan_step: 4.0,
            row_dividers: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.row_height <= 0.0 {
            return Err(HookscopeError::config("geometry.row_height must be greater than 0"));
        }
        if self.header_height < 0.0 || self.margin_right < 0.0 || self.bar_inset < 0.0 {
            return Err(HookscopeError::config("geometry sizes must not be negative"));
        }
        if !(0.0..10_000.0).contains(&self.label_gutter) {
            return Err(HookscopeError::config(format!(
                "geometry.label_gutter must be between 0 and 10000, got {}",
                self.label_gutter
            )));
        }
        if self.bar_inset * 2.0 >= self.row_height {
            return Err(HookscopeError::config("geometry.bar_inset leaves no room for bars"));
        }
        if self.min_bar_width <= 0.0 || self.char_width <= 0.0 {
            return Err(HookscopeError::config(
                "geometry.min_bar_width and geometry.char_width must be greater than 0",
            ));
        }
        if self.tick_spacing <= 0.0 || self.pan_step <= 0.0 {
            return Err(HookscopeError::config(
                "geometry.tick_spacing and geometry.pan_step must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Top of `row` in content coordinates.
    pub fn row_top(&self, row: usize) -> f64 {
        self.header_height + row as f64 * self.row_height
    }

    /// Row under viewport position `y`, before bounds checking.
    pub fn row_at(&self, y: f64, scroll_top: f64) -> Option<usize> {
        if y < self.header_height {
            return None;
        }
        let offset = y - self.header_height + scroll_top;
        (offset >= 0.0).then(|| (offset / self.row_height).floor() as usize)
    }

    /// Scrollable height for `rows` rows; never shorter than the viewport.
    pub fn content_height(&self, rows: usize, viewport_height: f64) -> f64 {
        self.row_top(rows).max(viewport_height)
    }

    /// Horizontal extent the bars are drawn in.
    pub fn timeline_range(&self, width: f64) -> (f64, f64) {
        let left = self.label_gutter;
        (left, (width - self.margin_right).max(left + 1.0))
    }

    /// Rows intersecting the area below the header.
    pub fn visible_rows(&self, rows: usize, viewport: Viewport, scroll_top: f64) -> Range<usize> {
        let body = (viewport.height - self.header_height).max(0.0);
        let first = (scroll_top / self.row_height).floor().max(0.0) as usize;
        let last = ((scroll_top + body) / self.row_height).ceil().max(0.0) as usize;
        first.min(rows)..last.min(rows)
    }
}

/// Visible area size in host units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }
}

/// Horizontal text alignment relative to `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// One primitive for the host to draw. Text `y` is the vertical center.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Rgb,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Rgb,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        color: Rgb,
        anchor: Anchor,
        bold: bool,
    },
    Dot {
        cx: f64,
        cy: f64,
        r: f64,
        color: Rgb,
    },
}

/// Everything needed to paint one frame.
///
/// `header` and `grid` are in viewport coordinates and stay put while rows
/// scroll. `rows` are in content coordinates; hosts shift them by
/// `-scroll_top`. Only rows in `visible_rows` are emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub viewport: Viewport,
    pub background: Rgb,
    pub foreground: Rgb,
    pub header: Vec<DrawCommand>,
    pub grid: Vec<DrawCommand>,
    pub rows: Vec<DrawCommand>,
    /// Shown instead of the chart when set
    pub placeholder: Option<String>,
    /// Viewport y where the scrolling rows begin
    pub body_top: f64,
    pub content_height: f64,
    pub scroll_top: f64,
    pub visible_rows: Range<usize>,
}

impl Scene {
    /// A frame carrying only a message, for empty, loading and failed views.
    pub fn placeholder(viewport: Viewport, palette: &Palette, message: impl Into<String>) -> Self {
        Self {
            viewport,
            background: palette.background,
            foreground: palette.muted,
            header: Vec::new(),
            grid: Vec::new(),
            rows: Vec::new(),
            placeholder: Some(message.into()),
            body_top: 0.0,
            content_height: viewport.height,
            scroll_top: 0.0,
            visible_rows: 0..0,
        }
    }

    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.viewport.height).max(0.0)
    }
}

/// Inputs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub rows: &'a [LayoutSpan],
    /// Scale after zoom and pan
    pub scale: &'a TimeScale,
    pub selected: Option<&'a str>,
    pub hovered: Option<usize>,
    pub viewport: Viewport,
    pub scroll_top: f64,
}

/// Turns laid-out spans into a [`Scene`].
#[derive(Debug, Clone)]
pub struct TimelineRenderer {
    geometry: TimelineGeometry,
    palette: Palette,
    colors: ColorTable,
}

impl TimelineRenderer {
    pub fn new(geometry: TimelineGeometry, palette: Palette, colors: ColorTable) -> Self {
        Self {
            geometry,
            palette,
            colors,
        }
    }

    pub fn geometry(&self) -> &TimelineGeometry {
        &self.geometry
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn render(&self, input: &RenderInput<'_>) -> Scene {
        let viewport = input.viewport;
        if input.rows.is_empty() {
            return Scene::placeholder(viewport, &self.palette, EMPTY_PLACEHOLDER);
        }

        let g = &self.geometry;
        let content_height = g.content_height(input.rows.len(), viewport.height);
        let max_scroll = (content_height - viewport.height).max(0.0);
        let scroll_top = input.scroll_top.clamp(0.0, max_scroll);
        let visible = g.visible_rows(input.rows.len(), viewport, scroll_top);

        let tick_count = ((viewport.width - g.label_gutter - g.margin_right) / g.tick_spacing)
            .floor()
            .max(2.0) as usize;
        let ticks = input.scale.ticks(tick_count);
        let (left, right) = g.timeline_range(viewport.width);
        let tick_xs: Vec<(f64, f64)> = ticks
            .values
            .iter()
            .map(|&v| (v, input.scale.apply(v)))
            .filter(|&(_, x)| x >= left - 0.5 && x <= right + 0.5)
            .collect();

        let mut rows = Vec::with_capacity(visible.len() * 6);
        for layout in &input.rows[visible.clone()] {
            self.push_row(&mut rows, layout, input);
        }

        Scene {
            viewport,
            background: self.palette.background,
            foreground: self.palette.foreground,
            header: self.header(viewport, &tick_xs, ticks.step),
            grid: self.grid(viewport, &tick_xs),
            rows,
            placeholder: None,
            body_top: g.header_height,
            content_height,
            scroll_top,
            visible_rows: visible,
        }
    }

    fn header(&self, viewport: Viewport, ticks: &[(f64, f64)], step: f64) -> Vec<DrawCommand> {
        let g = &self.geometry;
        let label_y = (g.header_height - g.tick_length) / 2.0;
        let (left, right) = g.timeline_range(viewport.width);

        let mut commands = vec![
            DrawCommand::Rect {
                x: 0.0,
                y: 0.0,
                width: viewport.width,
                height: g.header_height,
                fill: self.palette.background,
            },
            DrawCommand::Text {
                x: g.label_padding,
                y: label_y,
                text: "Span".to_string(),
                color: self.palette.muted,
                anchor: Anchor::Start,
                bold: true,
            },
        ];

        for &(value, x) in ticks {
            commands.push(DrawCommand::Line {
                x1: x,
                y1: g.header_height - g.tick_length,
                x2: x,
                y2: g.header_height,
                color: self.palette.border,
            });

            let text = format_tick(value, step);
            let half = text.chars().count() as f64 * g.char_width / 2.0;
            let anchor = if x - half < left {
                Anchor::Start
            } else if x + half > right {
                Anchor::End
            } else {
                Anchor::Middle
            };
            commands.push(DrawCommand::Text {
                x,
                y: label_y,
                text,
                color: self.palette.muted,
                anchor,
                bold: false,
            });
        }

        commands.push(DrawCommand::Line {
            x1: 0.0,
            y1: g.header_height,
            x2: viewport.width,
            y2: g.header_height,
            color: self.palette.border,
        });
        commands
    }

    fn grid(&self, viewport: Viewport, ticks: &[(f64, f64)]) -> Vec<DrawCommand> {
        let g = &self.geometry;
        let mut commands: Vec<DrawCommand> = ticks
            .iter()
            .map(|&(_, x)| DrawCommand::Line {
                x1: x,
                y1: g.header_height,
                x2: x,
                y2: viewport.height,
                color: self.palette.border,
            })
            .collect();
        commands.push(DrawCommand::Line {
            x1: g.label_gutter,
            y1: 0.0,
            x2: g.label_gutter,
            y2: viewport.height,
            color: self.palette.border,
        });
        commands
    }

    fn push_row(&self, out: &mut Vec<DrawCommand>, layout: &LayoutSpan, input: &RenderInput<'_>) {
        let g = &self.geometry;
        let span = &layout.span;
        let top = g.row_top(layout.row);
        let middle = top + g.row_height / 2.0;
        let width = input.viewport.width;
        let color = self.colors.color_for(span.service_name, span.status);

        let highlight = if input.selected == Some(span.span_id.as_str()) {
            Some(self.palette.selection())
        } else if input.hovered == Some(layout.row) {
            Some(self.palette.hover())
        } else {
            None
        };
        if let Some(fill) = highlight {
            out.push(DrawCommand::Rect {
                x: 0.0,
                y: top,
                width,
                height: g.row_height,
                fill,
            });
        }
        if g.row_dividers {
            out.push(DrawCommand::Line {
                x1: 0.0,
                y1: top + g.row_height,
                x2: width,
                y2: top + g.row_height,
                color: self.palette.border,
            });
        }

        let dot_x = g.label_padding + layout.depth as f64 * g.indent + g.dot_radius;
        out.push(DrawCommand::Dot {
            cx: dot_x,
            cy: middle,
            r: g.dot_radius,
            color,
        });

        let duration = format_duration(span.duration);
        let duration_x = g.label_gutter - g.label_padding;
        let label_x = dot_x + g.dot_radius + g.label_padding;
        let room = duration_x - duration.chars().count() as f64 * g.char_width - g.label_padding;
        let max_chars = ((room - label_x) / g.char_width).floor().max(0.0) as usize;
        if max_chars > 0 {
            out.push(DrawCommand::Text {
                x: label_x,
                y: middle,
                text: truncate(&span.name, max_chars),
                color: self.palette.foreground,
                anchor: Anchor::Start,
                bold: span.is_root(),
            });
        }
        out.push(DrawCommand::Text {
            x: duration_x,
            y: middle,
            text: duration,
            color: self.palette.muted,
            anchor: Anchor::End,
            bold: false,
        });

        let start_px = input.scale.apply(span.start_time as f64);
        let end_px = input.scale.apply(span.end_time() as f64);
        let x = start_px.max(g.label_gutter);
        let end = end_px.max(x);
        if x < width {
            out.push(DrawCommand::Rect {
                x,
                y: top + g.bar_inset,
                width: (end - x).max(g.min_bar_width),
                height: g.row_height - 2.0 * g.bar_inset,
                fill: color,
            });
        }
    }
}
