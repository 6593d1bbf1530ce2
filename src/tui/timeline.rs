//! Paints a timeline [`Scene`] into a terminal buffer.
//!
//! Scene coordinates are in cells. The header and grid are painted at fixed
//! positions; rows are shifted by the scroll offset and clipped to the body,
//! which is what keeps the axis sticky. Rects are opaque: they blank the
//! cells they cover, so grid lines never show through bars.

use crate::timeline::render::{Anchor, DrawCommand, Scene};
use crate::tui::widgets::to_color;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

/// Widget wrapper around a rendered scene.
pub struct TimelineView<'a> {
    scene: &'a Scene,
}

impl<'a> TimelineView<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self { scene }
    }
}

/// Vertical band a layer may paint in, in area-relative rows.
#[derive(Clone, Copy)]
struct Layer {
    area: Rect,
    top: i64,
    bottom: i64,
    shift: f64,
}

impl Layer {
    fn cell(&self, x: f64, y: f64) -> Option<(u16, u16)> {
        let col = x.floor() as i64;
        let row = (y - self.shift).floor() as i64;
        if col < 0 || col >= i64::from(self.area.width) || row < self.top || row >= self.bottom {
            return None;
        }
        Some((self.area.x + col as u16, self.area.y + row as u16))
    }

    fn fill(&self, buf: &mut Buffer, x: f64, y: f64, width: f64, height: f64, style: Style, symbol: Option<&str>) {
        let cols = x.floor() as i64..(x + width).ceil().max(x.floor() + 1.0) as i64;
        let top = (y - self.shift).floor() as i64;
        let rows = top..((y + height - self.shift).ceil() as i64).max(top + 1);
        for row in rows {
            for col in cols.clone() {
                if let Some(pos) = self.cell(col as f64, row as f64 + self.shift) {
                    if let Some(cell) = buf.cell_mut(pos) {
                        cell.set_style(style);
                        if let Some(symbol) = symbol {
                            cell.set_symbol(symbol);
                        }
                    }
                }
            }
        }
    }

    fn paint(&self, buf: &mut Buffer, command: &DrawCommand) {
        match command {
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => self.fill(buf, *x, *y, *width, *height, Style::default().bg(to_color(*fill)), Some(" ")),
            DrawCommand::Line {
                x1,
                y1,
                x2,
                y2,
                color,
            } => {
                let style = Style::default().fg(to_color(*color));
                if (x1 - x2).abs() < f64::EPSILON {
                    self.fill(buf, *x1, *y1, 0.0, y2 - y1, style, Some("│"));
                } else {
                    self.fill(buf, x1.min(*x2), *y1, (x2 - x1).abs(), 0.0, style, Some("─"));
                }
            },
            DrawCommand::Text {
                x,
                y,
                text,
                color,
                anchor,
                bold,
            } => {
                let len = text.chars().count() as f64;
                let start = match anchor {
                    Anchor::Start => *x,
                    Anchor::Middle => x - len / 2.0,
                    Anchor::End => x - len,
                };
                let mut style = Style::default().fg(to_color(*color));
                if *bold {
                    style = style.add_modifier(Modifier::BOLD);
                }
                for (i, ch) in text.chars().enumerate() {
                    if let Some(pos) = self.cell(start + i as f64, *y) {
                        if let Some(cell) = buf.cell_mut(pos) {
                            cell.set_char(ch).set_style(style);
                        }
                    }
                }
            },
            DrawCommand::Dot { cx, cy, color, .. } => {
                if let Some(pos) = self.cell(*cx, *cy) {
                    if let Some(cell) = buf.cell_mut(pos) {
                        cell.set_symbol("●").set_style(Style::default().fg(to_color(*color)));
                    }
                }
            },
        }
    }
}

impl Widget for TimelineView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let scene = self.scene;
        let background = Style::default()
            .bg(to_color(scene.background))
            .fg(to_color(scene.foreground));
        buf.set_style(area, background);

        let height = i64::from(area.height);
        if let Some(message) = &scene.placeholder {
            let width = message.chars().count().min(usize::from(area.width)) as u16;
            let x = area.x + (area.width.saturating_sub(width)) / 2;
            let y = area.y + area.height / 2;
            buf.set_stringn(x, y, message, usize::from(area.width), background);
            return;
        }

        let body_top = scene.body_top.ceil() as i64;
        let fixed = Layer {
            area,
            top: 0,
            bottom: height,
            shift: 0.0,
        };
        for command in &scene.grid {
            fixed.paint(buf, command);
        }

        let rows = Layer {
            area,
            top: body_top,
            bottom: height,
            shift: scene.scroll_top,
        };
        for command in &scene.rows {
            rows.paint(buf, command);
        }

        let header = Layer {
            area,
            top: 0,
            bottom: body_top.min(height),
            shift: 0.0,
        };
        for command in &scene.header {
            header.paint(buf, command);
        }
    }
}
