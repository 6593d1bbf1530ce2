//! Span details panel.
//!
//! Shows the selected span's identity, timing and status, followed by the
//! source fragment it was built from.

use crate::core::LayoutSpan;
use crate::timeline::format::format_duration;
use crate::tui::widgets::status_symbol;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span as TextSpan},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Draw the details panel for `span`, or a hint when nothing is selected.
pub fn draw_span_details(frame: &mut Frame, area: Rect, span: Option<&LayoutSpan>, scroll: u16) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" SPAN DETAILS ")
        .border_style(Style::default().fg(Color::DarkGray));

    let lines = match span {
        Some(span) => detail_lines(span),
        None => vec![Line::from(TextSpan::styled(
            "Select a span to see its details",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn field<'a>(label: &'a str, value: impl Into<String>, color: Color) -> Line<'a> {
    Line::from(vec![
        TextSpan::styled(label, Style::default().fg(Color::Gray)),
        TextSpan::styled(value.into(), Style::default().fg(color)),
    ])
}

pub(crate) fn detail_lines(layout: &LayoutSpan) -> Vec<Line<'static>> {
    let span = &layout.span;
    let (symbol, status_color) = status_symbol(span.status);

    let mut lines = vec![
        Line::from(TextSpan::styled(
            span.name.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        field("Span ID: ", span.span_id.clone(), Color::Cyan),
        field(
            "Parent: ",
            span.parent_id.clone().unwrap_or_else(|| "(root)".to_string()),
            Color::Cyan,
        ),
        field("Service: ", span.service_name.as_str(), Color::Magenta),
        Line::from(vec![
            TextSpan::styled("Status: ", Style::default().fg(Color::Gray)),
            TextSpan::styled(
                format!("{} {}", symbol, span.status.as_str()),
                Style::default().fg(status_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        field("Start: ", format!("+{}", format_duration(span.start_time)), Color::White),
        field("Duration: ", format_duration(span.duration), Color::Yellow),
        field("Depth: ", layout.depth.to_string(), Color::White),
    ];

    if span.timing_is_approximate {
        lines.push(Line::from(TextSpan::styled(
            "Timing is approximate",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    }

    if !span.data.is_null() {
        lines.push(Line::from(""));
        lines.push(Line::from(TextSpan::styled(
            "Data",
            Style::default().fg(Color::Gray).add_modifier(Modifier::UNDERLINED),
        )));
        let json = serde_json::to_string_pretty(&span.data).unwrap_or_else(|_| span.data.to_string());
        lines.extend(
            json.lines()
                .map(|l| Line::from(TextSpan::styled(l.to_string(), Style::default().fg(Color::White)))),
        );
    }

    lines
}
