//! Small shared rendering helpers.

use crate::core::SpanStatus;
use crate::timeline::palette::Rgb;
use ratatui::style::Color;

/// Symbol and color for a span status.
pub fn status_symbol(status: SpanStatus) -> (&'static str, Color) {
    match status {
        SpanStatus::Error => ("✖", Color::Red),
        SpanStatus::Warning => ("⚠", Color::Yellow),
        SpanStatus::Ok => ("●", Color::Green),
    }
}

#[inline]
pub fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_symbols() {
        assert_eq!(status_symbol(SpanStatus::Error), ("✖", Color::Red));
        assert_eq!(status_symbol(SpanStatus::Warning).1, Color::Yellow);
        assert_eq!(status_symbol(SpanStatus::Ok).0, "●");
        assert_eq!(to_color(Rgb::new(1, 2, 3)), Color::Rgb(1, 2, 3));
    }
}
