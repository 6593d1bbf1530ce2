//! Keyboard handling - vim-like navigation plus timeline zoom and pan

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    DetailsUp,
    DetailsDown,
    NextEvaluation,
    PrevEvaluation,
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    ResetZoom,
    ShrinkTimeline,
    GrowTimeline,
    ToggleSplit,
    Refresh,
    ToggleHelp,
    None,
}

/// Process keyboard input
#[inline]
pub fn handle_key(key: KeyEvent) -> Action {
    if key.kind == KeyEventKind::Release {
        return Action::None;
    }
    match key.code {
        // Quit
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,

        // Span navigation
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageUp,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageDown,

        // Details panel
        KeyCode::Char('K') => Action::DetailsUp,
        KeyCode::Char('J') => Action::DetailsDown,

        // Evaluations
        KeyCode::Tab => Action::NextEvaluation,
        KeyCode::BackTab => Action::PrevEvaluation,

        // Zoom and pan
        KeyCode::Char('+') | KeyCode::Char('=') => Action::ZoomIn,
        KeyCode::Char('-') | KeyCode::Char('_') => Action::ZoomOut,
        KeyCode::Left | KeyCode::Char('h') => Action::PanLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::PanRight,
        KeyCode::Char('0') => Action::ResetZoom,

        // Layout
        KeyCode::Char('[') => Action::ShrinkTimeline,
        KeyCode::Char(']') => Action::GrowTimeline,
        KeyCode::Char('v') => Action::ToggleSplit,

        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Char('?') | KeyCode::F(1) => Action::ToggleHelp,

        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_bindings() {
        assert_eq!(handle_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(
            handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(handle_key(key(KeyCode::Char('j'))), Action::MoveDown);
        assert_eq!(handle_key(key(KeyCode::Char('+'))), Action::ZoomIn);
        assert_eq!(handle_key(key(KeyCode::Char('h'))), Action::PanLeft);
        assert_eq!(handle_key(key(KeyCode::BackTab)), Action::PrevEvaluation);
        assert_eq!(handle_key(key(KeyCode::Char('d'))), Action::None);
        assert_eq!(
            handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            Action::PageDown
        );
    }
}
