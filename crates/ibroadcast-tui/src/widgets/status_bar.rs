//! Bottom keys bar: input mode label and the bindings that apply to it.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MODE_FILTER, C_MODE_NORMAL, C_MODE_SEARCH, C_MUTED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into a pane's `/` filter.
    Filter,
    /// Typing into the search box.
    Search,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "FILTER",
            Self::Search => "SEARCH",
        }
    }

    fn keys(self) -> &'static str {
        match self {
            Self::Normal => {
                "↑↓/jk move  Enter open/play  ⌫ back  Space pause  n/p track  ←→ vol  s stop  R refresh  Tab/1-3 panes  / filter  K keys  L logs  ? help  q quit"
            }
            Self::Filter => "type to filter  ↑↓ move  Enter keep  Esc clear/close",
            Self::Search => "type to search  ↓/Enter results  Esc clear/close",
        }
    }
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let color = match mode {
        InputMode::Normal => C_MODE_NORMAL,
        InputMode::Filter => C_MODE_FILTER,
        InputMode::Search => C_MODE_SEARCH,
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", mode.keys()), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
