//! Single-line text input on top of tui-input, used for `/` filters and
//! the search box.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, PartialEq, Eq)]
pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
    None,
}

pub struct FilterInput {
    input: Input,
    active: bool,
    prompt: &'static str,
    placeholder: String,
}

impl FilterInput {
    pub fn new(prompt: &'static str, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prompt,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Esc clears non-empty text first and only closes on an empty input.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc if !self.text().is_empty() => {
                self.input = Input::default();
                FilterAction::Changed(String::new())
            }
            KeyCode::Esc => {
                self.deactivate();
                FilterAction::Cancelled
            }
            KeyCode::Enter => {
                self.deactivate();
                FilterAction::Confirmed
            }
            _ => {
                let before = self.text().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.text() == before {
                    FilterAction::None
                } else {
                    FilterAction::Changed(self.text().to_string())
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let prefix_len = self.prompt.chars().count() as u16 + 1;
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(prefix_len + 1) as usize);
        let value = self.input.value();
        let span = if value.is_empty() && !self.active {
            Span::styled(
                format!("{} {}", self.prompt, self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(
                format!("{} {}", self.prompt, visible),
                Style::default().fg(C_FILTER_FG),
            )
        };
        frame.render_widget(
            Paragraph::new(Line::from(span)).style(Style::default().bg(C_FILTER_BG)),
            area,
        );

        if self.active {
            let x = area.x + prefix_len + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((x.min(area.x + area.width - 1), area.y));
        }
    }
}
