//! HelpOverlay: centered popup listing the key bindings.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_border, C_BG, C_MUTED, C_PRIMARY, C_SECONDARY},
};

pub struct HelpOverlay {
    visible: bool,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Component for HelpOverlay {
    fn id(&self) -> ComponentId {
        ComponentId::HelpOverlay
    }

    /// Any key closes the overlay.
    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if !self.visible {
            return Vec::new();
        }
        vec![Action::ToggleHelp]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::ToggleHelp = action {
            self.visible = !self.visible;
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, _state: &AppState) {
        if !self.visible {
            return;
        }
        let lines = vec![
            Line::from(Span::styled(
                " keyboard shortcuts",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section(" library"),
            help_row("enter  or  l", "open album/artist/playlist, play track"),
            help_row("backspace  or  h", "back to the previous view"),
            help_row("R", "refresh library from the server"),
            help_row("/", "filter rows (Esc clears, then closes)"),
            Line::from(""),
            section(" playback"),
            help_row("space", "pause / resume"),
            help_row("n / p", "next / previous track in queue"),
            help_row("← / →", "volume down / up"),
            help_row("s", "stop and clear queue"),
            Line::from(""),
            section(" navigation"),
            help_row("↑ / ↓  or  j / k", "move selection"),
            help_row("pg up / pg dn", "jump a page"),
            help_row("g / G", "first / last row"),
            help_row("tab / shift-tab", "next / previous pane"),
            help_row("1 / 2 / 3", "sidebar / table / search"),
            Line::from(""),
            section(" ui"),
            help_row("K / L", "toggle keys bar / log panel"),
            help_row("?", "toggle this help"),
            help_row("q / Ctrl+C", "quit"),
        ];

        let popup = centered_rect(64, lines.len() as u16 + 2, area);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(style_border(false))
                    .style(Style::default().bg(C_BG)),
            ),
            popup,
        );
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<20}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    rect
}
