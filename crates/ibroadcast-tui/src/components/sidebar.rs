//! Sidebar: library sections with their entity counts.

use ratatui::crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::{Action, ComponentId, Section},
    app_state::AppState,
    component::Component,
    theme::{style_default, style_muted, style_secondary, style_selected, C_ACCENT},
    widgets::pane_chrome::pane_chrome,
};

pub struct Sidebar {
    selected: usize,
}

impl Sidebar {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    fn current(&self) -> Section {
        Section::ALL[self.selected]
    }

    fn open(&self) -> Vec<Action> {
        let section = self.current();
        let focus = if section == Section::Search {
            ComponentId::SearchPanel
        } else {
            ComponentId::LibraryTable
        };
        vec![Action::ShowSection(section), Action::FocusPane(focus)]
    }
}

fn count_for(section: Section, state: &AppState) -> Option<usize> {
    let counts = state.library.as_ref()?.counts();
    match section {
        Section::Albums => Some(counts.albums),
        Section::Artists => Some(counts.artists),
        Section::Tracks => Some(counts.tracks),
        Section::Playlists => Some(counts.playlists),
        Section::Search => None,
    }
}

impl Component for Sidebar {
    fn id(&self) -> ComponentId {
        ComponentId::Sidebar
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(Section::ALL.len() - 1);
            }
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.selected = Section::ALL.len() - 1,
            KeyCode::Enter | KeyCode::Char('l') => return self.open(),
            _ => {}
        }
        Vec::new()
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(_) => {
                // one border row above the first entry
                let row = event.row.saturating_sub(area.y + 1) as usize;
                if row < Section::ALL.len() {
                    self.selected = row;
                    return self.open();
                }
            }
            MouseEventKind::ScrollUp => self.selected = self.selected.saturating_sub(1),
            MouseEventKind::ScrollDown => {
                self.selected = (self.selected + 1).min(Section::ALL.len() - 1)
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::ShowSection(section) = action {
            if let Some(i) = Section::ALL.iter().position(|s| s == section) {
                self.selected = i;
            }
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("library", Some('1'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = inner.width as usize;
        let lines: Vec<Line> = Section::ALL
            .iter()
            .enumerate()
            .map(|(i, &section)| {
                let marker = if section == state.section { "▸ " } else { "  " };
                let label = format!("{}{}", marker, section.label());
                let count = count_for(section, state)
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                let pad = width.saturating_sub(label.chars().count() + count.len() + 1);
                let base = if i == self.selected {
                    style_selected(focused)
                } else {
                    style_default()
                };
                let label_style = if section == state.section {
                    base.fg(C_ACCENT)
                } else {
                    base
                };
                Line::from(vec![
                    Span::styled(label, label_style),
                    Span::styled(" ".repeat(pad), base),
                    Span::styled(count, if i == self.selected { base } else { style_secondary() }),
                    Span::styled(" ", base),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);

        if let Some(user) = state.username.as_deref() {
            let y = inner.y + inner.height.saturating_sub(1);
            if inner.height as usize > Section::ALL.len() + 1 {
                let rect = Rect { y, height: 1, ..inner };
                frame.render_widget(Paragraph::new(Span::styled(user, style_muted())), rect);
            }
        }
    }
}
