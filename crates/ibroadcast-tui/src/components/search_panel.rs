//! SearchPanel: query box for the Search section.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{layout::Rect, Frame};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::pane_chrome,
    },
};

pub struct SearchPanel {
    input: FilterInput,
}

impl SearchPanel {
    pub fn new() -> Self {
        Self {
            input: FilterInput::new("search:", "track titles"),
        }
    }
}

impl Component for SearchPanel {
    fn id(&self) -> ComponentId {
        ComponentId::SearchPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        self.input.activate();
        if key.code == KeyCode::Down {
            return vec![Action::FocusPane(ComponentId::LibraryTable)];
        }
        match self.input.handle_key(key) {
            FilterAction::Changed(query) => vec![Action::SearchQuery(query)],
            FilterAction::Confirmed => vec![Action::FocusPane(ComponentId::LibraryTable)],
            FilterAction::Cancelled => vec![Action::FocusPane(ComponentId::Sidebar)],
            FilterAction::None => Vec::new(),
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        match action {
            Action::FocusPane(ComponentId::SearchPanel) => self.input.activate(),
            Action::FocusPane(_) | Action::FocusNext | Action::FocusPrev => {
                self.input.deactivate()
            }
            _ => {}
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, _state: &AppState) {
        let block = pane_chrome("search", Some('3'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if focused {
            self.input.activate();
        } else {
            self.input.deactivate();
        }
        self.input.draw(frame, inner);
    }
}
