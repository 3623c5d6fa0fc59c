//! LibraryTable: the rows of the current view, with a local `/` filter.
//!
//! Enter on a container row (album, artist, playlist) drills down; on a
//! track row it starts playback from there.

use ratatui::crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use ibroadcast_core::view::ViewKind;

use crate::{
    action::{Action, ComponentId},
    app_state::{search_matches, AppState},
    component::Component,
    theme::{
        style_default, style_header, style_muted, style_playing, style_selected, C_LOADING,
        C_SECONDARY,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

const PAGE: usize = 10;

type Item = (String, Vec<String>);

pub struct LibraryTable {
    list: ScrollableList<Item>,
    filter_input: FilterInput,
    /// Data rows in the last drawn window, for paging and clicks.
    window: usize,
}

impl LibraryTable {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|(_, cells): &Item, query: &str| {
                search_matches(query, &cells.join(" "))
            }),
            filter_input: FilterInput::new("/", "filter rows..."),
            window: PAGE,
        }
    }

    pub fn filter_active(&self) -> bool {
        self.filter_input.is_active()
    }

    /// Index of the selected row within the unfiltered view.
    pub fn selected_row(&self) -> Option<usize> {
        self.list.selected_index()
    }

    fn activate(&self, state: &AppState) -> Vec<Action> {
        let Some((id, _)) = self.list.selected_item() else {
            return Vec::new();
        };
        if state.view.kind.lists_tracks() {
            vec![Action::PlayFrom(id.clone())]
        } else {
            vec![Action::Open(id.clone())]
        }
    }

    fn reload(&mut self, state: &AppState, select: Option<usize>) {
        self.filter_input.clear();
        self.filter_input.deactivate();
        self.list.set_filter("");
        self.list.set_items(
            state
                .view
                .ids
                .iter()
                .cloned()
                .zip(state.view.rows.iter().cloned())
                .collect(),
        );
        if let Some(row) = select {
            self.list.select_index(row);
        }
    }
}

fn column_widths(headers: &[&str]) -> Vec<Constraint> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| match *h {
            "Year" => Constraint::Length(7),
            "Tracks" => Constraint::Length(7),
            "Duration" => Constraint::Length(9),
            _ if i == 0 => Constraint::Fill(3),
            _ => Constraint::Fill(2),
        })
        .collect()
}

fn view_title(state: &AppState) -> String {
    let lib = state.library.as_deref();
    match &state.view.kind {
        ViewKind::Album(id) => format!(
            "album · {}",
            lib.map(|l| l.album_title(Some(id.as_str()))).unwrap_or_default()
        ),
        ViewKind::Artist(id) => format!(
            "artist · {}",
            lib.map(|l| l.artist_name(Some(id.as_str()))).unwrap_or_default()
        ),
        ViewKind::Playlist(id) => format!(
            "playlist · {}",
            lib.and_then(|l| l.playlists.get(id))
                .map(|p| p.name.as_str())
                .unwrap_or_default()
        ),
        ViewKind::Search(q) if q.trim().is_empty() => "search".to_string(),
        ViewKind::Search(q) => format!("search · {}", q.trim()),
        kind => kind.label().to_string(),
    }
}

impl Component for LibraryTable {
    fn id(&self) -> ComponentId {
        ComponentId::LibraryTable
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if self.filter_input.is_active() {
            match key.code {
                KeyCode::Up => self.list.select_up(1),
                KeyCode::Down => self.list.select_down(1),
                _ => match self.filter_input.handle_key(key) {
                    FilterAction::Changed(text) => self.list.set_filter(&text),
                    FilterAction::Cancelled => {
                        self.list.set_filter("");
                        return vec![Action::CloseFilter];
                    }
                    FilterAction::Confirmed => return vec![Action::CloseFilter],
                    FilterAction::None => {}
                },
            }
            return Vec::new();
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::PageUp => self.list.select_up(self.window.max(1)),
            KeyCode::PageDown => self.list.select_down(self.window.max(1)),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter | KeyCode::Char('l') => return self.activate(state),
            KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Esc => {
                if !self.list.filter().is_empty() {
                    self.filter_input.clear();
                    self.list.set_filter("");
                } else {
                    return vec![Action::Back];
                }
            }
            KeyCode::Char('/') => self.filter_input.activate(),
            _ => {}
        }
        Vec::new()
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(3),
            MouseEventKind::ScrollDown => self.list.select_down(3),
            MouseEventKind::Down(_) => {
                // border + header row
                let top = area.y + 2;
                if event.row >= top {
                    let before = self.list.selected_index();
                    let row = (event.row - top) as usize;
                    if self.list.handle_click(row) && before == self.list.selected_index() {
                        return self.activate(state);
                    }
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::ViewChanged(select) => self.reload(state, *select),
            Action::CloseFilter => self.filter_input.deactivate(),
            _ => {}
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let title = view_title(state);
        let badge = if state.view_pending || state.loading {
            Some(Badge {
                text: "LOADING".into(),
                color: C_LOADING,
            })
        } else if self.list.filter().is_empty() {
            Some(Badge {
                text: self.list.total_len().to_string(),
                color: C_SECONDARY,
            })
        } else {
            Some(Badge {
                text: format!("{}/{}", self.list.len(), self.list.total_len()),
                color: C_SECONDARY,
            })
        };
        let block = pane_chrome(&title, Some('2'), focused, badge);
        let mut inner = block.inner(area);
        frame.render_widget(block, area);

        if self.filter_input.is_active() || !self.list.filter().is_empty() {
            let bar = Rect {
                y: inner.y + inner.height.saturating_sub(1),
                height: 1.min(inner.height),
                ..inner
            };
            self.filter_input.draw(frame, bar);
            inner.height = inner.height.saturating_sub(1);
        }

        let message = if state.library.is_none() {
            Some(if state.loading {
                "  loading library…"
            } else {
                "  no library loaded · press R to fetch it"
            })
        } else if self.list.total_len() == 0 {
            Some(match state.view.kind {
                ViewKind::Search(_) if state.search_query.trim().is_empty() => {
                    "  type in the search box to find tracks"
                }
                ViewKind::Search(_) => "  no tracks match",
                _ => "  nothing here",
            })
        } else if self.list.is_empty() {
            Some("  no rows match filter")
        } else {
            None
        };
        if let Some(message) = message {
            frame.render_widget(Paragraph::new(Span::styled(message, style_muted())), inner);
            return;
        }

        let body = inner.height.saturating_sub(1) as usize;
        self.window = body;
        self.list.ensure_visible(body);
        let selected = self.list.selected_in_view();
        let playing = state.playing_id();
        let lists_tracks = state.view.kind.lists_tracks();

        let rows: Vec<Row> = self
            .list
            .visible_items(body)
            .into_iter()
            .enumerate()
            .map(|(view_row, (_, (id, cells)))| {
                let is_playing = lists_tracks && playing == Some(id.as_str());
                let row_style = if view_row == selected {
                    style_selected(focused)
                } else {
                    style_default()
                };
                let cells = cells.iter().enumerate().map(|(i, text)| {
                    if i == 0 && is_playing {
                        Cell::from(Line::from(vec![
                            Span::styled("▶ ", style_playing()),
                            Span::raw(text.clone()),
                        ]))
                    } else {
                        Cell::from(text.clone())
                    }
                });
                let row = Row::new(cells).style(row_style);
                if is_playing && view_row != selected {
                    row.style(style_playing())
                } else {
                    row
                }
            })
            .collect();

        let headers = state.view.kind.headers();
        let table = Table::new(rows, column_widths(headers))
            .header(Row::new(headers.iter().copied()).style(style_header()))
            .column_spacing(2);
        frame.render_widget(table, inner);
    }
}
