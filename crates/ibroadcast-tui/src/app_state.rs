//! AppState: shared read-only data handed to every component.
//!
//! Only the App event loop writes to it.

use std::sync::Arc;

use ibroadcast_core::view::{View, ViewKind};
use ibroadcast_core::{LibrarySnapshot, LoadSource};

use crate::action::Section;
use crate::player::PlaybackState;
use crate::widgets::status_bar::InputMode;

pub struct AppState {
    pub library: Option<Arc<LibrarySnapshot>>,
    pub library_source: Option<LoadSource>,
    /// A library load is in flight.
    pub loading: bool,
    pub section: Section,
    /// Rows currently shown in the library table.
    pub view: View,
    /// A row or search request is in flight.
    pub view_pending: bool,
    pub search_query: String,
    pub playback: PlaybackState,
    pub input_mode: InputMode,
    pub show_logs: bool,
    pub show_keys_bar: bool,
    pub tui_log_lines: Vec<String>,
    pub username: Option<String>,
}

impl AppState {
    pub fn new(username: Option<String>, volume: f32, show_keys_bar: bool) -> Self {
        Self {
            library: None,
            library_source: None,
            loading: false,
            section: Section::Albums,
            view: View::empty(ViewKind::Albums),
            view_pending: false,
            search_query: String::new(),
            playback: PlaybackState {
                volume,
                ..PlaybackState::default()
            },
            input_mode: InputMode::Normal,
            show_logs: false,
            show_keys_bar,
            tui_log_lines: Vec::new(),
            username,
        }
    }

    /// Id of the track mpv is on, if any.
    pub fn playing_id(&self) -> Option<&str> {
        self.playback.track.as_ref().map(|t| t.id.as_str())
    }
}

/// Whether every whitespace-separated word of `query` occurs in `text`,
/// ignoring case.
pub fn search_matches(query: &str, text: &str) -> bool {
    let text = text.to_lowercase();
    query
        .split_whitespace()
        .all(|word| text.contains(&word.to_lowercase()))
}
