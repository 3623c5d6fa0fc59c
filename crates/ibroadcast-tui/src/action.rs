//! Action enum: all user-initiated intents and internal events.

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    NowPlaying,
    Sidebar,
    SearchPanel,
    LibraryTable,
    LogPanel,
    HelpOverlay,
}

/// Top-level library sections shown in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Albums,
    Artists,
    Tracks,
    Playlists,
    Search,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Albums,
        Section::Artists,
        Section::Tracks,
        Section::Playlists,
        Section::Search,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Albums => "Albums",
            Section::Artists => "Artists",
            Section::Tracks => "Tracks",
            Section::Playlists => "Playlists",
            Section::Search => "Search",
        }
    }
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    /// Play the current view's tracks starting at this id.
    PlayFrom(String),
    TogglePause,
    Next,
    Prev,
    VolumeStep(f32),
    Stop,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    ShowSection(Section),
    /// Drill into an album, artist or playlist.
    Open(String),
    Back,

    // ── Library ──────────────────────────────────────────────────────────────
    Refresh,
    /// `state.view` was replaced; select this row if given.
    ViewChanged(Option<usize>),

    // ── Filter/search ────────────────────────────────────────────────────────
    CloseFilter,
    SearchQuery(String),

    // ── UI ───────────────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleLogs,
    ToggleKeys,
    Quit,
}
