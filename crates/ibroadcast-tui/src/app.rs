//! App: component-based event loop.
//!
//! - `App` owns every component and the `AppState` they read.
//! - A `tokio::mpsc` channel carries `AppMessage`s in from input, data
//!   requests and the player.
//! - Components return `Vec<Action>`; the App dispatches each one.
//! - Row, search and load requests are tagged with a `Generation`; replies
//!   that are no longer current are dropped.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ibroadcast_core::api::Session;
use ibroadcast_core::search::SearchHit;
use ibroadcast_core::token::{StoredToken, TokenStore};
use ibroadcast_core::view::{self, View, ViewKind};
use ibroadcast_core::{DataManager, Generation, LoadMode, LoadOutcome, LoadSource, RequestKind};

use crate::{
    action::{Action, ComponentId, Section},
    app_state::AppState,
    component::Component,
    components::{
        help_overlay::HelpOverlay, library_table::LibraryTable, log_panel::LogPanel,
        now_playing::NowPlaying, search_panel::SearchPanel, sidebar::Sidebar,
    },
    focus::FocusRing,
    player::{PlayerCommand, PlayerCore, PlayerEvent, QueueEntry},
    theme::C_BG,
    widgets::{
        status_bar::{self, InputMode},
        toast::{Severity, ToastManager},
    },
};

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);
const VOLUME_STEP: f32 = 0.05;
const LOG_TAIL_LINES: usize = 500;
const LOG_PANEL_HEIGHT: u16 = 10;
const SIDEBAR_WIDTH: u16 = 24;

// ── Internal event bus ────────────────────────────────────────────────────────

pub enum AppMessage {
    Event(Event),
    LibraryLoaded(Generation, Result<LoadOutcome, String>),
    RowsReady(Generation, View, Option<usize>),
    SearchReady(Generation, String, Vec<SearchHit>),
    Player(PlayerEvent),
    LogTail(Vec<String>),
}

/// Everything `main` resolves before the UI starts.
pub struct AppConfig {
    pub manager: DataManager<Session>,
    pub tokens: TokenStore,
    pub username: Option<String>,
    pub log_path: PathBuf,
    pub start_mode: LoadMode,
    pub search_limit: usize,
    pub mpv_path: Option<PathBuf>,
    pub volume: f32,
    pub show_keys_bar: bool,
}

#[derive(Default, Clone, Copy)]
struct PaneAreas {
    sidebar: Rect,
    search: Rect,
    table: Rect,
    log: Rect,
}

pub struct App {
    state: AppState,
    manager: DataManager<Session>,
    tokens: TokenStore,
    log_path: PathBuf,
    start_mode: LoadMode,
    search_limit: usize,
    mpv_path: Option<PathBuf>,

    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,
    player_tx: Option<mpsc::Sender<PlayerCommand>>,

    focus: FocusRing,
    sidebar: Sidebar,
    search_panel: SearchPanel,
    library_table: LibraryTable,
    now_playing: NowPlaying,
    help_overlay: HelpOverlay,
    log_panel: LogPanel,
    toasts: ToastManager,

    /// Views to return to with Back, with their selected row.
    nav_stack: Vec<(View, Option<usize>)>,
    search_due: Option<Instant>,
    areas: PaneAreas,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let (tx, rx) = mpsc::channel::<AppMessage>(1024);
        let state = AppState::new(config.username, config.volume, config.show_keys_bar);
        let mut focus = FocusRing::new(vec![ComponentId::Sidebar, ComponentId::LibraryTable]);
        focus.set(ComponentId::LibraryTable);
        Self {
            state,
            manager: config.manager,
            tokens: config.tokens,
            log_path: config.log_path,
            start_mode: config.start_mode,
            search_limit: config.search_limit,
            mpv_path: config.mpv_path,
            tx,
            rx: Some(rx),
            player_tx: None,
            focus,
            sidebar: Sidebar::new(),
            search_panel: SearchPanel::new(),
            library_table: LibraryTable::new(),
            now_playing: NowPlaying,
            help_overlay: HelpOverlay::new(),
            log_panel: LogPanel::new(),
            toasts: ToastManager::default(),
            nav_stack: Vec::new(),
            search_due: None,
            areas: PaneAreas::default(),
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut rx = self
            .rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("app already ran"))?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("terminal ready, size={:?}", terminal.size());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            while !event_tx.is_closed() {
                match event::poll(Duration::from_millis(250)) {
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        });

        // ── Player ────────────────────────────────────────────────────────────
        let (player_tx, player_task) = PlayerCore::spawn(
            self.manager.clone(),
            self.mpv_path.clone(),
            self.state.playback.volume,
            self.tx.clone(),
        );
        self.player_tx = Some(player_tx);

        self.start_load(self.start_mode);

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry and spinner animation.
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Search debounce.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // tui.log tail, only while the log panel is open.
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    needs_redraw |= self.handle_message(msg);
                    for _ in 0..MAX_DRAIN {
                        match rx.try_recv() {
                            Ok(msg) => needs_redraw |= self.handle_message(msg),
                            Err(_) => break,
                        }
                    }
                }

                _ = toast_tick.tick() => {
                    needs_redraw |= self.toasts.tick();
                }

                _ = ui_tick.tick() => {
                    if self.search_due.is_some_and(|due| due <= Instant::now()) {
                        self.fire_search();
                        needs_redraw = true;
                    }
                }

                _ = log_refresh.tick() => {
                    if self.state.show_logs {
                        self.reload_tui_log();
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        if tokio::time::timeout(Duration::from_secs(3), player_task)
            .await
            .is_err()
        {
            warn!("player did not stop in time");
        }
        info!("bye");
        Ok(())
    }

    // ── Message handler ───────────────────────────────────────────────────────

    /// Returns true when the screen needs a redraw.
    fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    for action in self.handle_key(key) {
                        self.dispatch(action);
                    }
                    self.sync_input_mode();
                }
                Event::Mouse(mouse) => {
                    for action in self.handle_mouse(mouse) {
                        self.dispatch(action);
                    }
                    self.sync_input_mode();
                }
                Event::Resize(_, _) => {}
                _ => return false,
            },

            AppMessage::LibraryLoaded(generation, result) => {
                if !self.manager.is_current(generation) {
                    debug!("dropping stale library load {:?}", generation);
                    return false;
                }
                self.state.loading = false;
                match result {
                    Ok(outcome) => self.on_library_loaded(outcome),
                    Err(e) => {
                        self.toasts.resolve_spinner(Severity::Error, e);
                    }
                }
            }

            AppMessage::RowsReady(generation, view, select) => {
                if !self.manager.is_current(generation) {
                    debug!("dropping stale rows for {:?}", view.kind);
                    return false;
                }
                self.state.view_pending = false;
                self.state.view = view;
                self.dispatch(Action::ViewChanged(select));
            }

            AppMessage::SearchReady(generation, query, hits) => {
                if !self.manager.is_current(generation) || self.state.section != Section::Search {
                    debug!("dropping stale search results for {:?}", query);
                    return false;
                }
                self.state.view_pending = false;
                self.state.view = view::search_view(&query, &hits);
                self.dispatch(Action::ViewChanged(None));
            }

            AppMessage::Player(PlayerEvent::State(playback)) => {
                self.state.playback = playback;
            }
            AppMessage::Player(PlayerEvent::Error(message)) => {
                self.toasts.error(message);
            }

            AppMessage::LogTail(lines) => {
                if !self.state.show_logs {
                    return false;
                }
                self.state.tui_log_lines = lines;
            }
        }
        true
    }

    fn on_library_loaded(&mut self, outcome: LoadOutcome) {
        let tracks = outcome.snapshot.tracks.len();
        self.state.library = Some(outcome.snapshot);
        self.state.library_source = Some(outcome.source);
        match (outcome.source, outcome.warning) {
            (_, Some(warning)) => self.toasts.resolve_spinner(Severity::Warning, warning),
            (LoadSource::Network, None) => self
                .toasts
                .resolve_spinner(Severity::Success, format!("library loaded: {} tracks", tracks)),
            (LoadSource::Cache, None) => self.toasts.resolve_spinner(
                Severity::Info,
                format!("library loaded from cache: {} tracks", tracks),
            ),
        }
        if outcome.report.skipped > 0 {
            self.toasts.warning(format!(
                "skipped {} malformed records",
                outcome.report.skipped
            ));
        }

        // old views point into the previous snapshot
        self.nav_stack.clear();
        if self.state.section == Section::Search {
            self.fire_search();
        } else {
            let kind = self.state.view.kind.clone();
            self.request_rows(kind, self.library_table.selected_row());
        }
    }

    // ── Data requests ─────────────────────────────────────────────────────────

    fn start_load(&mut self, mode: LoadMode) {
        let generation = self.manager.begin(RequestKind::Load);
        self.state.loading = true;
        self.toasts.spinner(match mode {
            LoadMode::PreferCache => "loading library",
            LoadMode::Refresh => "refreshing library",
        });
        info!("loading library ({:?})", mode);

        let manager = self.manager.clone();
        let tokens = self.tokens.clone();
        let username = self.state.username.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = manager.load_library(mode).await;
            if matches!(&result, Ok(o) if o.source == LoadSource::Network) {
                persist_login(&manager, tokens, username).await;
            }
            let result = result.map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::LibraryLoaded(generation, result)).await;
        });
    }

    fn request_rows(&mut self, kind: ViewKind, select: Option<usize>) {
        let Some(library) = self.state.library.clone() else {
            return;
        };
        // a pending search must not overwrite these rows
        self.manager.begin(RequestKind::Search);
        let generation = self.manager.begin(RequestKind::Rows);
        self.state.view_pending = true;

        let manager = self.manager.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let view = manager.rows(kind, library).await;
            let _ = tx.send(AppMessage::RowsReady(generation, view, select)).await;
        });
    }

    fn fire_search(&mut self) {
        self.search_due = None;
        let Some(library) = self.state.library.clone() else {
            return;
        };
        self.manager.begin(RequestKind::Rows);
        let generation = self.manager.begin(RequestKind::Search);
        self.state.view_pending = true;

        let query = self.state.search_query.clone();
        let limit = self.search_limit;
        let manager = self.manager.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let hits = manager.search(library, query.clone(), limit).await;
            let _ = tx
                .send(AppMessage::SearchReady(generation, query, hits))
                .await;
        });
    }

    fn send_player(&self, cmd: PlayerCommand) {
        if let Some(tx) = &self.player_tx {
            if let Err(e) = tx.try_send(cmd) {
                warn!("player command dropped: {}", e);
            }
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let normal = self.state.input_mode == InputMode::Normal;

        // Global keys
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return vec![Action::Quit];
            }
            KeyCode::Char('q') if normal && !self.help_overlay.is_visible() => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') if normal => return vec![Action::ToggleHelp],
            KeyCode::Char('L') if normal => return vec![Action::ToggleLogs],
            _ => {}
        }

        if self.help_overlay.is_visible() {
            return self.help_overlay.handle_key(key, &self.state);
        }

        // Tab cycles focus from any mode, closing an open filter first
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                let step = if key.code == KeyCode::Tab {
                    Action::FocusNext
                } else {
                    Action::FocusPrev
                };
                if self.state.input_mode == InputMode::Filter {
                    return vec![Action::CloseFilter, step];
                }
                return vec![step];
            }
            _ => {}
        }

        if normal {
            match key.code {
                KeyCode::Char(' ') => return vec![Action::TogglePause],
                KeyCode::Char('n') => return vec![Action::Next],
                KeyCode::Char('p') => return vec![Action::Prev],
                KeyCode::Char('s') => return vec![Action::Stop],
                KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                    return vec![Action::VolumeStep(VOLUME_STEP)];
                }
                KeyCode::Left | KeyCode::Char('-') => {
                    return vec![Action::VolumeStep(-VOLUME_STEP)];
                }
                KeyCode::Char('R') => return vec![Action::Refresh],
                KeyCode::Char('K') => return vec![Action::ToggleKeys],
                KeyCode::Char('1') => return vec![Action::FocusPane(ComponentId::Sidebar)],
                KeyCode::Char('2') => return vec![Action::FocusPane(ComponentId::LibraryTable)],
                KeyCode::Char('3') => return vec![Action::FocusPane(ComponentId::SearchPanel)],
                _ => {}
            }
        }

        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::Sidebar) => self.sidebar.handle_key(key, s),
            Some(ComponentId::SearchPanel) => self.search_panel.handle_key(key, s),
            Some(ComponentId::LibraryTable) => self.library_table.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            _ => Vec::new(),
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let relevant = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !relevant {
            return Vec::new();
        }
        if self.help_overlay.is_visible() {
            return vec![Action::ToggleHelp];
        }

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.areas;
        let (col, row) = (event.column, event.row);
        let s = &self.state;

        macro_rules! click_pane {
            ($component:expr, $area:expr) => {{
                let id = $component.id();
                let mut actions = $component.handle_mouse(event, $area, s);
                if !self.focus.is_focused(id) {
                    actions.insert(0, Action::FocusPane(id));
                }
                return actions;
            }};
        }

        if hit(areas.sidebar, col, row) {
            click_pane!(self.sidebar, areas.sidebar);
        }
        if hit(areas.search, col, row) {
            click_pane!(self.search_panel, areas.search);
        }
        if hit(areas.table, col, row) {
            click_pane!(self.library_table, areas.table);
        }
        if hit(areas.log, col, row) {
            click_pane!(self.log_panel, areas.log);
        }
        Vec::new()
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    fn dispatch(&mut self, action: Action) {
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.sidebar.on_action(&action, s));
            out.extend(self.search_panel.on_action(&action, s));
            out.extend(self.library_table.on_action(&action, s));
            out.extend(self.now_playing.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out.extend(self.log_panel.on_action(&action, s));
            out
        };

        self.apply_action(action);

        // one level deep only
        for a in secondary {
            self.apply_action(a);
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            // ── Playback ─────────────────────────────────────────────────────
            Action::PlayFrom(id) => {
                let view = &self.state.view;
                if !view.kind.lists_tracks() {
                    return;
                }
                let Some(start) = view.ids.iter().position(|x| *x == id) else {
                    return;
                };
                let entries = view
                    .ids
                    .iter()
                    .zip(&view.rows)
                    .map(|(id, row)| QueueEntry {
                        id: id.clone(),
                        title: row.first().cloned().unwrap_or_default(),
                        artist: row.get(1).cloned().unwrap_or_default(),
                    })
                    .collect();
                self.send_player(PlayerCommand::PlayQueue { entries, start });
            }
            Action::TogglePause => self.send_player(PlayerCommand::TogglePause),
            Action::Next => self.send_player(PlayerCommand::Next),
            Action::Prev => self.send_player(PlayerCommand::Prev),
            Action::Stop => self.send_player(PlayerCommand::Stop),
            Action::VolumeStep(delta) => {
                let volume = (self.state.playback.volume + delta).clamp(0.0, 1.0);
                self.state.playback.volume = volume;
                self.send_player(PlayerCommand::SetVolume(volume));
            }

            // ── Navigation ───────────────────────────────────────────────────
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => {
                if id == ComponentId::SearchPanel && self.state.section != Section::Search {
                    self.show_section(Section::Search);
                }
                self.focus.set(id);
            }
            Action::ShowSection(section) => self.show_section(section),
            Action::Open(id) => {
                let kind = match self.state.view.kind {
                    ViewKind::Albums => ViewKind::Album(id),
                    ViewKind::Artists => ViewKind::Artist(id),
                    ViewKind::Playlists => ViewKind::Playlist(id),
                    _ => return,
                };
                self.nav_stack
                    .push((self.state.view.clone(), self.library_table.selected_row()));
                self.request_rows(kind, None);
            }
            Action::Back => {
                if let Some((view, select)) = self.nav_stack.pop() {
                    // supersede anything still loading for the view we leave
                    self.manager.begin(RequestKind::Rows);
                    self.state.view_pending = false;
                    self.state.view = view;
                    self.dispatch(Action::ViewChanged(select));
                } else if self.state.section != Section::Search {
                    let root = section_view(self.state.section, &self.state.search_query);
                    if root != self.state.view.kind {
                        self.request_rows(root, None);
                    }
                }
            }

            // ── Library ──────────────────────────────────────────────────────
            Action::Refresh => {
                if self.state.loading {
                    self.toasts.info("library load already running");
                } else {
                    self.start_load(LoadMode::Refresh);
                }
            }
            Action::ViewChanged(_) => {}

            // ── Filter / search ──────────────────────────────────────────────
            Action::CloseFilter => {}
            Action::SearchQuery(query) => {
                self.state.search_query = query;
                self.search_due = Some(Instant::now() + SEARCH_DEBOUNCE);
            }

            // ── UI ───────────────────────────────────────────────────────────
            Action::ToggleHelp => {}
            Action::ToggleLogs => {
                self.state.show_logs = !self.state.show_logs;
                if self.state.show_logs {
                    self.reload_tui_log();
                }
                self.sync_focus_items();
            }
            Action::ToggleKeys => {
                self.state.show_keys_bar = !self.state.show_keys_bar;
            }
            Action::Quit => {
                self.send_player(PlayerCommand::Shutdown);
                self.should_quit = true;
            }
        }
    }

    fn show_section(&mut self, section: Section) {
        self.state.section = section;
        self.nav_stack.clear();
        self.sync_focus_items();
        if section == Section::Search {
            self.fire_search();
        } else {
            self.request_rows(section_view(section, ""), None);
        }
    }

    fn sync_focus_items(&mut self) {
        let mut items = vec![ComponentId::Sidebar];
        if self.state.section == Section::Search {
            items.push(ComponentId::SearchPanel);
        }
        items.push(ComponentId::LibraryTable);
        if self.state.show_logs {
            items.push(ComponentId::LogPanel);
        }
        self.focus.set_items(items);
    }

    fn sync_input_mode(&mut self) {
        self.state.input_mode = if self.library_table.filter_active() {
            InputMode::Filter
        } else if self.focus.is_focused(ComponentId::SearchPanel) {
            InputMode::Search
        } else {
            InputMode::Normal
        };
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let log_height = if self.state.show_logs { LOG_PANEL_HEIGHT } else { 0 };
        let keys_height = u16::from(self.state.show_keys_bar);
        let [header, body, log, keys] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(log_height),
            Constraint::Length(keys_height),
        ])
        .areas(area);

        let [sidebar, main] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                .areas(body);
        let (search, table) = if self.state.section == Section::Search {
            let [search, table] =
                Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(main);
            (search, table)
        } else {
            (Rect::default(), main)
        };

        let s = &self.state;
        self.now_playing.draw(frame, header, false, s);
        self.sidebar
            .draw(frame, sidebar, self.focus.is_focused(ComponentId::Sidebar), s);
        if search.height > 0 {
            self.search_panel.draw(
                frame,
                search,
                self.focus.is_focused(ComponentId::SearchPanel),
                s,
            );
        }
        self.library_table.draw(
            frame,
            table,
            self.focus.is_focused(ComponentId::LibraryTable),
            s,
        );
        if log.height > 0 {
            self.log_panel
                .draw(frame, log, self.focus.is_focused(ComponentId::LogPanel), s);
        }
        if keys.height > 0 {
            status_bar::draw_keys_bar(frame, keys, s.input_mode);
        }

        self.help_overlay.draw(frame, area, true, s);
        self.toasts.draw(frame, area);

        self.areas = PaneAreas {
            sidebar,
            search,
            table,
            log,
        };
    }

    /// Read the tail of tui.log off the UI task; it arrives as `LogTail`.
    fn reload_tui_log(&self) {
        let path = self.log_path.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Some(lines) = read_log_tail(path, LOG_TAIL_LINES).await {
                let _ = tx.send(AppMessage::LogTail(lines)).await;
            }
        });
    }
}

/// Last `max` lines of the file at `path`, read on a blocking thread.
async fn read_log_tail(path: PathBuf, max: usize) -> Option<Vec<String>> {
    let read = tokio::task::spawn_blocking(move || {
        std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {:?}: {}", path, e))
    })
    .await;
    match read {
        Ok(Ok(content)) => Some(tail_lines(&content, max)),
        Ok(Err(e)) => {
            debug!("{}", e);
            None
        }
        Err(e) => {
            debug!("log read task failed: {}", e);
            None
        }
    }
}

fn tail_lines(content: &str, max: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Top-level view for a sidebar section.
fn section_view(section: Section, query: &str) -> ViewKind {
    match section {
        Section::Albums => ViewKind::Albums,
        Section::Artists => ViewKind::Artists,
        Section::Tracks => ViewKind::Tracks,
        Section::Playlists => ViewKind::Playlists,
        Section::Search => ViewKind::Search(query.to_string()),
    }
}

/// Store the session's login if it differs from what is on disk.
async fn persist_login(manager: &DataManager<Session>, tokens: TokenStore, username: Option<String>) {
    let (Some(username), Some(login)) = (username, manager.source().current_login().await) else {
        return;
    };
    let saved = tokio::task::spawn_blocking(move || {
        if tokens.load(&username).map(|t| t.login()) == Some(login.clone()) {
            return Ok(());
        }
        tokens.save(&StoredToken::new(&username, &login, None))
    })
    .await;
    match saved {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("could not save login token: {}", e),
        Err(e) => warn!("token save task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_the_last_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), vec!["b", "c"]);
        assert_eq!(tail_lines("a\nb", 10), vec!["a", "b"]);
        assert!(tail_lines("", 5).is_empty());
    }

    #[tokio::test]
    async fn log_tail_is_read_off_the_ui_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tui.log");
        let content: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(&path, content).unwrap();

        let lines = read_log_tail(path, 3).await.unwrap();
        assert_eq!(lines, vec!["line 17", "line 18", "line 19"]);
        assert!(read_log_tail(dir.path().join("missing.log"), 3).await.is_none());
    }
}
