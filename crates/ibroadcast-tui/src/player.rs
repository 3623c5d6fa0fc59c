//! Playback: a queue of tracks driven through mpv.
//!
//! `PlayerCore` runs as its own task. The app sends it `PlayerCommand`s and
//! receives `PlayerEvent`s on the app bus; mpv events come back through a
//! channel that outlives any single mpv connection.

use ibroadcast_core::api::Session;
use ibroadcast_core::DataManager;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::AppMessage;
use crate::mpv::{MpvDriver, MpvEvent, MpvHandle, OBS_DURATION, OBS_IDLE, OBS_PAUSE, OBS_TIME_POS};

const HEARTBEAT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
}

/// Ordered tracks plus a cursor. Pure state, no I/O.
#[derive(Debug, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,
    current: Option<usize>,
}

impl Queue {
    /// Replace the queue and point at `start`, clamped to the last entry.
    pub fn replace(&mut self, entries: Vec<QueueEntry>, start: usize) -> Option<&QueueEntry> {
        self.current = (!entries.is_empty()).then(|| start.min(entries.len() - 1));
        self.entries = entries;
        self.current()
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.entries.get(self.current?)
    }

    /// Move to the next entry. Running off the end leaves the queue idle.
    pub fn advance(&mut self) -> Option<&QueueEntry> {
        let next = self.current? + 1;
        self.current = (next < self.entries.len()).then_some(next);
        self.current()
    }

    /// Move to the previous entry; the first entry stays put.
    pub fn back(&mut self) -> Option<&QueueEntry> {
        let cur = self.current?;
        self.current = Some(cur.saturating_sub(1));
        self.current()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    /// 1-based position and length, for display.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current.map(|i| (i + 1, self.entries.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
}

impl PlayerStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlayerStatus::Stopped => "stopped",
            PlayerStatus::Loading => "loading",
            PlayerStatus::Playing => "playing",
            PlayerStatus::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    pub status: PlayerStatus,
    pub track: Option<QueueEntry>,
    pub position_secs: Option<u64>,
    pub duration_secs: Option<u64>,
    pub volume: f32,
    pub queue_position: Option<(usize, usize)>,
}

#[derive(Debug)]
pub enum PlayerCommand {
    PlayQueue { entries: Vec<QueueEntry>, start: usize },
    TogglePause,
    Next,
    Prev,
    SetVolume(f32),
    Stop,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    State(PlaybackState),
    Error(String),
}

pub struct PlayerCore {
    manager: DataManager<Session>,
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    mpv_tx: mpsc::Sender<MpvEvent>,
    mpv_rx: mpsc::Receiver<MpvEvent>,
    app_tx: mpsc::Sender<AppMessage>,
    queue: Queue,
    state: PlaybackState,
}

impl PlayerCore {
    /// Start the player task; returns its command sender and join handle.
    pub fn spawn(
        manager: DataManager<Session>,
        mpv_path: Option<PathBuf>,
        volume: f32,
        app_tx: mpsc::Sender<AppMessage>,
    ) -> (mpsc::Sender<PlayerCommand>, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (mpv_tx, mpv_rx) = mpsc::channel(256);
        let volume = volume.clamp(0.0, 1.0);
        let core = Self {
            manager,
            driver: MpvDriver::new(mpv_path, volume),
            handle: None,
            mpv_tx,
            mpv_rx,
            app_tx,
            queue: Queue::default(),
            state: PlaybackState {
                volume,
                ..PlaybackState::default()
            },
        };
        let task = tokio::spawn(core.run(cmd_rx));
        (cmd_tx, task)
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<PlayerCommand>) {
        let mut heartbeat = tokio::time::interval(HEARTBEAT);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(PlayerCommand::Shutdown) => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                Some(ev) = self.mpv_rx.recv() => self.handle_mpv_event(ev).await,
                _ = heartbeat.tick() => {
                    if self.handle.is_some() && !self.driver.process_alive() {
                        warn!("player: mpv went away");
                        self.handle = None;
                        if self.state.status != PlayerStatus::Stopped {
                            self.state.status = PlayerStatus::Stopped;
                            self.publish().await;
                            self.report_error("mpv exited unexpectedly").await;
                        }
                    }
                }
            }
        }
        if let Some(handle) = self.handle.take() {
            handle.quit().await;
        }
        self.driver.kill().await;
        info!("player: shut down");
    }

    async fn handle_command(&mut self, cmd: PlayerCommand) {
        debug!("player: {:?}", cmd);
        match cmd {
            PlayerCommand::PlayQueue { entries, start } => {
                let first = self.queue.replace(entries, start).cloned();
                self.play(first).await;
            }
            PlayerCommand::Next => {
                let next = self.queue.advance().cloned();
                self.play(next).await;
            }
            PlayerCommand::Prev => {
                let prev = self.queue.back().cloned();
                self.play(prev).await;
            }
            PlayerCommand::TogglePause => {
                let paused = match self.state.status {
                    PlayerStatus::Playing => true,
                    PlayerStatus::Paused => false,
                    _ => return,
                };
                if let Some(handle) = &self.handle {
                    if let Err(e) = handle.set_pause(paused).await {
                        warn!("player: pause failed: {}", e);
                    }
                }
            }
            PlayerCommand::SetVolume(volume) => {
                let volume = volume.clamp(0.0, 1.0);
                self.state.volume = volume;
                self.driver.last_volume = volume;
                if let Some(handle) = &self.handle {
                    if let Err(e) = handle.set_volume(volume).await {
                        warn!("player: volume failed: {}", e);
                    }
                }
                self.publish().await;
            }
            PlayerCommand::Stop => {
                self.queue.clear();
                self.play(None).await;
            }
            PlayerCommand::Shutdown => {}
        }
    }

    /// Load `entry`, or stop when there is nothing to play.
    async fn play(&mut self, entry: Option<QueueEntry>) {
        let Some(entry) = entry else {
            if let Some(handle) = &self.handle {
                let _ = handle.stop().await;
            }
            self.state = PlaybackState {
                volume: self.state.volume,
                ..PlaybackState::default()
            };
            self.publish().await;
            return;
        };

        self.state.status = PlayerStatus::Loading;
        self.state.track = Some(entry.clone());
        self.state.position_secs = None;
        self.state.duration_secs = None;
        self.state.queue_position = self.queue.position();
        self.publish().await;

        let url = match self.manager.source().stream_url(&entry.id, None).await {
            Ok(url) => url,
            Err(e) => {
                self.state.status = PlayerStatus::Stopped;
                self.publish().await;
                self.report_error(&format!("cannot stream {}: {}", entry.title, e)).await;
                return;
            }
        };
        let handle = match self.ensure_handle().await {
            Ok(h) => h,
            Err(e) => {
                self.state.status = PlayerStatus::Stopped;
                self.publish().await;
                self.report_error(&e.to_string()).await;
                return;
            }
        };
        info!("player: playing {} ({})", entry.title, entry.id);
        if let Err(e) = handle.load_track(&url, self.state.volume).await {
            self.state.status = PlayerStatus::Stopped;
            self.publish().await;
            self.report_error(&format!("mpv refused track: {}", e)).await;
        }
    }

    async fn ensure_handle(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(handle) = &self.handle {
            if self.driver.process_alive() {
                return Ok(handle.clone());
            }
        }
        self.handle = None;
        let handle = self.driver.spawn_and_connect(self.mpv_tx.clone()).await?;
        handle.observe_properties().await;
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    async fn handle_mpv_event(&mut self, ev: MpvEvent) {
        if let Some((id, data)) = ev.as_property_change() {
            let changed = self.apply_property(id, data);
            if changed {
                self.publish().await;
            }
            return;
        }
        match ev.event_name() {
            Some("file-loaded") => {
                self.state.status = PlayerStatus::Playing;
                self.publish().await;
            }
            Some("end-file") => match ev.end_reason() {
                Some("eof") => {
                    let next = self.queue.advance().cloned();
                    self.play(next).await;
                }
                Some("error") => {
                    let title = self
                        .state
                        .track
                        .as_ref()
                        .map(|t| t.title.clone())
                        .unwrap_or_default();
                    self.report_error(&format!("playback failed: {}", title)).await;
                    let next = self.queue.advance().cloned();
                    self.play(next).await;
                }
                // "stop" comes from our own loadfile/stop
                _ => {}
            },
            _ => {}
        }
    }

    /// Returns true when the visible state changed.
    fn apply_property(&mut self, id: u64, data: &Value) -> bool {
        match id {
            OBS_PAUSE => {
                let paused = data.as_bool().unwrap_or(false);
                let next = match (self.state.status, paused) {
                    (PlayerStatus::Playing, true) => PlayerStatus::Paused,
                    (PlayerStatus::Paused, false) => PlayerStatus::Playing,
                    (status, _) => status,
                };
                let changed = next != self.state.status;
                self.state.status = next;
                changed
            }
            OBS_TIME_POS => {
                // whole seconds only, mpv reports far more often than we redraw
                let secs = data.as_f64().map(|s| s.max(0.0) as u64);
                let changed = secs != self.state.position_secs;
                self.state.position_secs = secs;
                changed
            }
            OBS_DURATION => {
                let secs = data.as_f64().map(|s| s.max(0.0).round() as u64);
                let changed = secs != self.state.duration_secs;
                self.state.duration_secs = secs;
                changed
            }
            OBS_IDLE => {
                if data.as_bool() == Some(true)
                    && self.queue.current().is_none()
                    && self.state.status != PlayerStatus::Stopped
                {
                    self.state.status = PlayerStatus::Stopped;
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    async fn publish(&self) {
        let _ = self
            .app_tx
            .send(AppMessage::Player(PlayerEvent::State(self.state.clone())))
            .await;
    }

    async fn report_error(&self, message: &str) {
        warn!("player: {}", message);
        let _ = self
            .app_tx
            .send(AppMessage::Player(PlayerEvent::Error(message.to_string())))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<QueueEntry> {
        (0..n)
            .map(|i| QueueEntry {
                id: i.to_string(),
                title: format!("Track {}", i),
                artist: "Artist".into(),
            })
            .collect()
    }

    #[test]
    fn replace_starts_at_requested_track() {
        let mut q = Queue::default();
        assert_eq!(q.replace(entries(3), 1).map(|e| e.id.as_str()), Some("1"));
        assert_eq!(q.position(), Some((2, 3)));
    }

    #[test]
    fn start_past_the_end_is_clamped() {
        let mut q = Queue::default();
        assert_eq!(q.replace(entries(3), 9).map(|e| e.id.as_str()), Some("2"));
        assert!(q.replace(Vec::new(), 0).is_none());
        assert_eq!(q.position(), None);
    }

    #[test]
    fn advance_runs_off_the_end() {
        let mut q = Queue::default();
        q.replace(entries(2), 0);
        assert_eq!(q.advance().map(|e| e.id.as_str()), Some("1"));
        assert!(q.advance().is_none());
        assert!(q.current().is_none());
        assert!(q.advance().is_none());
    }

    #[test]
    fn back_stops_at_first() {
        let mut q = Queue::default();
        q.replace(entries(3), 1);
        assert_eq!(q.back().map(|e| e.id.as_str()), Some("0"));
        assert_eq!(q.back().map(|e| e.id.as_str()), Some("0"));
    }

    #[test]
    fn clear_empties() {
        let mut q = Queue::default();
        q.replace(entries(2), 0);
        q.clear();
        assert!(q.current().is_none());
        assert!(q.back().is_none());
    }
}
