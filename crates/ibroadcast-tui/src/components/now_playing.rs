//! NowPlaying: two-row header: current track and state, then progress and
//! library status.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ibroadcast_core::LoadSource;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    player::PlayerStatus,
    theme::{style_default, style_muted, style_secondary, C_ACCENT, C_LOADING, C_PLAYING},
    widgets::progress_bar::draw_progress,
};

pub struct NowPlaying;

fn status_span(status: PlayerStatus) -> Span<'static> {
    let (icon, color) = match status {
        PlayerStatus::Playing => ("▶", C_PLAYING),
        PlayerStatus::Paused => ("⏸", C_LOADING),
        PlayerStatus::Loading => ("…", C_LOADING),
        PlayerStatus::Stopped => ("■", C_ACCENT),
    };
    Span::styled(
        format!(" {} {} ", icon, status.label()),
        style_default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn library_summary(state: &AppState) -> String {
    let Some(library) = state.library.as_ref() else {
        return if state.loading {
            "loading library".to_string()
        } else {
            "no library".to_string()
        };
    };
    let source = match state.library_source {
        Some(LoadSource::Network) => "fresh",
        Some(LoadSource::Cache) => "cached",
        None => "",
    };
    let mut out = format!("{} tracks · {}", library.tracks.len(), source);
    if state.loading {
        out.push_str(" · refreshing");
    }
    out
}

impl Component for NowPlaying {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        let [top, bottom] = Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);
        let playback = &state.playback;

        let mut left = vec![status_span(playback.status)];
        match &playback.track {
            Some(track) => {
                left.push(Span::styled(
                    track.title.clone(),
                    style_default().add_modifier(Modifier::BOLD),
                ));
                left.push(Span::styled(format!("  {}", track.artist), style_secondary()));
            }
            None => left.push(Span::styled("nothing playing", style_muted())),
        }

        let mut right = Vec::new();
        if let Some((pos, len)) = playback.queue_position {
            right.push(Span::styled(format!("{}/{}  ", pos, len), style_muted()));
        }
        right.push(Span::styled(
            format!("vol {:>3}% ", (playback.volume * 100.0).round() as u32),
            style_secondary(),
        ));
        let right_width: u16 = right.iter().map(|s| s.width() as u16).sum();
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(right_width)]).areas(top);
        frame.render_widget(Paragraph::new(Line::from(left)), left_area);
        frame.render_widget(Paragraph::new(Line::from(right)), right_area);

        let summary = format!(" {} ", library_summary(state));
        let [progress_area, summary_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(summary.chars().count() as u16 + 1),
        ])
        .areas(bottom);
        if playback.track.is_some() {
            let inset = Rect {
                x: progress_area.x + 1,
                width: progress_area.width.saturating_sub(2),
                ..progress_area
            };
            draw_progress(frame, inset, playback.position_secs, playback.duration_secs);
        }
        frame.render_widget(
            Paragraph::new(Span::styled(summary, style_muted())).right_aligned(),
            summary_area,
        );
    }
}
