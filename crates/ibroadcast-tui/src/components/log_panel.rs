//! LogPanel: tail of `tui.log`, toggled with `L`.

use ratatui::crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, C_LOADING, C_TOAST_ERROR},
    widgets::pane_chrome::pane_chrome,
};

pub struct LogPanel {
    /// First visible line; `usize::MAX` pins to the bottom.
    scroll: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self { scroll: usize::MAX }
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = usize::MAX,
            _ => {}
        }
        Vec::new()
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
        Vec::new()
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::ToggleLogs = action {
            self.scroll = usize::MAX;
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);
        let block = pane_chrome("log", None, focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = &state.tui_log_lines;
        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no log entries yet", style_muted())),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let max_scroll = logs.len().saturating_sub(height);
        self.scroll = self.scroll.min(max_scroll);

        let lines: Vec<Line> = logs
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|raw| {
                let line = compact_log_line(raw);
                let style = if line.contains(" ERROR ") {
                    style_secondary().fg(C_TOAST_ERROR)
                } else if line.contains(" WARN ") {
                    style_secondary().fg(C_LOADING)
                } else {
                    style_muted()
                };
                Line::from(Span::styled(format!(" {}", line), style))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

// ── Log line formatting ───────────────────────────────────────────────────────

/// `2026-01-02T03:04:05.123Z  INFO ibroadcast_core::manager: msg`
/// becomes `03:04:05 INFO msg` (local time).
pub fn compact_log_line(raw: &str) -> String {
    let clean = strip_ansi(raw);
    let mut rest = clean.trim();
    let mut head: Vec<String> = Vec::new();

    if let Some((tok, rem)) = split_first_token(rest) {
        if let Some(ts) = compact_timestamp(tok) {
            head.push(ts);
            rest = rem.trim_start();
        }
    }
    if let Some((tok, rem)) = split_first_token(rest) {
        if matches!(tok, "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR") {
            head.push(tok.to_string());
            rest = rem.trim_start();
        }
    }
    // module path target
    if let Some((target, msg)) = rest.split_once(": ") {
        if !target.is_empty()
            && target.len() <= 48
            && target
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':'))
        {
            rest = msg.trim_start();
        }
    }

    match (head.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => head.join(" "),
        (false, false) => format!("{} {}", head.join(" "), rest),
    }
}

fn compact_timestamp(token: &str) -> Option<String> {
    let local = chrono::DateTime::parse_from_rfc3339(token)
        .ok()?
        .with_timezone(&chrono::Local);
    let fmt = if local.date_naive() == chrono::Local::now().date_naive() {
        "%H:%M:%S"
    } else {
        "%m-%d %H:%M"
    };
    Some(local.format(fmt).to_string())
}

fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let (first, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
    (!first.is_empty()).then_some((first, rest))
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ('@'..='~').contains(&ch) && ch != '[' {
                in_escape = false;
            }
        } else if ch == '\u{1b}' {
            in_escape = true;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_dropped_and_level_kept() {
        let line = compact_log_line("WARN ibroadcast_core::manager: library fetch failed");
        assert_eq!(line, "WARN library fetch failed");
    }

    #[test]
    fn timestamp_is_shortened() {
        let line = compact_log_line("2020-01-02T03:04:05.000Z  INFO ibroadcast_tui::app: hi");
        assert!(line.ends_with("INFO hi"), "{}", line);
        assert!(!line.contains("2020-01-02T"));
    }

    #[test]
    fn ansi_codes_are_stripped() {
        assert_eq!(strip_ansi("\u{1b}[2mdim\u{1b}[0m text"), "dim text");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(compact_log_line("  just words  "), "just words");
        assert_eq!(compact_log_line(""), "");
    }
}
