//! Transient notifications in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

const MAX_VISIBLE: usize = 4;
const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn icon(self) -> &'static str {
        match self {
            Severity::Info => "·",
            Severity::Success => "✓",
            Severity::Warning => "!",
            Severity::Error => "✗",
        }
    }

    fn style(self) -> Style {
        let color = match self {
            Severity::Info => C_TOAST_INFO,
            Severity::Success => C_TOAST_SUCCESS,
            Severity::Warning => C_TOAST_WARNING,
            Severity::Error => C_TOAST_ERROR,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn lifetime(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(5),
            Severity::Error => Duration::from_secs(6),
        }
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

/// Toast queue plus at most one spinner that stays until resolved.
#[derive(Default)]
pub struct ToastManager {
    toasts: VecDeque<Toast>,
    spinner: Option<(String, usize)>,
}

impl ToastManager {
    pub fn push(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        self.toasts.retain(|t| t.message != message);
        self.toasts.push_back(Toast {
            message,
            severity,
            expires: Instant::now() + severity.lifetime(),
        });
        while self.toasts.len() > MAX_VISIBLE * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Success);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Error);
    }

    pub fn spinner(&mut self, message: impl Into<String>) {
        self.spinner = Some((message.into(), 0));
    }

    /// Replace the spinner with an ordinary toast.
    pub fn resolve_spinner(&mut self, severity: Severity, message: impl Into<String>) {
        self.spinner = None;
        self.push(message, severity);
    }

    /// Expire old toasts and animate the spinner. Returns true when anything
    /// on screen changed.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires > now);
        if let Some((_, frame)) = self.spinner.as_mut() {
            *frame = (*frame + 1) % SPINNER_FRAMES.len();
            return true;
        }
        before != self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty() && self.spinner.is_none()
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() || area.height < 2 {
            return;
        }
        let max_width = (area.width / 2).clamp(30, 64).min(area.width);
        let mut lines: Vec<(String, Style)> = Vec::new();
        if let Some((message, i)) = &self.spinner {
            lines.push((
                format!(" {} {} ", SPINNER_FRAMES[*i], message),
                Severity::Info.style(),
            ));
        }
        for toast in self.toasts.iter().rev().take(MAX_VISIBLE) {
            lines.push((
                format!(" {} {} ", toast.severity.icon(), toast.message),
                toast.severity.style(),
            ));
        }

        let bottom = area.y + area.height;
        for (row, (text, style)) in lines.into_iter().enumerate() {
            let y = area.y + 1 + row as u16;
            if y >= bottom {
                break;
            }
            let width = (text.width() as u16).min(max_width);
            let rect = Rect {
                x: area.x + area.width.saturating_sub(width + 1),
                y,
                width,
                height: 1,
            };
            frame.render_widget(Clear, rect);
            frame.render_widget(Paragraph::new(Line::from(Span::styled(text, style))), rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let mut t = ToastManager::default();
        t.info("hello");
        t.info("hello");
        assert_eq!(t.toasts.len(), 1);
    }

    #[test]
    fn queue_is_capped() {
        let mut t = ToastManager::default();
        for i in 0..20 {
            t.error(format!("e{}", i));
        }
        assert_eq!(t.toasts.len(), MAX_VISIBLE * 2);
        assert_eq!(t.toasts.back().map(|x| x.message.as_str()), Some("e19"));
    }

    #[test]
    fn spinner_resolves_into_toast() {
        let mut t = ToastManager::default();
        t.spinner("loading");
        assert!(t.tick());
        t.resolve_spinner(Severity::Success, "done");
        assert!(t.spinner.is_none());
        assert!(!t.is_empty());
    }
}
