//! Thin playback progress bar with eighth-block resolution.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const EIGHTHS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// `width` cells filled to `progress` (clamped to 0..=1).
pub fn bar(progress: f64, width: usize) -> String {
    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0).round() as usize;
    let full = (eighths / 8).min(width);
    let mut out = "█".repeat(full);
    if full < width {
        out.push(EIGHTHS[eighths % 8]);
        out.push_str(&" ".repeat(width - full - 1));
    }
    out
}

/// `m:ss` or `h:mm:ss`.
pub fn clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

pub fn draw_progress(frame: &mut Frame, area: Rect, position: Option<u64>, duration: Option<u64>) {
    if area.width < 8 || area.height == 0 {
        return;
    }
    let left = clock(position.unwrap_or(0));
    let right = duration.map(clock).unwrap_or_else(|| "--:--".to_string());
    let width = (area.width as usize).saturating_sub(left.len() + right.len() + 2);
    let progress = match (position, duration) {
        (Some(p), Some(d)) if d > 0 => p as f64 / d as f64,
        _ => 0.0,
    };
    let line = Line::from(vec![
        Span::styled(left, Style::default().fg(C_SECONDARY)),
        Span::raw(" "),
        Span::styled(bar(progress, width), Style::default().fg(C_PLAYING).bg(C_MUTED)),
        Span::raw(" "),
        Span::styled(right, Style::default().fg(C_SECONDARY)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_has_exact_width() {
        for p in [0.0, 0.13, 0.5, 0.99, 1.0, 3.0] {
            assert_eq!(bar(p, 10).chars().count(), 10, "progress {}", p);
        }
        assert_eq!(bar(1.0, 4), "████");
        assert_eq!(bar(0.5, 4), "██  ");
    }

    #[test]
    fn clock_formats() {
        assert_eq!(clock(0), "0:00");
        assert_eq!(clock(200), "3:20");
        assert_eq!(clock(3725), "1:02:05");
    }
}
