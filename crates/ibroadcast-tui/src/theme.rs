//! Colour palette and shared styles.

use ratatui::style::{Color, Modifier, Style};

// ── Palette ───────────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(16, 17, 22);
pub const C_ACCENT: Color = Color::Rgb(236, 104, 72);
pub const C_PLAYING: Color = Color::Rgb(96, 196, 132);
pub const C_LOADING: Color = Color::Rgb(242, 182, 84);
pub const C_MUTED: Color = Color::Rgb(74, 76, 92);
pub const C_SECONDARY: Color = Color::Rgb(120, 122, 142);
pub const C_PRIMARY: Color = Color::Rgb(214, 214, 226);
pub const C_HEADER: Color = Color::Rgb(150, 140, 220);
pub const C_SELECTION_BG: Color = Color::Rgb(30, 32, 44);
pub const C_PANEL_BORDER: Color = Color::Rgb(42, 44, 56);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(236, 104, 72);
pub const C_NUMBER_HINT: Color = Color::Rgb(92, 94, 116);
pub const C_FILTER_BG: Color = Color::Rgb(22, 24, 34);
pub const C_FILTER_FG: Color = Color::Rgb(255, 204, 96);
pub const C_TOAST_INFO: Color = Color::Rgb(96, 164, 224);
pub const C_TOAST_SUCCESS: Color = Color::Rgb(96, 196, 132);
pub const C_TOAST_WARNING: Color = Color::Rgb(242, 182, 84);
pub const C_TOAST_ERROR: Color = Color::Rgb(236, 88, 88);
pub const C_MODE_NORMAL: Color = Color::Rgb(120, 122, 142);
pub const C_MODE_FILTER: Color = Color::Rgb(255, 204, 96);
pub const C_MODE_SEARCH: Color = Color::Rgb(96, 164, 224);

// ── Styles ────────────────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_header() -> Style {
    Style::default().fg(C_HEADER).add_modifier(Modifier::BOLD)
}

pub fn style_playing() -> Style {
    Style::default().fg(C_PLAYING)
}

pub fn style_selected(focused: bool) -> Style {
    let style = Style::default().bg(C_SELECTION_BG).fg(C_PRIMARY);
    if focused {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

pub fn style_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(C_PANEL_BORDER_FOCUSED)
    } else {
        Style::default().fg(C_PANEL_BORDER)
    }
}
