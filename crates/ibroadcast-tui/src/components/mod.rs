pub mod help_overlay;
pub mod library_table;
pub mod log_panel;
pub mod now_playing;
pub mod search_panel;
pub mod sidebar;
