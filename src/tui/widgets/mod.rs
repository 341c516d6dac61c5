pub mod alert;
pub mod color;
pub mod confirm_delete;
pub mod form;
pub mod help;
pub mod input;
pub mod reminder_list;
pub mod status_bar;

use ratatui::layout::{Constraint, Flex, Layout, Rect};

/// Centered rect taking the given percentage of `area`
/// Based on ratatui popup example: https://ratatui.rs/examples/apps/popup/
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

/// Cut `text` to `max_width` chars, ending in "..." when anything was dropped
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() > max_width {
        text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
