use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as display;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config, palette: &Palette) {
    let popup_area = popup_area(area, 60, 70);
    let style = Style::default().fg(palette.fg).bg(palette.bg);

    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(style),
        )
        .style(style)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let keys = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Reminders:\n");
    text.push_str(&format!(
        "  {} / {}: Navigate list up/down\n",
        display(&keys.list_up),
        display(&keys.list_down)
    ));
    text.push_str(&format!("  {}: New reminder\n", display(&keys.new)));
    text.push_str(&format!("  {}: Delete selected reminder\n", display(&keys.delete)));
    text.push_str(&format!(
        "  {}: Stop a recurring reminder\n",
        display(&keys.cancel_recurring)
    ));
    text.push('\n');

    text.push_str("New reminder form:\n");
    text.push_str("  Tab / Shift+Tab: Next/previous field\n");
    text.push_str("  Space: Toggle recurring (on the Recurring field)\n");
    text.push_str(&format!("  Enter / {}: Save\n", display(&keys.save)));
    text.push_str("  Esc: Cancel\n");
    text.push_str("  Time accepts HH:MM or YYYY-MM-DD HH:MM\n");
    text.push('\n');

    text.push_str("When a reminder fires:\n");
    text.push_str(&format!("  {}: Done\n", display(&keys.done)));
    text.push_str(&format!("  {} / Esc: Close\n", display(&keys.dismiss)));
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Toggle this help\n", display(&keys.help)));
    text.push_str(&format!("  {}: Quit\n", display(&keys.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_configured_bindings() {
        let mut config = Config::default();
        config.key_bindings.new = "a".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("a: New reminder"));
        assert!(text.contains("y: Done"));
    }
}
