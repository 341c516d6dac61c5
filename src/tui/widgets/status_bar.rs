use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;

use crate::tui::widgets::color::Palette;
use crate::tui::widgets::truncate;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&String>,
    key_hints: &[String],
    palette: &Palette,
) {
    let max_width = area.width as usize;

    let (content, style) = match message {
        // Status messages get a highlighted background for visibility
        Some(msg) => (
            truncate(msg, max_width),
            Style::default()
                .fg(palette.highlight_fg)
                .bg(palette.highlight_bg)
                .add_modifier(Modifier::BOLD),
        ),
        None => (
            fit_hints(key_hints, max_width),
            Style::default().fg(palette.fg).bg(palette.bg),
        ),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

/// Join as many hints as fit in `max_width`, marking the cut with an ellipsis
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let separator_len = SEPARATOR.chars().count();
    let ellipsis_len = ELLIPSIS.chars().count();

    let mut hints_text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let hint_len = hint.chars().count();
        let current_len = hints_text.chars().count();

        let would_be_len = if i == 0 {
            hint_len
        } else {
            current_len + separator_len + hint_len
        };

        if would_be_len > max_width {
            if i == 0 {
                return truncate(hint, max_width);
            }
            if current_len + ellipsis_len <= max_width {
                hints_text.push_str(ELLIPSIS);
            } else {
                hints_text = hints_text
                    .chars()
                    .take(max_width.saturating_sub(ellipsis_len))
                    .collect::<String>();
                hints_text.push_str(ELLIPSIS);
            }
            break;
        }

        if i > 0 {
            hints_text.push_str(SEPARATOR);
        }
        hints_text.push_str(hint);
    }

    hints_text
}
