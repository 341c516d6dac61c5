use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::models::Reminder;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::popup_area;

pub const DELETE_OPTIONS: [&str; 2] = ["Delete", "Cancel"];

pub fn render_confirm_delete(
    f: &mut Frame,
    area: Rect,
    reminder: &Reminder,
    selection: usize,
    palette: &Palette,
) {
    let popup_area = popup_area(area, 50, 35);
    let base = Style::default().fg(palette.fg).bg(palette.bg);

    // Clear the background first so the list doesn't show through
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled("Delete this reminder and cancel its alarm?", base)),
        Line::from(""),
        Line::from(Span::styled(reminder.title.clone(), base)),
        Line::from(""),
    ];

    for (index, option) in DELETE_OPTIONS.iter().enumerate() {
        let is_selected = index == selection;
        let prefix = if is_selected { "> " } else { "  " };
        let style = if is_selected {
            Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg)
        } else {
            base
        };
        lines.push(Line::from(Span::styled(format!("{}{}", prefix, option), style)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Use ↑↓ to navigate, Enter to confirm, Esc to cancel",
        base,
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Delete")
                .title_alignment(Alignment::Center)
                .style(base),
        )
        .style(base)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
