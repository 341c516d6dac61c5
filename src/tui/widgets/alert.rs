use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::delivery::NOTIFICATION_TITLE;
use crate::models::Reminder;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::popup_area;
use crate::utils::{format_key_binding_for_display as display, format_reminder_time};

/// In-terminal counterpart of the desktop notification for a fired reminder
pub fn render_alert(f: &mut Frame, area: Rect, reminder: &Reminder, config: &Config, palette: &Palette) {
    let popup_area = popup_area(area, 60, 40);
    let base = Style::default().fg(palette.fg).bg(palette.bg);
    let accent = Style::default()
        .fg(palette.highlight_fg)
        .bg(palette.highlight_bg)
        .add_modifier(Modifier::BOLD);

    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(reminder.title.clone(), base.add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(reminder.description.clone(), base)),
        Line::from(""),
        Line::from(Span::styled(
            format_reminder_time(reminder.scheduled_time_millis, &config.time_format),
            base,
        )),
    ];
    if reminder.is_recurring {
        lines.push(Line::from(Span::styled("↻ repeats until acknowledged", base)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(format!(" {}: Done ", display(&config.key_bindings.done)), accent),
        Span::styled("   ", base),
        Span::styled(format!(" {}: Close ", display(&config.key_bindings.dismiss)), accent),
    ]));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(NOTIFICATION_TITLE)
                .title_alignment(Alignment::Center)
                .style(base),
        )
        .style(base)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
