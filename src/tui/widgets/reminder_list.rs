use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, StatefulWidget,
};

use crate::models::Reminder;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::truncate;
use crate::utils::format_reminder_time;

pub const EMPTY_LIST_MESSAGE: &str = "No Task";

/// Every reminder takes two rows: status and title, then time and description
const ROWS_PER_ITEM: usize = 2;

/// First row of a list entry: completion marker, title, recurrence marker
pub fn headline(reminder: &Reminder) -> String {
    let status = if reminder.is_completed { "✓" } else { "○" };
    let recurring = if reminder.is_recurring { " ↻" } else { "" };
    format!("{} {}{}", status, reminder.title, recurring)
}

pub fn detail_line(reminder: &Reminder, time_format: &str) -> String {
    format!(
        "  {}  {}",
        format_reminder_time(reminder.scheduled_time_millis, time_format),
        reminder.description
    )
}

pub fn render_reminder_list(
    f: &mut Frame,
    area: Rect,
    reminders: &[Reminder],
    list_state: &mut ListState,
    time_format: &str,
    palette: &Palette,
) {
    let title = format!("Reminders ({})", reminders.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().fg(palette.fg).bg(palette.bg));

    if reminders.is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        // Center the placeholder vertically
        let row = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, inner.height.min(1));
        f.render_widget(
            Paragraph::new(EMPTY_LIST_MESSAGE)
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.fg).add_modifier(Modifier::DIM)),
            row,
        );
        return;
    }

    // 2 for borders, 2 for padding
    let max_width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = reminders
        .iter()
        .map(|reminder| {
            let mut style = Style::default();
            if reminder.is_completed {
                style = style.add_modifier(Modifier::DIM);
            }
            ListItem::new(vec![
                Line::from(truncate(&headline(reminder), max_width)),
                Line::from(truncate(&detail_line(reminder, time_format), max_width)),
            ])
            .style(style)
        })
        .collect();
    let total_items = items.len();

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(palette.highlight_fg)
                .bg(palette.highlight_bg),
        );
    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    let visible_items = list_area.height.saturating_sub(2) as usize / ROWS_PER_ITEM;
    if total_items > visible_items && visible_items > 0 && scrollbar_area.width > 0 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let selected_index = list_state.selected().unwrap_or(0);
        let scroll_position = selected_index.saturating_sub(visible_items - 1);
        let mut scrollbar_state = ScrollbarState::new(total_items)
            .viewport_content_length(visible_items)
            .position(scroll_position);

        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_inner_area,
            &mut scrollbar_state,
        );
    }
}
