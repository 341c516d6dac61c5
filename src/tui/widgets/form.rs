use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::{FormField, ReminderForm};
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::input::Input;
use crate::tui::widgets::popup_area;

/// Rows the form needs: four 3-row fields plus the error line and the border
pub const FORM_HEIGHT: u16 = 3 * 4 + 1 + 2;

pub fn render_reminder_form(f: &mut Frame, area: Rect, form: &ReminderForm, palette: &Palette) {
    let mut popup = popup_area(area, 70, 100);
    popup.height = popup.height.min(FORM_HEIGHT);
    popup.y = area.y + area.height.saturating_sub(popup.height) / 2;
    if popup.width < 4 || popup.height < 4 {
        return;
    }

    f.render_widget(Clear, popup);
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("New Reminder")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    let inner = outer.inner(popup);
    f.render_widget(outer, popup);

    let highlight_style = Style::default().bg(palette.highlight_bg).fg(palette.highlight_fg);
    let inactive_field_style = Style::default().fg(palette.fg).add_modifier(Modifier::DIM);
    let style_for = |field: FormField| {
        if form.current_field == field {
            highlight_style
        } else {
            inactive_field_style
        }
    };

    let field_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Description
            Constraint::Length(3), // Time
            Constraint::Length(3), // Recurring
            Constraint::Length(1), // Error
        ])
        .split(inner);

    render_input(f, field_areas[0], "Title", &form.title, style_for(FormField::Title));
    render_input(
        f,
        field_areas[1],
        "Description",
        &form.description,
        style_for(FormField::Description),
    );
    render_input(
        f,
        field_areas[2],
        "Time (HH:MM or YYYY-MM-DD HH:MM)",
        &form.time,
        style_for(FormField::Time),
    );

    let recurring = if form.recurring { "[x] Repeat until done" } else { "[ ] Repeat until done" };
    f.render_widget(
        Paragraph::new(recurring)
            .style(style_for(FormField::Recurring))
            .block(Block::default().borders(Borders::ALL).title("Recurring")),
        field_areas[3],
    );

    if let Some(ref error) = form.error {
        f.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(palette.error_fg)),
            field_areas[4],
        );
    }

    let active_area = match form.current_field {
        FormField::Title => Some((&form.title, field_areas[0])),
        FormField::Description => Some((&form.description, field_areas[1])),
        FormField::Time => Some((&form.time, field_areas[2])),
        FormField::Recurring => None,
    };
    if let Some((input, field_area)) = active_area {
        let content = Block::default().borders(Borders::ALL).inner(field_area);
        f.set_cursor_position(input.cursor_position(content));
    }
}

fn render_input(f: &mut Frame, area: Rect, title: &str, input: &Input, style: Style) {
    let width = area.width.saturating_sub(2) as usize;
    let (text, _) = input.visible(width);
    f.render_widget(
        Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(title.to_string())),
        area,
    );
}
