use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::delivery::NOTIFICATION_TITLE;
use crate::tui::app::Mode;
use crate::tui::widgets::{
    alert::render_alert, confirm_delete::render_confirm_delete, form::render_reminder_form,
    help::render_help, reminder_list::render_reminder_list, status_bar::render_status_bar,
};
use crate::tui::{App, Layout};

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let palette = app.palette;

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(NOTIFICATION_TITLE)
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    f.render_widget(outer_block, f.area());

    render_reminder_list(
        f,
        layout.main_area,
        &app.reminders,
        &mut app.list_state,
        &app.config.time_format,
        &palette,
    );

    let hints = app.key_hints();
    render_status_bar(f, layout.status_area, app.status_message.as_ref(), &hints, &palette);

    // Overlays, lowest first; a fired reminder always ends up on top
    match app.mode {
        Mode::Create => render_reminder_form(f, layout.main_area, &app.form, &palette),
        Mode::Help => render_help(f, layout.main_area, &app.config, &palette),
        Mode::List => {}
    }

    if let Some(ref reminder) = app.delete_confirmation {
        render_confirm_delete(f, layout.main_area, reminder, app.delete_modal_selection, &palette);
    }

    if let Some(reminder) = app.current_alert() {
        render_alert(f, layout.main_area, reminder, &app.config, &palette);
    }
}
