use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    size as terminal_size,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::time::Duration;

use crate::delivery::DeliveryAction;
use crate::tui::App;
use crate::tui::app::{FormField, Mode};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{ParsedKeyBinding, has_primary_modifier, parse_key_binding};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Restores the terminal when dropped, including during a panic unwind,
/// so the shell is never left in raw mode or on the alternate screen.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut guard = Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: false,
        };
        execute!(io::stdout(), EnterAlternateScreen)?;
        guard.alternate_screen_enabled = true;
        Ok(guard)
    }

    /// Restore on normal exit; the guard does nothing on drop afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already cleaning up, errors have nowhere to go
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays visible
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    loop {
        app.refresh();
        app.process_intents();
        app.check_status_message_timeout();

        terminal.draw(|f| {
            let layout = Layout::calculate(f.area());
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                // Only Press, otherwise Windows delivers every key twice
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut app, key_event)? {
                        break;
                    }
                }
                // Layout is recomputed from the frame size on the next draw
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    guard.restore()?;
    Ok(())
}

/// Dispatch one key press. Returns `true` when the user asked to quit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.current_alert().is_some() {
        return handle_alert_key(app, key_event);
    }
    if app.delete_confirmation.is_some() {
        handle_delete_confirmation_modal(app, key_event);
        return Ok(false);
    }

    match app.mode {
        Mode::Help => handle_help_key(app, key_event),
        Mode::Create => handle_form_key(app, key_event),
        Mode::List => handle_list_key(app, key_event),
    }
}

fn handle_alert_key(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let done = binding(&app.config.key_bindings.done)?;
    let dismiss = binding(&app.config.key_bindings.dismiss)?;

    if matches_key_event(key_event, &done) {
        app.acknowledge_alert(DeliveryAction::Done);
    } else if matches_key_event(key_event, &dismiss) || key_event.code == KeyCode::Esc {
        app.acknowledge_alert(DeliveryAction::Dismiss);
    }
    Ok(false)
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        // Two options, so up and down both just flip
        KeyCode::Up | KeyCode::Down | KeyCode::Tab | KeyCode::BackTab => {
            app.delete_modal_selection = 1 - app.delete_modal_selection.min(1);
        }
        KeyCode::Enter => app.confirm_delete(),
        KeyCode::Esc => {
            app.delete_confirmation = None;
        }
        _ => {}
    }
}

fn handle_help_key(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let help = binding(&app.config.key_bindings.help)?;
    let quit = binding(&app.config.key_bindings.quit)?;
    if key_event.code == KeyCode::Esc
        || matches_key_event(key_event, &help)
        || matches_key_event(key_event, &quit)
    {
        app.toggle_help();
    }
    Ok(false)
}

fn handle_form_key(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let save = binding(&app.config.key_bindings.save)?;
    if matches_key_event(key_event, &save) {
        app.submit_form(chrono::Local::now());
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Enter => app.submit_form(chrono::Local::now()),
        KeyCode::Tab | KeyCode::Down => app.form.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.form.prev_field(),
        KeyCode::Char(' ') if app.form.current_field == FormField::Recurring => {
            app.form.toggle_recurring();
        }
        KeyCode::Char(c) if !has_text_modifier(key_event.modifiers) => {
            if let Some(input) = app.form.current_input_mut() {
                input.insert_char(c);
            }
        }
        KeyCode::Backspace => {
            if let Some(input) = app.form.current_input_mut() {
                input.delete_char();
            }
        }
        KeyCode::Delete => {
            if let Some(input) = app.form.current_input_mut() {
                input.delete_forward();
            }
        }
        KeyCode::Left => {
            if let Some(input) = app.form.current_input_mut() {
                input.move_cursor_left();
            }
        }
        KeyCode::Right => {
            if let Some(input) = app.form.current_input_mut() {
                input.move_cursor_right();
            }
        }
        KeyCode::Home => {
            if let Some(input) = app.form.current_input_mut() {
                input.move_cursor_home();
            }
        }
        KeyCode::End => {
            if let Some(input) = app.form.current_input_mut() {
                input.move_cursor_end();
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_list_key(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = &app.config.key_bindings;
    let quit = binding(&keys.quit)?;
    let new = binding(&keys.new)?;
    let delete = binding(&keys.delete)?;
    let cancel_recurring = binding(&keys.cancel_recurring)?;
    let list_up = binding(&keys.list_up)?;
    let list_down = binding(&keys.list_down)?;
    let help = binding(&keys.help)?;

    if matches_key_event(key_event, &quit) {
        return Ok(true);
    }

    if matches_key_event(key_event, &new) {
        app.open_form();
    } else if matches_key_event(key_event, &delete) {
        app.request_delete();
    } else if matches_key_event(key_event, &cancel_recurring) {
        app.cancel_recurring_selected();
    } else if matches_key_event(key_event, &list_up) || key_event.code == KeyCode::Up {
        app.select_previous();
    } else if matches_key_event(key_event, &list_down) || key_event.code == KeyCode::Down {
        app.select_next();
    } else if matches_key_event(key_event, &help) {
        app.toggle_help();
    }
    Ok(false)
}

fn binding(key: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key).map_err(TuiError::KeyBindingError)
}

/// Control/Alt chords are commands, never typed text
fn has_text_modifier(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Ctrl on Windows/Linux, Option/Alt on macOS
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}
