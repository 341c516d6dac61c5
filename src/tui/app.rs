use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use chrono::{DateTime, Local};
use ratatui::widgets::ListState;

use crate::delivery::{Delivery, DeliveryAction, DeliveryHandler};
use crate::intent::Intent;
use crate::models::{REQUIRED_FIELDS_MESSAGE, Reminder};
use crate::scheduler::{AlarmScheduler, ScheduleOutcome};
use crate::service::ReminderService;
use crate::store::LiveReminders;
use crate::tui::error::TuiError;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::input::Input;
use crate::utils::{format_key_binding_for_display, parse_reminder_time};
use crate::Config;

pub const TIME_FORMAT_MESSAGE: &str = "Please enter a time as HH:MM";

const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Create,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Time,
    Recurring,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Time,
            FormField::Time => FormField::Recurring,
            FormField::Recurring => FormField::Title,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::Title => FormField::Recurring,
            FormField::Description => FormField::Title,
            FormField::Time => FormField::Description,
            FormField::Recurring => FormField::Time,
        }
    }
}

/// State of the add-reminder form
#[derive(Debug, Clone)]
pub struct ReminderForm {
    pub title: Input,
    pub description: Input,
    pub time: Input,
    pub recurring: bool,
    pub current_field: FormField,
    pub error: Option<String>,
}

impl Default for ReminderForm {
    fn default() -> Self {
        Self {
            title: Input::new(),
            description: Input::new(),
            time: Input::new(),
            recurring: false,
            current_field: FormField::Title,
            error: None,
        }
    }
}

impl ReminderForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text input under focus; `None` on the recurring toggle
    pub fn current_input_mut(&mut self) -> Option<&mut Input> {
        match self.current_field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Time => Some(&mut self.time),
            FormField::Recurring => None,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = self.current_field.next();
    }

    pub fn prev_field(&mut self) {
        self.current_field = self.current_field.prev();
    }

    pub fn toggle_recurring(&mut self) {
        self.recurring = !self.recurring;
    }

    /// Validate the fields and build the reminder. On failure the inline
    /// error is set and focus moves to the offending field.
    pub fn submit(&mut self, now: DateTime<Local>) -> Option<Reminder> {
        let title = self.title.value().trim();
        let description = self.description.value().trim();

        if !Reminder::has_required_fields(title, description) {
            self.error = Some(REQUIRED_FIELDS_MESSAGE.to_string());
            self.current_field = if title.is_empty() {
                FormField::Title
            } else {
                FormField::Description
            };
            return None;
        }

        let scheduled = match parse_reminder_time(self.time.value(), now) {
            Ok(millis) => millis,
            Err(e) => {
                tracing::debug!(input = self.time.value(), error = %e, "rejected reminder time");
                self.error = Some(TIME_FORMAT_MESSAGE.to_string());
                self.current_field = FormField::Time;
                return None;
            }
        };

        self.error = None;
        Some(Reminder::new(title.to_string(), description.to_string(), scheduled).recurring(self.recurring))
    }
}

pub struct App {
    pub config: Config,
    pub palette: Palette,
    service: ReminderService,
    scheduler: Arc<AlarmScheduler>,
    delivery: DeliveryHandler,
    live: LiveReminders,
    intents: Receiver<Intent>,
    pub reminders: Vec<Reminder>,
    pub list_state: ListState,
    pub mode: Mode,
    pub form: ReminderForm,
    pub delete_confirmation: Option<Reminder>,
    pub delete_modal_selection: usize,
    /// Fired reminders waiting for Done/Close, oldest first
    pub alerts: VecDeque<Reminder>,
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
}

impl App {
    /// Subscribe to the live list and arm an alarm for every pending reminder
    pub fn new(
        config: Config,
        service: ReminderService,
        scheduler: Arc<AlarmScheduler>,
        delivery: DeliveryHandler,
        intents: Receiver<Intent>,
    ) -> Result<Self, TuiError> {
        let live = service.list_all()?;
        let reminders = live.latest().unwrap_or_default();

        let mut list_state = ListState::default();
        if !reminders.is_empty() {
            list_state.select(Some(0));
        }

        let mut app = Self {
            palette: Palette::from_theme(&config.theme),
            config,
            service,
            scheduler,
            delivery,
            live,
            intents,
            reminders,
            list_state,
            mode: Mode::List,
            form: ReminderForm::new(),
            delete_confirmation: None,
            delete_modal_selection: 0,
            alerts: VecDeque::new(),
            status_message: None,
            status_message_time: None,
        };

        let unregistered = app.scheduler.rearm(&app.reminders);
        tracing::info!(reminders = app.reminders.len(), unregistered, "alarms re-armed");
        if unregistered > 0 {
            app.set_status_message(format!("{} reminder(s) could not be scheduled", unregistered));
        }

        Ok(app)
    }

    /// Pick up the latest emission of the live list, if it changed.
    /// Writes from another process (the CLI) are noticed here too, and
    /// alarms are brought in line with whatever changed.
    pub fn refresh(&mut self) {
        if let Err(e) = self.service.sync_external() {
            tracing::warn!(error = %e, "failed to check for external reminder changes");
        }
        if let Some(reminders) = self.live.latest() {
            let previous = std::mem::replace(&mut self.reminders, reminders);
            self.reconcile_alarms(&previous);
            self.adjust_selected_index();
        }
    }

    /// Cancel alarms of reminders that are gone or completed, and arm new or
    /// changed ones. Unchanged reminders are left alone, so a fired one-shot
    /// waiting for Done/Close is not fired again.
    fn reconcile_alarms(&mut self, previous: &[Reminder]) {
        let before: HashMap<i64, &Reminder> = previous
            .iter()
            .filter(|r| !r.is_completed)
            .map(|r| (r.scheduled_time_millis, r))
            .collect();
        let pending: HashMap<i64, &Reminder> = self
            .reminders
            .iter()
            .filter(|r| !r.is_completed)
            .map(|r| (r.scheduled_time_millis, r))
            .collect();

        for (key, reminder) in &pending {
            let changed = match before.get(key) {
                Some(old) => *old != *reminder,
                None => !self.scheduler.is_scheduled(reminder),
            };
            if changed {
                tracing::debug!(key, "reminder added or changed outside this session");
                self.scheduler.schedule(reminder);
            }
        }

        for (key, reminder) in &before {
            if pending.contains_key(key) {
                continue;
            }
            if self.scheduler.is_scheduled(reminder) {
                tracing::debug!(key, "reminder removed or completed outside this session");
                self.scheduler.cancel(reminder);
            }
            self.alerts.retain(|r| r.scheduled_time_millis != *key);
        }
    }

    /// Run the delivery handler for every intent queued since the last call
    pub fn process_intents(&mut self) {
        while let Ok(intent) = self.intents.try_recv() {
            self.deliver(&intent);
        }
    }

    pub fn deliver(&mut self, intent: &Intent) {
        match self.delivery.handle(intent) {
            Ok(Delivery::Fired { reminder, .. }) => {
                let key = reminder.scheduled_time_millis;
                if !self.alerts.iter().any(|r| r.scheduled_time_millis == key) {
                    self.alerts.push_back(reminder);
                }
            }
            Ok(Delivery::Acknowledged { reminder, action }) => {
                let key = reminder.scheduled_time_millis;
                self.alerts.retain(|r| r.scheduled_time_millis != key);
                let verb = match action {
                    DeliveryAction::Done => "marked done",
                    _ => "closed",
                };
                self.set_status_message(format!("\"{}\" {}", reminder.title, verb));
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to deliver reminder intent");
                self.set_status_message(format!("Failed to deliver reminder: {}", e));
            }
        }
        self.refresh();
    }

    pub fn current_alert(&self) -> Option<&Reminder> {
        self.alerts.front()
    }

    /// Answer the front alert the same way the notification buttons do
    pub fn acknowledge_alert(&mut self, action: DeliveryAction) {
        let Some(reminder) = self.alerts.front().cloned() else {
            return;
        };
        let Some(tag) = action.tag() else {
            return;
        };
        match Intent::for_reminder(&reminder) {
            Ok(intent) => self.deliver(&intent.with_action(tag)),
            Err(e) => {
                self.alerts.pop_front();
                self.set_status_message(format!("Failed to encode reminder: {}", e));
            }
        }
    }

    pub fn open_form(&mut self) {
        self.form = ReminderForm::new();
        self.mode = Mode::Create;
    }

    pub fn cancel_form(&mut self) {
        self.form = ReminderForm::new();
        self.mode = Mode::List;
    }

    /// Save the form: persist the reminder, then register its alarm
    pub fn submit_form(&mut self, now: DateTime<Local>) {
        let Some(reminder) = self.form.submit(now) else {
            return;
        };

        if let Err(e) = self.service.insert(&reminder) {
            self.form.error = Some(format!("Failed to save reminder: {}", e));
            return;
        }

        let message = match self.scheduler.schedule(&reminder) {
            ScheduleOutcome::Exact => "Reminder saved".to_string(),
            ScheduleOutcome::Repeating => format!(
                "Recurring reminder saved, repeats every {} min",
                self.scheduler.repeat_interval().as_secs() / 60
            ),
            ScheduleOutcome::Inexact => {
                "Reminder saved; exact alarms are off, it may fire a little late".to_string()
            }
            ScheduleOutcome::Unregistered => {
                "Reminder saved, but its alarm could not be registered".to_string()
            }
        };

        self.form = ReminderForm::new();
        self.mode = Mode::List;
        self.refresh();
        self.select_key(reminder.scheduled_time_millis);
        self.set_status_message(message);
    }

    pub fn selected_reminder(&self) -> Option<&Reminder> {
        self.list_state.selected().and_then(|i| self.reminders.get(i))
    }

    pub fn request_delete(&mut self) {
        match self.selected_reminder().cloned() {
            Some(reminder) => {
                self.delete_confirmation = Some(reminder);
                self.delete_modal_selection = 0;
            }
            None => self.set_status_message("No reminder selected".to_string()),
        }
    }

    /// Act on the confirmation modal: option 0 deletes, anything else cancels
    pub fn confirm_delete(&mut self) {
        let Some(reminder) = self.delete_confirmation.take() else {
            return;
        };
        if self.delete_modal_selection != 0 {
            return;
        }

        self.scheduler.cancel(&reminder);
        match self.service.delete(&reminder) {
            Ok(()) => {
                self.alerts.retain(|r| r.scheduled_time_millis != reminder.scheduled_time_millis);
                self.refresh();
                self.set_status_message("Reminder deleted".to_string());
            }
            Err(e) => self.set_status_message(format!("Failed to delete reminder: {}", e)),
        }
    }

    /// Stop the selected reminder from repeating; it is marked completed
    pub fn cancel_recurring_selected(&mut self) {
        let Some(reminder) = self.selected_reminder().cloned() else {
            self.set_status_message("No reminder selected".to_string());
            return;
        };
        if !reminder.is_recurring {
            self.set_status_message("Selected reminder is not recurring".to_string());
            return;
        }

        self.scheduler.cancel(&reminder);
        match self.service.update(&reminder.acknowledged()) {
            Ok(()) => {
                self.refresh();
                self.set_status_message("Recurrence cancelled".to_string());
            }
            Err(e) => self.set_status_message(format!("Failed to cancel recurrence: {}", e)),
        }
    }

    pub fn select_previous(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            self.list_state.select(Some(selected.saturating_sub(1)));
        }
    }

    pub fn select_next(&mut self) {
        if self.reminders.is_empty() {
            return;
        }
        let next = self
            .list_state
            .selected()
            .map(|i| (i + 1).min(self.reminders.len() - 1))
            .unwrap_or(0);
        self.list_state.select(Some(next));
    }

    fn select_key(&mut self, scheduled_time_millis: i64) {
        if let Some(index) = self
            .reminders
            .iter()
            .position(|r| r.scheduled_time_millis == scheduled_time_millis)
        {
            self.list_state.select(Some(index));
        }
    }

    /// Keep the selection inside the list after it shrinks or grows
    pub fn adjust_selected_index(&mut self) {
        if self.reminders.is_empty() {
            self.list_state.select(None);
            return;
        }
        let max = self.reminders.len() - 1;
        let selected = self.list_state.selected().unwrap_or(0).min(max);
        self.list_state.select(Some(selected));
    }

    pub fn toggle_help(&mut self) {
        self.mode = if self.mode == Mode::Help { Mode::List } else { Mode::Help };
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
        self.status_message_time = None;
    }

    /// Auto-clear the status message after a few seconds
    pub fn check_status_message_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    /// Key hints for the status bar in the current state
    pub fn key_hints(&self) -> Vec<String> {
        let keys = &self.config.key_bindings;
        let k = |binding: &str| format_key_binding_for_display(binding);

        if self.current_alert().is_some() {
            return vec![format!("{}: Done", k(&keys.done)), format!("{}: Close", k(&keys.dismiss))];
        }
        if self.delete_confirmation.is_some() {
            return vec!["↑↓: Select".to_string(), "Enter: Confirm".to_string(), "Esc: Cancel".to_string()];
        }
        match self.mode {
            Mode::List => vec![
                format!("{}: New", k(&keys.new)),
                format!("{}: Delete", k(&keys.delete)),
                format!("{}: Stop repeating", k(&keys.cancel_recurring)),
                format!("{}/{}: Move", k(&keys.list_up), k(&keys.list_down)),
                format!("{}: Help", k(&keys.help)),
                format!("{}: Quit", k(&keys.quit)),
            ],
            Mode::Create => vec![
                "Tab: Next field".to_string(),
                "Space: Toggle recurring".to_string(),
                format!("Enter/{}: Save", k(&keys.save)),
                "Esc: Cancel".to_string(),
            ],
            Mode::Help => vec![format!("{}/Esc: Close help", k(&keys.help))],
        }
    }
}
