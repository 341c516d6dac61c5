use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::models::{Reminder, REQUIRED_FIELDS_MESSAGE};
use crate::service::ReminderService;
use crate::store::StoreError;
use crate::utils::{format_reminder_time, parse_reminder_time};

#[derive(Parser)]
#[command(name = "taskrem")]
#[command(about = "Task reminders with alarms and notifications, in your terminal")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Quickly add a new reminder
    Add {
        /// Reminder title
        title: String,
        /// What the reminder is about
        #[arg(short, long)]
        description: String,
        /// When to fire: HH:MM (next occurrence) or "YYYY-MM-DD HH:MM"
        #[arg(long)]
        at: String,
        /// Repeat at a fixed interval until acknowledged
        #[arg(long)]
        recurring: bool,
    },
    /// Print all reminders, latest scheduled first
    List,
    /// Delete a reminder by its key (scheduled time in epoch milliseconds)
    Delete {
        #[arg(long)]
        at: i64,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to parse time: {0}")]
    TimeParseError(String),
    #[error("No reminder scheduled at {0}")]
    NotFound(i64),
}

/// Handle the add command. Returns the stored reminder.
pub fn handle_add(
    title: String,
    description: String,
    at: String,
    recurring: bool,
    service: &ReminderService,
) -> Result<Reminder, CliError> {
    if !Reminder::has_required_fields(&title, &description) {
        return Err(CliError::ValidationError(REQUIRED_FIELDS_MESSAGE.to_string()));
    }

    let scheduled = parse_reminder_time(&at, chrono::Local::now()).map_err(CliError::TimeParseError)?;
    let reminder = Reminder::new(title.trim().to_string(), description.trim().to_string(), scheduled)
        .recurring(recurring);

    service.insert(&reminder)?;
    println!(
        "Reminder saved (key: {}). The interactive session arms its alarm.",
        reminder.scheduled_time_millis
    );

    Ok(reminder)
}

/// Handle the list command
pub fn handle_list(service: &ReminderService, time_format: &str) -> Result<(), CliError> {
    let live = service.list_all()?;
    let reminders = live.latest().unwrap_or_default();

    if reminders.is_empty() {
        println!("No Task");
        return Ok(());
    }

    for reminder in reminders {
        let status = if reminder.is_completed { "✓" } else { "○" };
        let recurring = if reminder.is_recurring { " ↻" } else { "" };
        println!(
            "{} {}  {}{} - {}  [{}]",
            status,
            format_reminder_time(reminder.scheduled_time_millis, time_format),
            reminder.title,
            recurring,
            reminder.description,
            reminder.scheduled_time_millis
        );
    }

    Ok(())
}

/// Handle the delete command
pub fn handle_delete(at: i64, service: &ReminderService) -> Result<(), CliError> {
    let reminder = service.get(at)?.ok_or(CliError::NotFound(at))?;
    service.delete(&reminder)?;
    println!("Reminder deleted: {}", reminder.title);
    Ok(())
}
