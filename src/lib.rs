pub mod alarm;
pub mod cli;
pub mod config;
pub mod database;
pub mod delivery;
pub mod intent;
pub mod logging;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use delivery::{Delivery, DeliveryAction, DeliveryHandler};
pub use intent::Intent;
pub use models::Reminder;
pub use scheduler::{AlarmKey, AlarmPlatform, AlarmScheduler, ScheduleOutcome};
pub use service::ReminderService;
pub use store::ReminderStore;
pub use utils::Profile;
