use std::sync::Arc;

use crate::models::Reminder;
use crate::store::{LiveReminders, ReminderStore, StoreError};

/// The four reminder operations the UI and the delivery handler go through.
/// Each one maps straight onto the store.
#[derive(Clone)]
pub struct ReminderService {
    store: Arc<ReminderStore>,
}

impl ReminderService {
    pub fn new(store: Arc<ReminderStore>) -> Self {
        Self { store }
    }

    pub fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        tracing::debug!(key = reminder.scheduled_time_millis, "insert reminder");
        self.store.insert(reminder)
    }

    pub fn update(&self, reminder: &Reminder) -> Result<(), StoreError> {
        tracing::debug!(key = reminder.scheduled_time_millis, "update reminder");
        self.store.update(reminder)
    }

    pub fn delete(&self, reminder: &Reminder) -> Result<(), StoreError> {
        tracing::debug!(key = reminder.scheduled_time_millis, "delete reminder");
        self.store.delete(reminder)
    }

    /// Live view of every reminder, latest scheduled first
    pub fn list_all(&self) -> Result<LiveReminders, StoreError> {
        self.store.subscribe()
    }

    pub fn get(&self, scheduled_time_millis: i64) -> Result<Option<Reminder>, StoreError> {
        self.store.get(scheduled_time_millis)
    }

    /// Pick up writes made by another process on the same database
    pub fn sync_external(&self) -> Result<bool, StoreError> {
        self.store.sync_external()
    }

    /// Reminders that still need an alarm: everything not yet completed
    pub fn pending(&self) -> Result<Vec<Reminder>, StoreError> {
        Ok(self
            .store
            .snapshot()?
            .into_iter()
            .filter(|r| !r.is_completed)
            .collect())
    }
}
