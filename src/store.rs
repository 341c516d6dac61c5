use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::Reminder;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Reminder store lock poisoned")]
    Poisoned,
}

/// The reminder store: the database plus a live "all reminders" query.
///
/// Every successful insert, update or delete recomputes the full list and
/// pushes it to each subscriber, so readers only ever see complete snapshots.
pub struct ReminderStore {
    db: Mutex<Database>,
    subscribers: Mutex<Vec<Sender<Vec<Reminder>>>>,
    /// Last `data_version` seen, for noticing writes from other processes
    seen_version: Mutex<Option<i64>>,
}

impl ReminderStore {
    pub fn new(db: Database) -> Self {
        let seen_version = db.data_version().ok();
        Self {
            db: Mutex::new(db),
            subscribers: Mutex::new(Vec::new()),
            seen_version: Mutex::new(seen_version),
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        self.db()?.insert_reminder(reminder)?;
        self.publish()
    }

    /// Full-record replace. Unknown keys are left alone, but subscribers are
    /// still notified.
    pub fn update(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let updated = self.db()?.update_reminder(reminder)?;
        if !updated {
            tracing::debug!(key = reminder.scheduled_time_millis, "update for unknown reminder ignored");
        }
        self.publish()
    }

    pub fn delete(&self, reminder: &Reminder) -> Result<(), StoreError> {
        self.db()?.delete_reminder(reminder.scheduled_time_millis)?;
        self.publish()
    }

    pub fn get(&self, scheduled_time_millis: i64) -> Result<Option<Reminder>, StoreError> {
        Ok(self.db()?.get_reminder(scheduled_time_millis)?)
    }

    /// One-shot read of every reminder, latest scheduled first
    pub fn snapshot(&self) -> Result<Vec<Reminder>, StoreError> {
        Ok(self.db()?.get_all_reminders()?)
    }

    /// Subscribe to the live list. The current list is delivered immediately.
    pub fn subscribe(&self) -> Result<LiveReminders, StoreError> {
        let (tx, rx) = mpsc::channel();
        let current = self.snapshot()?;
        // The receiver is still in scope, so this send cannot fail
        let _ = tx.send(current);
        self.subscribers
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(tx);
        Ok(LiveReminders { rx })
    }

    /// Republish the list if another connection (the CLI, say) committed
    /// since the last check. Returns whether anything was published.
    pub fn sync_external(&self) -> Result<bool, StoreError> {
        let version = self.db()?.data_version()?;
        {
            let mut seen = self.seen_version.lock().map_err(|_| StoreError::Poisoned)?;
            if *seen == Some(version) {
                return Ok(false);
            }
            *seen = Some(version);
        }
        tracing::debug!(version, "external change to reminder database");
        self.publish()?;
        Ok(true)
    }

    fn publish(&self) -> Result<(), StoreError> {
        let current = self.snapshot()?;
        let mut subscribers = self.subscribers.lock().map_err(|_| StoreError::Poisoned)?;
        subscribers.retain(|tx| tx.send(current.clone()).is_ok());
        Ok(())
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Receiving end of the live reminder list
pub struct LiveReminders {
    rx: Receiver<Vec<Reminder>>,
}

impl LiveReminders {
    /// Drain pending emissions and return the most recent one, if any.
    /// Returns `None` when nothing changed since the last call.
    pub fn latest(&self) -> Option<Vec<Reminder>> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(list) => latest = Some(list),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Block until the next emission
    pub fn recv(&self) -> Option<Vec<Reminder>> {
        self.rx.recv().ok()
    }
}
