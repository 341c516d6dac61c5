//! Handling of fired alarms and notification actions.
//!
//! The handler is re-entered for every intent: a timer firing arrives with no
//! action tag; pressing "Done" or "Close" on the notification arrives with the
//! matching tag and the same reminder payload.

use std::sync::Arc;
use thiserror::Error;

use crate::intent::{Intent, ACTION_DISMISS, ACTION_DONE};
use crate::models::Reminder;
use crate::scheduler::AlarmScheduler;
use crate::service::ReminderService;
use crate::store::StoreError;

pub const NOTIFICATION_CHANNEL: &str = "reminders";
pub const NOTIFICATION_ID: u32 = 1;
pub const NOTIFICATION_TITLE: &str = "Task Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    Fire,
    Done,
    Dismiss,
}

impl DeliveryAction {
    /// Anything other than the two acknowledgement tags counts as a fire
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(ACTION_DONE) => DeliveryAction::Done,
            Some(ACTION_DISMISS) => DeliveryAction::Dismiss,
            _ => DeliveryAction::Fire,
        }
    }

    pub fn tag(self) -> Option<&'static str> {
        match self {
            DeliveryAction::Fire => None,
            DeliveryAction::Done => Some(ACTION_DONE),
            DeliveryAction::Dismiss => Some(ACTION_DISMISS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub label: &'static str,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: &'static str,
    pub id: u32,
    pub title: &'static str,
    pub body: String,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification failed: {0}")]
    Notification(String),
    #[error("Alert sound failed: {0}")]
    Sound(String),
}

/// Where notifications are posted
pub trait Notifier {
    /// Whether the user allows notifications to be shown
    fn permission_granted(&self) -> bool;

    fn show(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// One-shot alert sound played when a reminder fires
pub trait AlertSound {
    fn play(&self) -> Result<(), NotifyError>;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Malformed reminder payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// What a single invocation of the handler did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Fired { reminder: Reminder, notified: bool },
    Acknowledged { reminder: Reminder, action: DeliveryAction },
}

pub struct DeliveryHandler {
    service: ReminderService,
    scheduler: Arc<AlarmScheduler>,
    notifier: Box<dyn Notifier>,
    sound: Box<dyn AlertSound>,
}

impl DeliveryHandler {
    pub fn new(
        service: ReminderService,
        scheduler: Arc<AlarmScheduler>,
        notifier: Box<dyn Notifier>,
        sound: Box<dyn AlertSound>,
    ) -> Self {
        Self {
            service,
            scheduler,
            notifier,
            sound,
        }
    }

    pub fn handle(&self, intent: &Intent) -> Result<Delivery, DeliveryError> {
        let reminder = Reminder::from_payload(&intent.payload)?;

        match DeliveryAction::from_tag(intent.action.as_deref()) {
            DeliveryAction::Fire => Ok(self.fire(intent, reminder)),
            action => self.acknowledge(reminder, action),
        }
    }

    fn fire(&self, intent: &Intent, reminder: Reminder) -> Delivery {
        let notification = build_notification(intent, &reminder);

        let notified = if self.notifier.permission_granted() {
            match self.notifier.show(&notification) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(key = reminder.scheduled_time_millis, error = %e, "failed to show notification");
                    false
                }
            }
        } else {
            tracing::warn!(key = reminder.scheduled_time_millis, "notification permission not granted, suppressed");
            false
        };

        if let Err(e) = self.sound.play() {
            tracing::warn!(error = %e, "failed to play alert sound");
        }

        tracing::info!(key = reminder.scheduled_time_millis, notified, "reminder fired");
        Delivery::Fired { reminder, notified }
    }

    /// Done and Close both complete the reminder and stop any recurrence
    fn acknowledge(&self, reminder: Reminder, action: DeliveryAction) -> Result<Delivery, DeliveryError> {
        let acknowledged = reminder.acknowledged();
        self.service.update(&acknowledged)?;
        self.scheduler.cancel(&acknowledged);

        tracing::info!(key = acknowledged.scheduled_time_millis, ?action, "reminder acknowledged");
        Ok(Delivery::Acknowledged {
            reminder: acknowledged,
            action,
        })
    }
}

/// The notification shown when a reminder fires, with its two action buttons
pub fn build_notification(intent: &Intent, reminder: &Reminder) -> Notification {
    Notification {
        channel: NOTIFICATION_CHANNEL,
        id: NOTIFICATION_ID,
        title: NOTIFICATION_TITLE,
        body: format!("{}\n{}", reminder.title, reminder.description),
        actions: vec![
            NotificationAction {
                label: "Done",
                intent: intent.with_action(ACTION_DONE),
            },
            NotificationAction {
                label: "Close",
                intent: intent.with_action(ACTION_DISMISS),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_to_actions() {
        assert_eq!(DeliveryAction::from_tag(None), DeliveryAction::Fire);
        assert_eq!(DeliveryAction::from_tag(Some("DONE")), DeliveryAction::Done);
        assert_eq!(DeliveryAction::from_tag(Some("REJECT")), DeliveryAction::Dismiss);
        assert_eq!(DeliveryAction::from_tag(Some("SNOOZE")), DeliveryAction::Fire);
        assert_eq!(DeliveryAction::Done.tag(), Some(ACTION_DONE));
    }

    #[test]
    fn notification_carries_both_actions_with_same_payload() {
        let reminder = Reminder::new("Pay bill".into(), "Electric".into(), 99);
        let intent = Intent::for_reminder(&reminder).unwrap();
        let notification = build_notification(&intent, &reminder);

        assert_eq!(notification.title, "Task Reminder");
        assert!(notification.body.contains("Pay bill"));
        assert!(notification.body.contains("Electric"));

        let labels: Vec<_> = notification.actions.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec!["Done", "Close"]);
        assert_eq!(notification.actions[0].intent.action.as_deref(), Some("DONE"));
        assert_eq!(notification.actions[1].intent.action.as_deref(), Some("REJECT"));
        for action in &notification.actions {
            assert_eq!(action.intent.payload, intent.payload);
        }
    }
}
