use crate::models::Reminder;

/// Action tag carried by the "Done" notification button
pub const ACTION_DONE: &str = "DONE";
/// Action tag carried by the "Close" notification button
pub const ACTION_DISMISS: &str = "REJECT";

/// What gets handed to the delivery handler: an optional action tag and the
/// reminder serialized as JSON.
///
/// A timer registration carries an intent without an action; notification
/// buttons carry the same payload with a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: Option<String>,
    pub payload: String,
}

impl Intent {
    pub fn fire(payload: String) -> Self {
        Self { action: None, payload }
    }

    pub fn with_action(&self, action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            payload: self.payload.clone(),
        }
    }

    pub fn for_reminder(reminder: &Reminder) -> Result<Self, serde_json::Error> {
        Ok(Self::fire(reminder.to_payload()?))
    }
}
