use serde::{Deserialize, Serialize};

/// Shown when a reminder is submitted without a title or description
pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";

/// A task the user wants to be reminded about.
///
/// `scheduled_time_millis` is the primary key: two reminders never share an
/// exact scheduled time, and inserting one with an existing key replaces it.
/// The serialized form doubles as the payload carried by alarm intents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub title: String,
    pub description: String,
    pub scheduled_time_millis: i64, // epoch milliseconds
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Reminder {
    pub fn new(title: String, description: String, scheduled_time_millis: i64) -> Self {
        Self {
            title,
            description,
            scheduled_time_millis,
            is_completed: false,
            is_recurring: false,
        }
    }

    pub fn recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = is_recurring;
        self
    }

    /// The state a reminder ends in once the user acknowledges it or stops its
    /// recurrence: completed, and never re-armed.
    pub fn acknowledged(&self) -> Self {
        Self {
            is_completed: true,
            is_recurring: false,
            ..self.clone()
        }
    }

    /// Title and description must both contain something other than whitespace
    pub fn has_required_fields(title: &str, description: &str) -> bool {
        !title.trim().is_empty() && !description.trim().is_empty()
    }

    /// Encode as the JSON payload handed to the delivery handler
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a payload produced by [`Reminder::to_payload`]
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_fields() {
        let reminder = Reminder::new("Pay bill".to_string(), "Electric".to_string(), 1_700_000_000_000);
        let json = reminder.to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["title"], "Pay bill");
        assert_eq!(value["description"], "Electric");
        assert_eq!(value["scheduledTimeMillis"], 1_700_000_000_000_i64);
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["isRecurring"], false);
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn payload_flags_default_to_false() {
        let reminder = Reminder::from_payload(
            r#"{"title":"a","description":"b","scheduledTimeMillis":5}"#,
        )
        .unwrap();
        assert!(!reminder.is_completed);
        assert!(!reminder.is_recurring);
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(Reminder::has_required_fields("Pay bill", "Electric"));
        assert!(!Reminder::has_required_fields("   ", "Electric"));
        assert!(!Reminder::has_required_fields("Pay bill", ""));
    }

    #[test]
    fn acknowledged_clears_recurrence() {
        let reminder = Reminder::new("Water plants".into(), "Balcony".into(), 10).recurring(true);
        let done = reminder.acknowledged();
        assert!(done.is_completed);
        assert!(!done.is_recurring);
        assert_eq!(done.scheduled_time_millis, 10);
        assert_eq!(done.title, "Water plants");
    }
}
