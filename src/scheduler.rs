use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::intent::Intent;
use crate::models::Reminder;

/// Interval between re-fires of a recurring reminder unless configured otherwise
pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Handle identifying a timer registration.
///
/// Derived from the scheduled time truncated to 32 bits, so distinct
/// reminders can in principle collide. Registering under an existing key
/// replaces the earlier registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlarmKey(pub i32);

impl AlarmKey {
    pub fn from_millis(millis: i64) -> Self {
        AlarmKey(millis as i32)
    }

    pub fn of(reminder: &Reminder) -> Self {
        Self::from_millis(reminder.scheduled_time_millis)
    }
}

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Alarm service unavailable: {0}")]
    Unavailable(String),
    #[error("Repeat interval must be at least one millisecond")]
    InvalidInterval,
    #[error("Failed to encode alarm payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The wake-timer service alarms are registered with.
///
/// Times are epoch milliseconds. Every `set_*` call replaces any existing
/// registration under the same key.
pub trait AlarmPlatform: Send + Sync {
    /// Whether exact timers are currently permitted
    fn can_schedule_exact(&self) -> bool;

    fn set_exact(&self, key: AlarmKey, at_millis: i64, intent: Intent) -> Result<(), AlarmError>;

    /// Best-effort timer; the platform may delay delivery to batch wakeups
    fn set_inexact(&self, key: AlarmKey, at_millis: i64, intent: Intent) -> Result<(), AlarmError>;

    fn set_repeating(
        &self,
        key: AlarmKey,
        first_millis: i64,
        interval: Duration,
        intent: Intent,
    ) -> Result<(), AlarmError>;

    /// Remove a registration. Unknown keys are not an error.
    fn cancel(&self, key: AlarmKey) -> Result<(), AlarmError>;

    fn is_registered(&self, key: AlarmKey) -> bool;
}

/// How a reminder ended up registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Exact,
    /// Exact timers were not permitted; registered with degraded accuracy
    Inexact,
    Repeating,
    /// Registration failed; the reminder has no active alarm
    Unregistered,
}

/// Maps reminders onto timer registrations keyed by their scheduled time
pub struct AlarmScheduler {
    platform: Arc<dyn AlarmPlatform>,
    repeat_interval: Duration,
}

impl AlarmScheduler {
    pub fn new(platform: Arc<dyn AlarmPlatform>, repeat_interval: Duration) -> Self {
        Self { platform, repeat_interval }
    }

    pub fn repeat_interval(&self) -> Duration {
        self.repeat_interval
    }

    /// Register the reminder's alarm. Failures are logged, never returned:
    /// the reminder stays stored, just without an alarm.
    pub fn schedule(&self, reminder: &Reminder) -> ScheduleOutcome {
        match self.try_schedule(reminder) {
            Ok(outcome) => {
                tracing::info!(
                    key = %AlarmKey::of(reminder),
                    at = reminder.scheduled_time_millis,
                    ?outcome,
                    "alarm registered"
                );
                outcome
            }
            Err(e) => {
                tracing::error!(
                    key = %AlarmKey::of(reminder),
                    error = %e,
                    "failed to register alarm"
                );
                ScheduleOutcome::Unregistered
            }
        }
    }

    fn try_schedule(&self, reminder: &Reminder) -> Result<ScheduleOutcome, AlarmError> {
        let key = AlarmKey::of(reminder);
        let intent = Intent::for_reminder(reminder)?;
        let at = reminder.scheduled_time_millis;

        if reminder.is_recurring {
            self.platform.set_repeating(key, at, self.repeat_interval, intent)?;
            return Ok(ScheduleOutcome::Repeating);
        }

        if self.platform.can_schedule_exact() {
            self.platform.set_exact(key, at, intent)?;
            Ok(ScheduleOutcome::Exact)
        } else {
            tracing::warn!(key = %key, "exact alarms not permitted, falling back to inexact");
            self.platform.set_inexact(key, at, intent)?;
            Ok(ScheduleOutcome::Inexact)
        }
    }

    /// Unregister the reminder's alarm, if any
    pub fn cancel(&self, reminder: &Reminder) {
        let key = AlarmKey::of(reminder);
        match self.platform.cancel(key) {
            Ok(()) => tracing::info!(key = %key, "alarm cancelled"),
            Err(e) => tracing::error!(key = %key, error = %e, "failed to cancel alarm"),
        }
    }

    pub fn is_scheduled(&self, reminder: &Reminder) -> bool {
        self.platform.is_registered(AlarmKey::of(reminder))
    }

    /// Register alarms for every reminder that has not been completed yet.
    /// Returns how many ended up without an alarm.
    pub fn rearm(&self, reminders: &[Reminder]) -> usize {
        reminders
            .iter()
            .filter(|r| !r.is_completed)
            .map(|r| self.schedule(r))
            .filter(|outcome| *outcome == ScheduleOutcome::Unregistered)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Registration {
        Exact(i64),
        Inexact(i64),
        Repeating(i64, Duration),
    }

    #[derive(Default)]
    struct FakePlatform {
        exact_allowed: bool,
        deny_all: bool,
        registrations: Mutex<HashMap<AlarmKey, (Registration, Intent)>>,
    }

    impl FakePlatform {
        fn registration(&self, key: AlarmKey) -> Option<Registration> {
            self.registrations.lock().unwrap().get(&key).map(|(r, _)| r.clone())
        }

        fn insert(&self, key: AlarmKey, reg: Registration, intent: Intent) -> Result<(), AlarmError> {
            if self.deny_all {
                return Err(AlarmError::PermissionDenied("SCHEDULE_EXACT_ALARM".into()));
            }
            self.registrations.lock().unwrap().insert(key, (reg, intent));
            Ok(())
        }
    }

    impl AlarmPlatform for FakePlatform {
        fn can_schedule_exact(&self) -> bool {
            self.exact_allowed
        }

        fn set_exact(&self, key: AlarmKey, at: i64, intent: Intent) -> Result<(), AlarmError> {
            self.insert(key, Registration::Exact(at), intent)
        }

        fn set_inexact(&self, key: AlarmKey, at: i64, intent: Intent) -> Result<(), AlarmError> {
            self.insert(key, Registration::Inexact(at), intent)
        }

        fn set_repeating(&self, key: AlarmKey, first: i64, interval: Duration, intent: Intent) -> Result<(), AlarmError> {
            self.insert(key, Registration::Repeating(first, interval), intent)
        }

        fn cancel(&self, key: AlarmKey) -> Result<(), AlarmError> {
            self.registrations.lock().unwrap().remove(&key);
            Ok(())
        }

        fn is_registered(&self, key: AlarmKey) -> bool {
            self.registrations.lock().unwrap().contains_key(&key)
        }
    }

    fn scheduler(platform: FakePlatform) -> (Arc<FakePlatform>, AlarmScheduler) {
        let platform = Arc::new(platform);
        let scheduler = AlarmScheduler::new(platform.clone(), DEFAULT_REPEAT_INTERVAL);
        (platform, scheduler)
    }

    #[test]
    fn key_truncates_to_32_bits() {
        assert_eq!(AlarmKey::from_millis(5), AlarmKey(5));
        assert_eq!(AlarmKey::from_millis(1_700_000_000_000), AlarmKey(1_700_000_000_000_i64 as i32));
        assert_eq!(AlarmKey::from_millis((1_i64 << 32) + 7), AlarmKey(7));
    }

    #[test]
    fn one_shot_uses_exact_timer_when_permitted() {
        let (platform, scheduler) = scheduler(FakePlatform { exact_allowed: true, ..Default::default() });
        let r = Reminder::new("a".into(), "b".into(), 1_000);

        assert_eq!(scheduler.schedule(&r), ScheduleOutcome::Exact);
        assert_eq!(platform.registration(AlarmKey(1_000)), Some(Registration::Exact(1_000)));
    }

    #[test]
    fn one_shot_falls_back_to_inexact() {
        let (platform, scheduler) = scheduler(FakePlatform::default());
        let r = Reminder::new("a".into(), "b".into(), 1_000);

        assert_eq!(scheduler.schedule(&r), ScheduleOutcome::Inexact);
        assert_eq!(platform.registration(AlarmKey(1_000)), Some(Registration::Inexact(1_000)));
    }

    #[test]
    fn recurring_uses_configured_interval() {
        let platform = Arc::new(FakePlatform { exact_allowed: true, ..Default::default() });
        let scheduler = AlarmScheduler::new(platform.clone(), Duration::from_secs(30));
        let r = Reminder::new("a".into(), "b".into(), 2_000).recurring(true);

        assert_eq!(scheduler.schedule(&r), ScheduleOutcome::Repeating);
        assert_eq!(
            platform.registration(AlarmKey(2_000)),
            Some(Registration::Repeating(2_000, Duration::from_secs(30)))
        );
    }

    #[test]
    fn registration_carries_reminder_payload() {
        let (platform, scheduler) = scheduler(FakePlatform { exact_allowed: true, ..Default::default() });
        let r = Reminder::new("Pay bill".into(), "Electric".into(), 3_000);
        scheduler.schedule(&r);

        let registrations = platform.registrations.lock().unwrap();
        let (_, intent) = registrations.get(&AlarmKey(3_000)).unwrap();
        assert_eq!(intent.action, None);
        assert_eq!(Reminder::from_payload(&intent.payload).unwrap(), r);
    }

    #[test]
    fn schedule_then_cancel_leaves_nothing_registered() {
        let (platform, scheduler) = scheduler(FakePlatform { exact_allowed: true, ..Default::default() });
        let r = Reminder::new("a".into(), "b".into(), 4_000);

        scheduler.schedule(&r);
        assert!(scheduler.is_scheduled(&r));
        scheduler.cancel(&r);
        assert!(!scheduler.is_scheduled(&r));
        assert!(platform.registration(AlarmKey(4_000)).is_none());

        // cancelling again is harmless
        scheduler.cancel(&r);
    }

    #[test]
    fn permission_denied_is_swallowed() {
        let (_, scheduler) = scheduler(FakePlatform { deny_all: true, ..Default::default() });
        let r = Reminder::new("a".into(), "b".into(), 5_000);
        assert_eq!(scheduler.schedule(&r), ScheduleOutcome::Unregistered);
        assert!(!scheduler.is_scheduled(&r));
    }

    #[test]
    fn rescheduling_same_key_supersedes() {
        let (platform, scheduler) = scheduler(FakePlatform { exact_allowed: true, ..Default::default() });
        let r = Reminder::new("a".into(), "b".into(), 6_000);
        scheduler.schedule(&r);
        scheduler.schedule(&r.clone().recurring(true));

        assert_eq!(platform.registrations.lock().unwrap().len(), 1);
        assert!(matches!(
            platform.registration(AlarmKey(6_000)),
            Some(Registration::Repeating(6_000, _))
        ));
    }

    #[test]
    fn rearm_skips_completed() {
        let (platform, scheduler) = scheduler(FakePlatform { exact_allowed: true, ..Default::default() });
        let pending = Reminder::new("a".into(), "b".into(), 7_000);
        let done = Reminder::new("c".into(), "d".into(), 8_000).acknowledged();

        assert_eq!(scheduler.rearm(&[pending, done]), 0);
        assert!(platform.is_registered(AlarmKey(7_000)));
        assert!(!platform.is_registered(AlarmKey(8_000)));
    }
}
