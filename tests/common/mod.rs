#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskrem::delivery::{AlertSound, Notification, Notifier, NotifyError};
use taskrem::scheduler::AlarmError;
use taskrem::{
    AlarmKey, AlarmPlatform, AlarmScheduler, Database, DeliveryHandler, Intent, ReminderService,
    ReminderStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Exact,
    Inexact,
    Repeating(Duration),
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub at_millis: i64,
    pub kind: Kind,
    pub intent: Intent,
}

/// Alarm platform that records registrations and fires only when told to
#[derive(Default)]
pub struct FakePlatform {
    pub exact_allowed: bool,
    registrations: Mutex<HashMap<AlarmKey, Registration>>,
}

impl FakePlatform {
    pub fn new(exact_allowed: bool) -> Self {
        Self { exact_allowed, registrations: Mutex::new(HashMap::new()) }
    }

    pub fn registration(&self, key: AlarmKey) -> Option<Registration> {
        self.registrations.lock().unwrap().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    /// The intent the platform would deliver if `key` went off now.
    /// One-shot registrations are consumed; repeating ones stay.
    pub fn fire(&self, key: AlarmKey) -> Option<Intent> {
        let mut registrations = self.registrations.lock().unwrap();
        let registration = registrations.get(&key)?.clone();
        if !matches!(registration.kind, Kind::Repeating(_)) {
            registrations.remove(&key);
        }
        Some(registration.intent)
    }

    fn register(&self, key: AlarmKey, at_millis: i64, kind: Kind, intent: Intent) {
        self.registrations
            .lock()
            .unwrap()
            .insert(key, Registration { at_millis, kind, intent });
    }
}

impl AlarmPlatform for FakePlatform {
    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed
    }

    fn set_exact(&self, key: AlarmKey, at_millis: i64, intent: Intent) -> Result<(), AlarmError> {
        if !self.exact_allowed {
            return Err(AlarmError::PermissionDenied("exact alarms".into()));
        }
        self.register(key, at_millis, Kind::Exact, intent);
        Ok(())
    }

    fn set_inexact(&self, key: AlarmKey, at_millis: i64, intent: Intent) -> Result<(), AlarmError> {
        self.register(key, at_millis, Kind::Inexact, intent);
        Ok(())
    }

    fn set_repeating(
        &self,
        key: AlarmKey,
        first_millis: i64,
        interval: Duration,
        intent: Intent,
    ) -> Result<(), AlarmError> {
        self.register(key, first_millis, Kind::Repeating(interval), intent);
        Ok(())
    }

    fn cancel(&self, key: AlarmKey) -> Result<(), AlarmError> {
        self.registrations.lock().unwrap().remove(&key);
        Ok(())
    }

    fn is_registered(&self, key: AlarmKey) -> bool {
        self.registrations.lock().unwrap().contains_key(&key)
    }
}

#[derive(Clone, Default)]
pub struct FakeNotifier {
    pub denied: bool,
    pub shown: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for FakeNotifier {
    fn permission_granted(&self) -> bool {
        !self.denied
    }

    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct CountingSound {
    pub plays: Arc<AtomicUsize>,
}

impl CountingSound {
    pub fn count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl AlertSound for CountingSound {
    fn play(&self) -> Result<(), NotifyError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything a scenario needs, wired like the interactive session does
pub struct Harness {
    pub service: ReminderService,
    pub platform: Arc<FakePlatform>,
    pub scheduler: Arc<AlarmScheduler>,
    pub notifier: FakeNotifier,
    pub sound: CountingSound,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(true, false)
    }

    pub fn with_options(exact_allowed: bool, notifications_denied: bool) -> Self {
        Self::build(Database::open_in_memory().unwrap(), exact_allowed, notifications_denied)
    }

    /// A session backed by a database file other services can open too
    pub fn on_file(path: &Path) -> Self {
        Self::build(Database::new(path.to_str().unwrap()).unwrap(), true, false)
    }

    fn build(db: Database, exact_allowed: bool, notifications_denied: bool) -> Self {
        let service = ReminderService::new(Arc::new(ReminderStore::new(db)));
        let platform = Arc::new(FakePlatform::new(exact_allowed));
        let scheduler = Arc::new(AlarmScheduler::new(
            platform.clone(),
            Duration::from_secs(120),
        ));
        Self {
            service,
            platform,
            scheduler,
            notifier: FakeNotifier { denied: notifications_denied, ..FakeNotifier::default() },
            sound: CountingSound::default(),
        }
    }

    pub fn delivery(&self) -> DeliveryHandler {
        DeliveryHandler::new(
            self.service.clone(),
            Arc::clone(&self.scheduler),
            Box::new(self.notifier.clone()),
            Box::new(self.sound.clone()),
        )
    }
}
