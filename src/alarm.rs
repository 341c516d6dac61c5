use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::intent::Intent;
use crate::scheduler::{AlarmError, AlarmKey, AlarmPlatform};
use crate::utils::now_millis;

/// Width of the batching window inexact alarms are rounded up to
pub const INEXACT_WINDOW_MILLIS: i64 = 1_000;

struct Registration {
    next_fire: i64,
    interval: Option<i64>,
    intent: Intent,
}

#[derive(Default)]
struct State {
    registrations: HashMap<AlarmKey, Registration>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

/// In-process wake timer.
///
/// A single worker thread sleeps until the earliest registration is due and
/// sends its intent down the channel. Repeating registrations are pushed
/// forward by whole intervals; one-shots are dropped after firing. The thread
/// stops when the platform is dropped or the receiving end goes away.
pub struct ThreadAlarmPlatform {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    exact_allowed: bool,
}

impl ThreadAlarmPlatform {
    pub fn start(exact_allowed: bool, sink: Sender<Intent>) -> Result<Self, AlarmError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("taskrem-alarms".to_string())
            .spawn(move || run_timer(worker_shared, sink))
            .map_err(|e| AlarmError::Unavailable(e.to_string()))?;

        Ok(Self {
            shared,
            worker: Some(worker),
            exact_allowed,
        })
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, AlarmError> {
        self.shared
            .state
            .lock()
            .map_err(|_| AlarmError::Unavailable("timer state poisoned".to_string()))
    }

    fn register(&self, key: AlarmKey, registration: Registration) -> Result<(), AlarmError> {
        let mut state = self.state()?;
        if state.shutdown {
            return Err(AlarmError::Unavailable("timer thread stopped".to_string()));
        }
        state.registrations.insert(key, registration);
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.state().map(|s| s.registrations.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlarmPlatform for ThreadAlarmPlatform {
    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed
    }

    fn set_exact(&self, key: AlarmKey, at_millis: i64, intent: Intent) -> Result<(), AlarmError> {
        if !self.exact_allowed {
            return Err(AlarmError::PermissionDenied("exact alarms are disabled".to_string()));
        }
        self.register(key, Registration { next_fire: at_millis, interval: None, intent })
    }

    fn set_inexact(&self, key: AlarmKey, at_millis: i64, intent: Intent) -> Result<(), AlarmError> {
        self.register(
            key,
            Registration {
                next_fire: round_up_to_window(at_millis),
                interval: None,
                intent,
            },
        )
    }

    fn set_repeating(
        &self,
        key: AlarmKey,
        first_millis: i64,
        interval: Duration,
        intent: Intent,
    ) -> Result<(), AlarmError> {
        let interval = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        if interval <= 0 {
            return Err(AlarmError::InvalidInterval);
        }
        self.register(
            key,
            Registration {
                next_fire: first_millis,
                interval: Some(interval),
                intent,
            },
        )
    }

    fn cancel(&self, key: AlarmKey) -> Result<(), AlarmError> {
        let mut state = self.state()?;
        if state.registrations.remove(&key).is_some() {
            self.shared.wake.notify_all();
        }
        Ok(())
    }

    fn is_registered(&self, key: AlarmKey) -> bool {
        self.state()
            .map(|s| s.registrations.contains_key(&key))
            .unwrap_or(false)
    }
}

impl Drop for ThreadAlarmPlatform {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.shutdown = true;
            self.shared.wake.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn round_up_to_window(at_millis: i64) -> i64 {
    let remainder = at_millis.rem_euclid(INEXACT_WINDOW_MILLIS);
    if remainder == 0 {
        at_millis
    } else {
        at_millis.saturating_add(INEXACT_WINDOW_MILLIS - remainder)
    }
}

/// Pull every due intent out of the state, advancing or removing its registration
fn take_due(state: &mut State, now: i64) -> Vec<Intent> {
    let mut due = Vec::new();
    state.registrations.retain(|_, registration| {
        if registration.next_fire > now {
            return true;
        }
        due.push(registration.intent.clone());
        match registration.interval {
            Some(interval) => {
                let missed = (now - registration.next_fire) / interval + 1;
                registration.next_fire = registration
                    .next_fire
                    .saturating_add(missed.saturating_mul(interval));
                true
            }
            None => false,
        }
    });
    due
}

fn run_timer(shared: Arc<Shared>, sink: Sender<Intent>) {
    let Ok(mut state) = shared.state.lock() else {
        return;
    };

    loop {
        if state.shutdown {
            return;
        }

        let now = now_millis();
        for intent in take_due(&mut state, now) {
            tracing::debug!(action = ?intent.action, "alarm fired");
            if sink.send(intent).is_err() {
                tracing::warn!("alarm receiver closed, stopping timer thread");
                return;
            }
        }

        let next = state.registrations.values().map(|r| r.next_fire).min();
        state = match next {
            Some(next) => {
                let wait = Duration::from_millis(next.saturating_sub(now).max(0) as u64);
                match shared.wake.wait_timeout(state, wait) {
                    Ok((guard, _)) => guard,
                    Err(_) => return,
                }
            }
            None => match shared.wake.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            },
        };
    }
}
