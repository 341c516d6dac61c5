use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use crate::delivery::{AlertSound, Notification, Notifier, NotifyError};
use crate::intent::Intent;

const APP_NAME: &str = "taskrem";

/// Desktop notifications through the system notification daemon.
///
/// On freedesktop systems a helper thread waits for the user to press one of
/// the action buttons and sends the matching intent back to the handler.
pub struct DesktopNotifier {
    enabled: bool,
    #[cfg(all(unix, not(target_os = "macos")))]
    sink: Sender<Intent>,
}

impl DesktopNotifier {
    /// `sink` receives the intents of pressed action buttons. Only freedesktop
    /// servers report them; elsewhere it is dropped and the in-app alert is
    /// the only way to acknowledge.
    pub fn new(enabled: bool, sink: Sender<Intent>) -> Self {
        #[cfg(not(all(unix, not(target_os = "macos"))))]
        drop(sink);
        Self {
            enabled,
            #[cfg(all(unix, not(target_os = "macos")))]
            sink,
        }
    }

    fn build(notification: &Notification) -> notify_rust::Notification {
        let mut desktop = notify_rust::Notification::new();
        desktop
            .summary(notification.title)
            .body(&notification.body)
            .appname(APP_NAME)
            .icon("alarm-clock");
        // Same id every time, so a re-fire replaces the previous notification
        #[cfg(all(unix, not(target_os = "macos")))]
        desktop
            .id(notification.id)
            .hint(notify_rust::Hint::Category(notification.channel.to_string()));
        for action in &notification.actions {
            let identifier = action.intent.action.as_deref().unwrap_or(action.label);
            desktop.action(identifier, action.label);
        }
        desktop
    }
}

impl Notifier for DesktopNotifier {
    fn permission_granted(&self) -> bool {
        self.enabled
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        let desktop = Self::build(notification);
        let actions = notification.actions.clone();
        let sink = self.sink.clone();

        thread::Builder::new()
            .name("taskrem-notification".to_string())
            .spawn(move || {
                let handle = match desktop.show() {
                    Ok(handle) => handle,
                    Err(e) => {
                        tracing::warn!(error = %e, "notification daemon rejected notification");
                        return;
                    }
                };
                handle.wait_for_action(|chosen| {
                    let picked = actions
                        .iter()
                        .find(|a| a.intent.action.as_deref() == Some(chosen));
                    if let Some(action) = picked {
                        tracing::debug!(action = chosen, "notification action chosen");
                        let _ = sink.send(action.intent.clone());
                    }
                });
            })
            .map_err(|e| NotifyError::Notification(e.to_string()))?;

        Ok(())
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        Self::build(notification)
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError::Notification(e.to_string()))
    }
}

/// Players tried in order for a configured sound file
const PLAYERS: [&str; 3] = ["paplay", "aplay", "afplay"];

/// Plays a sound file by spawning a system audio player.
/// The child process is reaped on a background thread once it finishes.
pub struct CommandSound {
    candidates: Vec<(String, PathBuf)>,
}

impl CommandSound {
    /// Stock system sounds
    pub fn system_default() -> Self {
        let candidates = [
            ("paplay", "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga"),
            ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
            ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
            ("aplay", "/usr/share/sounds/generic.wav"),
            ("afplay", "/System/Library/Sounds/Glass.aiff"),
        ]
        .iter()
        .map(|(cmd, file)| (cmd.to_string(), PathBuf::from(file)))
        .collect();
        Self { candidates }
    }

    pub fn with_file(path: PathBuf) -> Self {
        let candidates = PLAYERS
            .iter()
            .map(|player| (player.to_string(), path.clone()))
            .collect();
        Self { candidates }
    }
}

impl AlertSound for CommandSound {
    fn play(&self) -> Result<(), NotifyError> {
        for (player, file) in &self.candidates {
            if !file.exists() {
                continue;
            }
            let spawned = Command::new(player)
                .arg(file)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(mut child) => {
                    thread::spawn(move || {
                        let _ = child.wait();
                    });
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(player = %player, error = %e, "sound player unavailable");
                }
            }
        }
        Err(NotifyError::Sound("no sound player or sound file available".to_string()))
    }
}

/// Used when sound is turned off
pub struct Silent;

impl AlertSound for Silent {
    fn play(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}
