use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use crossterm::event::KeyCode;
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "taskrem-dev",
            Profile::Prod => "taskrem",
        }
    }
}

/// Get the configuration directory for the given profile
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "taskrem", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory (database, log file) for the given profile
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "taskrem", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Turn user input into a scheduled time (epoch millis).
///
/// Accepts `HH:MM`, which resolves to today at that time and rolls over to
/// tomorrow once it has passed, or `YYYY-MM-DD HH:MM` for an absolute time.
/// `HH:MM` keeps the seconds and milliseconds of `now`, so reminders created
/// for the same minute still get distinct keys.
pub fn parse_reminder_time(input: &str, now: DateTime<Local>) -> Result<i64, String> {
    let input = input.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return local_millis(naive).ok_or_else(|| format!("'{}' does not exist in the local timezone", input));
    }

    let time = NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|_| format!("Invalid time '{}': expected HH:MM or YYYY-MM-DD HH:MM", input))?;
    let time = time
        .with_second(now.second())
        .and_then(|t| t.with_nanosecond(now.timestamp_subsec_millis() * 1_000_000))
        .unwrap_or(time);

    let today = now.date_naive().and_time(time);
    let millis = local_millis(today).ok_or_else(|| format!("'{}' does not exist in the local timezone", input))?;
    if millis > now.timestamp_millis() {
        return Ok(millis);
    }

    let tomorrow = today + ChronoDuration::days(1);
    local_millis(tomorrow).ok_or_else(|| format!("'{}' does not exist in the local timezone", input))
}

fn local_millis(naive: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Format a scheduled time for display using a chrono format string
pub fn format_reminder_time(millis: i64, format: &str) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format(format).to_string(),
        None => millis.to_string(),
    }
}

/// Parsed key binding information
#[derive(Debug, Clone)]
pub struct ParsedKeyBinding {
    pub key_code: KeyCode,
    pub requires_ctrl: bool,
}

/// Check if a key event has the primary modifier (Ctrl on Windows/Linux, Option/Alt on macOS)
pub fn has_primary_modifier(modifiers: crossterm::event::KeyModifiers) -> bool {
    #[cfg(target_os = "macos")]
    {
        modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
            || modifiers.contains(crossterm::event::KeyModifiers::ALT)
    }

    #[cfg(not(target_os = "macos"))]
    {
        modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
    }
}

/// Format a key binding string for display, showing the platform-appropriate modifier
pub fn format_key_binding_for_display(key_binding: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        key_binding.replace("Ctrl+", "Opt+")
    }

    #[cfg(not(target_os = "macos"))]
    {
        key_binding.to_string()
    }
}

/// Parse a key binding string from config into a ParsedKeyBinding
/// Supports single keys ("q", "n"), special keys ("Enter", "F1") and "Ctrl+" modifiers
pub fn parse_key_binding(key_str: &str) -> Result<ParsedKeyBinding, String> {
    let key_str = key_str.trim();

    if let Some(key_part) = key_str.strip_prefix("Ctrl+") {
        return Ok(ParsedKeyBinding {
            key_code: parse_key_code(key_part)?,
            requires_ctrl: true,
        });
    }

    Ok(ParsedKeyBinding {
        key_code: parse_key_code(key_str)?,
        requires_ctrl: false,
    })
}

fn parse_key_code(key_str: &str) -> Result<KeyCode, String> {
    match key_str {
        "Enter" => Ok(KeyCode::Enter),
        "Esc" | "Escape" => Ok(KeyCode::Esc),
        "Backspace" => Ok(KeyCode::Backspace),
        "Tab" => Ok(KeyCode::Tab),
        "Space" | " " => Ok(KeyCode::Char(' ')),
        "Left" => Ok(KeyCode::Left),
        "Right" => Ok(KeyCode::Right),
        "Up" => Ok(KeyCode::Up),
        "Down" => Ok(KeyCode::Down),
        "Home" => Ok(KeyCode::Home),
        "End" => Ok(KeyCode::End),
        "Delete" => Ok(KeyCode::Delete),
        _ => {
            if let Some(n) = key_str.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Ok(KeyCode::F(n));
                }
            }
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(KeyCode::Char(c)),
                _ => Err(format!("Unknown key binding: {}", key_str)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    #[test]
    fn hh_mm_later_today_keeps_sub_minute_part() {
        let now = at(9, 15, 42, 250);
        let millis = parse_reminder_time("17:30", now).unwrap();
        let expected = at(17, 30, 42, 250).timestamp_millis();
        assert_eq!(millis, expected);
    }

    #[test]
    fn hh_mm_in_the_past_rolls_to_tomorrow() {
        let now = at(18, 0, 5, 0);
        let millis = parse_reminder_time("08:00", now).unwrap();
        let today = at(8, 0, 5, 0).timestamp_millis();
        assert!(millis > now.timestamp_millis());
        assert!(millis - today >= 23 * 3_600_000);
    }

    #[test]
    fn absolute_date_time() {
        let now = at(9, 0, 30, 0);
        let millis = parse_reminder_time("2026-03-12 07:45", now).unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap().and_hms_opt(7, 45, 0).unwrap();
        assert_eq!(millis, local_millis(expected).unwrap());
    }

    #[test]
    fn garbage_time_is_rejected() {
        assert!(parse_reminder_time("soon", at(9, 0, 0, 0)).is_err());
        assert!(parse_reminder_time("25:00", at(9, 0, 0, 0)).is_err());
    }

    #[test]
    fn key_bindings_parse() {
        let ctrl_s = parse_key_binding("Ctrl+s").unwrap();
        assert!(ctrl_s.requires_ctrl);
        assert_eq!(ctrl_s.key_code, KeyCode::Char('s'));

        assert_eq!(parse_key_binding("F1").unwrap().key_code, KeyCode::F(1));
        assert_eq!(parse_key_binding("Enter").unwrap().key_code, KeyCode::Enter);
        assert!(parse_key_binding("Hyper+q").is_err());
    }

    #[test]
    fn expand_path_leaves_absolute_paths_alone() {
        assert_eq!(expand_path("/tmp/taskrem.db"), PathBuf::from("/tmp/taskrem.db"));
    }
}
