use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(&self) -> &'static str {
        match self {
            Profile::Dev => "plantcare-dev",
            Profile::Prod => "plantcare",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "plantcare-dev" instead of "plantcare"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "plantcare", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "plantcare-dev" instead of "plantcare"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "plantcare", profile.app_name())
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

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Get the current date as an ISO 8601 string (YYYY-MM-DD)
pub fn get_current_date_string() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Current instant as RFC 3339 with millisecond precision, e.g. `2024-12-21T08:30:00.000Z`
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fresh opaque entity id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The calendar-date part of a date or timestamp string (everything before `T`)
pub fn date_part(value: &str) -> &str {
    value.split('T').next().unwrap_or(value)
}

/// Parse either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (taken as midnight UTC)
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_date(value)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Whole days between a stored date and `today`; `None` if the date can't be read
pub fn days_since(date: &str, today: NaiveDate) -> Option<i64> {
    let then = parse_datetime(date)?.date_naive();
    Some((today - then).num_days())
}
