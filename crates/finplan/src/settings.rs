//! Startup settings: where items live and how reminders behave.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use finplan_reminders::ReminderConfig;

/// Errors while assembling settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no data directory available, pass --items")]
    NoDataDir,

    #[error("health check interval must be at least one second")]
    ZeroInterval,

    #[error("invalid reminder date format '{0}'")]
    InvalidDateFormat(String),
}

/// Everything the commands need to run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub items_path: PathBuf,
    pub reminders: ReminderConfig,
}

impl Settings {
    /// Combine command line values with the optional JSON config file.
    ///
    /// Command line values win over the file; the file wins over defaults.
    pub fn load(
        items_path: Option<PathBuf>,
        config_path: Option<&Path>,
        health_check_interval: Option<u64>,
        time_zone: Option<Tz>,
    ) -> Result<Self, SettingsError> {
        let mut reminders = match config_path {
            Some(path) => read_config(path)?,
            None => ReminderConfig::default(),
        };
        if let Some(secs) = health_check_interval {
            reminders.health_check_interval_secs = secs;
        }
        if time_zone.is_some() {
            reminders.time_zone = time_zone;
        }
        if reminders.health_check_interval_secs == 0 {
            return Err(SettingsError::ZeroInterval);
        }
        if !reminders.phrasing.date_format_is_valid() {
            return Err(SettingsError::InvalidDateFormat(
                reminders.phrasing.date_format,
            ));
        }

        let items_path = match items_path {
            Some(path) => path,
            None => default_items_path()?,
        };

        Ok(Self {
            items_path,
            reminders,
        })
    }
}

/// `<data dir>/finplan/items.json`
pub fn default_items_path() -> Result<PathBuf, SettingsError> {
    dirs::data_dir()
        .map(|dir| dir.join("finplan").join("items.json"))
        .ok_or(SettingsError::NoDataDir)
}

fn read_config(path: &Path) -> Result<ReminderConfig, SettingsError> {
    let data = std::fs::read(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_slice(&data).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded reminder config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = Settings::load(Some(PathBuf::from("items.json")), None, None, None).unwrap();
        assert_eq!(settings.items_path, PathBuf::from("items.json"));
        assert_eq!(settings.reminders, ReminderConfig::default());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let file = config_file(
            r#"{"channelName": "Bills", "phrasing": {"today": "Heute"}, "retry": {"maxAttempts": 2}}"#,
        );

        let settings =
            Settings::load(Some(PathBuf::from("items.json")), Some(file.path()), None, None).unwrap();

        assert_eq!(settings.reminders.channel_name, "Bills");
        assert_eq!(settings.reminders.phrasing.today, "Heute");
        assert_eq!(settings.reminders.phrasing.tomorrow, "Tomorrow");
        assert_eq!(settings.reminders.retry.max_attempts, 2);
        assert_eq!(settings.reminders.channel_id, "channel_reminder");
    }

    #[test]
    fn test_flag_overrides_config_file() {
        let file = config_file(r#"{"healthCheckIntervalSecs": 600}"#);

        let settings = Settings::load(
            Some(PathBuf::from("items.json")),
            Some(file.path()),
            Some(900),
            None,
        )
        .unwrap();

        assert_eq!(settings.reminders.health_check_interval_secs, 900);
    }

    #[test]
    fn test_time_zone_flag_overrides_config_file() {
        let file = config_file(r#"{"timeZone": "Europe/Berlin"}"#);

        let settings =
            Settings::load(Some(PathBuf::from("items.json")), Some(file.path()), None, None)
                .unwrap();
        assert_eq!(settings.reminders.time_zone, Some(Tz::Europe__Berlin));

        let settings = Settings::load(
            Some(PathBuf::from("items.json")),
            Some(file.path()),
            None,
            Some(Tz::America__New_York),
        )
        .unwrap();
        assert_eq!(settings.reminders.time_zone, Some(Tz::America__New_York));
    }

    #[test]
    fn test_invalid_date_format_rejected_at_startup() {
        let file = config_file(r#"{"phrasing": {"dateFormat": "%Q"}}"#);
        let err = Settings::load(Some(PathBuf::from("items.json")), Some(file.path()), None, None)
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidDateFormat(ref f) if f == "%Q"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = Settings::load(Some(PathBuf::from("items.json")), None, Some(0), None).unwrap_err();
        assert!(matches!(err, SettingsError::ZeroInterval));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(
            Some(PathBuf::from("items.json")),
            Some(&dir.path().join("absent.json")),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_malformed_config_file() {
        let file = config_file("{not json");
        let err = Settings::load(Some(PathBuf::from("items.json")), Some(file.path()), None, None)
            .unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
