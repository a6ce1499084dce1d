use crate::calendar::{Calendar, CalendarSystem};
use crate::error::ConfigError;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "daybook";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tasks_file: PathBuf,
    pub events_file: PathBuf,
    pub calendar: CalendarSystem,
    pub first_weekday: Weekday,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Config {
            tasks_file: data_dir.join("tasks.csv"),
            events_file: data_dir.join("events.csv"),
            calendar: CalendarSystem::Gregorian,
            first_weekday: Weekday::Mon,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.tasks_file = resolve(base, &config.tasks_file);
            config.events_file = resolve(base, &config.events_file);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }
        if let Some(path) = dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml")) {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(&path);
            }
        }
        tracing::debug!("No config file found, using defaults");
        Ok(Config::default())
    }

    pub fn calendar(&self) -> Calendar {
        Calendar::new(self.calendar, self.first_weekday)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
tasks_file = "/data/tasks.csv"
events_file = "/data/events.csv"
calendar = "persian"
first_weekday = "Sat"
"#,
        )
        .unwrap();
        assert_eq!(config.tasks_file, PathBuf::from("/data/tasks.csv"));
        assert_eq!(config.calendar, CalendarSystem::Persian);
        assert_eq!(config.calendar().first_weekday, Weekday::Sat);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = Config::from_toml("calendar = \"gregorian\"").unwrap();
        let defaults = Config::default();
        assert_eq!(config.tasks_file, defaults.tasks_file);
        assert_eq!(config.first_weekday, Weekday::Mon);
    }

    #[test]
    fn test_unknown_calendar_is_rejected() {
        assert!(matches!(
            Config::from_toml("calendar = \"lunar\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tasks_file = \"my_tasks.csv\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        let dir = file.path().parent().unwrap();
        assert_eq!(config.tasks_file, dir.join("my_tasks.csv"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/daybook.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
