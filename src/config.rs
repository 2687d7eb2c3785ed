use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::layout::WeekStart;
use crate::models::Priority;

pub const DATA_DIR_ENV: &str = "TASKFLOW_DATA_DIR";
pub const USER_ENV: &str = "TASKFLOW_USER";
pub const DEFAULT_USER: &str = "demo";

const SETTINGS_FILE: &str = "settings.json";
/// Log output of the interactive UI, which owns the terminal while it runs.
pub const LOG_FILE: &str = "taskflow.log";

/// User preferences stored in `settings.json` next to the data files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub default_user: Option<String>,
    pub default_priority: Priority,
    pub calendar_week_start: WeekStart,
    pub timeline_zoom: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_user: None,
            default_priority: Priority::Medium,
            calendar_week_start: WeekStart::Sunday,
            timeline_zoom: 1.0,
        }
    }
}

impl Settings {
    /// Reads settings from `dir`, falling back to defaults if the file is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path).map(|s| serde_json::from_str::<Settings>(&s)) {
            Ok(Ok(settings)) => settings,
            Ok(Err(e)) => {
                warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let s = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(SETTINGS_FILE), s)?;
        Ok(())
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub user_id: String,
    pub settings: Settings,
}

impl Config {
    /// Resolves the data directory, settings and active user.
    ///
    /// The user is taken from `user_override`, then `TASKFLOW_USER`, then the
    /// settings file, then `demo`.
    pub fn load(user_override: Option<String>) -> Self {
        let data_dir = data_dir();
        let settings = Settings::load(&data_dir);
        let user_id = user_override
            .or_else(|| std::env::var(USER_ENV).ok())
            .or_else(|| settings.default_user.clone())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        Self { data_dir, user_id, settings }
    }

    /// A configuration rooted at `data_dir`, ignoring the environment.
    pub fn at(data_dir: impl Into<PathBuf>, user_id: impl Into<String>) -> Self {
        let data_dir = data_dir.into();
        let settings = Settings::load(&data_dir);
        Self { data_dir, user_id: user_id.into(), settings }
    }
}

/// Returns the directory holding all data files.
///
/// The path is determined in the following order:
/// 1. `TASKFLOW_DATA_DIR` environment variable.
/// 2. `~/.local/share/taskflow` (on Linux).
/// 3. `./.taskflow` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::data_local_dir()
            .map(|p| p.join("taskflow"))
            .unwrap_or_else(|| PathBuf::from(".taskflow"))
    })
}

/// Opens the UI log file in `dir` for appending, creating both as needed.
pub fn open_log_file(dir: &Path) -> Result<fs::File> {
    fs::create_dir_all(dir)?;
    let file = fs::OpenOptions::new().create(true).append(true).open(dir.join(LOG_FILE))?;
    Ok(file)
}
