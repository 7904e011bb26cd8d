//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::tutorial::model::settings_keys;

/// Host-side configuration for the tutorial engine.
#[derive(Debug, Clone)]
pub struct TutorialConfig {
    /// Path of the local settings database.
    pub db_path: PathBuf,
    /// User the progress flags are stored under (single-user app).
    pub user_id: String,
    /// Delay between launch and the automatic tutorial start, so the main
    /// screen has rendered before the overlay appears.
    pub autostart_delay: Duration,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/circl-tutorial.db"),
            user_id: settings_keys::DEFAULT_USER.to_string(),
            autostart_delay: Duration::from_millis(1000),
        }
    }
}

impl TutorialConfig {
    /// Build a config from `CIRCL_TUTORIAL_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("CIRCL_TUTORIAL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(user) = lookup("CIRCL_TUTORIAL_USER") {
            if user.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "CIRCL_TUTORIAL_USER".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            config.user_id = user;
        }
        if let Some(raw) = lookup("CIRCL_TUTORIAL_AUTOSTART_DELAY_MS") {
            let ms: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "CIRCL_TUTORIAL_AUTOSTART_DELAY_MS".to_string(),
                message: format!("{e}"),
            })?;
            config.autostart_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}
