use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::internal_error::{InternalError, InternalResult};

/// Where the host keeps its data and how often it re-checks the day.
///
/// Every key is optional in the TOML file:
///
/// ```toml
/// data_dir = "/home/me/.local/share/daily-tasks"
/// primary_db = "/home/me/.local/share/daily-tasks/daily_tasks.db"
/// fallback_dir = "/home/me/.local/share/daily-tasks/fallback"
/// reset_poll_secs = 60
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub data_dir: PathBuf,
    pub primary_db: Option<PathBuf>,
    pub fallback_dir: Option<PathBuf>,
    pub reset_poll_secs: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daily-tasks");

        Self {
            data_dir,
            primary_db: None,
            fallback_dir: None,
            reset_poll_secs: 60,
        }
    }
}

impl PlannerConfig {
    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> InternalResult<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    InternalError::Config(format!("failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> InternalResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> InternalResult<()> {
        if self.reset_poll_secs == 0 {
            return Err(InternalError::Config(
                "reset_poll_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn primary_db_path(&self) -> PathBuf {
        self.primary_db
            .clone()
            .unwrap_or_else(|| self.data_dir.join("daily_tasks.db"))
    }

    pub fn fallback_dir_path(&self) -> PathBuf {
        self.fallback_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("fallback"))
    }

    pub fn reset_poll_interval(&self) -> Duration {
        Duration::from_secs(self.reset_poll_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_data_dir() {
        let config = PlannerConfig::from_toml("data_dir = \"/tmp/dt\"").unwrap();
        assert_eq!(config.primary_db_path(), PathBuf::from("/tmp/dt/daily_tasks.db"));
        assert_eq!(config.fallback_dir_path(), PathBuf::from("/tmp/dt/fallback"));
        assert_eq!(config.reset_poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn explicit_paths_win() {
        let config = PlannerConfig::from_toml(
            "data_dir = \"/tmp/dt\"\nprimary_db = \"/var/db.sqlite\"\nreset_poll_secs = 5",
        )
        .unwrap();
        assert_eq!(config.primary_db_path(), PathBuf::from("/var/db.sqlite"));
        assert_eq!(config.reset_poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn zero_interval_and_bad_toml_are_rejected() {
        assert!(matches!(
            PlannerConfig::from_toml("reset_poll_secs = 0"),
            Err(InternalError::Config(_))
        ));
        assert!(matches!(
            PlannerConfig::from_toml("reset_poll_secs = \"soon\""),
            Err(InternalError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlannerConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, InternalError::Config(_)));
    }
}
