//! User preferences. Only `daily_reset_enabled` matters to the reset engine;
//! the rest is carried so that export/import round-trips the whole document.

use std::sync::{Arc, RwLock};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::internal_error::InternalResult;
use crate::storage::FallbackStore;

pub const SETTINGS_KEY: &str = "daily_tasks_settings";
pub const SETTINGS_VERSION: u64 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitTrackerConfig {
    pub enabled: bool,
    pub label: String,
    pub unit: String,
    pub custom_unit: String,
    pub min_value: f64,
    pub max_value: f64,
    pub start_value: f64,
    pub current_value: f64,
    pub increment: f64,
}

impl Default for UnitTrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            label: "Screen time".to_string(),
            unit: "minutes".to_string(),
            custom_unit: String::new(),
            min_value: 0.0,
            max_value: 480.0,
            start_value: 0.0,
            current_value: 0.0,
            increment: 15.0,
        }
    }
}

impl UnitTrackerConfig {
    fn clamp(&mut self) {
        if self.max_value < self.min_value {
            std::mem::swap(&mut self.max_value, &mut self.min_value);
        }
        self.current_value = self.current_value.clamp(self.min_value, self.max_value);
        self.start_value = self.start_value.clamp(self.min_value, self.max_value);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub version: u64,
    pub daily_reset_enabled: bool,
    pub animations_enabled: bool,
    pub selected_theme: String,
    pub app_title: String,
    pub edit_mode: bool,
    pub notes_enabled: bool,
    pub notes_title: String,
    pub notes_content: String,
    pub unit_tracker: UnitTrackerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            daily_reset_enabled: true,
            animations_enabled: true,
            selected_theme: "cyberpunk".to_string(),
            app_title: "Daily Tasks".to_string(),
            edit_mode: true,
            notes_enabled: false,
            notes_title: "Notes".to_string(),
            notes_content: String::new(),
            unit_tracker: UnitTrackerConfig::default(),
        }
    }
}

/// Brings any stored settings document up to `SETTINGS_VERSION`.
///
/// Version 0 documents have no `version` key and may call the tracker
/// `timeTracker`. Missing keys take their defaults at every version.
pub fn migrate_settings(raw: Value) -> Settings {
    let mut document = match raw {
        Value::Object(document) => document,
        other => {
            warn!("settings document is not an object, using defaults: {}", other);
            Map::new()
        }
    };

    let version = document.get("version").and_then(Value::as_u64).unwrap_or(0);
    if version < 1 {
        if let Some(tracker) = document.remove("timeTracker") {
            document.entry("unitTracker").or_insert(tracker);
        }
    }

    let mut settings: Settings = match serde_json::from_value(Value::Object(document)) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("settings document unreadable, using defaults: {}", e);
            Settings::default()
        }
    };
    settings.unit_tracker.clamp();
    settings.version = SETTINGS_VERSION;
    settings
}

/// Read-only view of the daily reset switch.
pub trait DailyResetPreference: Send + Sync {
    /// `None` while the preference has not been loaded yet; callers must not
    /// act on a default in that state.
    fn is_daily_reset_enabled(&self) -> Option<bool>;
}

/// Settings kept in the fallback tier, unloaded until `load` is called.
pub struct SharedSettings {
    store: Arc<dyn FallbackStore>,
    current: RwLock<Option<Settings>>,
}

impl SharedSettings {
    pub fn new(store: Arc<dyn FallbackStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Loads and migrates the stored document. An unreadable store yields the
    /// defaults so the app is never stuck in the unloaded state.
    pub fn load(&self) -> InternalResult<Settings> {
        let settings = match self.store.get_item(SETTINGS_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(raw) => migrate_settings(raw),
                Err(e) => {
                    warn!("stored settings are not JSON, using defaults: {}", e);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };

        *self.current.write()? = Some(settings.clone());
        Ok(settings)
    }

    pub fn current(&self) -> Option<Settings> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    /// Persists `settings`, then makes it current.
    pub fn replace(&self, settings: Settings) -> InternalResult<()> {
        let settings = migrate_settings(serde_json::to_value(&settings)?);
        self.store
            .set_item(SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        *self.current.write()? = Some(settings);
        Ok(())
    }

    pub fn set_daily_reset_enabled(&self, enabled: bool) -> InternalResult<()> {
        let mut settings = self.current().unwrap_or_default();
        settings.daily_reset_enabled = enabled;
        self.replace(settings)
    }
}

impl DailyResetPreference for SharedSettings {
    fn is_daily_reset_enabled(&self) -> Option<bool> {
        self.current().map(|settings| settings.daily_reset_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn legacy_document_is_upgraded() {
        let settings = migrate_settings(json!({
            "dailyResetEnabled": false,
            "appTitle": "Mornings",
            "timeTracker": { "enabled": true, "minValue": 0, "maxValue": 60, "currentValue": 90 }
        }));

        assert_eq!(settings.version, SETTINGS_VERSION);
        assert!(!settings.daily_reset_enabled);
        assert_eq!(settings.app_title, "Mornings");
        assert_eq!(settings.selected_theme, "cyberpunk");
        assert!(settings.unit_tracker.enabled);
        assert_eq!(settings.unit_tracker.current_value, 60.0);
    }

    #[test]
    fn junk_document_means_defaults() {
        assert_eq!(migrate_settings(json!([1, 2])), Settings::default());
        assert_eq!(
            migrate_settings(json!({ "dailyResetEnabled": "sometimes" })),
            Settings::default()
        );
    }

    #[test]
    fn preference_is_pending_until_loaded() {
        let store = Arc::new(MemoryStore::new());
        let settings = SharedSettings::new(store.clone());
        assert_eq!(settings.is_daily_reset_enabled(), None);

        settings.load().unwrap();
        assert_eq!(settings.is_daily_reset_enabled(), Some(true));

        settings.set_daily_reset_enabled(false).unwrap();
        let reloaded = SharedSettings::new(store);
        reloaded.load().unwrap();
        assert_eq!(reloaded.is_daily_reset_enabled(), Some(false));
    }
}
