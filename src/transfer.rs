//! JSON backup documents.
//!
//! Import only ever replaces the collections and the marker wholesale; there
//! is no merge.

use chrono::{SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::DayKey;
use crate::internal_error::{InternalError, InternalResult};
use crate::settings::{migrate_settings, Settings};
use crate::storage::DurableStore;
use crate::todo::data::{Category, Task};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: String,
    pub data: ExportData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub settings: Settings,
    #[serde(default)]
    pub app_state: AppState,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub last_reset_date: Option<DayKey>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImportReport {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    pub tasks: usize,
    pub categories: usize,
    pub settings: Settings,
}

pub async fn export_data(
    store: &DurableStore,
    settings: &Settings,
) -> InternalResult<ExportDocument> {
    let categories = store.get_categories().await?;
    let tasks = store.get_tasks().await?;
    let last_reset_date = store.get_last_reset_marker().await?;

    Ok(ExportDocument {
        version: EXPORT_VERSION.to_string(),
        export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        data: ExportData {
            tasks,
            categories,
            settings: settings.clone(),
            app_state: AppState { last_reset_date },
        },
    })
}

pub fn to_json(document: &ExportDocument) -> InternalResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Field-presence checks only; record contents are decoded leniently later.
pub fn validate_import(raw: &Value) -> ImportReport {
    if !raw.is_object() {
        return ImportReport::failed("Invalid JSON format");
    }
    let data = match (raw.get("version"), raw.get("data")) {
        (Some(version), Some(data)) if !version.is_null() && !data.is_null() => data,
        _ => return ImportReport::failed("Missing required fields (version, data)"),
    };

    let tasks = match data.get("tasks").and_then(Value::as_array) {
        Some(tasks) => tasks,
        None => return ImportReport::failed("Invalid or missing tasks data"),
    };
    let categories = match data.get("categories").and_then(Value::as_array) {
        Some(categories) => categories,
        None => return ImportReport::failed("Invalid or missing categories data"),
    };
    if !data.get("settings").map_or(false, Value::is_object) {
        return ImportReport::failed("Invalid or missing settings data");
    }

    let task_ok = |task: &Value| {
        non_empty_str(task.get("id"))
            && non_empty_str(task.get("title"))
            && task.get("completed").map_or(false, Value::is_boolean)
    };
    if !tasks.iter().all(task_ok) {
        return ImportReport::failed("Invalid task structure");
    }

    let category_ok =
        |category: &Value| non_empty_str(category.get("id")) && non_empty_str(category.get("name"));
    if !categories.iter().all(category_ok) {
        return ImportReport::failed("Invalid category structure");
    }

    ImportReport::succeeded("Data validation successful")
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).map_or(false, |s| !s.is_empty())
}

/// Validates `raw` and replaces the stored collections and marker with its
/// contents. The imported settings are returned for the caller to apply.
pub async fn import_data(store: &DurableStore, raw: &str) -> InternalResult<Imported> {
    let document: Value = serde_json::from_str(raw)?;

    let report = validate_import(&document);
    if !report.success {
        return Err(InternalError::Validation(report.error.unwrap_or_default()));
    }

    let data = &document["data"];
    let tasks: Vec<Task> = serde_json::from_value(data["tasks"].clone())?;
    let categories: Vec<Category> = serde_json::from_value(data["categories"].clone())?;
    let settings = migrate_settings(data["settings"].clone());
    let last_reset_date = data["appState"]["lastResetDate"]
        .as_str()
        .filter(|day| !day.is_empty());

    store.save_tasks(&tasks).await?;
    store.save_categories(&categories).await?;
    if let Some(day) = last_reset_date {
        store.set_last_reset_marker(day).await?;
    }

    info!("imported {} tasks and {} categories", tasks.len(), categories.len());
    Ok(Imported {
        tasks: tasks.len(),
        categories: categories.len(),
        settings,
    })
}
