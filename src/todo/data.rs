use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{CategoryID, TaskID};

use super::{lenient, timestamp};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "lenient::text")]
    pub id: TaskID,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: bool,
    #[serde(deserialize_with = "lenient::text")]
    pub category_id: CategoryID,
    #[serde(default, deserialize_with = "lenient::position")]
    pub order: usize,
    #[serde(
        default,
        deserialize_with = "lenient::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_value: Option<f64>,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(deserialize_with = "lenient::text")]
    pub id: CategoryID,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub color: String,
    #[serde(default, deserialize_with = "lenient::position")]
    pub order: usize,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// What the caller supplies when adding a task; the board fills in the rest.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub category_id: CategoryID,
    #[serde(default)]
    pub unit_value: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
