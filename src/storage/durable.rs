use chrono::Utc;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::data::DayKey;
use crate::internal_error::InternalResult;
use crate::todo::data::{Category, Task};
use crate::todo::util::merge_reordered;

use super::seed::{default_categories, default_tasks};
use super::tiered::{Mirror, TieredStore};

pub const TASKS_KEY: &str = "tasks";
pub const CATEGORIES_KEY: &str = "categories";
pub const LAST_RESET_KEY: &str = "lastReset";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub tasks: usize,
    pub categories: usize,
}

/// Typed access to the three persisted records.
///
/// Every mutation is a read-modify-write of the whole collection. Two
/// instances writing concurrently race and the last write wins; there is no
/// locking across instances.
pub struct DurableStore {
    tiers: TieredStore,
}

impl DurableStore {
    pub fn new(tiers: TieredStore) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &TieredStore {
        &self.tiers
    }

    pub async fn get_tasks(&self) -> InternalResult<Vec<Task>> {
        Ok(self.read_tasks().await?.records)
    }

    /// Replaces the stored collection wholesale, unreadable entries included.
    pub async fn save_tasks(&self, tasks: &[Task]) -> InternalResult<()> {
        self.write_tasks(&Collection::from(tasks)).await
    }

    pub async fn add_task(&self, task: &Task) -> InternalResult<()> {
        let mut tasks = self.read_tasks().await?;
        tasks.records.push(task.clone());
        self.write_tasks(&tasks).await
    }

    /// Returns `false` (and writes nothing) when no task has that id.
    pub async fn update_task(&self, updated: &Task) -> InternalResult<bool> {
        let mut tasks = self.read_tasks().await?;
        match tasks.records.iter_mut().find(|task| task.id == updated.id) {
            Some(task) => *task = updated.clone(),
            None => return Ok(false),
        }
        self.write_tasks(&tasks).await?;
        Ok(true)
    }

    pub async fn delete_task(&self, task_id: &str) -> InternalResult<()> {
        let mut tasks = self.read_tasks().await?;
        tasks.records.retain(|task| task.id != task_id);
        self.write_tasks(&tasks).await
    }

    /// Flips `completed` on the stored copy and returns the persisted task.
    pub async fn toggle_task(&self, task_id: &str) -> InternalResult<Option<Task>> {
        let mut tasks = self.read_tasks().await?;
        let toggled = match tasks.records.iter_mut().find(|task| task.id == task_id) {
            Some(task) => {
                task.completed = !task.completed;
                task.updated_at = Utc::now();
                task.clone()
            }
            None => return Ok(None),
        };
        self.write_tasks(&tasks).await?;
        Ok(Some(toggled))
    }

    /// Stores `reordered` in place of the tasks of `category_id` and returns
    /// the full task list as persisted.
    pub async fn reorder_tasks(
        &self,
        category_id: &str,
        reordered: &[Task],
    ) -> InternalResult<Vec<Task>> {
        let mut tasks = self.read_tasks().await?;
        tasks.records = merge_reordered(&tasks.records, category_id, reordered);
        self.write_tasks(&tasks).await?;
        Ok(tasks.records)
    }

    /// Clears every completion flag and returns the collection as persisted.
    pub async fn reset_daily_tasks(&self) -> InternalResult<Vec<Task>> {
        let now = Utc::now();
        let mut tasks = self.read_tasks().await?;
        for task in tasks.records.iter_mut() {
            task.completed = false;
            task.updated_at = now;
        }
        self.write_tasks(&tasks).await?;
        Ok(tasks.records)
    }

    /// Seeds the default categories (and, if there are no tasks yet, the
    /// default tasks) when the category collection is absent or empty.
    pub async fn get_categories(&self) -> InternalResult<Vec<Category>> {
        let mut categories = self.read_categories().await?;
        if !categories.records.is_empty() {
            return Ok(categories.records);
        }

        categories.records = default_categories();
        self.write_categories(&categories).await?;
        if self.read_tasks().await?.is_empty() {
            self.save_tasks(&default_tasks()).await?;
        }
        info!("seeded {} default categories", categories.records.len());
        Ok(categories.records)
    }

    /// Replaces the stored collection wholesale, unreadable entries included.
    pub async fn save_categories(&self, categories: &[Category]) -> InternalResult<()> {
        self.write_categories(&Collection::from(categories)).await
    }

    pub async fn add_category(&self, category: &Category) -> InternalResult<()> {
        let mut categories = self.read_categories().await?;
        categories.records.push(category.clone());
        self.write_categories(&categories).await
    }

    pub async fn update_category(&self, updated: &Category) -> InternalResult<bool> {
        let mut categories = self.read_categories().await?;
        match categories
            .records
            .iter_mut()
            .find(|category| category.id == updated.id)
        {
            Some(category) => *category = updated.clone(),
            None => return Ok(false),
        }
        self.write_categories(&categories).await?;
        Ok(true)
    }

    /// Removes the category and every task that references it. Tasks are
    /// written before categories, so a failure in between leaves no orphans.
    pub async fn delete_category(&self, category_id: &str) -> InternalResult<()> {
        let mut tasks = self.read_tasks().await?;
        tasks.records.retain(|task| task.category_id != category_id);
        self.write_tasks(&tasks).await?;

        let mut categories = self.read_categories().await?;
        categories.records.retain(|category| category.id != category_id);
        self.write_categories(&categories).await
    }

    /// Stores `reordered` as the category list, keeping unreadable entries.
    pub async fn reorder_categories(&self, reordered: &[Category]) -> InternalResult<()> {
        let mut categories = self.read_categories().await?;
        categories.records = reordered.to_vec();
        self.write_categories(&categories).await
    }

    pub async fn get_last_reset_marker(&self) -> InternalResult<Option<DayKey>> {
        let marker = self.tiers.read_or_fallback(LAST_RESET_KEY).await?;
        Ok(match marker {
            Some(Value::String(day)) if !day.is_empty() => Some(day),
            _ => None,
        })
    }

    pub async fn set_last_reset_marker(&self, day: &str) -> InternalResult<()> {
        self.tiers
            .write(LAST_RESET_KEY, &Value::String(day.to_string()), Mirror::Always)
            .await
    }

    /// Copies legacy fallback-tier data into an empty primary tier.
    ///
    /// Runs before first use. Nothing happens when the primary already holds
    /// tasks or when the fallback holds nothing worth copying. Entries are
    /// copied verbatim.
    pub async fn migrate(&self) -> MigrationReport {
        let mut report = MigrationReport::default();

        let primary_tasks = match self.tiers.primary().get_item(TASKS_KEY).await {
            Ok(value) => value,
            Err(e) => {
                warn!("skipping migration, primary tier unreadable: {}", e);
                return report;
            }
        };
        let primary_empty = match primary_tasks {
            None => true,
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };
        if !primary_empty {
            return report;
        }

        let legacy_tasks = self.read_legacy(TASKS_KEY);
        let legacy_categories = self.read_legacy(CATEGORIES_KEY);

        if !legacy_tasks.is_empty() {
            let count = legacy_tasks.len();
            match self.copy_to_primary(TASKS_KEY, legacy_tasks).await {
                Ok(()) => report.tasks = count,
                Err(e) => warn!("migrating tasks failed: {}", e),
            }
        }
        if !legacy_categories.is_empty() {
            let count = legacy_categories.len();
            match self.copy_to_primary(CATEGORIES_KEY, legacy_categories).await {
                Ok(()) => report.categories = count,
                Err(e) => warn!("migrating categories failed: {}", e),
            }
        }

        if report != MigrationReport::default() {
            info!(
                "migrated {} tasks and {} categories from fallback storage",
                report.tasks, report.categories
            );
        }
        report
    }

    fn read_legacy(&self, key: &str) -> Vec<Value> {
        match self.tiers.read_fallback(key) {
            Ok(Some(Value::Array(items))) => items,
            Ok(Some(other)) => {
                warn!("legacy {} is not a list, not migrating it: {}", key, other);
                vec![]
            }
            Ok(None) => vec![],
            Err(e) => {
                warn!("legacy {} unreadable: {}", key, e);
                vec![]
            }
        }
    }

    async fn copy_to_primary(&self, key: &str, items: Vec<Value>) -> InternalResult<()> {
        self.tiers.primary().set_item(key, &Value::Array(items)).await
    }

    async fn read_tasks(&self) -> InternalResult<Collection<Task>> {
        Ok(Collection::decode(TASKS_KEY, self.tiers.read(TASKS_KEY).await?))
    }

    async fn write_tasks(&self, tasks: &Collection<Task>) -> InternalResult<()> {
        self.tiers
            .write(TASKS_KEY, &tasks.encode()?, Mirror::OnFailure)
            .await
    }

    async fn read_categories(&self) -> InternalResult<Collection<Category>> {
        Ok(Collection::decode(
            CATEGORIES_KEY,
            self.tiers.read(CATEGORIES_KEY).await?,
        ))
    }

    async fn write_categories(&self, categories: &Collection<Category>) -> InternalResult<()> {
        self.tiers
            .write(CATEGORIES_KEY, &categories.encode()?, Mirror::Always)
            .await
    }
}

/// A stored collection split into the records that decode and the raw
/// entries that do not. Unreadable entries are written back untouched,
/// after the records.
#[derive(Debug)]
struct Collection<T> {
    records: Vec<T>,
    unreadable: Vec<Value>,
}

impl<T: Clone> From<&[T]> for Collection<T> {
    fn from(records: &[T]) -> Self {
        Self {
            records: records.to_vec(),
            unreadable: vec![],
        }
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    fn decode(key: &str, value: Option<Value>) -> Self {
        let items = match value {
            None | Some(Value::Null) => vec![],
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!("stored {} is not a list, keeping it as one entry", key);
                vec![other]
            }
        };

        let mut collection = Self {
            records: Vec::with_capacity(items.len()),
            unreadable: vec![],
        };
        for item in items {
            match serde_json::from_value(item.clone()) {
                Ok(record) => collection.records.push(record),
                Err(e) => {
                    warn!("keeping unreadable entry in {} as is: {}", key, e);
                    collection.unreadable.push(item);
                }
            }
        }
        collection
    }

    fn encode(&self) -> InternalResult<Value> {
        let mut items = Vec::with_capacity(self.records.len() + self.unreadable.len());
        for record in &self.records {
            items.push(serde_json::to_value(record)?);
        }
        items.extend(self.unreadable.iter().cloned());
        Ok(Value::Array(items))
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty() && self.unreadable.is_empty()
    }
}
