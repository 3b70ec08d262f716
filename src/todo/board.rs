use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use serde::Serialize;

use crate::data::DayKey;
use crate::internal_error::InternalResult;
use crate::reset::{DailyCheck, ResetCoordinator, ResetOutcome};
use crate::settings::{DailyResetPreference, SharedSettings};
use crate::storage::DurableStore;
use crate::transfer::{self, ImportReport};

use super::data::*;
use super::util::*;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_reset_date: Option<DayKey>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            tasks: vec![],
            categories: vec![],
            is_loading: true,
            error: None,
            last_reset_date: None,
        }
    }
}

/// In-memory projection of the durable store.
///
/// Every mutation writes through to the store first and only touches memory
/// once that write succeeded, using the exact value that was persisted. A
/// failed write leaves memory as it was and sets `error`.
pub struct TaskBoard {
    store: Arc<DurableStore>,
    preference: Arc<dyn DailyResetPreference>,
    coordinator: ResetCoordinator,
    state: RwLock<BoardState>,
}

impl TaskBoard {
    pub fn new(
        store: Arc<DurableStore>,
        preference: Arc<dyn DailyResetPreference>,
        coordinator: ResetCoordinator,
    ) -> Self {
        Self {
            store,
            preference,
            coordinator,
            state: RwLock::new(BoardState::default()),
        }
    }

    pub fn store(&self) -> &DurableStore {
        &self.store
    }

    /// Migrates legacy data, then re-derives memory from the store.
    pub async fn load(&self) -> bool {
        self.with_state(|state| state.is_loading = true);
        self.store.migrate().await;

        let loaded = self.read_all().await;
        match self.settle(loaded, "Failed to load data") {
            Some((categories, tasks, marker)) => {
                info!("loaded {} tasks in {} categories", tasks.len(), categories.len());
                self.with_state(|state| {
                    state.categories = categories;
                    state.tasks = tasks;
                    state.last_reset_date = marker;
                    state.is_loading = false;
                });
                true
            }
            None => {
                self.with_state(|state| state.is_loading = false);
                false
            }
        }
    }

    async fn read_all(&self) -> InternalResult<(Vec<Category>, Vec<Task>, Option<DayKey>)> {
        // Categories first: the first read seeds the default tasks.
        let categories = self.store.get_categories().await?;
        let tasks = self.store.get_tasks().await?;
        let marker = self.store.get_last_reset_marker().await?;
        Ok((categories, tasks, marker))
    }

    pub async fn add_task(&self, new_task: NewTask) -> Option<Task> {
        let title = rejecting_invalid(validate_label(&new_task.title, "task title"))?;
        let order = self.view(|state| {
            let known = state
                .categories
                .iter()
                .any(|category| category.id == new_task.category_id);
            known.then(|| tasks_in_category(&state.tasks, &new_task.category_id).len())
        });
        let order = match order {
            Some(order) => order,
            None => {
                debug!("rejecting task for unknown category {}", new_task.category_id);
                return None;
            }
        };

        let now = Utc::now();
        let task = Task {
            id: generate_id("task"),
            title,
            completed: false,
            category_id: new_task.category_id,
            order,
            unit_value: new_task.unit_value,
            created_at: now,
            updated_at: now,
        };

        self.settle(self.store.add_task(&task).await, "Failed to add task")?;
        self.with_state(|state| state.tasks.push(task.clone()));
        Some(task)
    }

    pub async fn update_task(&self, task: Task) -> Option<Task> {
        let title = rejecting_invalid(validate_label(&task.title, "task title"))?;
        if !self.has_category(&task.category_id) {
            debug!("rejecting update into unknown category {}", task.category_id);
            return None;
        }
        let updated = Task {
            title,
            updated_at: Utc::now(),
            ..task
        };

        if !self.settle(self.store.update_task(&updated).await, "Failed to update task")? {
            debug!("task {} no longer exists", updated.id);
            return None;
        }
        self.with_state(|state| {
            let replaced = replace_by_id(&state.tasks, |t: &Task| t.id.as_str(), &updated);
            if let Some(replaced) = replaced {
                state.tasks = replaced;
            }
        });
        Some(updated)
    }

    pub async fn delete_task(&self, task_id: &str) -> bool {
        if self
            .settle(self.store.delete_task(task_id).await, "Failed to delete task")
            .is_none()
        {
            return false;
        }
        self.with_state(|state| state.tasks.retain(|task| task.id != task_id));
        true
    }

    /// Flips the stored copy of the task, not the in-memory one, so a stale
    /// view does not decide the new value.
    pub async fn toggle_task(&self, task_id: &str) -> Option<Task> {
        let toggled = self.settle(self.store.toggle_task(task_id).await, "Failed to toggle task")??;
        self.with_state(|state| match state.tasks.iter_mut().find(|t| t.id == toggled.id) {
            Some(task) => *task = toggled.clone(),
            None => state.tasks.push(toggled.clone()),
        });
        Some(toggled)
    }

    /// Renumbers `ordered` by position and persists it together with every
    /// task outside `category_id`. `ordered` must hold exactly the tasks
    /// currently in the category.
    pub async fn reorder_tasks(&self, category_id: &str, ordered: Vec<Task>) -> bool {
        if let Some(stray) = ordered.iter().find(|task| task.category_id != category_id) {
            debug!("task {} is not in category {}", stray.id, category_id);
            return false;
        }
        let same_set = self.view(|state| {
            is_permutation(
                tasks_in_category(&state.tasks, category_id)
                    .into_iter()
                    .map(|task| task.id.as_str()),
                ordered.iter().map(|task| task.id.as_str()),
            )
        });
        if !same_set {
            debug!("task reorder does not match the tasks of {}", category_id);
            return false;
        }

        let reordered = assign_task_order(ordered, Utc::now());
        let persisted = self.settle(
            self.store.reorder_tasks(category_id, &reordered).await,
            "Failed to reorder tasks",
        );
        match persisted {
            Some(tasks) => {
                self.with_state(|state| state.tasks = tasks);
                true
            }
            None => false,
        }
    }

    pub async fn add_category(&self, new_category: NewCategory) -> Option<Category> {
        let name = rejecting_invalid(validate_label(&new_category.name, "category name"))?;
        let order = self.view(|state| state.categories.len());

        let now = Utc::now();
        let category = Category {
            id: generate_id("category"),
            name,
            color: new_category.color,
            order,
            created_at: now,
            updated_at: now,
        };

        self.settle(self.store.add_category(&category).await, "Failed to add category")?;
        self.with_state(|state| state.categories.push(category.clone()));
        Some(category)
    }

    pub async fn update_category(&self, category: Category) -> Option<Category> {
        let name = rejecting_invalid(validate_label(&category.name, "category name"))?;
        let updated = Category {
            name,
            updated_at: Utc::now(),
            ..category
        };

        if !self.settle(
            self.store.update_category(&updated).await,
            "Failed to update category",
        )? {
            debug!("category {} no longer exists", updated.id);
            return None;
        }
        self.with_state(|state| {
            let replaced = replace_by_id(&state.categories, |c: &Category| c.id.as_str(), &updated);
            if let Some(replaced) = replaced {
                state.categories = replaced;
            }
        });
        Some(updated)
    }

    /// Deletes the category and its tasks from the store and from memory.
    pub async fn delete_category(&self, category_id: &str) -> bool {
        if self
            .settle(
                self.store.delete_category(category_id).await,
                "Failed to delete category",
            )
            .is_none()
        {
            return false;
        }
        self.with_state(|state| {
            state.tasks.retain(|task| task.category_id != category_id);
            state.categories.retain(|category| category.id != category_id);
        });
        true
    }

    /// `ordered` must hold exactly the current categories.
    pub async fn reorder_categories(&self, ordered: Vec<Category>) -> bool {
        let same_set = self.view(|state| {
            is_permutation(
                state.categories.iter().map(|c| c.id.as_str()),
                ordered.iter().map(|c| c.id.as_str()),
            )
        });
        if !same_set {
            debug!("category reorder does not match the current categories");
            return false;
        }

        let reordered = assign_category_order(ordered, Utc::now());
        if self
            .settle(
                self.store.reorder_categories(&reordered).await,
                "Failed to reorder categories",
            )
            .is_none()
        {
            return false;
        }
        self.with_state(|state| state.categories = reordered);
        true
    }

    /// Evaluates the daily reset once the board has loaded. Returns `None`
    /// when nothing was evaluated or the evaluation failed.
    pub async fn check_daily_reset(&self) -> Option<ResetOutcome> {
        if self.view(|state| state.is_loading) {
            debug!("board still loading, skipping daily reset check");
            return None;
        }

        let outcome = self
            .coordinator
            .evaluate(&self.store, self.preference.as_ref())
            .await;
        let outcome = self.settle(outcome, "Failed to reset daily tasks")?;
        self.apply(&outcome);
        Some(outcome)
    }

    /// Manual reset: bypasses the date check and the preference.
    pub async fn reset_daily_tasks(&self) -> Option<ResetOutcome> {
        let outcome = self.coordinator.force_reset(&self.store).await;
        let outcome = self.settle(outcome, "Failed to reset daily tasks")?;
        self.apply(&outcome);
        Some(outcome)
    }

    fn apply(&self, outcome: &ResetOutcome) {
        self.with_state(|state| match outcome {
            ResetOutcome::MarkerInitialized(day) => {
                state.last_reset_date = Some(day.clone());
            }
            ResetOutcome::Reset { day, tasks } => {
                state.tasks = tasks.clone();
                state.last_reset_date = Some(day.clone());
            }
            ResetOutcome::PreferencePending | ResetOutcome::Disabled | ResetOutcome::UpToDate => {}
        });
    }

    pub async fn export_json(&self, settings: &SharedSettings) -> InternalResult<String> {
        let current = settings.current().unwrap_or_default();
        let document = transfer::export_data(&self.store, &current).await?;
        transfer::to_json(&document)
    }

    /// Replaces everything with the document's contents, applies its
    /// settings and reloads.
    pub async fn import_json(&self, raw: &str, settings: &SharedSettings) -> ImportReport {
        let imported = match transfer::import_data(&self.store, raw).await {
            Ok(imported) => imported,
            Err(e) => {
                error!("import failed: {}", e);
                return ImportReport::failed(e.to_string());
            }
        };
        if let Err(e) = settings.replace(imported.settings.clone()) {
            error!("applying imported settings failed: {}", e);
        }
        self.load().await;

        ImportReport::succeeded(format!(
            "Successfully imported {} tasks and {} categories",
            imported.tasks, imported.categories
        ))
    }

    pub fn snapshot(&self) -> BoardState {
        self.view(|state| state.clone())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.view(|state| state.tasks.clone())
    }

    pub fn categories(&self) -> Vec<Category> {
        self.view(|state| state.categories.clone())
    }

    pub fn tasks_in_category(&self, category_id: &str) -> Vec<Task> {
        self.view(|state| {
            tasks_in_category(&state.tasks, category_id)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn sorted_categories(&self) -> Vec<Category> {
        let mut categories = self.categories();
        categories.sort_by_key(|category| category.order);
        categories
    }

    pub fn progress(&self) -> Progress {
        self.view(|state| progress_of(state.tasks.iter()))
    }

    pub fn category_progress(&self, category_id: &str) -> Progress {
        self.view(|state| progress_of(tasks_in_category(&state.tasks, category_id).into_iter()))
    }

    pub fn last_reset_date(&self) -> Option<DayKey> {
        self.view(|state| state.last_reset_date.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.view(|state| state.error.clone())
    }

    pub fn clear_error(&self) {
        self.with_state(|state| state.error = None);
    }

    pub fn is_loading(&self) -> bool {
        self.view(|state| state.is_loading)
    }

    fn has_category(&self, category_id: &str) -> bool {
        self.view(|state| state.categories.iter().any(|c| c.id == category_id))
    }

    /// Turns a storage failure into the user-visible error string.
    fn settle<T>(&self, result: InternalResult<T>, message: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{}: {}", message, e);
                self.with_state(|state| state.error = Some(message.to_string()));
                None
            }
        }
    }

    fn view<R>(&self, f: impl FnOnce(&BoardState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

#[async_trait]
impl DailyCheck for TaskBoard {
    async fn check(&self) {
        self.check_daily_reset().await;
    }
}

/// Validation failures are the caller's to surface; the board just declines.
fn rejecting_invalid<T>(result: InternalResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}
