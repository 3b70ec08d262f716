use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::internal_error::{InternalError, InternalResult};

use super::data::*;

pub fn generate_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &suffix[..9])
}

pub fn validate_label(label: &str, what: &str) -> InternalResult<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(InternalError::Validation(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

/// Renumber `tasks` so each `order` equals its position in the slice.
pub fn assign_task_order(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
    tasks
        .into_iter()
        .enumerate()
        .map(|(index, mut task)| {
            task.order = index;
            task.updated_at = now;
            task
        })
        .collect()
}

pub fn assign_category_order(categories: Vec<Category>, now: DateTime<Utc>) -> Vec<Category> {
    categories
        .into_iter()
        .enumerate()
        .map(|(index, mut category)| {
            category.order = index;
            category.updated_at = now;
            category
        })
        .collect()
}

/// `(all tasks outside category_id) ∪ reordered`, keeping the outside tasks in
/// their current sequence.
pub fn merge_reordered(all: &[Task], category_id: &str, reordered: &[Task]) -> Vec<Task> {
    all.iter()
        .filter(|task| task.category_id != category_id)
        .cloned()
        .chain(reordered.iter().cloned())
        .collect()
}

pub fn tasks_in_category<'a>(tasks: &'a [Task], category_id: &str) -> Vec<&'a Task> {
    let mut in_category: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.category_id == category_id)
        .collect();
    in_category.sort_by_key(|task| task.order);
    in_category
}

pub fn progress_of<'a>(tasks: impl Iterator<Item = &'a Task>) -> Progress {
    let mut progress = Progress {
        completed: 0,
        total: 0,
    };
    for task in tasks {
        progress.total += 1;
        if task.completed {
            progress.completed += 1;
        }
    }
    progress
}

/// True when `given` names every id in `current` exactly once and nothing else.
pub fn is_permutation<'a>(
    current: impl IntoIterator<Item = &'a str>,
    given: impl IntoIterator<Item = &'a str>,
) -> bool {
    let current: HashSet<&str> = current.into_iter().collect();
    let mut seen = HashSet::new();
    given
        .into_iter()
        .all(|id| current.contains(id) && seen.insert(id))
        && seen.len() == current.len()
}

pub fn replace_by_id<T: Clone>(
    items: &[T],
    id_of: impl Fn(&T) -> &str,
    updated: &T,
) -> Option<Vec<T>> {
    let id = id_of(updated);
    let index = items.iter().position(|item| id_of(item) == id)?;
    let mut replaced = items.to_vec();
    replaced[index] = updated.clone();
    Some(replaced)
}
