#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use daily_tasks::clock::Clock;
use daily_tasks::data::DayKey;
use daily_tasks::reset::ResetCoordinator;
use daily_tasks::settings::DailyResetPreference;
use daily_tasks::storage::{DurableStore, FallbackStore, MemoryStore, PrimaryStore, TieredStore};
use daily_tasks::todo::{Category, Task, TaskBoard};
use daily_tasks::{InternalError, InternalResult};

/// Primary tier that can be told to fail, and counts write attempts.
#[derive(Default)]
pub struct FlakyPrimary {
    pub inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_key: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl FlakyPrimary {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Refuses writes to `key` only.
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.failing_key.lock().unwrap() = key.map(str::to_string);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrimaryStore for FlakyPrimary {
    async fn get_item(&self, key: &str) -> InternalResult<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(InternalError::Storage("primary read refused".into()));
        }
        PrimaryStore::get_item(&self.inner, key).await
    }

    async fn set_item(&self, key: &str, value: &Value) -> InternalResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) || refuses(&self.failing_key, key) {
            return Err(InternalError::Storage("primary write refused".into()));
        }
        PrimaryStore::set_item(&self.inner, key, value).await
    }

    async fn remove_item(&self, key: &str) -> InternalResult<()> {
        PrimaryStore::remove_item(&self.inner, key).await
    }
}

#[derive(Default)]
pub struct FlakyFallback {
    pub inner: MemoryStore,
    fail: AtomicBool,
    failing_key: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl FlakyFallback {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Refuses writes to `key` only.
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.failing_key.lock().unwrap() = key.map(str::to_string);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn decoded<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        FallbackStore::get_item(&self.inner, key)
            .unwrap()
            .map(|text| serde_json::from_str(&text).unwrap())
    }
}

impl FallbackStore for FlakyFallback {
    fn get_item(&self, key: &str) -> InternalResult<Option<String>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(InternalError::Storage("fallback read refused".into()));
        }
        FallbackStore::get_item(&self.inner, key)
    }

    fn set_item(&self, key: &str, value: &str) -> InternalResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) || refuses(&self.failing_key, key) {
            return Err(InternalError::Storage("fallback write refused".into()));
        }
        FallbackStore::set_item(&self.inner, key, value)
    }

    fn remove_item(&self, key: &str) -> InternalResult<()> {
        FallbackStore::remove_item(&self.inner, key)
    }
}

fn refuses(failing_key: &Mutex<Option<String>>, key: &str) -> bool {
    failing_key.lock().unwrap().as_deref() == Some(key)
}

pub struct FixedClock(Mutex<DayKey>);

impl FixedClock {
    pub fn set(&self, day: &str) {
        *self.0.lock().unwrap() = day.to_string();
    }
}

impl Clock for FixedClock {
    fn today_key(&self) -> DayKey {
        self.0.lock().unwrap().clone()
    }
}

pub struct FixedPreference(Mutex<Option<bool>>);

impl FixedPreference {
    pub fn set(&self, enabled: Option<bool>) {
        *self.0.lock().unwrap() = enabled;
    }
}

impl DailyResetPreference for FixedPreference {
    fn is_daily_reset_enabled(&self) -> Option<bool> {
        *self.0.lock().unwrap()
    }
}

pub struct Harness {
    pub primary: Arc<FlakyPrimary>,
    pub fallback: Arc<FlakyFallback>,
    pub clock: Arc<FixedClock>,
    pub preference: Arc<FixedPreference>,
    pub store: Arc<DurableStore>,
    pub board: Arc<TaskBoard>,
}

impl Harness {
    pub fn new(today: &str, enabled: Option<bool>) -> Self {
        let primary = Arc::new(FlakyPrimary::default());
        let fallback = Arc::new(FlakyFallback::default());
        let clock = Arc::new(FixedClock(Mutex::new(today.to_string())));
        let preference = Arc::new(FixedPreference(Mutex::new(enabled)));

        let store = Arc::new(DurableStore::new(TieredStore::new(
            primary.clone(),
            fallback.clone(),
        )));
        let board = Arc::new(TaskBoard::new(
            store.clone(),
            preference.clone(),
            ResetCoordinator::new(clock.clone()),
        ));

        Self {
            primary,
            fallback,
            clock,
            preference,
            store,
            board,
        }
    }

    /// Writes the given records straight into the store, bypassing the board.
    pub async fn seed(&self, categories: &[Category], tasks: &[Task], marker: Option<&str>) {
        self.store.save_categories(categories).await.unwrap();
        self.store.save_tasks(tasks).await.unwrap();
        if let Some(day) = marker {
            self.store.set_last_reset_marker(day).await.unwrap();
        }
    }

    pub async fn stored_tasks(&self) -> Vec<Task> {
        self.store.get_tasks().await.unwrap()
    }

    pub async fn stored_marker(&self) -> Option<DayKey> {
        self.store.get_last_reset_marker().await.unwrap()
    }
}

pub fn category(id: &str, order: usize) -> Category {
    let then = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    Category {
        id: id.to_string(),
        name: format!("Category {}", id),
        color: "#123456".to_string(),
        order,
        created_at: then,
        updated_at: then,
    }
}

pub fn task(id: &str, category_id: &str, completed: bool, order: usize) -> Task {
    let then = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    Task {
        id: id.to_string(),
        title: format!("Task {}", id),
        completed,
        category_id: category_id.to_string(),
        order,
        unit_value: None,
        created_at: then,
        updated_at: then,
    }
}

pub fn completion(tasks: &[Task]) -> Vec<(String, bool)> {
    tasks.iter().map(|t| (t.id.clone(), t.completed)).collect()
}
