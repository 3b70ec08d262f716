mod common;

use std::sync::Arc;

use common::*;
use daily_tasks::clock::LocalClock;
use daily_tasks::reset::ResetCoordinator;
use daily_tasks::settings::SharedSettings;
use daily_tasks::storage::durable::{CATEGORIES_KEY, LAST_RESET_KEY, TASKS_KEY};
use daily_tasks::storage::{
    DurableStore, FallbackStore, PrimaryStore, SqliteStore, TextFileStore, TieredStore,
};
use daily_tasks::todo::{NewTask, Task, TaskBoard};
use serde_json::json;

const TODAY: &str = "2024-02-05";

#[tokio::test]
async fn primary_write_failure_lands_in_fallback() {
    let h = Harness::new(TODAY, Some(true));
    h.primary.fail_writes(true);
    let tasks = vec![task("a", "c", true, 0), task("b", "c", false, 1)];

    h.store.save_tasks(&tasks).await.unwrap();

    let in_fallback: Vec<Task> = h.fallback.decoded(TASKS_KEY).unwrap();
    assert_eq!(in_fallback, tasks);
    assert!(PrimaryStore::get_item(&h.primary.inner, TASKS_KEY)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn board_mutations_survive_a_broken_primary() {
    let h = Harness::new(TODAY, Some(true));
    h.seed(&[category("c", 0)], &[], None).await;
    h.board.load().await;
    h.primary.fail_writes(true);

    let added = h
        .board
        .add_task(NewTask {
            title: "Stretch".to_string(),
            category_id: "c".to_string(),
            unit_value: Some(10.0),
        })
        .await
        .unwrap();

    assert_eq!(h.board.error(), None);
    let in_fallback: Vec<Task> = h.fallback.decoded(TASKS_KEY).unwrap();
    assert_eq!(in_fallback, vec![added]);
}

#[tokio::test]
async fn total_failure_is_surfaced_and_memory_kept() {
    let h = Harness::new(TODAY, Some(true));
    h.seed(&[category("c", 0)], &[task("a", "c", false, 0)], None)
        .await;
    h.board.load().await;
    h.primary.fail_writes(true);
    h.fallback.fail(true);

    let added = h
        .board
        .add_task(NewTask {
            title: "Stretch".to_string(),
            category_id: "c".to_string(),
            unit_value: None,
        })
        .await;

    assert!(added.is_none());
    assert_eq!(h.board.error().as_deref(), Some("Failed to add task"));
    assert_eq!(h.board.tasks().len(), 1);

    assert!(h.board.toggle_task("a").await.is_none());
    assert_eq!(h.board.error().as_deref(), Some("Failed to toggle task"));
    assert!(!h.board.tasks()[0].completed);
}

#[tokio::test]
async fn reads_fall_back_when_primary_errors() {
    let h = Harness::new(TODAY, Some(true));
    FallbackStore::set_item(
        &h.fallback.inner,
        TASKS_KEY,
        &json!([{
            "id": "legacy",
            "title": "Old task",
            "completed": true,
            "categoryId": "c",
            "order": 0,
            "createdAt": 1704067200000i64,
            "updatedAt": "Mon, 01 Jan 2024 00:00:00 +0000"
        }])
        .to_string(),
    )
    .unwrap();
    h.primary.fail_reads(true);

    let tasks = h.store.get_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "legacy");
    assert_eq!(tasks[0].created_at, tasks[0].updated_at);

    h.fallback.fail(true);
    assert!(h.store.get_tasks().await.is_err());
}

#[tokio::test]
async fn marker_falls_back_when_primary_has_none() {
    let h = Harness::new(TODAY, Some(true));
    FallbackStore::set_item(&h.fallback.inner, LAST_RESET_KEY, "\"2024-02-01\"").unwrap();

    assert_eq!(h.stored_marker().await.as_deref(), Some("2024-02-01"));

    h.store.set_last_reset_marker(TODAY).await.unwrap();
    assert_eq!(h.stored_marker().await.as_deref(), Some(TODAY));
    assert_eq!(
        h.fallback.decoded::<String>(LAST_RESET_KEY).as_deref(),
        Some(TODAY)
    );
}

#[tokio::test]
async fn migration_copies_legacy_tasks_into_primary() {
    let h = Harness::new(TODAY, Some(true));
    let legacy: Vec<Task> = (0..5)
        .map(|n| task(&format!("t{}", n), "c", n % 2 == 0, n))
        .collect();
    FallbackStore::set_item(
        &h.fallback.inner,
        TASKS_KEY,
        &serde_json::to_string(&legacy).unwrap(),
    )
    .unwrap();
    PrimaryStore::set_item(&h.primary.inner, TASKS_KEY, &json!([]))
        .await
        .unwrap();

    let report = h.store.migrate().await;
    assert_eq!(report.tasks, 5);
    assert_eq!(report.categories, 0);

    let in_primary = PrimaryStore::get_item(&h.primary.inner, TASKS_KEY)
        .await
        .unwrap()
        .unwrap();
    let in_primary: Vec<Task> = serde_json::from_value(in_primary).unwrap();
    assert_eq!(in_primary, legacy);
    assert_eq!(h.store.get_tasks().await.unwrap(), legacy);
}

#[tokio::test]
async fn migration_leaves_populated_primary_alone() {
    let h = Harness::new(TODAY, Some(true));
    h.store.save_tasks(&[task("current", "c", false, 0)]).await.unwrap();
    FallbackStore::set_item(
        &h.fallback.inner,
        TASKS_KEY,
        &serde_json::to_string(&[task("legacy", "c", false, 0)]).unwrap(),
    )
    .unwrap();
    FallbackStore::set_item(
        &h.fallback.inner,
        CATEGORIES_KEY,
        &serde_json::to_string(&[category("legacy", 0)]).unwrap(),
    )
    .unwrap();

    let report = h.store.migrate().await;
    assert_eq!((report.tasks, report.categories), (0, 0));
    assert_eq!(h.stored_tasks().await[0].id, "current");
}

#[tokio::test]
async fn fresh_install_loads_seed_data() {
    let h = Harness::new(TODAY, Some(true));
    assert!(h.board.is_loading());
    assert!(h.board.load().await);

    let state = h.board.snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
    assert_eq!(h.board.categories().len(), 2);
    assert_eq!(h.board.tasks().len(), 10);
    assert_eq!(h.board.category_progress("default-todo").total, 5);
    assert_eq!(h.stored_tasks().await.len(), 10);
}

#[tokio::test]
async fn sqlite_and_text_tiers_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("daily_tasks.db");
    let fallback_dir = dir.path().join("fallback");

    let open = || {
        let primary = Arc::new(SqliteStore::open(&db_path).unwrap());
        let fallback = Arc::new(TextFileStore::open(&fallback_dir).unwrap());
        let settings = Arc::new(SharedSettings::new(fallback.clone()));
        settings.load().unwrap();
        let store = Arc::new(DurableStore::new(TieredStore::new(primary, fallback)));
        TaskBoard::new(store, settings, ResetCoordinator::new(Arc::new(LocalClock)))
    };

    let first_id = {
        let board = open();
        assert!(board.load().await);
        board.check_daily_reset().await.unwrap();
        let id = board.tasks_in_category("default-chores")[0].id.clone();
        board.toggle_task(&id).await.unwrap();
        id
    };

    let board = open();
    assert!(board.load().await);
    let reloaded = board
        .tasks()
        .into_iter()
        .find(|t| t.id == first_id)
        .unwrap();
    assert!(reloaded.completed);
    assert!(board.last_reset_date().is_some());
    assert!(fallback_dir.join("categories.json").exists());
}
