use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use daily_tasks::clock::{format_countdown, time_until_next_midnight, LocalClock};
use daily_tasks::config::PlannerConfig;
use daily_tasks::reset::{ResetCoordinator, ResetScheduler};
use daily_tasks::settings::SharedSettings;
use daily_tasks::storage::{DurableStore, SqliteStore, TextFileStore, TieredStore};
use daily_tasks::todo::TaskBoard;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DAILY_TASKS_CONFIG").ok())
        .map(PathBuf::from);
    let config = PlannerConfig::load(config_path.as_deref())?;

    let primary = Arc::new(SqliteStore::open(&config.primary_db_path())?);
    let fallback = Arc::new(TextFileStore::open(&config.fallback_dir_path())?);

    let settings = Arc::new(SharedSettings::new(fallback.clone()));
    settings.load()?;

    let store = Arc::new(DurableStore::new(TieredStore::new(primary, fallback)));
    let board = Arc::new(TaskBoard::new(
        store,
        settings.clone(),
        ResetCoordinator::new(Arc::new(LocalClock)),
    ));

    if !board.load().await {
        log::error!("starting with an empty board: {:?}", board.error());
    }
    let progress = board.progress();
    log::info!(
        "{} of {} tasks done, {}",
        progress.completed,
        progress.total,
        format_countdown(&time_until_next_midnight())
    );

    let scheduler = ResetScheduler::new(config.reset_poll_interval()).start(board.clone());

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    scheduler.shutdown().await;

    Ok(())
}
