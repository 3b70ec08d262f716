use std::sync::Arc;

use log::{debug, info};

use crate::clock::Clock;
use crate::data::DayKey;
use crate::internal_error::InternalResult;
use crate::settings::DailyResetPreference;
use crate::storage::DurableStore;
use crate::todo::data::Task;

/// Where the persisted marker stands relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    /// The preference has not loaded yet.
    Pending,
    Disabled,
    NeverReset,
    UpToDate,
    Stale,
}

impl ResetState {
    pub fn classify(enabled: Option<bool>, marker: Option<&str>, today: &str) -> ResetState {
        match enabled {
            None => return ResetState::Pending,
            Some(false) => return ResetState::Disabled,
            Some(true) => {}
        }

        match marker {
            None | Some("") => ResetState::NeverReset,
            Some(day) if day == today => ResetState::UpToDate,
            Some(_) => ResetState::Stale,
        }
    }
}

/// What an evaluation did. Anything carrying data has already been
/// persisted by the time it is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    PreferencePending,
    Disabled,
    UpToDate,
    MarkerInitialized(DayKey),
    Reset { day: DayKey, tasks: Vec<Task> },
}

pub struct ResetCoordinator {
    clock: Arc<dyn Clock>,
}

impl ResetCoordinator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn today_key(&self) -> DayKey {
        self.clock.today_key()
    }

    /// Runs the daily-reset state machine once.
    ///
    /// A missing marker is stamped without touching any task; a stale marker
    /// clears every completion flag, then advances the marker. Neither the
    /// preference gate nor an up-to-date marker writes anything.
    pub async fn evaluate(
        &self,
        store: &DurableStore,
        preference: &dyn DailyResetPreference,
    ) -> InternalResult<ResetOutcome> {
        let enabled = preference.is_daily_reset_enabled();
        let today = self.today_key();
        let marker = match enabled {
            Some(true) => store.get_last_reset_marker().await?,
            _ => None,
        };

        match ResetState::classify(enabled, marker.as_deref(), &today) {
            ResetState::Pending => Ok(ResetOutcome::PreferencePending),
            ResetState::Disabled => Ok(ResetOutcome::Disabled),
            ResetState::UpToDate => {
                debug!("daily reset already done for {}", today);
                Ok(ResetOutcome::UpToDate)
            }
            ResetState::NeverReset => {
                store.set_last_reset_marker(&today).await?;
                info!("no reset marker found, stamped {}", today);
                Ok(ResetOutcome::MarkerInitialized(today))
            }
            ResetState::Stale => self.reset(store, today).await,
        }
    }

    /// Manual override: clears completions and stamps today regardless of
    /// the marker or the preference.
    pub async fn force_reset(&self, store: &DurableStore) -> InternalResult<ResetOutcome> {
        self.reset(store, self.today_key()).await
    }

    async fn reset(&self, store: &DurableStore, today: DayKey) -> InternalResult<ResetOutcome> {
        let tasks = store.reset_daily_tasks().await?;
        store.set_last_reset_marker(&today).await?;
        info!("daily reset for {} cleared {} tasks", today, tasks.len());
        Ok(ResetOutcome::Reset { day: today, tasks })
    }
}
