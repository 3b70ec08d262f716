use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Anything the scheduler can ask to re-check the day boundary.
#[async_trait]
pub trait DailyCheck: Send + Sync {
    async fn check(&self);
}

/// Polls a `DailyCheck` once immediately and then every `interval`. A clock
/// change or a resume from suspend is picked up on the next tick.
pub struct ResetScheduler {
    interval: Duration,
}

impl ResetScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn start<T>(&self, target: Arc<T>) -> SchedulerHandle
    where
        T: DailyCheck + ?Sized + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        debug!("scheduled daily reset check");
                        target.check().await;
                    }
                }
            }
            debug!("reset scheduler stopped");
        });

        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

impl Default for ResetScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// Owns the polling loop. Dropping the handle cancels it.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops the loop, letting an in-flight check finish first.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl DailyCheck for Counter {
        async fn check(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn checks_immediately_then_every_interval() {
        let counter = Arc::new(Counter::default());
        let handle = ResetScheduler::new(Duration::from_secs(60)).start(counter.clone());

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let counter = Arc::new(Counter::default());
        let handle = ResetScheduler::default().start(counter.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(handle);
        let seen = counter.0.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), seen);
    }
}
