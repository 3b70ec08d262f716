pub mod coordinator;
pub mod scheduler;

pub use coordinator::{ResetCoordinator, ResetOutcome, ResetState};
pub use scheduler::{DailyCheck, ResetScheduler, SchedulerHandle, DEFAULT_POLL_INTERVAL};
