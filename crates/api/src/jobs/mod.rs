//! Background jobs and their scheduler.

mod finish_events;
mod pool_metrics;
mod scheduler;

pub use finish_events::FinishEventsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
