//! Finishes live events whose end date has passed.

use chrono::Utc;
use domain::services::EventService;

use super::scheduler::{Job, JobFrequency};

pub struct FinishEventsJob {
    events: EventService,
    interval_secs: u64,
}

impl FinishEventsJob {
    pub fn new(events: EventService, interval_secs: u64) -> Self {
        Self {
            events,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for FinishEventsJob {
    fn name(&self) -> &'static str {
        "finish_events"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let finished = self
            .events
            .finish_overdue(Utc::now())
            .await
            .map_err(|e| e.to_string())?;
        if finished > 0 {
            tracing::info!(finished = finished, "Finished overdue events");
        }
        Ok(())
    }
}
