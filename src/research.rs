//! Research task polling.
//!
//! A research task is created remotely and then polled at a fixed cadence
//! until it completes, fails, or the attempt budget runs out:
//!
//! ```text
//! Created ──▶ Polling ──┬──▶ Completed   (Ok(ResearchOutcome::Completed))
//!                       ├──▶ Failed      (Err(ScoutError::TaskFailed))
//!                       └──▶ TimedOut    (Ok(ResearchOutcome::TimedOut))
//! ```
//!
//! The first poll happens immediately after creation; the interval is waited
//! only between attempts. There is no backoff and no jitter. The loop
//! observes a [`CancellationToken`] both while waiting and while a status
//! request is in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{ExaApi, ResearchParams};
use crate::config::ResearchConfig;
use crate::error::ScoutError;
use crate::models::{ExaResearchStatus, ExaResearchTask, ResearchReport, ResearchState};
use crate::shape::shape_research;

/// Fixed polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSchedule {
    /// 60 polls, 10 seconds apart.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 60,
        }
    }
}

impl From<&ResearchConfig> for PollSchedule {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Non-error outcomes of [`ResearchPoller::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchOutcome {
    Completed(ResearchReport),
    /// No terminal status was observed within the attempt budget.
    TimedOut { task_id: String, attempts: u32 },
}

pub struct ResearchPoller {
    api: Arc<dyn ExaApi>,
    model: String,
    schedule: PollSchedule,
}

impl ResearchPoller {
    pub fn new(api: Arc<dyn ExaApi>, model: impl Into<String>, schedule: PollSchedule) -> Self {
        Self {
            api,
            model: model.into(),
            schedule,
        }
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Creates a research task and returns its id.
    pub async fn create(&self, instructions: &str) -> Result<String, ScoutError> {
        if instructions.trim().is_empty() {
            return Err(ScoutError::InvalidInput(
                "Instructions are required".to_string(),
            ));
        }

        let task = self
            .api
            .research_create(&ResearchParams {
                instructions: instructions.to_string(),
                model: self.model.clone(),
            })
            .await
            .map_err(|e| ScoutError::CreateFailed(e.to_string()))?;

        let task_id = resolve_task_id(task)?;
        tracing::info!(task_id = %task_id, "research task created");
        Ok(task_id)
    }

    /// Fetches the current status of `task_id`.
    pub async fn poll(&self, task_id: &str) -> Result<ExaResearchStatus, ScoutError> {
        self.api
            .research_status(task_id)
            .await
            .map_err(|e| ScoutError::PollFailed(e.to_string()))
    }

    /// Creates a task and polls it to a terminal state.
    pub async fn run(
        &self,
        instructions: &str,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, ScoutError> {
        let task_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScoutError::Cancelled),
            created = self.create(instructions) => created?,
        };

        for attempt in 1..=self.schedule.max_attempts {
            if attempt > 1 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(cancelled(&task_id, attempt)),
                    _ = tokio::time::sleep(self.schedule.interval) => {}
                }
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(&task_id, attempt)),
                status = self.poll(&task_id) => status?,
            };

            match status.status {
                ResearchState::Completed => {
                    tracing::info!(task_id = %task_id, attempt, "research task completed");
                    return Ok(ResearchOutcome::Completed(shape_research(status)?));
                }
                ResearchState::Failed => {
                    tracing::warn!(task_id = %task_id, attempt, "research task failed");
                    return Err(ScoutError::TaskFailed { task_id });
                }
                ResearchState::Unknown => {
                    tracing::debug!(task_id = %task_id, attempt, "unrecognized research status");
                }
                ResearchState::Pending | ResearchState::Running => {
                    tracing::debug!(task_id = %task_id, attempt, state = ?status.status, "research task in progress");
                }
            }
        }

        tracing::warn!(
            task_id = %task_id,
            attempts = self.schedule.max_attempts,
            "research task timed out"
        );
        Ok(ResearchOutcome::TimedOut {
            task_id,
            attempts: self.schedule.max_attempts,
        })
    }
}

fn cancelled(task_id: &str, attempt: u32) -> ScoutError {
    tracing::info!(task_id, attempt, "research polling cancelled");
    ScoutError::Cancelled
}

/// Picks the task id from the create response.
///
/// `researchId` wins when both aliases are present; a disagreement between
/// them is logged as a data-quality warning.
fn resolve_task_id(task: ExaResearchTask) -> Result<String, ScoutError> {
    let research_id = task.research_id.filter(|s| !s.trim().is_empty());
    let id = task.id.filter(|s| !s.trim().is_empty());

    match (research_id, id) {
        (Some(research_id), Some(id)) => {
            if research_id != id {
                tracing::warn!(
                    research_id = %research_id,
                    id = %id,
                    "research create response carries conflicting task ids; using researchId"
                );
            }
            Ok(research_id)
        }
        (Some(research_id), None) => Ok(research_id),
        (None, Some(id)) => Ok(id),
        (None, None) => Err(ScoutError::CreateFailed(
            "Failed to create research task".to_string(),
        )),
    }
}
