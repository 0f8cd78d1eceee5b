//! Guarded task status transitions.
//!
//! Every transition is a compare-and-swap against the database row
//! (`UPDATE ... WHERE task_id = $1 AND status = expected`): concurrent
//! double-transitions cannot corrupt state because only one update observes
//! the expected source status. The affected-row count is surfaced as a
//! structured [`TransitionOutcome`] so callers can tell an applied
//! transition from a no-op or a missing task instead of being answered with
//! silence.

use super::states::TaskStatus;
use crate::error::{Result, TaskingError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

/// Events that drive a review task through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    /// Reviewer picks up the task
    Start,
    /// Reviewer finishes; hand over to verification
    Complete,
    /// Verifier accepts the work
    VerifyPass,
    /// Verifier rejects the work back to the reviewer
    VerifyFail,
}

/// Required source status and target status for an event.
///
/// The table is total: each event has exactly one legal edge, and the
/// guard in the conditional update enforces the source side.
pub fn transition_for(event: TaskEvent) -> (TaskStatus, TaskStatus) {
    match event {
        TaskEvent::Start => (TaskStatus::Incomplete, TaskStatus::InProgress),
        TaskEvent::Complete => (TaskStatus::InProgress, TaskStatus::Verifying),
        TaskEvent::VerifyPass => (TaskStatus::Verifying, TaskStatus::Completed),
        TaskEvent::VerifyFail => (TaskStatus::Verifying, TaskStatus::InProgress),
    }
}

/// Outcome of a guarded transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The conditional update matched and the status changed.
    Applied { from: TaskStatus, to: TaskStatus },
    /// The task exists but was not in the required source status.
    NotApplied { current: TaskStatus },
    /// No task row with the given id.
    NotFound,
}

impl TransitionOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// State machine over `tasking_tasks` rows.
///
/// Holds no per-task state; the database row is the single source of truth
/// and the conditional update is the only concurrency mechanism.
#[derive(Debug, Clone)]
pub struct TaskStateMachine {
    pool: PgPool,
}

impl TaskStateMachine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn start(&self, task_id: i64) -> Result<TransitionOutcome> {
        self.apply(task_id, TaskEvent::Start).await
    }

    pub async fn complete(&self, task_id: i64) -> Result<TransitionOutcome> {
        self.apply(task_id, TaskEvent::Complete).await
    }

    pub async fn verify_pass(&self, task_id: i64) -> Result<TransitionOutcome> {
        self.apply(task_id, TaskEvent::VerifyPass).await
    }

    pub async fn verify_fail(&self, task_id: i64) -> Result<TransitionOutcome> {
        self.apply(task_id, TaskEvent::VerifyFail).await
    }

    /// Attempt a single guarded transition.
    pub async fn apply(&self, task_id: i64, event: TaskEvent) -> Result<TransitionOutcome> {
        let (expected, target) = transition_for(event);

        let rows_affected = sqlx::query(
            r#"
            UPDATE tasking_tasks
            SET status = $1, updated_at = NOW()
            WHERE task_id = $2 AND status = $3
            "#,
        )
        .bind(target.to_string())
        .bind(task_id)
        .bind(expected.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected > 0 {
            info!(task_id, from = %expected, to = %target, "task transition applied");
            return Ok(TransitionOutcome::Applied {
                from: expected,
                to: target,
            });
        }

        // Zero rows: distinguish "wrong source status" from "no such task".
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM tasking_tasks WHERE task_id = $1")
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            Some(status_str) => {
                let current = status_str
                    .parse::<TaskStatus>()
                    .map_err(TaskingError::InvalidStatus)?;
                debug!(task_id, %current, event = ?event, "task transition was a no-op");
                Ok(TransitionOutcome::NotApplied { current })
            }
            None => {
                debug!(task_id, event = ?event, "task transition target not found");
                Ok(TransitionOutcome::NotFound)
            }
        }
    }

    /// Bulk administrative back-edge used when an image is uncompleted:
    /// every Completed task of the image returns to Verifying. Returns the
    /// number of tasks moved.
    pub async fn reset_on_uncomplete(&self, image_id: i64) -> Result<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE tasking_tasks
            SET status = $1, updated_at = NOW()
            WHERE status = $2
              AND image_area_id IN (
                  SELECT image_area_id FROM tasking_image_areas WHERE image_id = $3
              )
            "#,
        )
        .bind(TaskStatus::Verifying.to_string())
        .bind(TaskStatus::Completed.to_string())
        .bind(image_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        info!(image_id, tasks_reset = rows_affected, "reset completed tasks to verifying");
        Ok(rows_affected)
    }
}
