//! Image completion and uncompletion.
//!
//! Completion is a cross-cutting precondition check over the state
//! machine's terminal status: an image may acquire its completion timestamp
//! only when every task reachable through its image areas is Completed.
//! Batch completion produces a per-image outcome map so one blocked image
//! never obscures the others.

use crate::error::Result;
use crate::models::{Image, ReviewTask};
use crate::state_machine::TaskStateMachine;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

/// Per-image outcome of the complete-image operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    Completed,
    AlreadyCompleted,
    /// Precondition failed; the offending task ids are named so batch
    /// callers can report exactly what blocks each image.
    IncompleteTasks { task_ids: Vec<i64> },
    NotFound,
}

/// Outcome of the administrative uncomplete operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncompleteOutcome {
    /// Whether a completion timestamp was actually cleared
    pub cleared: bool,
    /// Completed tasks moved back to Verifying
    pub tasks_reset: u64,
}

#[derive(Clone)]
pub struct ImageLifecycleService {
    pool: PgPool,
    state_machine: TaskStateMachine,
}

impl ImageLifecycleService {
    pub fn new(pool: PgPool) -> Self {
        let state_machine = TaskStateMachine::new(pool.clone());
        Self {
            pool,
            state_machine,
        }
    }

    /// Complete one image if every reachable task is Completed. An image
    /// with zero tasks completes vacuously.
    pub async fn complete_image(&self, image_id: i64) -> Result<CompletionOutcome> {
        let Some(image) = Image::find_by_id(&self.pool, image_id).await? else {
            return Ok(CompletionOutcome::NotFound);
        };
        if image.completed_at.is_some() {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let blocking = ReviewTask::incomplete_task_ids_for_image(&self.pool, image_id).await?;
        if !blocking.is_empty() {
            return Ok(CompletionOutcome::IncompleteTasks { task_ids: blocking });
        }

        // The guard re-checks completed_at, so a concurrent completion
        // resolves to AlreadyCompleted instead of double-stamping.
        if Image::mark_completed(&self.pool, image_id).await? {
            info!(image_id, "image completed");
            Ok(CompletionOutcome::Completed)
        } else {
            Ok(CompletionOutcome::AlreadyCompleted)
        }
    }

    /// Batch completion with a per-image outcome map.
    pub async fn complete_images(
        &self,
        image_ids: &[i64],
    ) -> Result<HashMap<i64, CompletionOutcome>> {
        let mut outcomes = HashMap::with_capacity(image_ids.len());
        for &image_id in image_ids {
            let outcome = self.complete_image(image_id).await?;
            outcomes.insert(image_id, outcome);
        }
        Ok(outcomes)
    }

    /// Clear the completion timestamp and push the image's Completed tasks
    /// back to Verifying for re-review.
    pub async fn uncomplete_image(&self, image_id: i64) -> Result<UncompleteOutcome> {
        let cleared = Image::clear_completed(&self.pool, image_id).await?;
        let tasks_reset = if cleared {
            self.state_machine.reset_on_uncomplete(image_id).await?
        } else {
            0
        };

        if cleared {
            info!(image_id, tasks_reset, "image uncompleted");
        }

        Ok(UncompleteOutcome {
            cleared,
            tasks_reset,
        })
    }
}
