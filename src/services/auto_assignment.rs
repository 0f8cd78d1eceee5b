//! # Auto-Assignment Load Balancer
//!
//! On ingestion of a new area-of-image, picks the least-loaded eligible
//! reviewer and creates its task.
//!
//! Selection criteria:
//! 1. The target image area must resolve (area name + external image id).
//! 2. Candidates are the reviewer role's members, filtered by presence.
//! 3. Load is each candidate's count of non-terminal tasks, computed in one
//!    grouped query.
//! 4. Minimum load wins; ties break lexicographically on identity id so the
//!    choice is deterministic.
//!
//! Load computation and task insertion are not one atomic transaction: two
//! concurrent assignments can both observe the same counts and land on the
//! same reviewer. Balancing is best-effort, not a hard guarantee.

use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::models::{ImageArea, ReviewTask};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an assignment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    /// A task now exists for the image area. `replaced` is true when an
    /// earlier task was overwritten by the upsert.
    Assigned {
        assignee_id: String,
        task_id: i64,
        replaced: bool,
    },
    /// Nothing resolved or nobody eligible; no side effects (unless noted).
    Unassigned,
}

/// Pick the least-loaded candidate; ties break by lexicographic id.
///
/// Pure so the balancing rule is testable without a database.
pub fn pick_least_loaded(candidates: &[(String, i64)]) -> Option<&str> {
    candidates
        .iter()
        .min_by_key(|(id, count)| (*count, id.as_str()))
        .map(|(id, _)| id.as_str())
}

#[derive(Clone)]
pub struct AutoAssignmentService {
    pool: PgPool,
    resolver: Arc<IdentityResolver>,
    reviewer_role: String,
}

impl AutoAssignmentService {
    pub fn new(pool: PgPool, resolver: Arc<IdentityResolver>, reviewer_role: String) -> Self {
        Self {
            pool,
            resolver,
            reviewer_role,
        }
    }

    /// Auto-assign the task for one area of one image.
    pub async fn auto_assign(
        &self,
        area_name: &str,
        external_image_id: i64,
    ) -> Result<AssignmentOutcome> {
        let Some(image_area) =
            ImageArea::resolve(&self.pool, area_name, external_image_id).await?
        else {
            debug!(area_name, external_image_id, "no image area resolved, leaving unassigned");
            return Ok(AssignmentOutcome::Unassigned);
        };

        let candidates = self.resolver.eligible_for_role(&self.reviewer_role).await?;
        if candidates.is_empty() {
            debug!(
                role = %self.reviewer_role,
                "no eligible reviewers present, leaving unassigned"
            );
            return Ok(AssignmentOutcome::Unassigned);
        }

        let candidate_ids: Vec<String> = candidates.into_iter().map(|u| u.id).collect();
        let counts = ReviewTask::active_counts(&self.pool, &candidate_ids).await?;
        let loads: Vec<(String, i64)> = candidate_ids
            .into_iter()
            .map(|id| {
                let count = counts.get(&id).copied().unwrap_or(0);
                (id, count)
            })
            .collect();

        // Non-empty candidate list, so a pick always exists.
        let Some(chosen) = pick_least_loaded(&loads).map(str::to_string) else {
            return Ok(AssignmentOutcome::Unassigned);
        };

        self.upsert_assignment(image_area.image_area_id, &chosen)
            .await
    }

    /// Manual assignment: the identity comes from the caller instead of the
    /// load computation. Unknown usernames and unresolvable areas leave the
    /// graph untouched.
    pub async fn assign_task(
        &self,
        area_name: &str,
        external_image_id: i64,
        username: &str,
    ) -> Result<AssignmentOutcome> {
        let Some(image_area) =
            ImageArea::resolve(&self.pool, area_name, external_image_id).await?
        else {
            debug!(area_name, external_image_id, "no image area resolved for manual assignment");
            return Ok(AssignmentOutcome::Unassigned);
        };

        let Some(assignee_id) = self.resolver.find_user_id(username).await? else {
            debug!(username, "username not known to identity provider");
            return Ok(AssignmentOutcome::Unassigned);
        };

        self.upsert_assignment(image_area.image_area_id, &assignee_id)
            .await
    }

    async fn upsert_assignment(
        &self,
        image_area_id: i64,
        assignee_id: &str,
    ) -> Result<AssignmentOutcome> {
        let (task, inserted) =
            ReviewTask::upsert_for_image_area(&self.pool, image_area_id, Some(assignee_id))
                .await?;
        let replaced = !inserted;

        info!(
            image_area_id,
            assignee_id,
            task_id = task.task_id,
            replaced,
            "task assigned"
        );

        Ok(AssignmentOutcome::Assigned {
            assignee_id: assignee_id.to_string(),
            task_id: task.task_id,
            replaced,
        })
    }
}
