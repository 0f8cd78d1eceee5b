//! # ReviewTask Model
//!
//! The reviewable unit of work for one image/area pair, carrying the
//! four-state lifecycle, an optional assignee (opaque identity id), and
//! free-text remarks.
//!
//! ## Database Schema
//!
//! Maps to the `tasking_tasks` table:
//! - `task_id`: primary key (BIGSERIAL)
//! - `image_area_id`: owning join row, UNIQUE (one task per image/area)
//! - `assignee_id`: nullable opaque identity id; NULL means unassigned
//! - `status`: one of the four lifecycle strings, CHECK-constrained
//! - `remarks`: free text, defaults to empty
//!
//! Status is stored as its string form and parsed on read, matching how
//! transitions are guarded (`WHERE status = expected`) in the state machine.

use crate::error::{Result as TaskingResult, TaskingError};
use crate::state_machine::TaskStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReviewTask {
    pub task_id: i64,
    pub image_area_id: i64,
    pub assignee_id: Option<String>,
    pub status: String,
    pub remarks: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

const TASK_COLUMNS: &str =
    "task_id, image_area_id, assignee_id, status, remarks, created_at, updated_at";

/// Upsert result row: the task plus whether the statement inserted it.
#[derive(Debug, FromRow)]
struct UpsertedTask {
    #[sqlx(flatten)]
    task: ReviewTask,
    inserted: bool,
}

impl ReviewTask {
    /// Parse the stored status string
    pub fn task_status(&self) -> TaskingResult<TaskStatus> {
        self.status
            .parse::<TaskStatus>()
            .map_err(TaskingError::InvalidStatus)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ReviewTask>, sqlx::Error> {
        sqlx::query_as::<_, ReviewTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasking_tasks WHERE task_id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_image_area(
        pool: &PgPool,
        image_area_id: i64,
    ) -> Result<Option<ReviewTask>, sqlx::Error> {
        sqlx::query_as::<_, ReviewTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasking_tasks WHERE image_area_id = $1"
        ))
        .bind(image_area_id)
        .fetch_optional(pool)
        .await
    }

    /// Upsert the task for a join row, guarded by the uniqueness constraint
    /// on `image_area_id`. Re-running for an already-tasked image area
    /// overwrites the assignment and resets the status to Incomplete;
    /// callers surface that through their own outcome types.
    ///
    /// The returned flag is true when the row was freshly inserted. It is
    /// derived from the upsert itself (`xmax = 0` holds only for rows the
    /// inserting transaction created), not from a separate read, so a
    /// concurrent upsert landing between statements cannot skew it.
    pub async fn upsert_for_image_area(
        pool: &PgPool,
        image_area_id: i64,
        assignee_id: Option<&str>,
    ) -> Result<(ReviewTask, bool), sqlx::Error> {
        let row = sqlx::query_as::<_, UpsertedTask>(&format!(
            r#"
            INSERT INTO tasking_tasks (image_area_id, assignee_id, status, remarks)
            VALUES ($1, $2, $3, '')
            ON CONFLICT (image_area_id) DO UPDATE SET
                assignee_id = EXCLUDED.assignee_id,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING {TASK_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(image_area_id)
        .bind(assignee_id)
        .bind(TaskStatus::Incomplete.to_string())
        .fetch_one(pool)
        .await?;

        Ok((row.task, row.inserted))
    }

    pub async fn update_remarks(
        pool: &PgPool,
        task_id: i64,
        remarks: &str,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = sqlx::query(
            "UPDATE tasking_tasks SET remarks = $1, updated_at = NOW() WHERE task_id = $2",
        )
        .bind(remarks)
        .bind(task_id)
        .execute(pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Bulk active-task counts for a candidate pool in one grouped query.
    /// Active means any non-terminal status. Candidates with no tasks are
    /// absent from the map; callers fill zeroes.
    pub async fn active_counts(
        pool: &PgPool,
        assignee_ids: &[String],
    ) -> Result<HashMap<String, i64>, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT assignee_id, COUNT(*) AS active
            FROM tasking_tasks
            WHERE assignee_id = ANY($1) AND status <> $2
            GROUP BY assignee_id
            "#,
        )
        .bind(assignee_ids)
        .bind(TaskStatus::Completed.to_string())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Ids of an image's tasks that block completion (status not terminal).
    pub async fn incomplete_task_ids_for_image(
        pool: &PgPool,
        image_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT t.task_id
            FROM tasking_tasks t
            INNER JOIN tasking_image_areas ia ON t.image_area_id = ia.image_area_id
            WHERE ia.image_id = $1 AND t.status <> $2
            ORDER BY t.task_id
            "#,
        )
        .bind(image_id)
        .bind(TaskStatus::Completed.to_string())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
