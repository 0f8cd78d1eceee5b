//! # Image Model
//!
//! An image is the unit of ingestion and the root of the review graph: it is
//! divided into geographic areas, and each image/area pair carries at most
//! one review task. An image is complete once every reachable task is in the
//! terminal status, recorded by the `completed_at` timestamp.
//!
//! ## Database Schema
//!
//! Maps to the `tasking_images` table:
//! - `image_id`: primary key (BIGSERIAL)
//! - `external_image_id`: nullable ingestion id; NULL means internally
//!   originated
//! - `uploaded_at` / `captured_at`: ingestion timestamps
//! - `completed_at`: NULL until the complete-image operation succeeds
//! - descriptive attributes: priority, category, quality, report,
//!   cloud_cover, target_tracing

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub image_id: i64,
    pub external_image_id: Option<i64>,
    pub uploaded_at: NaiveDateTime,
    pub captured_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub quality: Option<String>,
    pub report: Option<String>,
    pub cloud_cover: Option<i32>,
    pub target_tracing: bool,
}

/// New Image for creation (without generated fields)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewImage {
    pub external_image_id: Option<i64>,
    pub uploaded_at: Option<NaiveDateTime>, // Defaults to NOW() if not provided
    pub captured_at: Option<NaiveDateTime>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub quality: Option<String>,
    pub report: Option<String>,
    pub cloud_cover: Option<i32>,
    pub target_tracing: bool,
}

const IMAGE_COLUMNS: &str = "image_id, external_image_id, uploaded_at, captured_at, completed_at, \
                             priority, category, quality, report, cloud_cover, target_tracing";

impl Image {
    /// Create a new image
    pub async fn create(pool: &PgPool, new_image: NewImage) -> Result<Image, sqlx::Error> {
        let image = sqlx::query_as::<_, Image>(&format!(
            r#"
            INSERT INTO tasking_images (
                external_image_id, uploaded_at, captured_at, priority, category,
                quality, report, cloud_cover, target_tracing
            )
            VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8, $9)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(new_image.external_image_id)
        .bind(new_image.uploaded_at)
        .bind(new_image.captured_at)
        .bind(new_image.priority)
        .bind(new_image.category)
        .bind(new_image.quality)
        .bind(new_image.report)
        .bind(new_image.cloud_cover)
        .bind(new_image.target_tracing)
        .fetch_one(pool)
        .await?;

        Ok(image)
    }

    pub async fn create_with_transaction(
        tx: &mut Transaction<'_, Postgres>,
        new_image: NewImage,
    ) -> Result<Image, sqlx::Error> {
        let image = sqlx::query_as::<_, Image>(&format!(
            r#"
            INSERT INTO tasking_images (
                external_image_id, uploaded_at, captured_at, priority, category,
                quality, report, cloud_cover, target_tracing
            )
            VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8, $9)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(new_image.external_image_id)
        .bind(new_image.uploaded_at)
        .bind(new_image.captured_at)
        .bind(new_image.priority)
        .bind(new_image.category)
        .bind(new_image.quality)
        .bind(new_image.report)
        .bind(new_image.cloud_cover)
        .bind(new_image.target_tracing)
        .fetch_one(&mut **tx)
        .await?;

        Ok(image)
    }

    /// Find an image by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM tasking_images WHERE image_id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Find an image by its external ingestion id
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_image_id: i64,
    ) -> Result<Option<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM tasking_images WHERE external_image_id = $1"
        ))
        .bind(external_image_id)
        .fetch_optional(pool)
        .await
    }

    /// Stamp `completed_at`, guarded so an already-completed image is left
    /// untouched. Returns whether the update applied.
    pub async fn mark_completed(pool: &PgPool, image_id: i64) -> Result<bool, sqlx::Error> {
        let rows_affected = sqlx::query(
            "UPDATE tasking_images SET completed_at = NOW() \
             WHERE image_id = $1 AND completed_at IS NULL",
        )
        .bind(image_id)
        .execute(pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Administrative uncomplete: clear `completed_at`. Returns whether a
    /// timestamp was actually cleared.
    pub async fn clear_completed(pool: &PgPool, image_id: i64) -> Result<bool, sqlx::Error> {
        let rows_affected = sqlx::query(
            "UPDATE tasking_images SET completed_at = NULL \
             WHERE image_id = $1 AND completed_at IS NOT NULL",
        )
        .bind(image_id)
        .execute(pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Delete an image; areas joins and tasks go with it (ON DELETE CASCADE).
    pub async fn delete(pool: &PgPool, image_id: i64) -> Result<bool, sqlx::Error> {
        let rows_affected = sqlx::query("DELETE FROM tasking_images WHERE image_id = $1")
            .bind(image_id)
            .execute(pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// True when the image has no external ingestion id (internally
    /// originated, "target tracing generated").
    pub fn is_internally_originated(&self) -> bool {
        self.external_image_id.is_none()
    }
}
