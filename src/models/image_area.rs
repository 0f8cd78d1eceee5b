//! # ImageArea Model
//!
//! The join of one image and one area: the unit a review task is created
//! against. The `(image_id, area_id)` pair is unique, and the task table
//! carries a uniqueness constraint on `image_area_id` so each join row has
//! at most one task.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ImageArea {
    pub image_area_id: i64,
    pub image_id: i64,
    pub area_id: i64,
}

impl ImageArea {
    pub async fn create_with_transaction(
        tx: &mut Transaction<'_, Postgres>,
        image_id: i64,
        area_id: i64,
    ) -> Result<ImageArea, sqlx::Error> {
        sqlx::query_as::<_, ImageArea>(
            r#"
            INSERT INTO tasking_image_areas (image_id, area_id)
            VALUES ($1, $2)
            ON CONFLICT (image_id, area_id) DO UPDATE SET image_id = EXCLUDED.image_id
            RETURNING image_area_id, image_id, area_id
            "#,
        )
        .bind(image_id)
        .bind(area_id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ImageArea>, sqlx::Error> {
        sqlx::query_as::<_, ImageArea>(
            "SELECT image_area_id, image_id, area_id FROM tasking_image_areas \
             WHERE image_area_id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Resolve the join row auto-assignment targets: area matched on name,
    /// image matched on external ingestion id.
    pub async fn resolve(
        pool: &PgPool,
        area_name: &str,
        external_image_id: i64,
    ) -> Result<Option<ImageArea>, sqlx::Error> {
        sqlx::query_as::<_, ImageArea>(
            r#"
            SELECT ia.image_area_id, ia.image_id, ia.area_id
            FROM tasking_image_areas ia
            INNER JOIN tasking_images i ON ia.image_id = i.image_id
            INNER JOIN tasking_areas a ON ia.area_id = a.area_id
            WHERE a.name = $1 AND i.external_image_id = $2
            "#,
        )
        .bind(area_name)
        .bind(external_image_id)
        .fetch_optional(pool)
        .await
    }

    /// All join rows of an image
    pub async fn for_image(pool: &PgPool, image_id: i64) -> Result<Vec<ImageArea>, sqlx::Error> {
        sqlx::query_as::<_, ImageArea>(
            "SELECT image_area_id, image_id, area_id FROM tasking_image_areas \
             WHERE image_id = $1 ORDER BY image_area_id",
        )
        .bind(image_id)
        .fetch_all(pool)
        .await
    }
}
