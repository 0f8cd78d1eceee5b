//! # Area Model
//!
//! A named geographic region of interest. Areas are shared across images
//! through the `tasking_image_areas` join and carry two externally-set
//! classification flags (`v10`, `ops_v`) that roll up into the summary view.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Area {
    pub area_id: i64,
    pub name: String,
    pub v10: bool,
    pub ops_v: bool,
}

impl Area {
    /// Find an area by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Area>, sqlx::Error> {
        sqlx::query_as::<_, Area>(
            "SELECT area_id, name, v10, ops_v FROM tasking_areas WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Upsert by natural key: an existing row is returned unchanged, flags
    /// intact.
    pub async fn get_or_create(pool: &PgPool, name: &str) -> Result<Area, sqlx::Error> {
        sqlx::query_as::<_, Area>(
            r#"
            INSERT INTO tasking_areas (name, v10, ops_v)
            VALUES ($1, false, false)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING area_id, name, v10, ops_v
            "#,
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn get_or_create_with_transaction(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> Result<Area, sqlx::Error> {
        sqlx::query_as::<_, Area>(
            r#"
            INSERT INTO tasking_areas (name, v10, ops_v)
            VALUES ($1, false, false)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING area_id, name, v10, ops_v
            "#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await
    }

    /// Set the classification flags; they are owned by an external system
    /// and only stored here.
    pub async fn set_flags(
        pool: &PgPool,
        area_id: i64,
        v10: bool,
        ops_v: bool,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected =
            sqlx::query("UPDATE tasking_areas SET v10 = $1, ops_v = $2 WHERE area_id = $3")
                .bind(v10)
                .bind(ops_v)
                .bind(area_id)
                .execute(pool)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }
}
