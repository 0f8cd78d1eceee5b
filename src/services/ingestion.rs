//! Validated ingestion of an image and its areas.
//!
//! Payload validation happens at this boundary as a typed error; the core
//! below it never sees malformed input. Image, areas, and join rows are
//! created inside one scoped transaction so a failure mid-ingest leaves no
//! partial graph. The returned ids let the caller drive auto-assignment per
//! area after commit.

use crate::error::{Result, TaskingError};
use crate::models::{Area, Image, ImageArea, NewImage};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    pub external_image_id: Option<i64>,
    pub uploaded_at: Option<NaiveDateTime>,
    pub captured_at: Option<NaiveDateTime>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub quality: Option<String>,
    pub report: Option<String>,
    pub cloud_cover: Option<i32>,
    pub target_tracing: bool,
    /// Names of the areas this image covers; may be empty (an image with no
    /// areas is valid and appears in the manager view).
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub image_id: i64,
    pub image_area_ids: Vec<i64>,
}

pub fn validate(request: &IngestRequest) -> Result<()> {
    if let Some(cover) = request.cloud_cover {
        if !(0..=100).contains(&cover) {
            return Err(TaskingError::Validation(format!(
                "cloud_cover must be within 0-100, got {cover}"
            )));
        }
    }

    if let Some(id) = request.external_image_id {
        if id <= 0 {
            return Err(TaskingError::Validation(format!(
                "external_image_id must be positive, got {id}"
            )));
        }
    }

    if request.areas.iter().any(|name| name.trim().is_empty()) {
        return Err(TaskingError::Validation(
            "area names must not be blank".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for name in &request.areas {
        if !seen.insert(name.as_str()) {
            return Err(TaskingError::Validation(format!(
                "duplicate area name in request: {name}"
            )));
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct IngestionService {
    pool: PgPool,
}

impl IngestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestResult> {
        validate(&request)?;

        let mut tx = self.pool.begin().await?;

        let image = Image::create_with_transaction(
            &mut tx,
            NewImage {
                external_image_id: request.external_image_id,
                uploaded_at: request.uploaded_at,
                captured_at: request.captured_at,
                priority: request.priority,
                category: request.category,
                quality: request.quality,
                report: request.report,
                cloud_cover: request.cloud_cover,
                target_tracing: request.target_tracing,
            },
        )
        .await?;

        let mut image_area_ids = Vec::with_capacity(request.areas.len());
        for name in &request.areas {
            let area = Area::get_or_create_with_transaction(&mut tx, name).await?;
            let image_area =
                ImageArea::create_with_transaction(&mut tx, image.image_id, area.area_id).await?;
            image_area_ids.push(image_area.image_area_id);
        }

        tx.commit().await?;

        info!(
            image_id = image.image_id,
            areas = image_area_ids.len(),
            external_image_id = request.external_image_id,
            "image ingested"
        );

        Ok(IngestResult {
            image_id: image.image_id,
            image_area_ids,
        })
    }
}
