//! # Aggregation Engine
//!
//! Builds the two read-model views over the image/area/task graph. Each
//! view is one joined fetch (LEFT joins for the manager view, INNER joins
//! for the summary view; the join difference is load-bearing: images with
//! areas but no tasks appear only in the manager view) followed by a pure
//! assembly pass, so every rollup rule is testable without a database.
//! Display names come from the identity resolver in one bulk call per view.

use crate::aggregation::types::{
    DateRange, ManagerChildRow, ManagerImageRow, ManagerView, SummaryChildRow, SummaryImageRow,
    SummaryView, MULTIPLE_ASSIGNEES, NO_AREAS_PLACEHOLDER,
};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::state_machine::TaskStatus;
use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// One row of the manager fetch: image columns plus optional child columns
/// from the LEFT joins.
#[derive(Debug, Clone, FromRow)]
pub struct ManagerJoinRow {
    pub image_id: i64,
    pub external_image_id: Option<i64>,
    pub uploaded_at: NaiveDateTime,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub quality: Option<String>,
    pub report: Option<String>,
    pub cloud_cover: Option<i32>,
    pub image_area_id: Option<i64>,
    pub area_name: Option<String>,
    pub assignee_id: Option<String>,
    pub remarks: Option<String>,
}

/// One row of the summary fetch: INNER joins, so child columns are present.
#[derive(Debug, Clone, FromRow)]
pub struct SummaryJoinRow {
    pub image_id: i64,
    pub uploaded_at: NaiveDateTime,
    pub image_area_id: i64,
    pub area_name: String,
    pub v10: bool,
    pub ops_v: bool,
    pub assignee_id: Option<String>,
    pub status: String,
    pub remarks: String,
}

pub struct AggregationEngine {
    pool: PgPool,
    resolver: Arc<IdentityResolver>,
}

impl AggregationEngine {
    pub fn new(pool: PgPool, resolver: Arc<IdentityResolver>) -> Self {
        Self { pool, resolver }
    }

    /// Manager view: every incomplete image in range, with or without
    /// areas and tasks.
    pub async fn manager_view(&self, range: DateRange) -> Result<ManagerView> {
        let rows = sqlx::query_as::<_, ManagerJoinRow>(
            r#"
            SELECT i.image_id, i.external_image_id, i.uploaded_at, i.priority,
                   i.category, i.quality, i.report, i.cloud_cover,
                   ia.image_area_id, a.name AS area_name, t.assignee_id, t.remarks
            FROM tasking_images i
            LEFT JOIN tasking_image_areas ia ON ia.image_id = i.image_id
            LEFT JOIN tasking_areas a ON a.area_id = ia.area_id
            LEFT JOIN tasking_tasks t ON t.image_area_id = ia.image_area_id
            WHERE i.completed_at IS NULL
              AND i.uploaded_at >= $1 AND i.uploaded_at <= $2
            ORDER BY i.uploaded_at, i.image_id, ia.image_area_id
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let names = self.resolve_names(rows.iter().filter_map(|r| r.assignee_id.clone())).await;
        debug!(rows = rows.len(), "assembling manager view");
        Ok(assemble_manager(rows, &names))
    }

    /// Summary view: incomplete images with at least one task in range.
    pub async fn summary_view(&self, range: DateRange) -> Result<SummaryView> {
        let rows = sqlx::query_as::<_, SummaryJoinRow>(
            r#"
            SELECT i.image_id, i.uploaded_at, ia.image_area_id, a.name AS area_name,
                   a.v10, a.ops_v, t.assignee_id, t.status, t.remarks
            FROM tasking_images i
            INNER JOIN tasking_image_areas ia ON ia.image_id = i.image_id
            INNER JOIN tasking_areas a ON a.area_id = ia.area_id
            INNER JOIN tasking_tasks t ON t.image_area_id = ia.image_area_id
            WHERE i.completed_at IS NULL
              AND i.uploaded_at >= $1 AND i.uploaded_at <= $2
            ORDER BY i.uploaded_at, i.image_id, ia.image_area_id
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let names = self.resolve_names(rows.iter().filter_map(|r| r.assignee_id.clone())).await;
        debug!(rows = rows.len(), "assembling summary view");
        Ok(assemble_summary(rows, &names))
    }

    /// Summary row for one image reached directly (outside the ranged
    /// fetch). An image with zero areas gets the explicit placeholder row;
    /// an image whose areas carry no tasks yields an empty view, matching
    /// its absence from the ranged summary fetch.
    pub async fn summary_for_image(&self, image_id: i64) -> Result<Option<SummaryView>> {
        let Some(image) = crate::models::Image::find_by_id(&self.pool, image_id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, SummaryJoinRow>(
            r#"
            SELECT i.image_id, i.uploaded_at, ia.image_area_id, a.name AS area_name,
                   a.v10, a.ops_v, t.assignee_id, t.status, t.remarks
            FROM tasking_images i
            INNER JOIN tasking_image_areas ia ON ia.image_id = i.image_id
            INNER JOIN tasking_areas a ON a.area_id = ia.area_id
            INNER JOIN tasking_tasks t ON t.image_area_id = ia.image_area_id
            WHERE i.image_id = $1
            ORDER BY ia.image_area_id
            "#,
        )
        .bind(image_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            // Zero rows only means zero areas when the join through the
            // task table found nothing because there were no join rows at
            // all; taskless areas also produce zero rows here.
            let areas = crate::models::ImageArea::for_image(&self.pool, image_id).await?;
            if areas.is_empty() {
                return Ok(Some(SummaryView {
                    images: vec![placeholder_no_areas(image.image_id, image.uploaded_at)],
                    children: Vec::new(),
                }));
            }
            return Ok(Some(SummaryView {
                images: Vec::new(),
                children: Vec::new(),
            }));
        }

        let names = self.resolve_names(rows.iter().filter_map(|r| r.assignee_id.clone())).await;
        Ok(Some(assemble_summary(rows, &names)))
    }

    /// Manager view in the flattened, sign-keyed shape legacy callers
    /// consume.
    pub async fn manager_data(
        &self,
        range: DateRange,
    ) -> Result<BTreeMap<i64, crate::aggregation::ManagerRecord>> {
        Ok(self.manager_view(range).await?.into_flat_map())
    }

    /// Summary view in the flattened, sign-keyed shape legacy callers
    /// consume.
    pub async fn summary_data(
        &self,
        range: DateRange,
    ) -> Result<BTreeMap<i64, crate::aggregation::SummaryRecord>> {
        Ok(self.summary_view(range).await?.into_flat_map())
    }

    async fn resolve_names(
        &self,
        assignee_ids: impl Iterator<Item = String>,
    ) -> HashMap<String, String> {
        let mut ids: Vec<String> = assignee_ids.collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return HashMap::new();
        }
        self.resolver.resolve_many(&ids).await
    }
}

/// Shared-assignee rollup: None for no children; the single shared value
/// when every child agrees (all-unassigned counts as agreement); the
/// literal `"multiple"` otherwise.
fn rollup_assignee(child_assignees: &[Option<String>]) -> Option<String> {
    let mut iter = child_assignees.iter();
    let first = iter.next()?;
    if iter.all(|a| a == first) {
        first.clone()
    } else {
        Some(MULTIPLE_ASSIGNEES.to_string())
    }
}

fn display_name(names: &HashMap<String, String>, id: &str) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}

/// Placeholder summary row for an image with no areas at all.
pub fn placeholder_no_areas(image_id: i64, uploaded_at: NaiveDateTime) -> SummaryImageRow {
    SummaryImageRow {
        image_id,
        uploaded_at,
        task_completed: "0/0".to_string(),
        remarks: NO_AREAS_PLACEHOLDER.to_string(),
        assignee: None,
        v10: false,
        ops_v: false,
    }
}

/// Assemble the manager view from fetched rows. Rows must be grouped by
/// image (the fetch orders them); child columns are None for images the
/// LEFT joins found no areas for.
pub fn assemble_manager(
    rows: Vec<ManagerJoinRow>,
    names: &HashMap<String, String>,
) -> ManagerView {
    let mut view = ManagerView::default();
    let mut index_by_image: HashMap<i64, usize> = HashMap::new();
    let mut child_assignees: HashMap<i64, Vec<Option<String>>> = HashMap::new();

    for row in rows {
        if !index_by_image.contains_key(&row.image_id) {
            index_by_image.insert(row.image_id, view.images.len());
            view.images.push(ManagerImageRow {
                image_id: row.image_id,
                external_image_id: row.external_image_id,
                uploaded_at: row.uploaded_at,
                priority: row.priority.clone(),
                category: row.category.clone(),
                quality: row.quality.clone(),
                report: row.report.clone(),
                cloud_cover: row.cloud_cover,
                assignee: None,
                ttg: row.external_image_id.is_none(),
            });
        }

        if let (Some(image_area_id), Some(area_name)) = (row.image_area_id, row.area_name) {
            let assignee = row.assignee_id.map(|id| display_name(names, &id));
            child_assignees
                .entry(row.image_id)
                .or_default()
                .push(assignee.clone());
            view.children.push(ManagerChildRow {
                image_area_id,
                parent_id: row.image_id,
                area_name,
                assignee,
                remarks: row.remarks.unwrap_or_default(),
            });
        }
    }

    for image in &mut view.images {
        if let Some(assignees) = child_assignees.get(&image.image_id) {
            image.assignee = rollup_assignee(assignees);
        }
    }

    view
}

/// Assemble the summary view from fetched rows. An image whose rows are
/// absent entirely (zero areas, reachable only via a direct call) is the
/// caller's concern; see [`placeholder_no_areas`].
pub fn assemble_summary(
    rows: Vec<SummaryJoinRow>,
    names: &HashMap<String, String>,
) -> SummaryView {
    struct Accum {
        index: usize,
        total: usize,
        completed: usize,
        remarks: String,
        assignees: Vec<Option<String>>,
        v10: bool,
        ops_v: bool,
    }

    let mut view = SummaryView::default();
    let mut accum_by_image: HashMap<i64, Accum> = HashMap::new();
    let mut image_order: Vec<i64> = Vec::new();

    for row in rows {
        let assignee = row.assignee_id.map(|id| display_name(names, &id));
        let is_completed = row.status == TaskStatus::Completed.to_string();

        let accum = accum_by_image.entry(row.image_id).or_insert_with(|| {
            image_order.push(row.image_id);
            let index = view.images.len();
            view.images.push(SummaryImageRow {
                image_id: row.image_id,
                uploaded_at: row.uploaded_at,
                task_completed: String::new(),
                remarks: String::new(),
                assignee: None,
                v10: false,
                ops_v: false,
            });
            Accum {
                index,
                total: 0,
                completed: 0,
                remarks: String::new(),
                assignees: Vec::new(),
                v10: false,
                ops_v: false,
            }
        });

        accum.total += 1;
        if is_completed {
            accum.completed += 1;
        }
        // Every child contributes its remarks plus a newline, so empty
        // remarks still produce a bare newline in the rollup.
        accum.remarks.push_str(&row.remarks);
        accum.remarks.push('\n');
        accum.assignees.push(assignee.clone());
        accum.v10 |= row.v10;
        accum.ops_v |= row.ops_v;

        view.children.push(SummaryChildRow {
            image_area_id: row.image_area_id,
            parent_id: row.image_id,
            area_name: row.area_name,
            assignee,
            status: row.status,
            remarks: row.remarks,
        });
    }

    for image_id in image_order {
        let Some(accum) = accum_by_image.get(&image_id) else {
            continue;
        };
        let image = &mut view.images[accum.index];
        image.task_completed = format!("{}/{}", accum.completed, accum.total);
        image.remarks = accum.remarks.clone();
        image.assignee = rollup_assignee(&accum.assignees);
        image.v10 = accum.v10;
        image.ops_v = accum.ops_v;
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> HashMap<String, String> {
        HashMap::from([
            ("id1".to_string(), "alice".to_string()),
            ("id2".to_string(), "bob".to_string()),
        ])
    }

    fn ts() -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    fn manager_row(
        image_id: i64,
        image_area_id: Option<i64>,
        assignee_id: Option<&str>,
    ) -> ManagerJoinRow {
        ManagerJoinRow {
            image_id,
            external_image_id: Some(image_id * 100),
            uploaded_at: ts(),
            priority: None,
            category: None,
            quality: None,
            report: None,
            cloud_cover: None,
            image_area_id,
            area_name: image_area_id.map(|id| format!("area-{id}")),
            assignee_id: assignee_id.map(str::to_string),
            remarks: image_area_id.map(|_| String::new()),
        }
    }

    fn summary_row(
        image_id: i64,
        image_area_id: i64,
        assignee_id: Option<&str>,
        status: &str,
        remarks: &str,
    ) -> SummaryJoinRow {
        SummaryJoinRow {
            image_id,
            uploaded_at: ts(),
            image_area_id,
            area_name: format!("area-{image_area_id}"),
            v10: false,
            ops_v: false,
            assignee_id: assignee_id.map(str::to_string),
            status: status.to_string(),
            remarks: remarks.to_string(),
        }
    }

    #[test]
    fn test_manager_image_without_areas_appears() {
        let view = assemble_manager(vec![manager_row(1, None, None)], &names());
        assert_eq!(view.images.len(), 1);
        assert!(view.children.is_empty());
        assert_eq!(view.images[0].assignee, None);
    }

    #[test]
    fn test_manager_shared_assignee() {
        let rows = vec![
            manager_row(1, Some(10), Some("id1")),
            manager_row(1, Some(11), Some("id1")),
        ];
        let view = assemble_manager(rows, &names());
        assert_eq!(view.images[0].assignee.as_deref(), Some("alice"));
    }

    #[test]
    fn test_manager_all_unassigned_counts_as_shared() {
        let rows = vec![
            manager_row(1, Some(10), None),
            manager_row(1, Some(11), None),
        ];
        let view = assemble_manager(rows, &names());
        assert_eq!(view.images[0].assignee, None);
        assert_eq!(view.children.len(), 2);
    }

    #[test]
    fn test_manager_differing_assignees_yield_multiple() {
        let rows = vec![
            manager_row(1, Some(10), Some("id1")),
            manager_row(1, Some(11), Some("id2")),
        ];
        let view = assemble_manager(rows, &names());
        assert_eq!(view.images[0].assignee.as_deref(), Some("multiple"));
    }

    #[test]
    fn test_manager_assigned_and_unassigned_mix_is_multiple() {
        let rows = vec![
            manager_row(1, Some(10), Some("id1")),
            manager_row(1, Some(11), None),
        ];
        let view = assemble_manager(rows, &names());
        assert_eq!(view.images[0].assignee.as_deref(), Some("multiple"));
    }

    #[test]
    fn test_manager_ttg_from_missing_external_id() {
        let mut row = manager_row(1, None, None);
        row.external_image_id = None;
        let view = assemble_manager(vec![row], &names());
        assert!(view.images[0].ttg);
    }

    #[test]
    fn test_manager_unresolved_assignee_echoes_id() {
        let rows = vec![manager_row(1, Some(10), Some("ghost"))];
        let view = assemble_manager(rows, &names());
        assert_eq!(view.children[0].assignee.as_deref(), Some("ghost"));
    }

    #[test]
    fn test_summary_task_completed_counter() {
        let rows = vec![
            summary_row(1, 10, Some("id1"), "completed", ""),
            summary_row(1, 11, Some("id1"), "in_progress", ""),
            summary_row(1, 12, Some("id1"), "completed", ""),
        ];
        let view = assemble_summary(rows, &names());
        assert_eq!(view.images[0].task_completed, "2/3");
    }

    #[test]
    fn test_summary_remarks_concatenation_golden() {
        let rows = vec![
            summary_row(1, 10, None, "incomplete", "a"),
            summary_row(1, 11, None, "incomplete", ""),
        ];
        let view = assemble_summary(rows, &names());
        assert_eq!(view.images[0].remarks, "a\n\n");
    }

    #[test]
    fn test_summary_flag_or_rollup() {
        let mut first = summary_row(1, 10, None, "incomplete", "");
        first.v10 = true;
        let mut second = summary_row(1, 11, None, "incomplete", "");
        second.ops_v = true;
        let view = assemble_summary(vec![first, second], &names());
        assert!(view.images[0].v10);
        assert!(view.images[0].ops_v);
    }

    #[test]
    fn test_summary_assignee_rollup_over_tasks() {
        let rows = vec![
            summary_row(1, 10, Some("id1"), "incomplete", ""),
            summary_row(1, 11, Some("id2"), "incomplete", ""),
            summary_row(2, 20, Some("id2"), "verifying", ""),
        ];
        let view = assemble_summary(rows, &names());
        assert_eq!(view.images[0].assignee.as_deref(), Some("multiple"));
        assert_eq!(view.images[1].assignee.as_deref(), Some("bob"));
    }

    #[test]
    fn test_placeholder_no_areas() {
        let row = placeholder_no_areas(3, ts());
        assert_eq!(row.task_completed, "0/0");
        assert_eq!(row.remarks, NO_AREAS_PLACEHOLDER);
    }

    #[test]
    fn test_rollup_assignee_empty_is_none() {
        assert_eq!(rollup_assignee(&[]), None);
    }
}
