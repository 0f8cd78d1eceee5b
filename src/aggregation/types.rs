//! Read-model shapes for the manager and summary views.
//!
//! The primary representation is typed: each view holds explicit image and
//! child collections, children pointing at their parent through
//! `parent_id`. Consumers that still key rows by sign get the flattened
//! projection from `into_flat_map`: image rows under their positive
//! `image_id`, child rows under the negated `image_area_id`, so the two id
//! spaces never collide and the parent of every negative key is present as
//! a positive key in the same map.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive range over `Image.uploaded_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

/// Remarks placeholder for a summary row built from an image with no areas.
pub const NO_AREAS_PLACEHOLDER: &str = "No areas";

/// Literal assignee rollup value when children disagree.
pub const MULTIPLE_ASSIGNEES: &str = "multiple";

// ---------------------------------------------------------------------------
// Manager view: every incomplete image in range, areas and tasks optional.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerImageRow {
    pub image_id: i64,
    pub external_image_id: Option<i64>,
    pub uploaded_at: NaiveDateTime,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub quality: Option<String>,
    pub report: Option<String>,
    pub cloud_cover: Option<i32>,
    /// None without child areas; the shared display name when all children
    /// agree; the literal `"multiple"` otherwise.
    pub assignee: Option<String>,
    /// Target-tracing generated: the image has no external ingestion id.
    pub ttg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerChildRow {
    pub image_area_id: i64,
    pub parent_id: i64,
    pub area_name: String,
    pub assignee: Option<String>,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManagerRecord {
    Image(ManagerImageRow),
    Child(ManagerChildRow),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManagerView {
    pub images: Vec<ManagerImageRow>,
    pub children: Vec<ManagerChildRow>,
}

impl ManagerView {
    /// Flatten into the sign-keyed map consumed by legacy callers.
    pub fn into_flat_map(self) -> BTreeMap<i64, ManagerRecord> {
        let mut map = BTreeMap::new();
        for image in self.images {
            map.insert(image.image_id, ManagerRecord::Image(image));
        }
        for child in self.children {
            map.insert(-child.image_area_id, ManagerRecord::Child(child));
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Summary view: incomplete images with active tasking only.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryImageRow {
    pub image_id: i64,
    pub uploaded_at: NaiveDateTime,
    /// `"<completed>/<total>"` across the image's tasks
    pub task_completed: String,
    /// Every child's remarks followed by a newline, concatenated; empty
    /// remarks contribute a bare newline.
    pub remarks: String,
    pub assignee: Option<String>,
    /// OR across child areas' flags
    pub v10: bool,
    pub ops_v: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryChildRow {
    pub image_area_id: i64,
    pub parent_id: i64,
    pub area_name: String,
    pub assignee: Option<String>,
    pub status: String,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryRecord {
    Image(SummaryImageRow),
    Child(SummaryChildRow),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryView {
    pub images: Vec<SummaryImageRow>,
    pub children: Vec<SummaryChildRow>,
}

impl SummaryView {
    /// Flatten into the sign-keyed map consumed by legacy callers.
    pub fn into_flat_map(self) -> BTreeMap<i64, SummaryRecord> {
        let mut map = BTreeMap::new();
        for image in self.images {
            map.insert(image.image_id, SummaryRecord::Image(image));
        }
        for child in self.children {
            map.insert(-child.image_area_id, SummaryRecord::Child(child));
        }
        map
    }
}
