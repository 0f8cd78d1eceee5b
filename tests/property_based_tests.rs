//! Property-based tests over the pure parts of the core: the sign-keyed
//! flattening convention, the summary remarks rollup, and the
//! load-balancer's selection rule.

use chrono::NaiveDateTime;
use imagery_tasking::aggregation::{
    assemble_summary, ManagerChildRow, ManagerImageRow, ManagerRecord, ManagerView,
    SummaryJoinRow,
};
use imagery_tasking::services::pick_least_loaded;
use proptest::prelude::*;
use std::collections::HashMap;

fn ts() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .unwrap()
        .naive_utc()
}

fn image_row(image_id: i64) -> ManagerImageRow {
    ManagerImageRow {
        image_id,
        external_image_id: Some(image_id),
        uploaded_at: ts(),
        priority: None,
        category: None,
        quality: None,
        report: None,
        cloud_cover: None,
        assignee: None,
        ttg: false,
    }
}

/// A small parent/child forest: image ids and per-image child counts, with
/// globally unique child ids.
fn view_strategy() -> impl Strategy<Value = ManagerView> {
    proptest::collection::vec(0usize..4, 1..8).prop_map(|child_counts| {
        let mut images = Vec::new();
        let mut children = Vec::new();
        let mut next_child_id = 1i64;
        for (i, count) in child_counts.into_iter().enumerate() {
            let image_id = (i as i64) + 1;
            images.push(image_row(image_id));
            for _ in 0..count {
                children.push(ManagerChildRow {
                    image_area_id: next_child_id,
                    parent_id: image_id,
                    area_name: format!("area-{next_child_id}"),
                    assignee: None,
                    remarks: String::new(),
                });
                next_child_id += 1;
            }
        }
        ManagerView { images, children }
    })
}

proptest! {
    /// Property: flattening never loses a row and never lets the two id
    /// spaces collide; the sign is a faithful discriminant.
    #[test]
    fn flat_map_preserves_rows_and_signs(view in view_strategy()) {
        let images = view.images.len();
        let children = view.children.len();
        let map = view.into_flat_map();

        prop_assert_eq!(map.len(), images + children);
        for (&key, record) in &map {
            match record {
                ManagerRecord::Image(image) => {
                    prop_assert!(key > 0);
                    prop_assert_eq!(image.image_id, key);
                }
                ManagerRecord::Child(child) => {
                    prop_assert!(key < 0);
                    prop_assert_eq!(child.image_area_id, -key);
                }
            }
        }
    }

    /// Property: every child's parent is present in the flattened map as an
    /// image row under a positive key.
    #[test]
    fn flat_map_children_reference_present_parents(view in view_strategy()) {
        let map = view.into_flat_map();
        for record in map.values() {
            if let ManagerRecord::Child(child) = record {
                prop_assert!(matches!(
                    map.get(&child.parent_id),
                    Some(ManagerRecord::Image(_))
                ));
            }
        }
    }

    /// Property: the summary remarks rollup is the concatenation of each
    /// child's remarks followed by a newline, in child order.
    #[test]
    fn summary_remarks_concatenation_shape(
        remarks in proptest::collection::vec("[a-z]{0,5}", 1..6)
    ) {
        let rows: Vec<SummaryJoinRow> = remarks
            .iter()
            .enumerate()
            .map(|(i, r)| SummaryJoinRow {
                image_id: 1,
                uploaded_at: ts(),
                image_area_id: (i as i64) + 1,
                area_name: format!("area-{i}"),
                v10: false,
                ops_v: false,
                assignee_id: None,
                status: "incomplete".to_string(),
                remarks: r.clone(),
            })
            .collect();

        let view = assemble_summary(rows, &HashMap::new());
        let expected: String = remarks.iter().map(|r| format!("{r}\n")).collect();
        prop_assert_eq!(&view.images[0].remarks, &expected);
        prop_assert_eq!(
            view.images[0].remarks.matches('\n').count(),
            remarks.len()
        );
    }

    /// Property: the pick is always a candidate with the minimal count, and
    /// among minimal candidates it is the lexicographically smallest id.
    #[test]
    fn least_loaded_pick_is_minimal_and_deterministic(
        counts in proptest::collection::hash_map("[a-e]{1,3}", 0i64..10, 1..8)
    ) {
        let candidates: Vec<(String, i64)> =
            counts.iter().map(|(id, c)| (id.clone(), *c)).collect();

        let pick = pick_least_loaded(&candidates).unwrap();
        let min_count = candidates.iter().map(|(_, c)| *c).min().unwrap();
        let expected = candidates
            .iter()
            .filter(|(_, c)| *c == min_count)
            .map(|(id, _)| id.as_str())
            .min()
            .unwrap();

        prop_assert_eq!(pick, expected);
    }
}
