//! Database-backed flow tests over the migrated schema: guarded transition
//! no-ops, the completion precondition, assignment upsert replacement, and
//! the direct summary path for images without tasks.

use imagery_tasking::aggregation::AggregationEngine;
use imagery_tasking::models::ReviewTask;
use imagery_tasking::services::{IngestRequest, IngestResult, IngestionService};
use imagery_tasking::{
    CompletionOutcome, IdentityProvider, IdentityRecord, IdentityResolver, ImageLifecycleService,
    TaskStateMachine, TaskStatus, TransitionOutcome,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Provider double for paths that never need a roster.
struct EmptyProvider;

#[async_trait::async_trait]
impl IdentityProvider for EmptyProvider {
    async fn users_for_role(&self, _role: &str) -> imagery_tasking::Result<Vec<IdentityRecord>> {
        Ok(Vec::new())
    }

    async fn find_user_id(&self, _username: &str) -> imagery_tasking::Result<Option<String>> {
        Ok(None)
    }

    async fn find_username(&self, _user_id: &str) -> imagery_tasking::Result<Option<String>> {
        Ok(None)
    }
}

fn engine(pool: &PgPool) -> AggregationEngine {
    let resolver = Arc::new(IdentityResolver::new(
        Arc::new(EmptyProvider),
        vec!["reviewer".to_string()],
        Duration::from_secs(300),
        100,
    ));
    AggregationEngine::new(pool.clone(), resolver)
}

async fn ingest(pool: &PgPool, external_image_id: i64, areas: &[&str]) -> IngestResult {
    IngestionService::new(pool.clone())
        .ingest(IngestRequest {
            external_image_id: Some(external_image_id),
            areas: areas.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        })
        .await
        .unwrap()
}

/// Drive one task through its full lifecycle to the terminal status.
async fn complete_task(sm: &TaskStateMachine, task_id: i64) {
    assert!(sm.start(task_id).await.unwrap().applied());
    assert!(sm.complete(task_id).await.unwrap().applied());
    assert!(sm.verify_pass(task_id).await.unwrap().applied());
}

#[sqlx::test]
async fn test_second_start_is_a_noop(pool: PgPool) {
    let ingested = ingest(&pool, 101, &["alpha"]).await;
    let (task, _) =
        ReviewTask::upsert_for_image_area(&pool, ingested.image_area_ids[0], Some("id1"))
            .await
            .unwrap();

    let sm = TaskStateMachine::new(pool.clone());
    assert_eq!(
        sm.start(task.task_id).await.unwrap(),
        TransitionOutcome::Applied {
            from: TaskStatus::Incomplete,
            to: TaskStatus::InProgress,
        }
    );

    // The guard sees the wrong source status and leaves the row untouched.
    assert_eq!(
        sm.start(task.task_id).await.unwrap(),
        TransitionOutcome::NotApplied {
            current: TaskStatus::InProgress,
        }
    );

    let current = ReviewTask::find_by_id(&pool, task.task_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.task_status().unwrap(), TaskStatus::InProgress);
}

#[sqlx::test]
async fn test_transition_on_missing_task(pool: PgPool) {
    let sm = TaskStateMachine::new(pool);
    assert_eq!(
        sm.start(999_999).await.unwrap(),
        TransitionOutcome::NotFound
    );
}

#[sqlx::test]
async fn test_blocked_completion_names_offending_tasks(pool: PgPool) {
    let ingested = ingest(&pool, 102, &["alpha", "bravo"]).await;
    let mut task_ids = Vec::new();
    for &image_area_id in &ingested.image_area_ids {
        let (task, _) = ReviewTask::upsert_for_image_area(&pool, image_area_id, Some("id1"))
            .await
            .unwrap();
        task_ids.push(task.task_id);
    }
    task_ids.sort_unstable();

    let lifecycle = ImageLifecycleService::new(pool.clone());
    assert_eq!(
        lifecycle.complete_image(ingested.image_id).await.unwrap(),
        CompletionOutcome::IncompleteTasks {
            task_ids: task_ids.clone(),
        }
    );

    // Finishing one task still leaves the other blocking, by id.
    let sm = TaskStateMachine::new(pool.clone());
    complete_task(&sm, task_ids[0]).await;
    assert_eq!(
        lifecycle.complete_image(ingested.image_id).await.unwrap(),
        CompletionOutcome::IncompleteTasks {
            task_ids: vec![task_ids[1]],
        }
    );

    complete_task(&sm, task_ids[1]).await;
    assert_eq!(
        lifecycle.complete_image(ingested.image_id).await.unwrap(),
        CompletionOutcome::Completed
    );
    assert_eq!(
        lifecycle.complete_image(ingested.image_id).await.unwrap(),
        CompletionOutcome::AlreadyCompleted
    );
}

#[sqlx::test]
async fn test_upsert_reports_replacement(pool: PgPool) {
    let ingested = ingest(&pool, 103, &["alpha"]).await;
    let image_area_id = ingested.image_area_ids[0];

    let (first, inserted) = ReviewTask::upsert_for_image_area(&pool, image_area_id, Some("id1"))
        .await
        .unwrap();
    assert!(inserted);
    assert_eq!(first.assignee_id.as_deref(), Some("id1"));

    let (second, inserted) = ReviewTask::upsert_for_image_area(&pool, image_area_id, Some("id2"))
        .await
        .unwrap();
    assert!(!inserted);
    assert_eq!(second.task_id, first.task_id);
    assert_eq!(second.assignee_id.as_deref(), Some("id2"));
}

#[sqlx::test]
async fn test_summary_for_image_with_taskless_areas_is_empty(pool: PgPool) {
    // Areas exist but no tasks: the image is absent from the summary join,
    // and the direct path must not mistake that for the zero-areas case.
    let ingested = ingest(&pool, 104, &["alpha", "bravo"]).await;

    let view = engine(&pool)
        .summary_for_image(ingested.image_id)
        .await
        .unwrap()
        .unwrap();
    assert!(view.images.is_empty());
    assert!(view.children.is_empty());
}

#[sqlx::test]
async fn test_summary_for_image_without_areas_gets_placeholder(pool: PgPool) {
    let ingested = ingest(&pool, 105, &[]).await;

    let view = engine(&pool)
        .summary_for_image(ingested.image_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.images.len(), 1);
    assert_eq!(view.images[0].remarks, "No areas");
    assert_eq!(view.images[0].task_completed, "0/0");
    assert!(view.children.is_empty());

    let missing = engine(&pool).summary_for_image(999_999).await.unwrap();
    assert!(missing.is_none());
}
