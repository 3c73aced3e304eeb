//! Checkpoint-store semantics: atomic appends, idempotent success
//! commits, and audit retention of failed attempts.

use chrono::Utc;
use sqlx::PgPool;

use folio_core::types::DbId;
use folio_db::models::file_task::NewFileTask;
use folio_db::models::job::SubmitJob;
use folio_db::models::step_result::NewStepResult;
use folio_db::repositories::{JobRepo, StepResultRepo, TaskRepo, TemplateRepo};

async fn seed_task(pool: &PgPool) -> DbId {
    let steps = serde_json::json!([
        {"provider": "ocr-base", "input": {"type": "original"}, "config": {}},
        {"provider": "ocr-clean", "input": {"type": "previous_step"}, "config": {}}
    ]);
    let template = TemplateRepo::create(pool, "two-pass", &steps).await.unwrap();
    let job = JobRepo::submit(
        pool,
        &SubmitJob {
            template_id: template.id,
            input_root: Some("/data/in".to_string()),
            input_files: None,
            recursive: None,
        },
    )
    .await
    .unwrap();
    TaskRepo::enqueue_batch(
        pool,
        job.id,
        &[NewFileTask {
            file_path: "/data/in/page.png".to_string(),
            file_size_bytes: 2048,
        }],
    )
    .await
    .unwrap();
    TaskRepo::claim_next(pool, 1, 300.0)
        .await
        .unwrap()
        .unwrap()
        .task_id
}

fn success(task_id: DbId, step_index: i32, text: &str) -> NewStepResult {
    let now = Utc::now();
    NewStepResult {
        file_task_id: task_id,
        step_index,
        provider: "ocr-base".to_string(),
        output_text: Some(text.to_string()),
        confidence: Some(0.93),
        error: None,
        started_at: now,
        finished_at: now,
    }
}

fn failure(task_id: DbId, step_index: i32, error: &str) -> NewStepResult {
    let now = Utc::now();
    NewStepResult {
        file_task_id: task_id,
        step_index,
        provider: "ocr-base".to_string(),
        output_text: None,
        confidence: None,
        error: Some(error.to_string()),
        started_at: now,
        finished_at: now,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_success_commit_is_rejected_idempotently(pool: PgPool) {
    let task_id = seed_task(&pool).await;

    let first = StepResultRepo::append(&pool, &success(task_id, 0, "hello"))
        .await
        .unwrap();
    assert!(first.is_some());

    // A concurrent redelivery commits the same step: the insert is a
    // no-op and the original row is what callers adopt.
    let second = StepResultRepo::append(&pool, &success(task_id, 0, "divergent"))
        .await
        .unwrap();
    assert!(second.is_none());

    let committed = StepResultRepo::find_committed(&pool, task_id, 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(committed.output_text.as_deref(), Some("hello"));

    let all = StepResultRepo::list_by_task(&pool, task_id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_attempts_accumulate_but_are_not_committed(pool: PgPool) {
    let task_id = seed_task(&pool).await;

    StepResultRepo::append(&pool, &failure(task_id, 0, "timeout"))
        .await
        .unwrap();
    StepResultRepo::append(&pool, &failure(task_id, 0, "timeout again"))
        .await
        .unwrap();
    StepResultRepo::append(&pool, &success(task_id, 0, "recovered"))
        .await
        .unwrap();

    let committed = StepResultRepo::list_committed(&pool, task_id).await.unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].output_text.as_deref(), Some("recovered"));

    // The retry history stays on record for audit.
    let all = StepResultRepo::list_by_task(&pool, task_id).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().filter(|r| r.error.is_some()).count(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn committed_results_come_back_in_step_order(pool: PgPool) {
    let task_id = seed_task(&pool).await;

    // Insert out of order; the resume load must still be step-ordered.
    StepResultRepo::append(&pool, &success(task_id, 1, "second"))
        .await
        .unwrap();
    StepResultRepo::append(&pool, &success(task_id, 0, "first"))
        .await
        .unwrap();

    let committed = StepResultRepo::list_committed(&pool, task_id).await.unwrap();
    let indices: Vec<i32> = committed.iter().map(|r| r.step_index).collect();
    assert_eq!(indices, vec![0, 1]);
}
