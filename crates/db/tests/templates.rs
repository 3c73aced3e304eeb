//! Template persistence: versioning and immutability while referenced.

use sqlx::PgPool;

use folio_db::models::job::SubmitJob;
use folio_db::repositories::{JobRepo, TemplateRepo};

fn steps() -> serde_json::Value {
    serde_json::json!([
        {"provider": "ocr-base", "input": {"type": "original"}, "config": {}}
    ])
}

#[sqlx::test(migrations = "./migrations")]
async fn create_starts_at_version_one(pool: PgPool) {
    let template = TemplateRepo::create(&pool, "letters", &steps()).await.unwrap();
    assert_eq!(template.version, 1);
    assert_eq!(template.name, "letters");
    assert!(template.parsed_steps().unwrap().len() == 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_name_is_a_unique_violation(pool: PgPool) {
    TemplateRepo::create(&pool, "letters", &steps()).await.unwrap();
    let err = TemplateRepo::create(&pool, "letters", &steps()).await.unwrap_err();
    match err {
        sqlx::Error::Database(db_err) => {
            assert_eq!(db_err.code().as_deref(), Some("23505"));
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn create_version_bumps_and_keeps_the_original(pool: PgPool) {
    let v1 = TemplateRepo::create(&pool, "letters", &steps()).await.unwrap();
    let v2 = TemplateRepo::create_version(&pool, v1.id, &steps())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(v2.name, "letters");
    assert_eq!(v2.version, 2);
    assert_ne!(v2.id, v1.id);

    // The original row is untouched.
    let original = TemplateRepo::find_by_id(&pool, v1.id).await.unwrap().unwrap();
    assert_eq!(original.version, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn template_is_pinned_while_a_job_is_non_terminal(pool: PgPool) {
    let template = TemplateRepo::create(&pool, "letters", &steps()).await.unwrap();
    assert!(!TemplateRepo::is_pinned(&pool, template.id).await.unwrap());

    let job = JobRepo::submit(
        &pool,
        &SubmitJob {
            template_id: template.id,
            input_root: Some("/data/in".to_string()),
            input_files: None,
            recursive: None,
        },
    )
    .await
    .unwrap();
    assert!(TemplateRepo::is_pinned(&pool, template.id).await.unwrap());

    // Once the job reaches a terminal state, the pin is released.
    JobRepo::mark_empty_completed(&pool, job.id).await.unwrap();
    assert!(!TemplateRepo::is_pinned(&pool, template.id).await.unwrap());
}
