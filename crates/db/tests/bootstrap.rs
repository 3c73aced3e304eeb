use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    // Health check
    folio_db::health_check(&pool).await.unwrap();

    // Verify all four lookup tables exist and have seed data
    let tables = [
        "job_statuses",
        "task_statuses",
        "worker_statuses",
        "export_statuses",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert!(count.0 > 0, "{table} should have seed data, got 0 rows");
    }
}

/// Lookup seed rows must line up with the core status enums.
#[sqlx::test(migrations = "./migrations")]
async fn test_status_seeds_match_enums(pool: PgPool) {
    use folio_core::status::{ExportState, JobState, TaskState, WorkerStatus};

    let checks: &[(&str, i16, &str)] = &[
        ("job_statuses", JobState::Pending.id(), "pending"),
        ("job_statuses", JobState::CompletedWithErrors.id(), "completed_with_errors"),
        ("job_statuses", JobState::Cancelled.id(), "cancelled"),
        ("task_statuses", TaskState::Queued.id(), "queued"),
        ("task_statuses", TaskState::Succeeded.id(), "succeeded"),
        ("task_statuses", TaskState::Cancelled.id(), "cancelled"),
        ("worker_statuses", WorkerStatus::Idle.id(), "idle"),
        ("worker_statuses", WorkerStatus::Offline.id(), "offline"),
        ("export_statuses", ExportState::Submitted.id(), "submitted"),
        ("export_statuses", ExportState::PollTimeout.id(), "poll_timeout"),
    ];

    for (table, id, expected) in checks {
        let (name,): (String,) =
            sqlx::query_as(&format!("SELECT name FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|e| panic!("{table} id {id} query failed: {e}"));
        assert_eq!(&name, expected, "{table} id {id}");
    }
}
