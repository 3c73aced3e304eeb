//! Worker registry: registration, heartbeats, and stale-worker sweeps.

use sqlx::PgPool;

use folio_core::status::WorkerStatus;
use folio_db::repositories::WorkerRepo;

#[sqlx::test(migrations = "./migrations")]
async fn register_creates_an_idle_worker(pool: PgPool) {
    let worker = WorkerRepo::register(&pool, "scan-worker-01", 4).await.unwrap();
    assert_eq!(worker.name, "scan-worker-01");
    assert_eq!(worker.status_id, WorkerStatus::Idle.id());
    assert_eq!(worker.max_concurrency, 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn restarting_under_the_same_name_reclaims_the_row(pool: PgPool) {
    let first = WorkerRepo::register(&pool, "scan-worker-01", 4).await.unwrap();
    WorkerRepo::set_status(&pool, first.id, WorkerStatus::Offline)
        .await
        .unwrap();

    // The restarted process comes back idle with its new concurrency.
    let second = WorkerRepo::register(&pool, "scan-worker-01", 8).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.status_id, WorkerStatus::Idle.id());
    assert_eq!(second.max_concurrency, 8);

    let workers = WorkerRepo::list(&pool).await.unwrap();
    assert_eq!(workers.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn stale_heartbeats_are_marked_offline(pool: PgPool) {
    let fresh = WorkerRepo::register(&pool, "fresh", 4).await.unwrap();
    let stale = WorkerRepo::register(&pool, "stale", 4).await.unwrap();

    // Age one worker's heartbeat past the timeout.
    sqlx::query("UPDATE workers SET last_heartbeat_at = NOW() - INTERVAL '10 minutes' WHERE id = $1")
        .bind(stale.id)
        .execute(&pool)
        .await
        .unwrap();

    let transitioned = WorkerRepo::mark_stale_offline(&pool, 120.0).await.unwrap();
    assert_eq!(transitioned, 1);

    let workers = WorkerRepo::list(&pool).await.unwrap();
    for worker in workers {
        let expected = if worker.id == fresh.id {
            WorkerStatus::Idle.id()
        } else {
            WorkerStatus::Offline.id()
        };
        assert_eq!(worker.status_id, expected, "worker {}", worker.name);
    }

    // Already-offline workers are not counted again.
    assert_eq!(WorkerRepo::mark_stale_offline(&pool, 120.0).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn heartbeat_refreshes_recency_and_status(pool: PgPool) {
    let worker = WorkerRepo::register(&pool, "scan-worker-01", 4).await.unwrap();

    sqlx::query("UPDATE workers SET last_heartbeat_at = NOW() - INTERVAL '10 minutes' WHERE id = $1")
        .bind(worker.id)
        .execute(&pool)
        .await
        .unwrap();

    WorkerRepo::heartbeat(&pool, worker.id, WorkerStatus::Busy)
        .await
        .unwrap();

    // A live heartbeat keeps the worker out of the stale sweep.
    assert_eq!(WorkerRepo::mark_stale_offline(&pool, 120.0).await.unwrap(), 0);
    let workers = WorkerRepo::list(&pool).await.unwrap();
    assert_eq!(workers[0].status_id, WorkerStatus::Busy.id());
}
