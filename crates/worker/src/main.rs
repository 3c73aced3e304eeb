use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::status::WorkerStatus;
use folio_db::repositories::WorkerRepo;
use folio_events::{EventBus, EventPersistence};
use folio_pipeline::{ChainEngine, EngineConfig, QueueConfig, TaskQueue};
use folio_recog::ProviderRegistry;
use folio_worker::heartbeat::run_heartbeat;
use folio_worker::{WorkerConfig, WorkerRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        name = %config.name,
        concurrency = config.concurrency,
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = folio_db::create_pool(&database_url).await?;
    folio_db::health_check(&pool).await?;
    tracing::info!("Database connection pool created");

    // --- Provider registry ---
    let registry = ProviderRegistry::from_spec(&config.providers_spec)
        .map_err(|e| anyhow::anyhow!("RECOGNITION_PROVIDERS invalid: {e}"))?;
    if registry.ids().is_empty() {
        tracing::warn!("No recognition providers configured; every step will fail");
    } else {
        tracing::info!(providers = ?registry.ids(), "Recognition providers registered");
    }

    // --- Registration ---
    let worker = WorkerRepo::register(&pool, &config.name, config.concurrency as i32).await?;
    tracing::info!(worker_id = worker.id, "Worker registered");

    // --- Event bus and persistence ---
    let bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(EventPersistence::run(
        pool.clone(),
        bus.subscribe(),
    ));

    // --- Queue and engine ---
    let queue = TaskQueue::new(
        pool.clone(),
        QueueConfig {
            lease: config.lease,
            poll_interval: config.poll_interval,
        },
    );
    let engine = Arc::new(ChainEngine::new(
        pool.clone(),
        Arc::new(registry),
        Arc::clone(&bus),
        EngineConfig {
            step_timeout: config.step_timeout,
            max_retries: config.max_retries,
            ..Default::default()
        },
    ));

    // --- Background loops ---
    let cancel = CancellationToken::new();
    let heartbeat_handle = tokio::spawn(run_heartbeat(
        pool.clone(),
        queue.clone(),
        worker.id,
        cancel.clone(),
    ));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        });
    }

    // --- Main loop ---
    let runtime = WorkerRuntime::new(queue, engine, worker.id, config.concurrency as usize);
    runtime.run(cancel.clone()).await;

    // --- Post-shutdown cleanup ---
    tracing::info!("Worker loop stopped, cleaning up");

    WorkerRepo::set_status(&pool, worker.id, WorkerStatus::Offline).await?;
    let _ = tokio::time::timeout(Duration::from_secs(5), heartbeat_handle).await;

    // Drop every bus sender (the runtime holds one through the engine)
    // to close the broadcast channel, signalling persistence to shut
    // down.
    drop(runtime);
    drop(bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// drains cleanly whether stopped interactively or by a process manager
/// (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
