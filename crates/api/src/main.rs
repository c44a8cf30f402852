use anyhow::{Context, Result};
use domain::ports::{DomainEventPublisher, LoggingPublisher, SnapshotStore};
use domain::services::{SnapshotDirectory, SnapshotService};
use domain::Ports;
use persistence::repositories::{
    EventRepository, InviteRepository, ParticipantRepository, SnapshotRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use events_api::app::{create_app, AppState};
use events_api::config::Config;
use events_api::jobs::{FinishEventsJob, JobScheduler, PoolMetricsJob};
use events_api::middleware::{init_metrics, logging::init_logging};
use events_api::services::{
    amqp, AmqpPublisher, HttpDirectory, SnapshotConsumers, SnapshotHandler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging);
    init_metrics().context("failed to install metrics recorder")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting events service");

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;
    let ping_timeout = Duration::from_secs(config.database.ping_timeout_secs);
    persistence::db::ping(&pool, ping_timeout)
        .await
        .context("database did not answer ping")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let snapshots: Arc<dyn SnapshotStore> = Arc::new(SnapshotRepository::new(pool.clone()));
    let upstream = Arc::new(HttpDirectory::new(config.directory.clone())?);

    let connection = if config.rabbitmq.enabled {
        Some(amqp::connect(&config.rabbitmq).await?)
    } else {
        info!("RabbitMQ disabled; domain events are only logged");
        None
    };
    let publisher: Arc<dyn DomainEventPublisher> = match &connection {
        Some(connection) => {
            Arc::new(AmqpPublisher::new(connection, &config.rabbitmq.event_exchange).await?)
        }
        None => Arc::new(LoggingPublisher),
    };

    let ports = Ports {
        events: Arc::new(EventRepository::new(pool.clone())),
        invites: Arc::new(InviteRepository::new(pool.clone())),
        participants: Arc::new(ParticipantRepository::new(pool.clone())),
        snapshots: Arc::clone(&snapshots),
        directory: Arc::new(SnapshotDirectory::new(upstream, Arc::clone(&snapshots))),
        publisher,
    };

    let consumers = match &connection {
        Some(connection) => {
            let handler = SnapshotHandler::new(SnapshotService::new(Arc::clone(&snapshots)));
            Some(SnapshotConsumers::start(connection, &config.rabbitmq, handler).await?)
        }
        None => None,
    };

    let state = AppState::new(config.clone(), ports, Some(pool.clone()));

    let mut scheduler = JobScheduler::new();
    scheduler.register(FinishEventsJob::new(
        state.events.clone(),
        config.jobs.finish_events_interval_secs,
    ));
    scheduler.register(PoolMetricsJob::new(
        pool.clone(),
        config.jobs.pool_metrics_interval_secs,
    ));
    scheduler.start();

    let app = create_app(state);
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight requests are done; stop consumers, then jobs, then connections.
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if let Some(consumers) = consumers {
        consumers.shutdown(shutdown_timeout).await;
    }
    scheduler.shutdown();
    scheduler.wait_for_shutdown(shutdown_timeout).await;

    if let Some(connection) = connection {
        if let Err(e) = connection.close(200, "shutdown").await {
            tracing::warn!(error = %e, "Failed to close RabbitMQ connection");
        }
    }
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
