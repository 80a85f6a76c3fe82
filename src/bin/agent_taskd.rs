//! Runs the task engine's background jobs against `PostgreSQL`.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://... agent-taskd
//! ```
//!
//! The daemon primes the activity index, then runs the retention sweep and
//! the periodic index resync until interrupted. Intervals and timeouts are
//! read from `SWEEP_INTERVAL`, `INDEX_RESYNC_INTERVAL`, `RETENTION_MONTHS`
//! and `TRANSACTION_TIMEOUT`; log filtering follows `RUST_LOG`.

use agent_task_manager::config::EngineConfig;
use agent_task_manager::task::{
    adapters::postgres::{PostgresTaskStore, TaskPgPool},
    services::{ActivityIndex, BackgroundJobs, RetentionSweeper},
};
use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use mockable::DefaultClock;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let config = EngineConfig::from_env();
    tracing::info!(
        sweep_interval_s = config.sweep_interval().as_secs(),
        resync_interval_s = config.resync_interval().as_secs(),
        retention_months = config.retention().as_u32(),
        "starting agent-taskd"
    );

    let pool: TaskPgPool =
        TaskPgPool::builder().build(ConnectionManager::<PgConnection>::new(database_url))?;
    let store = Arc::new(
        PostgresTaskStore::new(pool).with_transaction_timeout(config.transaction_timeout()),
    );

    let index = ActivityIndex::init(&*store).await?;
    let mut jobs = BackgroundJobs::new();

    let sweeper = Arc::new(RetentionSweeper::new(Arc::clone(&store), Arc::new(DefaultClock)));
    jobs.push("retention-sweep", sweeper.spawn(config.sweep_interval(), jobs.token()));
    jobs.push(
        "activity-resync",
        index.start_resync(Arc::clone(&store), config.resync_interval(), jobs.token()),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    jobs.shutdown().await;
    tracing::info!("agent-taskd stopped");
    Ok(())
}
