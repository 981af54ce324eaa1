pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{
    config::Settings,
    redis::RedisHandle,
    state::{AppState, StateParts},
    telemetry,
};
use crate::services::algorithm::AlgorithmRegistry;
use crate::services::submissions::PgSubmissionStore;
use crate::services::task_queue::RedisTaskQueue;
use crate::services::workflow_store::PgWorkflowStore;

pub async fn run() -> anyhow::Result<()> {
    let (state, redis) = bootstrap().await?;

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Essay grader API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    let (state, redis) = bootstrap().await?;

    let result = tasks::scheduler::run(state).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

async fn bootstrap() -> anyhow::Result<(AppState, RedisHandle)> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; dispatch will fail until it is back");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let algorithms = AlgorithmRegistry::from_settings(&settings)?;
    tracing::info!(algorithms = ?algorithms.ids().collect::<Vec<_>>(), "Algorithms registered");

    let state = build_state(settings, db_pool, redis.clone(), algorithms);
    Ok((state, redis))
}

fn build_state(
    settings: Settings,
    db_pool: PgPool,
    redis: RedisHandle,
    algorithms: AlgorithmRegistry,
) -> AppState {
    let queue = RedisTaskQueue::new(redis.clone(), settings.queue().name.clone());
    AppState::new(
        settings,
        StateParts {
            workflows: Arc::new(PgWorkflowStore::new(db_pool.clone())),
            submissions: Arc::new(PgSubmissionStore::new(db_pool)),
            queue: Arc::new(queue),
            algorithms,
            redis: Some(redis),
        },
    )
}
