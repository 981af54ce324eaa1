use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::core::redis::RedisHandle;
use crate::core::state::AppState;
use crate::services::task_queue::{RedisTaskConsumer, TaskMessage};
use crate::tasks::{self, reschedule};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let concurrency = state.settings().worker().concurrency;

    let mut handles = Vec::with_capacity(concurrency + 1);
    for index in 0..concurrency {
        let consumer_id = format!("{}-{index}", state.settings().worker().id);
        handles.push(tokio::spawn(task_worker(state.clone(), consumer_id, shutdown_rx.clone())));
    }
    handles.push(tokio::spawn(reschedule_loop(state.clone(), shutdown_rx.clone())));

    tracing::info!(
        worker_id = %state.settings().worker().id,
        concurrency,
        queue = %state.settings().queue().name,
        "Worker started"
    );

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn task_worker(state: AppState, consumer_id: String, mut shutdown: watch::Receiver<bool>) {
    // BLMOVE blocks its connection, so each consumer gets a dedicated one.
    let redis = RedisHandle::new(state.settings().redis().redis_url());
    let consumer = RedisTaskConsumer::new(redis.clone(), &state.settings().queue().name, &consumer_id);
    let poll_timeout = state.settings().queue().poll_timeout_seconds;
    let mut recovered = false;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if redis.connection().await.is_none() {
            if let Err(err) = redis.connect().await {
                tracing::error!(consumer_id, error = %err, "Task consumer failed to connect to Redis");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(RECONNECT_DELAY) => continue,
                }
            }
        }

        if !recovered {
            match consumer.recover().await {
                Ok(_) => recovered = true,
                Err(err) => {
                    tracing::error!(consumer_id, error = %err, "Failed to requeue unacknowledged tasks");
                }
            }
        }

        let delivery = tokio::select! {
            _ = shutdown.changed() => break,
            next = consumer.next(poll_timeout) => next,
        };

        let delivery = match delivery {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(err) => {
                tracing::error!(consumer_id, error = %err, "Failed to read from task queue");
                redis.disconnect().await;
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(RECONNECT_DELAY) => continue,
                }
            }
        };

        match delivery.message() {
            Ok(message) => {
                run_task(&state, &message).await;
            }
            Err(err) => {
                tracing::error!(consumer_id, error = %err, "Discarding malformed task message");
            }
        }

        if let Err(err) = consumer.ack(&delivery).await {
            tracing::error!(consumer_id, error = %err, "Failed to acknowledge task");
        }
    }

    redis.disconnect().await;
    tracing::debug!(consumer_id, "Task consumer stopped");
}

/// Runs one delivery. Errors are logged and the workflow stays pending for the sweep.
pub(crate) async fn run_task(state: &AppState, message: &TaskMessage) -> &'static str {
    let result = tasks::execute(state, message).await;
    let outcome = match &result {
        Ok(outcome) => outcome.as_str(),
        Err(_) => "error",
    };
    metrics::counter!("worker_tasks_total", "kind" => message.kind.as_str(), "outcome" => outcome)
        .increment(1);

    match result {
        Ok(outcome) => tracing::info!(
            kind = %message.kind,
            workflow_id = %message.workflow_id,
            outcome = outcome.as_str(),
            "Task finished"
        ),
        Err(err) => tracing::error!(
            kind = %message.kind,
            workflow_id = %message.workflow_id,
            error = format!("{err:#}"),
            "Task failed; workflow left pending"
        ),
    }
    outcome
}

async fn reschedule_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().worker().reschedule_interval_seconds);
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = reschedule_all_scopes(&state).await {
                    tracing::error!(error = %err, "reschedule_all_scopes failed");
                }
            }
        }
    }
}

/// Sweeps every (course, item) scope that still holds pending workflows.
///
/// A failing scope is logged and does not stop the others.
pub(crate) async fn reschedule_all_scopes(state: &AppState) -> Result<usize> {
    let scopes = state.workflows().list_incomplete_scopes().await?;
    let mut failed = 0;

    for scope in &scopes {
        if let Err(err) =
            reschedule::reschedule_unfinished(state, &scope.course_id, &scope.item_id).await
        {
            failed += 1;
            tracing::error!(
                course_id = %scope.course_id,
                item_id = %scope.item_id,
                error = %err,
                "Scope reschedule failed"
            );
        }
    }

    if !scopes.is_empty() {
        tracing::info!(scopes = scopes.len(), failed, "Periodic reschedule finished");
    }
    Ok(scopes.len())
}
