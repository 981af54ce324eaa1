use std::fmt;

use async_trait::async_trait;
use redis::{cmd, RedisError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::redis::RedisHandle;
use crate::core::time::{format_primitive, primitive_now_utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TaskKind {
    TrainClassifiers,
    GradeEssay,
}

impl TaskKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::TrainClassifiers => "train_classifiers",
            Self::GradeEssay => "grade_essay",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire format of a queued task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TaskMessage {
    pub(crate) kind: TaskKind,
    pub(crate) workflow_id: String,
    pub(crate) enqueued_at: String,
}

impl TaskMessage {
    pub(crate) fn new(kind: TaskKind, workflow_id: &str) -> Self {
        Self {
            kind,
            workflow_id: workflow_id.to_string(),
            enqueued_at: format_primitive(primitive_now_utc()),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("task queue is not connected")]
    Disconnected,
    #[error("task queue error: {0}")]
    Redis(#[from] RedisError),
    #[error("failed to encode task message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// At-least-once delivery of worker tasks. Dispatch never waits for the task to run.
#[async_trait]
pub(crate) trait TaskQueue: Send + Sync {
    async fn dispatch(&self, kind: TaskKind, workflow_id: &str) -> Result<(), DispatchError>;
}

#[derive(Clone)]
pub(crate) struct RedisTaskQueue {
    redis: RedisHandle,
    queue_name: String,
}

impl RedisTaskQueue {
    pub(crate) fn new(redis: RedisHandle, queue_name: impl Into<String>) -> Self {
        Self { redis, queue_name: queue_name.into() }
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn dispatch(&self, kind: TaskKind, workflow_id: &str) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(&TaskMessage::new(kind, workflow_id))?;
        let mut connection = self.redis.connection().await.ok_or(DispatchError::Disconnected)?;

        cmd("LPUSH")
            .arg(&self.queue_name)
            .arg(payload)
            .query_async::<_, i64>(&mut connection)
            .await?;

        metrics::counter!("tasks_dispatched_total", "kind" => kind.as_str()).increment(1);
        tracing::debug!(kind = %kind, workflow_id, queue = %self.queue_name, "Task dispatched");
        Ok(())
    }
}

/// A message taken from the queue and parked on the consumer's processing list
/// until acknowledged.
#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    raw: String,
}

impl Delivery {
    pub(crate) fn message(&self) -> Result<TaskMessage, serde_json::Error> {
        serde_json::from_str(&self.raw)
    }
}

/// Reliable consumer: `BLMOVE` into a per-worker processing list, `LREM` on ack.
pub(crate) struct RedisTaskConsumer {
    redis: RedisHandle,
    queue_name: String,
    processing_list: String,
}

impl RedisTaskConsumer {
    pub(crate) fn new(redis: RedisHandle, queue_name: &str, consumer_id: &str) -> Self {
        Self {
            redis,
            queue_name: queue_name.to_string(),
            processing_list: processing_list_name(queue_name, consumer_id),
        }
    }

    /// Moves deliveries left unacknowledged by a previous run back onto the queue.
    pub(crate) async fn recover(&self) -> Result<usize, DispatchError> {
        let mut connection = self.redis.connection().await.ok_or(DispatchError::Disconnected)?;
        let mut recovered = 0;

        loop {
            let moved = cmd("LMOVE")
                .arg(&self.processing_list)
                .arg(&self.queue_name)
                .arg("RIGHT")
                .arg("RIGHT")
                .query_async::<_, Option<String>>(&mut connection)
                .await?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(
                processing_list = %self.processing_list,
                recovered,
                "Requeued unacknowledged tasks"
            );
        }
        Ok(recovered)
    }

    /// Waits up to `timeout_seconds` for the next delivery.
    pub(crate) async fn next(&self, timeout_seconds: u64) -> Result<Option<Delivery>, DispatchError> {
        let mut connection = self.redis.connection().await.ok_or(DispatchError::Disconnected)?;

        let raw = cmd("BLMOVE")
            .arg(&self.queue_name)
            .arg(&self.processing_list)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout_seconds)
            .query_async::<_, Option<String>>(&mut connection)
            .await?;

        Ok(raw.map(|raw| Delivery { raw }))
    }

    pub(crate) async fn ack(&self, delivery: &Delivery) -> Result<(), DispatchError> {
        let mut connection = self.redis.connection().await.ok_or(DispatchError::Disconnected)?;

        cmd("LREM")
            .arg(&self.processing_list)
            .arg(1)
            .arg(&delivery.raw)
            .query_async::<_, i64>(&mut connection)
            .await?;
        Ok(())
    }
}

fn processing_list_name(queue_name: &str, consumer_id: &str) -> String {
    format!("{queue_name}:processing:{consumer_id}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_uses_snake_case_kind() {
        let message = TaskMessage::new(TaskKind::GradeEssay, "wf-1");
        let value = serde_json::to_value(&message).expect("serialize message");

        assert_eq!(value["kind"], json!("grade_essay"));
        assert_eq!(value["workflow_id"], json!("wf-1"));
        assert!(value["enqueued_at"].as_str().is_some_and(|at| at.ends_with('Z')));
    }

    #[test]
    fn delivery_decodes_wire_payload() {
        let delivery = Delivery {
            raw: r#"{"kind":"train_classifiers","workflow_id":"wf-2","enqueued_at":"2025-01-02T10:20:30Z"}"#
                .to_string(),
        };
        let message = delivery.message().expect("decode");
        assert_eq!(message.kind, TaskKind::TrainClassifiers);
        assert_eq!(message.workflow_id, "wf-2");
    }

    #[test]
    fn delivery_rejects_unknown_kind() {
        let delivery =
            Delivery { raw: r#"{"kind":"reboot","workflow_id":"x","enqueued_at":""}"#.to_string() };
        assert!(delivery.message().is_err());
    }

    #[test]
    fn processing_list_is_scoped_per_consumer() {
        assert_eq!(
            processing_list_name("grader:tasks", "worker-1-0"),
            "grader:tasks:processing:worker-1-0"
        );
    }

    #[tokio::test]
    async fn dispatch_without_connection_fails() {
        let redis = RedisHandle::new("redis://127.0.0.1:6379/1".to_string());
        let queue = RedisTaskQueue::new(redis, "grader:tasks");

        let err = queue.dispatch(TaskKind::TrainClassifiers, "wf-3").await.unwrap_err();
        assert!(matches!(err, DispatchError::Disconnected));
    }
}
