use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::algorithm::AlgorithmRegistry;
use crate::services::submissions::SubmissionStore;
use crate::services::task_queue::TaskQueue;
use crate::services::workflow_store::WorkflowStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    workflows: Arc<dyn WorkflowStore>,
    submissions: Arc<dyn SubmissionStore>,
    queue: Arc<dyn TaskQueue>,
    algorithms: AlgorithmRegistry,
    redis: Option<RedisHandle>,
}

pub(crate) struct StateParts {
    pub(crate) workflows: Arc<dyn WorkflowStore>,
    pub(crate) submissions: Arc<dyn SubmissionStore>,
    pub(crate) queue: Arc<dyn TaskQueue>,
    pub(crate) algorithms: AlgorithmRegistry,
    pub(crate) redis: Option<RedisHandle>,
}

impl AppState {
    pub(crate) fn new(settings: Settings, parts: StateParts) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                workflows: parts.workflows,
                submissions: parts.submissions,
                queue: parts.queue,
                algorithms: parts.algorithms,
                redis: parts.redis,
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn workflows(&self) -> &dyn WorkflowStore {
        self.inner.workflows.as_ref()
    }

    pub(crate) fn submissions(&self) -> &dyn SubmissionStore {
        self.inner.submissions.as_ref()
    }

    pub(crate) fn queue(&self) -> &dyn TaskQueue {
        self.inner.queue.as_ref()
    }

    pub(crate) fn algorithms(&self) -> &AlgorithmRegistry {
        &self.inner.algorithms
    }

    pub(crate) fn redis(&self) -> Option<&RedisHandle> {
        self.inner.redis.as_ref()
    }
}
