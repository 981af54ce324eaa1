pub(crate) mod grading;
pub(crate) mod reschedule;
pub(crate) mod scheduler;
pub(crate) mod training;

use anyhow::Result;

use crate::core::state::AppState;
use crate::services::task_queue::{TaskKind, TaskMessage};

/// How a worker task left its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    Completed,
    Failed,
    /// The workflow was already terminal, e.g. a duplicate delivery.
    Skipped,
}

impl TaskOutcome {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

pub(crate) async fn execute(state: &AppState, message: &TaskMessage) -> Result<TaskOutcome> {
    match message.kind {
        TaskKind::TrainClassifiers => training::train_classifiers(state, &message.workflow_id).await,
        TaskKind::GradeEssay => grading::grade_essay(state, &message.workflow_id).await,
    }
}
