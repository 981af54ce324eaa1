use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "workflowstatus", rename_all = "lowercase")]
pub(crate) enum WorkflowStatus {
    Pending,
    Complete,
    Failed,
}

impl WorkflowStatus {
    pub(crate) fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}
