pub(crate) mod algorithm;
pub(crate) mod classifier_sets;
pub(crate) mod errors;
pub(crate) mod grading;
pub(crate) mod retry;
pub(crate) mod submissions;
pub(crate) mod task_queue;
pub(crate) mod training;
pub(crate) mod workflow_store;
