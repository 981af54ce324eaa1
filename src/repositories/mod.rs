pub(crate) mod assessments;
pub(crate) mod classifier_sets;
pub(crate) mod grading_workflows;
pub(crate) mod health;
pub(crate) mod rubrics;
pub(crate) mod scopes;
pub(crate) mod submissions;
pub(crate) mod training_workflows;
