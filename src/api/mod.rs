pub(crate) mod errors;
pub(crate) mod grading;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod submissions;
pub(crate) mod training;
pub(crate) mod workflows;
