use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod grading;
pub(crate) mod rubric;
pub(crate) mod submission;
pub(crate) mod training;
pub(crate) mod workflow;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}
