use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::Settings;
use crate::db::models::Classifier;

/// One training essay with the points it earned for a single criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ExampleEssay {
    pub(crate) text: String,
    pub(crate) score: i32,
}

#[derive(Debug, Error)]
pub(crate) enum AlgorithmError {
    #[error("training failed: {0}")]
    Training(String),
    #[error("scoring failed: {0}")]
    Scoring(String),
    #[error("algorithm service returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("algorithm service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub(crate) trait Algorithm: Send + Sync {
    async fn train(&self, examples: &[ExampleEssay]) -> Result<Classifier, AlgorithmError>;

    async fn score(&self, text: &str, classifier: &Classifier) -> Result<f64, AlgorithmError>;
}

/// Algorithm id → implementation, resolved per workflow.
#[derive(Clone, Default)]
pub(crate) struct AlgorithmRegistry {
    algorithms: BTreeMap<String, Arc<dyn Algorithm>>,
}

impl AlgorithmRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, id: impl Into<String>, algorithm: impl Algorithm + 'static) -> Self {
        self.algorithms.insert(id.into(), Arc::new(algorithm));
        self
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<dyn Algorithm>> {
        self.algorithms.get(id).cloned()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.algorithms.contains_key(id)
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.algorithms().request_timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut registry = Self::new();
        for (id, base_url) in &settings.algorithms().endpoints {
            registry = registry.with(id.clone(), HttpAlgorithm::new(client.clone(), id, base_url));
            tracing::info!(algorithm_id = %id, base_url = %base_url, "Registered algorithm");
        }

        if registry.algorithms.is_empty() {
            tracing::warn!("No algorithms configured; training and grading requests will be rejected");
        }

        Ok(registry)
    }
}

#[derive(Debug, Serialize)]
struct TrainRequest<'a> {
    examples: &'a [ExampleEssay],
}

#[derive(Debug, Deserialize)]
struct TrainResponse {
    classifier: String,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
    classifier: String,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// Remote train/score service speaking JSON; classifiers travel base64-encoded.
#[derive(Debug, Clone)]
pub(crate) struct HttpAlgorithm {
    client: Client,
    id: String,
    base_url: String,
}

impl HttpAlgorithm {
    pub(crate) fn new(client: Client, id: &str, base_url: &str) -> Self {
        Self {
            client,
            id: id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        on_rejected: fn(String) -> AlgorithmError,
    ) -> Result<R, AlgorithmError> {
        let url = format!("{}/{path}", self.base_url);
        let timer = Instant::now();

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| AlgorithmError::Unavailable(err.to_string()))?;

        let status = response.status();
        metrics::histogram!(
            "algorithm_request_duration_seconds",
            "algorithm" => self.id.clone(),
            "operation" => path.to_string()
        )
        .record(timer.elapsed().as_secs_f64());

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            let detail = response.text().await.unwrap_or_default();
            return Err(AlgorithmError::Unavailable(format!("{status}: {detail}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(on_rejected(format!("{status}: {detail}")));
        }

        response.json::<R>().await.map_err(|err| AlgorithmError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl Algorithm for HttpAlgorithm {
    async fn train(&self, examples: &[ExampleEssay]) -> Result<Classifier, AlgorithmError> {
        tracing::debug!(algorithm_id = %self.id, examples = examples.len(), "Sending train request");
        let response: TrainResponse =
            self.post("train", &TrainRequest { examples }, AlgorithmError::Training).await?;

        BASE64
            .decode(response.classifier.as_bytes())
            .map(Classifier::from)
            .map_err(|err| AlgorithmError::InvalidResponse(err.to_string()))
    }

    async fn score(&self, text: &str, classifier: &Classifier) -> Result<f64, AlgorithmError> {
        let request = ScoreRequest { text, classifier: BASE64.encode(classifier.as_bytes()) };
        let response: ScoreResponse =
            self.post("score", &request, AlgorithmError::Scoring).await?;

        if !response.score.is_finite() {
            return Err(AlgorithmError::InvalidResponse(format!(
                "non-finite score {}",
                response.score
            )));
        }

        Ok(response.score)
    }
}
