use thiserror::Error;

/// Failure returned by the orchestrators to their callers.
#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    /// The caller supplied something unusable; nothing was persisted.
    #[error("{0}")]
    Request(String),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
