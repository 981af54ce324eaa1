use std::future::Future;

/// Attempt, retry up to `max_retries` times, then hand back the last error.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
}

#[derive(Debug)]
pub(crate) struct Exhausted<E> {
    pub(crate) attempts: u32,
    pub(crate) last_error: E,
}

impl RetryPolicy {
    pub(crate) const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub(crate) fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub(crate) async fn run<T, E, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, Exhausted<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt_number = 1;
        loop {
            match attempt(attempt_number).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt_number < self.max_attempts() => {
                    tracing::warn!(
                        operation,
                        attempt = attempt_number,
                        error = %err,
                        "Attempt failed; retrying"
                    );
                    attempt_number += 1;
                }
                Err(err) => {
                    tracing::error!(
                        operation,
                        attempts = attempt_number,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(Exhausted { attempts: attempt_number, last_error: err });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::RetryPolicy;

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::new(1)
            .run("op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(7) }
            })
            .await;

        assert_eq!(result.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let result = RetryPolicy::new(1)
            .run("op", |attempt| async move {
                if attempt == 1 {
                    Err("first attempt fails".to_string())
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.ok(), Some(2));
    }

    #[tokio::test]
    async fn surfaces_last_error_after_bound() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::new(1)
            .run("op", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(format!("failure {attempt}")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.attempts, 2);
        assert_eq!(err.last_error, "failure 2");
    }

    #[tokio::test]
    async fn zero_retries_attempts_once() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::new(0)
            .run("op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("nope") }
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
