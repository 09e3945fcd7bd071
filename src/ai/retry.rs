//! Retry with exponential backoff around single generation calls.

use super::{CodeGenerator, GeneratedSource, GenerationError, TransformRequest};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Backoff schedule for transient generation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before retry number `retry` (1-based), capped at `max_backoff`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run one generation call under `policy`, bounding each attempt by
/// `call_timeout`.
///
/// Non-retryable errors (authentication above all) are returned as-is on the
/// first occurrence. Retryable errors that survive every attempt come back
/// wrapped in [`GenerationError::RetriesExhausted`].
pub async fn generate_with_retry(
    generator: &dyn CodeGenerator,
    request: &TransformRequest,
    policy: &RetryPolicy,
    call_timeout: Duration,
) -> Result<GeneratedSource, GenerationError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match timeout(call_timeout, generator.transform(request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(call_timeout)),
        };

        let error = match outcome {
            Ok(generated) => return Ok(generated),
            Err(e) => e,
        };

        if !error.is_retryable() {
            return Err(error);
        }

        if attempt >= attempts {
            warn!(
                artifact = %request.artifact,
                attempts,
                error = %error,
                "Giving up on generation call"
            );
            return Err(GenerationError::RetriesExhausted {
                attempts,
                last: Box::new(error),
            });
        }

        let mut wait = policy.backoff_for(attempt);
        if let Some(hint) = error.retry_after() {
            wait = hint.min(policy.max_backoff);
        }

        debug!(
            artifact = %request.artifact,
            attempt,
            backoff_ms = wait.as_millis() as u64,
            error = %error,
            "Retrying generation call"
        );
        sleep(wait).await;
    }
}
