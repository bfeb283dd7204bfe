//! The collaborator boundary itself: a single narrow trait standing in
//! for "the LLM" everywhere else in this workspace. No message history,
//! no tool calls, no streaming — one prompt in, one completion out.
//! Conversion-pipeline code is written entirely against this trait and
//! never learns which vendor or model answered it.

use std::time::Duration;

use crate::error::LlmError;

/// Text-in, text-out collaborator.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` so a single collaborator instance can be
/// shared across the conversion worker pool's tasks.
pub trait TextCollaborator: Send + Sync + 'static {
    /// Produces a single completion for `prompt`. Implementations own
    /// their own internal timeout; [`RetryingCollaborator`] layers an
    /// additional budget-wide deadline and retry policy on top of
    /// whatever an implementation already does.
    fn complete(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}

/// Bounds on how long, and how many times, the conversion pipeline is
/// willing to wait on the collaborator for one prompt.
#[derive(Debug, Clone, Copy)]
pub struct CollaboratorBudget {
    /// Wall-clock budget for a single attempt.
    pub attempt_timeout: Duration,
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Linear backoff unit between retries.
    pub retry_backoff: Duration,
}

impl Default for CollaboratorBudget {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(20),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Wraps any [`TextCollaborator`] with a per-attempt timeout and a
/// bounded, linearly-backed-off retry loop. This is the type the
/// conversion pipeline actually holds — never a bare collaborator.
pub struct RetryingCollaborator<C> {
    inner: C,
    budget: CollaboratorBudget,
}

impl<C: TextCollaborator> RetryingCollaborator<C> {
    pub fn new(inner: C, budget: CollaboratorBudget) -> Self {
        Self { inner, budget }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut last_err = None;
        for attempt in 1..=self.budget.max_attempts {
            let attempt_result = tokio::time::timeout(
                self.budget.attempt_timeout,
                self.inner.complete(prompt),
            )
            .await;

            let outcome = match attempt_result {
                Ok(inner_result) => inner_result,
                Err(_) => Err(LlmError::Timeout),
            };

            match outcome {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < self.budget.max_attempts => {
                    tracing::warn!(attempt, error = %err, "collaborator attempt failed, retrying");
                    tokio::time::sleep(self.budget.retry_backoff * attempt).await;
                    last_err = Some(err);
                }
                Err(err) => {
                    return Err(LlmError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
            }
        }
        // Unreachable in practice: the loop above always returns on its
        // final iteration. Kept as a defined fallback rather than a panic.
        Err(LlmError::RetriesExhausted {
            attempts: self.budget.max_attempts,
            last: Box::new(last_err.unwrap_or(LlmError::Timeout)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyCollaborator {
        fail_times: u32,
        calls: Arc<AtomicU32>,
    }

    impl TextCollaborator for FlakyCollaborator {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
            if call_index < self.fail_times {
                Err(LlmError::RequestFailed("simulated".into()))
            } else {
                Ok(format!("ok:{prompt}"))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let collaborator = RetryingCollaborator::new(
            FlakyCollaborator { fail_times: 2, calls: calls.clone() },
            CollaboratorBudget { max_attempts: 3, ..Default::default() },
        );
        let result = collaborator.complete("hello").await.unwrap();
        assert_eq!(result, "ok:hello");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retry_budget_and_reports_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let collaborator = RetryingCollaborator::new(
            FlakyCollaborator { fail_times: 99, calls: calls.clone() },
            CollaboratorBudget { max_attempts: 2, retry_backoff: Duration::from_millis(1), ..Default::default() },
        );
        let err = collaborator.complete("hello").await.unwrap_err();
        match err {
            LlmError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    struct NonRetryableCollaborator;

    impl TextCollaborator for NonRetryableCollaborator {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::InvalidResponse("missing text field".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_stops_after_first_attempt() {
        let collaborator = RetryingCollaborator::new(
            NonRetryableCollaborator,
            CollaboratorBudget { max_attempts: 5, ..Default::default() },
        );
        let err = collaborator.complete("hello").await.unwrap_err();
        match err {
            LlmError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }
}
