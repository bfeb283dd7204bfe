//! A deterministic, no-network [`TextCollaborator`] for tests. Never
//! use this outside tests — like the teacher's dev authenticator, it
//! exists purely to let code built against the trait be exercised
//! without a live collaborator.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::contract::TextCollaborator;
use crate::error::LlmError;

/// Replies to a `complete` call by either looking up a canned response
/// keyed on the exact prompt text, or falling back to an echo of the
/// prompt. Optionally scripted to fail its first N calls, to exercise
/// [`crate::RetryingCollaborator`] without real network flakiness.
pub struct MockCollaborator {
    responses: HashMap<String, String>,
    fail_first: u32,
    calls: Mutex<u32>,
}

impl MockCollaborator {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fail_first: 0,
            calls: Mutex::new(0),
        }
    }

    pub fn with_response(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.insert(prompt.into(), response.into());
        self
    }

    pub fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().expect("mock collaborator lock poisoned")
    }
}

impl Default for MockCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCollaborator for MockCollaborator {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let call_index = {
            let mut calls = self.calls.lock().expect("mock collaborator lock poisoned");
            let index = *calls;
            *calls += 1;
            index
        };

        if call_index < self.fail_first {
            return Err(LlmError::RequestFailed("mock scripted failure".into()));
        }

        match self.responses.get(prompt) {
            Some(response) => Ok(response.clone()),
            None => Ok(format!("echo: {prompt}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_scripted_response_for_exact_prompt() {
        let mock = MockCollaborator::new().with_response("convert this", "<html>converted</html>");
        let out = mock.complete("convert this").await.unwrap();
        assert_eq!(out, "<html>converted</html>");
    }

    #[tokio::test]
    async fn falls_back_to_echo_for_unscripted_prompt() {
        let mock = MockCollaborator::new();
        let out = mock.complete("anything").await.unwrap();
        assert_eq!(out, "echo: anything");
    }

    #[tokio::test]
    async fn fails_first_n_calls_then_succeeds() {
        let mock = MockCollaborator::new().failing_first(2);
        assert!(mock.complete("x").await.is_err());
        assert!(mock.complete("x").await.is_err());
        assert!(mock.complete("x").await.is_ok());
        assert_eq!(mock.call_count(), 3);
    }
}
