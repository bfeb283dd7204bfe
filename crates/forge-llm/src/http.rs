//! An HTTP-backed [`TextCollaborator`]. Speaks a narrow JSON request/
//! response shape (`{"prompt": ...}` in, `{"text": ...}` out) against a
//! configurable endpoint — vendor-specific adapters live outside this
//! workspace and can implement [`TextCollaborator`] directly instead of
//! going through this generic shape.

use serde::{Deserialize, Serialize};

use crate::contract::TextCollaborator;
use crate::error::LlmError;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

/// Talks to a single HTTP endpoint that accepts `{"prompt": "..."}` and
/// returns `{"text": "..."}`. No retry or timeout logic lives here —
/// that's [`crate::RetryingCollaborator`]'s job, layered on top.
pub struct HttpCollaborator {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpCollaborator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

impl TextCollaborator for HttpCollaborator {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&CompletionRequest { prompt });

        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| LlmError::RequestFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::RequestFailed(format!(
                "collaborator endpoint returned status {}",
                response.status()
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;

        if body.text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("empty completion text".into()));
        }

        Ok(body.text)
    }
}
