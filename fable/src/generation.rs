//! Story generation via a hosted chat-completion API.
//!
//! One synchronous POST per request: a single-message conversation with the
//! prompt, the configured model identifier, and the session's story key as
//! bearer auth. The first choice's message content is the story.
//!
//! Two failure shapes are kept distinct: a non-2xx status surfaces as
//! [`Error::Upstream`] (the caller decides how to degrade), while a 2xx body
//! that lacks a `choices` array degrades here to [`STORY_ERROR_SENTINEL`].

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::config::StoryConfig;
use crate::errors::Error;

/// Fixed story text rendered when the generation API response is unusable
pub const STORY_ERROR_SENTINEL: &str = "Error generating story.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Clone)]
pub struct StoryClient {
    http: Client,
    api_url: Url,
    model: String,
}

impl StoryClient {
    pub fn new(http: Client, config: &StoryConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        }
    }

    /// Generate a story for `prompt`.
    ///
    /// Returns `Err(Error::Upstream)` for network failures and non-2xx
    /// statuses. A 2xx response that is not JSON or has no usable `choices`
    /// returns the sentinel story text.
    pub async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(self.api_url.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                service: "story",
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "story",
                status: Some(status.as_u16()),
                detail: body,
            });
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Story API returned a non-JSON success body: {}", e);
                return Ok(STORY_ERROR_SENTINEL.to_string());
            }
        };

        match body.pointer("/choices/0/message/content").and_then(Value::as_str) {
            Some(content) => Ok(content.to_string()),
            None => {
                warn!(%body, "Story API response has no usable choices");
                Ok(STORY_ERROR_SENTINEL.to_string())
            }
        }
    }
}
