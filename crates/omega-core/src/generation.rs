//! Generation client for the OpenAI-compatible text/image API.
//!
//! Thin wrapper only: no retry, no backoff, no rate-limit handling. Failures
//! surface to the caller as `GatewayError::Upstream`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

// OpenAI-compatible request/response shapes.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    size: String,
    response_format: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: String,
}

/// The upstream generation API as the dispatcher sees it: returns text or a
/// base64 image, or fails.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Chat completion; returns the first choice's message content.
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> GatewayResult<String>;

    /// Image synthesis; returns the base64-encoded image payload.
    async fn generate_image(&self, prompt: &str) -> GatewayResult<String>;
}

/// Live backend against an OpenAI-compatible endpoint.
pub struct OpenAiBackend {
    api_base: String,
    api_key: String,
    text_model: String,
    image_model: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let base: String = api_base.into();
        Self {
            api_base: base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            text_model: text_model.into(),
            image_model: image_model.into(),
            client,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> GatewayResult<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: self.text_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature,
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(format!("chat request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(format!(
                "generation API error {status}: {body}"
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| GatewayError::upstream(format!("chat response parse failed: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::upstream("generation API returned no choices"))
    }

    async fn generate_image(&self, prompt: &str) -> GatewayResult<String> {
        let url = format!("{}/images/generations", self.api_base);
        let body = ImageRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            size: "1024x1024".to_string(),
            response_format: "b64_json".to_string(),
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(format!("image request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(format!(
                "generation API error {status}: {body}"
            )));
        }

        let parsed: ImageResponse = res
            .json()
            .await
            .map_err(|e| GatewayError::upstream(format!("image response parse failed: {e}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.b64_json)
            .ok_or_else(|| GatewayError::upstream("generation API returned no image data"))
    }
}

/// A chat call the mock recorded, for asserting on prompts in tests.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Scripted backend for tests: canned payloads, recorded prompts, optional
/// forced failure.
pub struct MockBackend {
    reply: String,
    image_b64: String,
    failing: bool,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            image_b64: "bW9jay1pbWFnZQ==".to_string(),
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose every call fails with an upstream error.
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            image_b64: String::new(),
            failing: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> GatewayResult<String> {
        if self.failing {
            return Err(GatewayError::upstream("mock backend failure"));
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MockCall {
                system: system.to_string(),
                user: user.to_string(),
                temperature,
            });
        }
        Ok(self.reply.clone())
    }

    async fn generate_image(&self, prompt: &str) -> GatewayResult<String> {
        if self.failing {
            return Err(GatewayError::upstream("mock backend failure"));
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MockCall {
                system: "image".to_string(),
                user: prompt.to_string(),
                temperature: 0.0,
            });
        }
        Ok(self.image_b64.clone())
    }
}
