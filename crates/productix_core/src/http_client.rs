//! HTTP client for a Gemini-style `generateContent` text-completion endpoint.
//!
//! This module provides a reqwest-based implementation of the
//! [`TextCompletion`](crate::TextCompletion) trait.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::observability;
use crate::retry::RetryPolicy;
use crate::{CompletionRequest, ProductixError, TextCompletion};

#[derive(Clone, Debug)]
pub struct ReqwestCompletionClient {
    base_url: String,
    model: String,
    api_key: SecretString,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl ReqwestCompletionClient {
    /// Create a client without a request timeout.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com`
    /// * `model` - model name such as `gemini-2.5-flash`
    /// * `api_key` - sent in the `x-goog-api-key` header
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: SecretString,
    ) -> Result<Self, ProductixError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(base_url, model, api_key, client))
    }

    pub fn from_config(config: &Config) -> Result<Self, ProductixError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(
            &config.base_url,
            config.model.clone(),
            config.api_key.clone(),
            client,
        ))
    }

    fn with_client(
        base_url: &str,
        model: impl Into<String>,
        api_key: SecretString,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<String, ProductixError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        let payload: GenerateContentResponse = resp.json().await?;
        extract_text(payload)
    }
}

/// Extract error information from a failed response.
async fn error_from_response(resp: reqwest::Response) -> ProductixError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let body_snippet: String = body.chars().take(256).collect();
    ProductixError::from_status(status, body_snippet)
}

fn extract_text(payload: GenerateContentResponse) -> Result<String, ProductixError> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ProductixError::MalformedResponse(
            "completion contained no text".into(),
        ));
    }
    Ok(text)
}

fn request_body(request: &CompletionRequest) -> serde_json::Value {
    let mut body = json!({
        "contents": [{"role": "user", "parts": [{"text": request.prompt}]}]
    });
    if let Some(instruction) = &request.system_instruction {
        body["systemInstruction"] = json!({"parts": [{"text": instruction}]});
    }
    body
}

#[async_trait]
impl TextCompletion for ReqwestCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProductixError> {
        let body = request_body(&request);
        debug!(model = %self.model, prompt_chars = request.prompt.len(), "requesting completion");
        let result = self.retry.retry_async(|| self.send_once(&body)).await;
        observability::record_completion(if result.is_ok() { "ok" } else { "error" });
        result
    }
}
