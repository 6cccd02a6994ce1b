//! OpenAI Chat Completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::sse::forward_fragments;
use super::{GenerationError, GenerationRequest, TextGenerator, http_client};
use crate::config::BackendConfig;

const PROVIDER: &str = "openai";

pub struct OpenAiClient {
    http: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn from_config(
        config: &BackendConfig,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            http: http_client(timeout)?,
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "stream": stream,
        });

        // gpt-5 and the o-series only accept max_completion_tokens
        let uses_completion_tokens = self.model.starts_with("gpt-5")
            || self.model.starts_with("o1")
            || self.model.starts_with("o3")
            || self.model.starts_with("o4");
        if uses_completion_tokens {
            body["max_completion_tokens"] = json!(request.max_tokens);
        } else {
            body["max_tokens"] = json!(request.max_tokens);
        }
        body
    }

    async fn post(&self, request: &GenerationRequest, stream: bool) -> Result<Response, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(%url, stream, "Sending OpenAI request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(PROVIDER, status.as_u16(), &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response: ChatResponse = self
            .post(request, false)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn stream(
        &self,
        request: &GenerationRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<(), GenerationError> {
        let response = self.post(request, true).await?;
        forward_fragments(response, &chunk_tx, decode_event).await
    }
}

fn decode_event(data: &str) -> Result<Option<String>, GenerationError> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| GenerationError::InvalidResponse(format!("OpenAI stream event: {e}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}
