//! Anthropic Messages API client

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

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
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

    async fn post(&self, request: &GenerationRequest, stream: bool) -> Result<Response, GenerationError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(%url, stream, "Sending Anthropic request");

        let body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [{ "role": "user", "content": request.prompt }],
            "stream": stream,
        });

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
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
impl TextGenerator for AnthropicClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response: MessageResponse = self
            .post(request, false)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect())
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
    let event: StreamEvent = serde_json::from_str(data)
        .map_err(|e| GenerationError::InvalidResponse(format!("Anthropic stream event: {e}")))?;

    match event.kind.as_str() {
        "content_block_delta" => Ok(event.delta.and_then(|delta| delta.text)),
        "error" => Err(GenerationError::Api {
            provider: PROVIDER.to_string(),
            status: 0,
            message: event
                .error
                .and_then(|error| error.message)
                .unwrap_or_else(|| "stream error".to_string()),
        }),
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    delta: Option<StreamDelta>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn client(base_url: String) -> AnthropicClient {
        let config = BackendConfig {
            model: "claude-3-5-haiku-latest".to_string(),
            base_url,
            api_key: None,
        };
        AnthropicClient::from_config(&config, "ant-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Plan Kyoto".to_string(),
            max_tokens: 2048,
        }
    }

    #[tokio::test]
    async fn test_complete() {
        let body = r#"{"id":"msg_1","type":"message","content":[{"type":"text","text":"Day 1: Fushimi Inari"}]}"#;
        let (base_url, captured) = serve_once("200 OK", "application/json", body).await;

        let text = client(base_url).complete(&request()).await.unwrap();
        assert_eq!(text, "Day 1: Fushimi Inari");

        let captured = captured.await.unwrap();
        let head = captured.head.to_lowercase();
        assert!(head.starts_with("post /v1/messages"));
        assert!(head.contains("x-api-key: ant-key"));
        assert!(head.contains("anthropic-version: 2023-06-01"));
        assert!(captured.body.contains("\"max_tokens\":2048"));
    }

    #[tokio::test]
    async fn test_stream() {
        let body = concat!(
            "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Day 1: \"}}\n\n",
            "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Arashiyama\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        );
        let (base_url, _) = serve_once("200 OK", "text/event-stream", body).await;

        let (tx, mut rx) = mpsc::channel(16);
        client(base_url).stream(&request(), tx).await.unwrap();

        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment);
        }
        assert_eq!(fragments, vec!["Day 1: ", "Arashiyama"]);
    }

    #[test]
    fn test_stream_error_event() {
        let err = decode_event(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }
}
