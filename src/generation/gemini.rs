//! Google Gemini client, the direct model API

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

const PROVIDER: &str = "gemini";

pub struct GeminiClient {
    http: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
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

    fn body(request: &GenerationRequest) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": { "maxOutputTokens": request.max_tokens },
        })
    }

    async fn post(&self, method: &str, request: &GenerationRequest) -> Result<Response, GenerationError> {
        let url = format!("{}/models/{}:{method}", self.base_url, self.model);
        debug!(%url, prompt_len = request.prompt.len(), "Sending Gemini request");

        let mut builder = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::body(request));
        if method == "streamGenerateContent" {
            builder = builder.query(&[("alt", "sse")]);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(PROVIDER, status.as_u16(), &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self.post("generateContent", request).await?;
        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(body.text())
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn stream(
        &self,
        request: &GenerationRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<(), GenerationError> {
        let response = self.post("streamGenerateContent", request).await?;
        forward_fragments(response, &chunk_tx, decode_event).await
    }
}

/// Text carried by one streamed Gemini event
fn decode_event(data: &str) -> Result<Option<String>, GenerationError> {
    let event: GeminiResponse = serde_json::from_str(data)
        .map_err(|e| GenerationError::InvalidResponse(format!("Gemini stream event: {e}")))?;
    if let Some(error) = event.error {
        return Err(GenerationError::Api {
            provider: PROVIDER.to_string(),
            status: error.code.unwrap_or_default(),
            message: error.message.unwrap_or_default(),
        });
    }
    Ok(Some(event.text()))
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<GeminiError>,
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
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: Option<String>,
}

impl GeminiResponse {
    /// Text parts of the first candidate, concatenated
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}
