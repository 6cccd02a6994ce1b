use reqwest::Response;
use serde_json::Value;
use thiserror::Error;

/// Longest upstream error text kept in a message
const MAX_MESSAGE_LEN: usize = 300;

/// Why an enrichment call produced no usable context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("the service responded with an error status ({status}): {message}")]
    ServerStatus { status: u16, message: String },

    #[error("the request was sent but no response was received ({0})")]
    NoResponse(String),

    #[error("the request could not be constructed or sent ({0})")]
    RequestSetup(String),

    #[error("no results were found for this location")]
    NoResults,

    #[error("the service returned an unreadable response ({0})")]
    InvalidPayload(String),
}

impl EnrichmentError {
    /// Sort a transport error into one of the failure categories
    #[must_use]
    pub fn classify(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::ServerStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_builder() {
            Self::RequestSetup(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::InvalidPayload(err.to_string())
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::NoResponse(err.to_string())
        } else {
            Self::RequestSetup(err.to_string())
        }
    }
}

/// Pass a successful response through, turn anything else into
/// [`EnrichmentError::ServerStatus`] carrying the upstream error text.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, EnrichmentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(EnrichmentError::ServerStatus {
        status: status.as_u16(),
        message: upstream_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
    })
}

/// Best-effort extraction of an error message from a JSON or text body
pub(crate) fn upstream_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => json_message(&json).unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    };
    Some(message.chars().take(MAX_MESSAGE_LEN).collect())
}

fn json_message(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("detail")
            .or_else(|| fields.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
