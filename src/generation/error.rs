use thiserror::Error;

use crate::enrichment::error::upstream_message;

/// Why no itinerary text could be generated
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no text generation provider is configured")]
    NoProvider,

    #[error("{provider} rejected the API key (HTTP {status}): {message}")]
    Unauthorized {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{provider} returned no text")]
    EmptyResponse { provider: String },
}

impl GenerationError {
    /// Map a non-success HTTP response onto an error kind
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        let message = upstream_message(body).unwrap_or_else(|| "no details".to_string());
        // Gemini answers a bad key with 400 INVALID_ARGUMENT
        let bad_key = matches!(status, 401 | 403)
            || (status == 400 && (body.contains("API_KEY_INVALID") || body.contains("API key not valid")));

        if bad_key {
            Self::Unauthorized {
                provider: provider.to_string(),
                status,
                message,
            }
        } else {
            Self::Api {
                provider: provider.to_string(),
                status,
                message,
            }
        }
    }

    /// Human-readable explanation with a hint on how to fix it
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::NoProvider => {
                "No AI provider is configured. Set one of the provider API keys and run again."
                    .to_string()
            }
            GenerationError::Unauthorized { provider, .. } => format!(
                "The {provider} API key was rejected. Check that the key is valid and has access to the configured model."
            ),
            GenerationError::Api {
                provider,
                status,
                message,
            } => format!("{provider} could not generate the itinerary (HTTP {status}): {message}"),
            GenerationError::Network(e) if e.is_timeout() => {
                "The AI provider did not answer in time. Try again or raise generation.timeout_seconds."
                    .to_string()
            }
            GenerationError::Network(e) => {
                format!("Unable to reach the AI provider: {e}. Please check your internet connection.")
            }
            GenerationError::InvalidResponse(message) => {
                format!("The AI provider sent a response that could not be read: {message}")
            }
            GenerationError::EmptyResponse { provider } => {
                format!("{provider} returned an empty itinerary. Try again with more trip details.")
            }
        }
    }
}
