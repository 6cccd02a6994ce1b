//! Automatic provider selection
//!
//! Picks the first backend with a configured key, unless the configuration
//! pins one.

use std::time::Duration;

use tracing::{debug, info};

use super::anthropic::AnthropicClient;
use super::openai::OpenAiClient;
use super::{GenerationError, TextGenerator};
use crate::config::GenerationConfig;

/// Providers tried when `generation.provider` is `auto`, in priority order
pub const AUTO_ORDER: [&str; 2] = ["openai", "anthropic"];

/// Build the generator the provider abstraction settles on.
///
/// Fails with [`GenerationError::NoProvider`] when no candidate has a key.
pub fn best_available(config: &GenerationConfig) -> Result<Box<dyn TextGenerator>, GenerationError> {
    let candidates: Vec<&str> = match config.provider.as_str() {
        "auto" => AUTO_ORDER.to_vec(),
        pinned => vec![pinned],
    };

    for name in candidates {
        if let Some(generator) = build(config, name)? {
            info!(provider = generator.name(), model = generator.model(), "Selected text generation provider");
            return Ok(generator);
        }
        debug!(provider = name, "Provider has no API key, skipping");
    }
    Err(GenerationError::NoProvider)
}

/// Names of the providers that have a key, in selection order
#[must_use]
pub fn configured(config: &GenerationConfig) -> Vec<&'static str> {
    AUTO_ORDER
        .into_iter()
        .filter(|name| match *name {
            "openai" => config.openai.api_key.is_some(),
            "anthropic" => config.anthropic.api_key.is_some(),
            _ => false,
        })
        .collect()
}

fn build(config: &GenerationConfig, name: &str) -> Result<Option<Box<dyn TextGenerator>>, GenerationError> {
    let timeout = Duration::from_secs(u64::from(config.timeout_seconds));
    let generator: Box<dyn TextGenerator> = match name {
        "openai" => match &config.openai.api_key {
            Some(key) => Box::new(OpenAiClient::from_config(&config.openai, key.clone(), timeout)?),
            None => return Ok(None),
        },
        "anthropic" => match &config.anthropic.api_key {
            Some(key) => Box::new(AnthropicClient::from_config(&config.anthropic, key.clone(), timeout)?),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(generator))
}
