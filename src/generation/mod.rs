//! Itinerary text generation
//!
//! Two strategies, tried in priority order and resolved once per run:
//! 1. The primary model API (Gemini) when its key is configured, always
//!    streaming.
//! 2. Otherwise the provider abstraction, which picks the first configured
//!    backend and either completes in one shot or streams, per configuration.
//!
//! Every backend implements [`TextGenerator`], so the two modes share one
//! call site in [`Strategy::generate`].

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod provider;
pub(crate) mod sse;

use std::fmt;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::enrichment::USER_AGENT;
use crate::models::GeneratedItinerary;
use crate::output::OutputSink;

pub use anthropic::AnthropicClient;
pub use error::GenerationError;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Fragments buffered between the network task and the terminal echo
const FRAGMENT_BUFFER: usize = 64;

/// One completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

/// A text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name used in logs and messages
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Return the whole completion at once
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Send text fragments in arrival order, returning once the response
    /// has ended. The sender is dropped on return.
    async fn stream(
        &self,
        request: &GenerationRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<(), GenerationError>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, GenerationError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Complete,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// The direct model API
    Primary,
    /// Picked by the provider abstraction
    AutoSelected,
}

/// The backend and mode chosen for this run
pub struct Strategy {
    kind: StrategyKind,
    mode: GenerationMode,
    generator: Box<dyn TextGenerator>,
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("provider", &self.generator.name())
            .field("model", &self.generator.model())
            .finish()
    }
}

impl Strategy {
    pub fn new(kind: StrategyKind, mode: GenerationMode, generator: Box<dyn TextGenerator>) -> Self {
        Self {
            kind,
            mode,
            generator,
        }
    }

    /// Pick the strategy for this run.
    ///
    /// `stream_override` only applies to auto-selected providers; the
    /// primary API always streams.
    pub fn resolve(config: &GenerationConfig, stream_override: Option<bool>) -> Result<Self, GenerationError> {
        if let Some(key) = &config.primary.api_key {
            let timeout = Duration::from_secs(u64::from(config.timeout_seconds));
            let client = GeminiClient::from_config(&config.primary, key.clone(), timeout)?;
            debug!(model = %config.primary.model, "Using primary model API");
            return Ok(Self::new(StrategyKind::Primary, GenerationMode::Stream, Box::new(client)));
        }

        let generator = provider::best_available(config)?;
        let mode = if stream_override.unwrap_or(config.stream) {
            GenerationMode::Stream
        } else {
            GenerationMode::Complete
        };
        Ok(Self::new(StrategyKind::AutoSelected, mode, generator))
    }

    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    #[must_use]
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// e.g. `gemini (gemini-2.5-flash, streaming)`
    #[must_use]
    pub fn describe(&self) -> String {
        let mode = match self.mode {
            GenerationMode::Complete => "single response",
            GenerationMode::Stream => "streaming",
        };
        format!("{} ({}, {mode})", self.generator.name(), self.generator.model())
    }

    /// Run the generation and echo the text to the sink's terminal.
    ///
    /// Streamed fragments are echoed as they arrive. Nothing is written to
    /// the output file here; a failed or empty generation returns an error
    /// so the caller never persists partial text.
    pub async fn generate<W: Write>(
        &self,
        request: &GenerationRequest,
        sink: &mut OutputSink<W>,
    ) -> Result<GeneratedItinerary, GenerationError> {
        info!(strategy = %self.describe(), prompt_len = request.prompt.len(), "Generating itinerary");

        let itinerary = match self.mode {
            GenerationMode::Complete => {
                let text = self.generator.complete(request).await?;
                if let Err(e) = sink.echo(&text) {
                    warn!(error = %e, "Failed to echo itinerary");
                }
                GeneratedItinerary::from_text(text)
            }
            GenerationMode::Stream => {
                let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(FRAGMENT_BUFFER);
                let producer = self.generator.stream(request, chunk_tx);
                let consumer = async {
                    let mut itinerary = GeneratedItinerary::default();
                    while let Some(fragment) = chunk_rx.recv().await {
                        if let Err(e) = sink.echo(&fragment) {
                            warn!(error = %e, "Failed to echo fragment");
                        }
                        itinerary.push_fragment(fragment);
                    }
                    itinerary
                };

                let (streamed, itinerary) = tokio::join!(producer, consumer);
                streamed?;
                debug!(fragments = itinerary.fragments().len(), "Stream finished");
                itinerary
            }
        };

        if itinerary.is_empty() {
            return Err(GenerationError::EmptyResponse {
                provider: self.generator.name().to_string(),
            });
        }
        Ok(itinerary)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Generator replaying canned fragments, optionally failing at the end
    pub struct ScriptedGenerator {
        pub fragments: Vec<String>,
        pub fail_after: Option<GenerationError>,
        pub prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedGenerator {
        pub fn new(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(ToString::to_string).collect(),
                fail_after: None,
                prompts: Arc::default(),
            }
        }

        pub fn failing(fragments: &[&str], error: GenerationError) -> Self {
            Self {
                fail_after: Some(error),
                ..Self::new(fragments)
            }
        }

        fn take_failure(&self) -> Result<(), GenerationError> {
            match &self.fail_after {
                Some(GenerationError::Api {
                    provider,
                    status,
                    message,
                }) => Err(GenerationError::Api {
                    provider: provider.clone(),
                    status: *status,
                    message: message.clone(),
                }),
                Some(_) => Err(GenerationError::InvalidResponse("scripted failure".to_string())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.take_failure()?;
            Ok(self.fragments.concat())
        }

        async fn stream(
            &self,
            request: &GenerationRequest,
            chunk_tx: mpsc::Sender<String>,
        ) -> Result<(), GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            for fragment in &self.fragments {
                if chunk_tx.send(fragment.clone()).await.is_err() {
                    break;
                }
            }
            self.take_failure()
        }
    }
}
