//! Configuration management for the `travelplan` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TravelPlanError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `travelplan` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelPlanConfig {
    /// Text generation backends
    pub generation: GenerationConfig,
    /// Web search enrichment
    pub search: SearchConfig,
    /// Flight data enrichment
    pub flights: FlightsConfig,
    /// Prompt template settings
    pub prompt: PromptConfig,
    /// Output file settings
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Text generation settings shared by every backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Request timeout in seconds, passed to every generation call
    pub timeout_seconds: u32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Stream the auto-selected provider instead of a single-shot call
    pub stream: bool,
    /// Provider preference for auto-selection (auto, openai, anthropic)
    pub provider: String,
    /// Direct model API, used whenever its key is present
    pub primary: BackendConfig,
    /// OpenAI candidate for auto-selection
    pub openai: BackendConfig,
    /// Anthropic candidate for auto-selection
    pub anthropic: BackendConfig,
}

/// Connection settings for one generation backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Web search enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Results requested per query
    pub count: u32,
    /// Query templates rendered against the trip request
    pub queries: Vec<String>,
    pub timeout_seconds: u32,
}

/// Flight data enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightsConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Adult passenger count
    pub adults: u32,
    /// 1 economy, 2 premium economy, 3 business, 4 first
    pub travel_class: u8,
    pub currency: String,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Custom template file; the built-in template is used when unset
    pub template_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File overwritten with the generated itinerary
    pub path: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty, compact or json)
    pub format: String,
    /// OTLP/HTTP endpoint for span export, disabled when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_generation_timeout() -> u32 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_provider() -> String {
    "auto".to_string()
}

fn default_primary_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_primary_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_search_base_url() -> String {
    "https://api.search.brave.com/res/v1".to_string()
}

fn default_search_count() -> u32 {
    5
}

fn default_search_queries() -> Vec<String> {
    vec![
        "events and festivals in {{destination}} from {{start_date}} to {{end_date}}".to_string(),
        "weather forecast for {{destination}} from {{start_date}} to {{end_date}}".to_string(),
    ]
}

fn default_enrichment_timeout() -> u32 {
    30
}

fn default_flights_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_adults() -> u32 {
    1
}

fn default_travel_class() -> u8 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_generation_timeout(),
            max_tokens: default_max_tokens(),
            stream: false,
            provider: default_provider(),
            primary: BackendConfig {
                model: default_primary_model(),
                base_url: default_primary_base_url(),
                api_key: None,
            },
            openai: BackendConfig {
                model: default_openai_model(),
                base_url: default_openai_base_url(),
                api_key: None,
            },
            anthropic: BackendConfig {
                model: default_anthropic_model(),
                base_url: default_anthropic_base_url(),
                api_key: None,
            },
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key: None,
            count: default_search_count(),
            queries: default_search_queries(),
            timeout_seconds: default_enrichment_timeout(),
        }
    }
}

impl Default for FlightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_flights_base_url(),
            api_key: None,
            adults: default_adults(),
            travel_class: default_travel_class(),
            currency: default_currency(),
            timeout_seconds: default_enrichment_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

/// Well-known credential variables, checked in order for each key slot
pub const PRIMARY_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];
pub const OPENAI_KEY_VARS: &[&str] = &["OPENAI_API_KEY"];
pub const ANTHROPIC_KEY_VARS: &[&str] = &["ANTHROPIC_API_KEY"];
pub const SEARCH_KEY_VARS: &[&str] = &["BRAVE_SEARCH_API_KEY", "BRAVE_API_KEY"];
pub const FLIGHTS_KEY_VARS: &[&str] = &["SERPAPI_API_KEY"];

const VALID_PROVIDERS: [&str; 3] = ["auto", "openai", "anthropic"];

impl TravelPlanConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. TRAVELPLAN_GENERATION__TIMEOUT_SECONDS=60
        builder = builder.add_source(
            Environment::with_prefix("TRAVELPLAN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelPlanConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.fill_credentials(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travelplan").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        let generation = &mut self.generation;
        if generation.timeout_seconds == 0 {
            generation.timeout_seconds = default_generation_timeout();
        }
        if generation.max_tokens == 0 {
            generation.max_tokens = default_max_tokens();
        }
        if generation.provider.is_empty() {
            generation.provider = default_provider();
        }
        fill_backend(
            &mut generation.primary,
            default_primary_model,
            default_primary_base_url,
        );
        fill_backend(
            &mut generation.openai,
            default_openai_model,
            default_openai_base_url,
        );
        fill_backend(
            &mut generation.anthropic,
            default_anthropic_model,
            default_anthropic_base_url,
        );

        if self.search.base_url.is_empty() {
            self.search.base_url = default_search_base_url();
        }
        if self.search.count == 0 {
            self.search.count = default_search_count();
        }
        if self.search.queries.is_empty() {
            self.search.queries = default_search_queries();
        }
        if self.search.timeout_seconds == 0 {
            self.search.timeout_seconds = default_enrichment_timeout();
        }

        if self.flights.base_url.is_empty() {
            self.flights.base_url = default_flights_base_url();
        }
        if self.flights.adults == 0 {
            self.flights.adults = default_adults();
        }
        if self.flights.travel_class == 0 {
            self.flights.travel_class = default_travel_class();
        }
        if self.flights.currency.is_empty() {
            self.flights.currency = default_currency();
        }
        if self.flights.timeout_seconds == 0 {
            self.flights.timeout_seconds = default_enrichment_timeout();
        }

        if self.output.path.as_os_str().is_empty() {
            self.output.path = default_output_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Fill every unset API key from the well-known credential variables.
    ///
    /// Keys already present in the file or `TRAVELPLAN_*` overrides win.
    /// Blank values count as unset.
    pub fn fill_credentials<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots: [(&mut Option<String>, &[&str]); 5] = [
            (&mut self.generation.primary.api_key, PRIMARY_KEY_VARS),
            (&mut self.generation.openai.api_key, OPENAI_KEY_VARS),
            (&mut self.generation.anthropic.api_key, ANTHROPIC_KEY_VARS),
            (&mut self.search.api_key, SEARCH_KEY_VARS),
            (&mut self.flights.api_key, FLIGHTS_KEY_VARS),
        ];

        for (slot, names) in slots {
            if slot.as_deref().is_some_and(|key| key.trim().is_empty()) {
                *slot = None;
            }
            if slot.is_none() {
                *slot = names
                    .iter()
                    .filter_map(|name| lookup(name))
                    .find(|value| !value.trim().is_empty());
            }
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.generation.timeout_seconds > 600 {
            return Err(
                TravelPlanError::config("Generation timeout cannot exceed 600 seconds").into(),
            );
        }

        if self.search.count > 20 {
            return Err(
                TravelPlanError::config("Search result count cannot exceed 20").into(),
            );
        }

        if self.search.timeout_seconds > 300 || self.flights.timeout_seconds > 300 {
            return Err(TravelPlanError::config(
                "Enrichment timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.flights.adults > 9 {
            return Err(
                TravelPlanError::config("Flight search supports at most 9 adults").into(),
            );
        }

        if !(1..=4).contains(&self.flights.travel_class) {
            return Err(TravelPlanError::config(
                "Flight travel class must be between 1 (economy) and 4 (first)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelPlanError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelPlanError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !VALID_PROVIDERS.contains(&self.generation.provider.as_str()) {
            return Err(TravelPlanError::config(format!(
                "Invalid generation provider '{}'. Must be one of: {}",
                self.generation.provider,
                VALID_PROVIDERS.join(", ")
            ))
            .into());
        }

        let urls = [
            ("generation.primary", &self.generation.primary.base_url),
            ("generation.openai", &self.generation.openai.base_url),
            ("generation.anthropic", &self.generation.anthropic.base_url),
            ("search", &self.search.base_url),
            ("flights", &self.flights.base_url),
        ];
        for (section, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelPlanError::config(format!(
                    "{section} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn fill_backend(backend: &mut BackendConfig, model: fn() -> String, base_url: fn() -> String) {
    if backend.model.is_empty() {
        backend.model = model();
    }
    if backend.base_url.is_empty() {
        backend.base_url = base_url();
    }
}
