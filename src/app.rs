//! End-to-end planning run
//!
//! Input collection, prompt rendering, enrichment, generation and output,
//! strictly in that order.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{
    ANTHROPIC_KEY_VARS, FLIGHTS_KEY_VARS, OPENAI_KEY_VARS, PRIMARY_KEY_VARS, SEARCH_KEY_VARS,
    TravelPlanConfig,
};
use crate::enrichment::EnrichmentGateway;
use crate::generation::{GenerationError, GenerationRequest, Strategy, provider};
use crate::input::InputCollector;
use crate::models::{FlightQuery, TripRequest};
use crate::output::OutputSink;
use crate::prompt::PromptTemplate;

/// Per-invocation overrides from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub output_path: Option<PathBuf>,
    pub enrich: bool,
    pub stream: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            enrich: true,
            stream: None,
        }
    }
}

/// How a run ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The itinerary was written to this file
    Written(PathBuf),
    /// No generation backend is configured; guidance was printed
    NoProvider,
}

/// Which environment variables enable which backend
#[must_use]
pub fn setup_guidance() -> String {
    format!(
        "No AI provider is configured, so no itinerary can be generated.\n\
         \n\
         Set one of the following and run again:\n\
         \x20 {}  Google Gemini (used first, streams the answer)\n\
         \x20 {}  OpenAI\n\
         \x20 {}  Anthropic\n\
         \n\
         Optional, for live context in the itinerary:\n\
         \x20 {}  web search for events and weather\n\
         \x20 {}  flight search\n\
         \n\
         Keys can also be placed in a .env file in the current directory.\n",
        PRIMARY_KEY_VARS.join(" or "),
        OPENAI_KEY_VARS.join(" or "),
        ANTHROPIC_KEY_VARS.join(" or "),
        SEARCH_KEY_VARS.join(" or "),
        FLIGHTS_KEY_VARS.join(" or "),
    )
}

/// Summary of the backends a run would use, without contacting any of them
pub fn describe_setup(config: &TravelPlanConfig) -> Result<String> {
    let generation = match Strategy::resolve(&config.generation, None) {
        Ok(strategy) => strategy.describe(),
        Err(GenerationError::NoProvider) => "not configured".to_string(),
        Err(e) => return Err(e).context("Failed to set up the generation backend"),
    };

    let providers = provider::configured(&config.generation);
    let providers = if providers.is_empty() {
        "none".to_string()
    } else {
        providers.join(", ")
    };

    let search = if config.search.api_key.is_some() {
        "Brave Search"
    } else {
        "not configured"
    };
    let flights = match (&config.flights.api_key, config.flights.enabled) {
        (Some(_), true) => "SerpApi Google Flights",
        (Some(_), false) => "disabled",
        (None, _) => "not configured",
    };

    Ok(format!(
        "Generation:      {generation}\n\
         Fallback keys:   {providers}\n\
         Web search:      {search}\n\
         Flight search:   {flights}\n\
         Output file:     {}\n",
        config.output.path.display()
    ))
}

/// Reject templates that use keys no trip can supply before asking the
/// user anything, by rendering against an empty trip
fn check_template(template: &PromptTemplate, with_flights: bool) -> crate::Result<()> {
    let sample = TripRequest {
        flight: with_flights.then(FlightQuery::default),
        ..TripRequest::default()
    };
    template.render(&sample).map(|_| ())
}

/// Everything one planning run needs, resolved up front
pub struct Planner {
    template: PromptTemplate,
    gateway: EnrichmentGateway,
    strategy: Strategy,
    output_path: PathBuf,
    max_tokens: u32,
}

impl Planner {
    pub fn new(
        template: PromptTemplate,
        gateway: EnrichmentGateway,
        strategy: Strategy,
        output_path: PathBuf,
        max_tokens: u32,
    ) -> Self {
        Self {
            template,
            gateway,
            strategy,
            output_path,
            max_tokens,
        }
    }

    /// Collect a trip, build the prompt and write the generated itinerary.
    ///
    /// Returns the path of the written file.
    pub async fn plan<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<PathBuf> {
        check_template(&self.template, self.gateway.has_flights())?;

        let mut collector = InputCollector::new(input, output);
        let trip = collector.collect(self.gateway.has_flights())?;
        let mut out = collector.into_output();

        let mut prompt = self.template.render(&trip)?;

        if self.gateway.is_active_for(&trip) {
            writeln!(out, "\nFetching real-time information for {}...", trip.destination)?;
            let bundle = self.gateway.enrich(&trip).await;
            info!(sections = bundle.sections().len(), "Enrichment finished");
            prompt = bundle.append_to(prompt);
        }

        writeln!(out, "\nGenerating your itinerary with {}...\n", self.strategy.describe())?;
        out.flush()?;

        let request = GenerationRequest {
            prompt,
            max_tokens: self.max_tokens,
        };
        let mut sink = OutputSink::new(&self.output_path, out);
        let itinerary = self.strategy.generate(&request, &mut sink).await?;
        sink.persist(&itinerary)?;

        Ok(self.output_path.clone())
    }
}

/// Run the interactive planner.
///
/// The generation strategy is resolved before the first prompt. Without
/// any backend the setup guidance is printed and the output file is left
/// alone.
pub async fn run<R: BufRead, W: Write>(
    config: &TravelPlanConfig,
    options: &RunOptions,
    input: R,
    mut output: W,
) -> Result<RunOutcome> {
    let strategy = match Strategy::resolve(&config.generation, options.stream) {
        Ok(strategy) => strategy,
        Err(GenerationError::NoProvider) => {
            warn!("No text generation provider configured");
            write!(output, "{}", setup_guidance())?;
            output.flush()?;
            return Ok(RunOutcome::NoProvider);
        }
        Err(e) => return Err(e).context("Failed to set up the generation backend"),
    };

    let template = match &config.prompt.template_path {
        Some(path) => PromptTemplate::from_file(path)?,
        None => PromptTemplate::default(),
    };

    let gateway = if options.enrich {
        EnrichmentGateway::from_config(config)?
    } else {
        info!("Enrichment disabled for this run");
        EnrichmentGateway::new(Vec::new())
    };

    let output_path = options
        .output_path
        .clone()
        .unwrap_or_else(|| config.output.path.clone());

    let planner = Planner::new(
        template,
        gateway,
        strategy,
        output_path,
        config.generation.max_tokens,
    );
    let path = planner.plan(input, output).await?;
    Ok(RunOutcome::Written(path))
}
