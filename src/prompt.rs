//! Prompt template engine
//!
//! Templates use handlebars `{{key}}` placeholders naming [`TripRequest`]
//! fields. Rendering is strict: a placeholder the request cannot supply is
//! an error instead of being left in the output. Values are inserted
//! verbatim, never HTML-escaped and never rescanned, so a value containing
//! `{{...}}` is copied literally.

use std::fs;
use std::path::Path;

use anyhow::Context;
use handlebars::{Handlebars, RenderErrorReason};
use tracing::debug;

use crate::models::TripRequest;
use crate::{Result, TravelPlanError};

/// Built-in itinerary instructions
pub const DEFAULT_TEMPLATE: &str = "
You are an intelligent travel assistant helping users plan personalized, optimized, and realistic daily travel itineraries. The user will provide their destination, travel dates, trip type, and preferences. Based on that, you will generate a full-day-by-day itinerary that includes:

- Top attractions (famous + hidden gems)
- Local restaurants (based on taste or diet)
- Events/festivals happening during that time (if any)
- Breaks, buffer time, and transit duration
- Local cultural tips or fun facts (1 per day)
- A packing tip or weather advice based on forecast
- respond in plain text only. Your entire response must be plain text, with no markdown formatting such as headers, bolding, or lists.

## User Info:
- Destination: {{destination}}
- Dates: {{start_date}} to {{end_date}}
- Type of Trip: {{trip_type}} (e.g., business, leisure, adventure, food tour, cultural, solo, couple, family)
- Interests: {{interests}} (e.g., art, food, architecture, nightlife, hiking, nature, relaxation, photography)
- Budget: {{budget}} (e.g., budget, mid-range, luxury)
- Travel pace: {{pace}} (e.g., relaxed, medium, packed)
- Extra Notes: {{extra_notes}}

## Instructions:
1. Divide the trip into clear Day 1, Day 2... sections.
2. Each day should include:
   - Morning activity
   - Lunch place (with cuisine suggestion)
   - Afternoon activity
   - Optional evening plan or rest idea
3. Mention entry fees, travel time, local customs briefly if relevant.
4. Try to maximize unique experiences, not just common tourist spots.
5. Include 1 line of travel wisdom or tip each day.

Your entire response must be in plain text. Do not use any markdown.
";

/// A prompt template with `{{key}}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    hbs: Handlebars<'static>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        Self {
            source: source.into(),
            hbs,
        }
    }

    /// Load a template from a text file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
        debug!(path = %path.display(), bytes = source.len(), "Loaded prompt template");
        Ok(Self::new(source))
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute every placeholder with the matching request field.
    ///
    /// Fails with a validation error naming the first key the request
    /// cannot supply, or describing the syntax error.
    pub fn render(&self, trip: &TripRequest) -> Result<String> {
        self.hbs
            .render_template(&self.source, &trip.template_context())
            .map_err(|e| match e.reason() {
                RenderErrorReason::MissingVariable(Some(key)) => TravelPlanError::validation(
                    format!("prompt template has an unresolved placeholder: {key}"),
                ),
                _ => TravelPlanError::validation(format!("prompt template cannot be rendered: {e}")),
            })
    }
}
