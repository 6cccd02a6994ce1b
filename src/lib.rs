//! `travelplan` - AI travel itinerary generator
//!
//! This library collects trip details from an interactive prompt, enriches
//! them with live search and flight results, and asks a text-generation
//! backend for a day-by-day itinerary that is written to a file.

pub mod app;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod generation;
pub mod input;
pub mod logging;
pub mod models;
pub mod output;
pub mod prompt;

#[cfg(test)]
mod test_support;

// Re-export core types for public API
pub use app::{Planner, RunOptions, RunOutcome};
pub use config::TravelPlanConfig;
pub use enrichment::{EnrichmentBundle, EnrichmentError, EnrichmentGateway};
pub use error::TravelPlanError;
pub use generation::{GenerationError, Strategy, TextGenerator};
pub use models::{FlightQuery, GeneratedItinerary, TripRequest};
pub use prompt::PromptTemplate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelPlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
