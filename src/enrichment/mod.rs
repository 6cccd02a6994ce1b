//! Enrichment gateway
//!
//! Fetches live context for the itinerary prompt:
//! - Web search results for events and weather at the destination
//! - Flight search results for the collected route and dates
//!
//! Every call is best-effort. Failures are logged and turned into
//! explanatory text, so the gateway always hands back a bundle and never
//! an error.

pub mod error;
pub mod flights;
pub mod search;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::TravelPlanConfig;
use crate::models::{FlightQuery, TripRequest};
use crate::prompt::PromptTemplate;

pub use error::EnrichmentError;
pub use flights::SerpApiFlightsClient;
pub use search::BraveSearchClient;

pub(crate) const USER_AGENT: &str = concat!("travelplan/", env!("CARGO_PKG_VERSION"));

pub const REALTIME_SECTION: &str = "Real-time Information";
pub const FLIGHT_SECTION: &str = "Flight Information";

/// A web search backend returning one text snippet per result
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, EnrichmentError>;
}

/// A flight data backend returning the raw search payload
#[async_trait]
pub trait FlightSearch: Send + Sync {
    async fn search_flights(&self, query: &FlightQuery) -> Result<Value, EnrichmentError>;
}

/// Labeled blocks of context appended to the prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentBundle {
    sections: Vec<EnrichmentSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSection {
    pub title: &'static str,
    pub body: String,
}

impl EnrichmentBundle {
    pub fn push(&mut self, title: &'static str, body: String) {
        self.sections.push(EnrichmentSection { title, body });
    }

    #[must_use]
    pub fn sections(&self) -> &[EnrichmentSection] {
        &self.sections
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Append every section to `prompt` under its label
    #[must_use]
    pub fn append_to(&self, mut prompt: String) -> String {
        for section in &self.sections {
            prompt.push_str("\n\n## ");
            prompt.push_str(section.title);
            prompt.push_str(":\n");
            prompt.push_str(&section.body);
        }
        prompt
    }
}

/// Runs the configured enrichment services for one trip
pub struct EnrichmentGateway {
    search: Option<Box<dyn WebSearch>>,
    flights: Option<Box<dyn FlightSearch>>,
    queries: Vec<PromptTemplate>,
}

impl EnrichmentGateway {
    /// A gateway with no services attached
    #[must_use]
    pub fn new(queries: Vec<PromptTemplate>) -> Self {
        Self {
            search: None,
            flights: None,
            queries,
        }
    }

    /// Attach the services whose credentials are configured
    pub fn from_config(config: &TravelPlanConfig) -> crate::Result<Self> {
        let queries = config
            .search
            .queries
            .iter()
            .map(|query| PromptTemplate::new(query.as_str()))
            .collect();
        let mut gateway = Self::new(queries);

        if let Some(key) = &config.search.api_key {
            gateway = gateway.with_search(Box::new(BraveSearchClient::new(
                &config.search,
                key.clone(),
            )?));
        }
        if config.flights.enabled
            && let Some(key) = &config.flights.api_key
        {
            gateway = gateway.with_flights(Box::new(SerpApiFlightsClient::new(
                &config.flights,
                key.clone(),
            )?));
        }

        debug!(
            search = gateway.has_search(),
            flights = gateway.has_flights(),
            "Enrichment gateway configured"
        );
        Ok(gateway)
    }

    #[must_use]
    pub fn with_search(mut self, search: Box<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    #[must_use]
    pub fn with_flights(mut self, flights: Box<dyn FlightSearch>) -> Self {
        self.flights = Some(flights);
        self
    }

    #[must_use]
    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    /// Whether flight details should be collected from the user
    #[must_use]
    pub fn has_flights(&self) -> bool {
        self.flights.is_some()
    }

    /// Whether [`Self::enrich`] would call anything for this trip
    #[must_use]
    pub fn is_active_for(&self, trip: &TripRequest) -> bool {
        self.has_search() || (self.has_flights() && trip.flight.is_some())
    }

    /// Render the configured query templates for `trip`, dropping any that
    /// reference unknown fields.
    #[must_use]
    pub fn search_queries(&self, trip: &TripRequest) -> Vec<String> {
        self.queries
            .iter()
            .filter_map(|query| match query.render(trip) {
                Ok(rendered) => Some(rendered),
                Err(e) => {
                    warn!(query = query.source(), error = %e, "Skipping search query");
                    None
                }
            })
            .collect()
    }

    /// Search results for every query, one block per query.
    ///
    /// Returns an empty string when no search service is configured.
    pub async fn search_context(&self, trip: &TripRequest) -> String {
        let Some(search) = &self.search else {
            return String::new();
        };

        let mut blocks = Vec::new();
        for query in self.search_queries(trip) {
            let block = match search.search(&query).await {
                Ok(results) => format!("{query}:\n{}", results.join("\n")),
                Err(EnrichmentError::NoResults) => {
                    info!(%query, "No search results for this location");
                    format!("{query}: no real-time results were found for this location.")
                }
                Err(e) => {
                    warn!(%query, error = %e, "Web search failed");
                    format!("{query}: real-time information is unavailable because {e}.")
                }
            };
            blocks.push(block);
        }
        blocks.join("\n\n")
    }

    /// Serialized flight search payload, or a one-line description of why
    /// there is none.
    pub async fn flight_context(&self, query: &FlightQuery) -> String {
        let Some(flights) = &self.flights else {
            return String::new();
        };

        match flights.search_flights(query).await {
            Ok(payload) => payload.to_string(),
            Err(e) => {
                warn!(origin = %query.origin, destination = %query.destination, error = %e, "Flight search failed");
                format!("Flight search failed: {e}.")
            }
        }
    }

    /// Run both enrichment calls and bundle their text.
    ///
    /// The calls run concurrently; real-time information always precedes
    /// flight information in the bundle.
    pub async fn enrich(&self, trip: &TripRequest) -> EnrichmentBundle {
        // empty when no search service is attached or no query rendered
        let search = async {
            let body = self.search_context(trip).await;
            (!body.is_empty()).then_some(body)
        };
        let flights = async {
            match (&self.flights, &trip.flight) {
                (Some(_), Some(query)) => Some(self.flight_context(query).await),
                _ => None,
            }
        };
        let (search, flights) = tokio::join!(search, flights);

        let mut bundle = EnrichmentBundle::default();
        if let Some(body) = search {
            bundle.push(REALTIME_SECTION, body);
        }
        if let Some(body) = flights {
            bundle.push(FLIGHT_SECTION, body);
        }
        bundle
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{FixedFlights, ScriptedSearch};
    use super::*;
    use crate::test_support::serve_once;
    use rstest::rstest;
    use serde_json::json;

    fn trip(with_flight: bool) -> TripRequest {
        TripRequest {
            destination: "Paris".to_string(),
            start_date: "2025-09-01".to_string(),
            end_date: "2025-09-03".to_string(),
            flight: with_flight.then(|| FlightQuery {
                origin: "JFK".to_string(),
                destination: "CDG".to_string(),
                departure_date: "2025-08-31".to_string(),
                return_date: None,
            }),
            ..TripRequest::default()
        }
    }

    fn default_queries() -> Vec<PromptTemplate> {
        TravelPlanConfig::default()
            .search
            .queries
            .iter()
            .map(|query| PromptTemplate::new(query.as_str()))
            .collect()
    }

    #[test]
    fn test_search_queries_render_trip_fields() {
        let gateway = EnrichmentGateway::new(default_queries());
        let queries = gateway.search_queries(&trip(false));
        assert_eq!(
            queries,
            vec![
                "events and festivals in Paris from 2025-09-01 to 2025-09-03",
                "weather forecast for Paris from 2025-09-01 to 2025-09-03",
            ]
        );
    }

    #[test]
    fn test_search_queries_skip_unknown_fields() {
        let gateway = EnrichmentGateway::new(vec![
            PromptTemplate::new("hotels near {{hotel}}"),
            PromptTemplate::new("museums in {{destination}}"),
        ]);
        assert_eq!(gateway.search_queries(&trip(false)), vec!["museums in Paris"]);
    }

    #[tokio::test]
    async fn test_search_context_joins_results_per_query() {
        let search = ScriptedSearch::new(vec![
            Ok(vec!["Jazz festival".to_string(), "Night market".to_string()]),
            Ok(vec!["Sunny, 24C".to_string()]),
        ]);
        let gateway = EnrichmentGateway::new(default_queries()).with_search(Box::new(search));

        let context = gateway.search_context(&trip(false)).await;
        assert_eq!(
            context,
            "events and festivals in Paris from 2025-09-01 to 2025-09-03:\nJazz festival\nNight market\n\n\
             weather forecast for Paris from 2025-09-01 to 2025-09-03:\nSunny, 24C"
        );
    }

    #[rstest]
    #[case(EnrichmentError::NoResults, "no real-time results were found for this location")]
    #[case(EnrichmentError::NoResponse("timed out".into()), "no response was received")]
    #[case(EnrichmentError::RequestSetup("bad url".into()), "could not be constructed")]
    #[case(
        EnrichmentError::ServerStatus { status: 429, message: "slow down".into() },
        "error status (429): slow down"
    )]
    #[tokio::test]
    async fn test_search_failures_become_text(#[case] error: EnrichmentError, #[case] expected: &str) {
        let search = ScriptedSearch::new(vec![Err(error)]);
        let gateway = EnrichmentGateway::new(vec![PromptTemplate::new("events in {{destination}}")])
            .with_search(Box::new(search));

        let context = gateway.search_context(&trip(false)).await;
        assert!(context.starts_with("events in Paris: "), "{context}");
        assert!(context.contains(expected), "{context}");
    }

    #[tokio::test]
    async fn test_search_context_without_service_is_empty() {
        let gateway = EnrichmentGateway::new(default_queries());
        assert_eq!(gateway.search_context(&trip(false)).await, "");
    }

    #[rstest]
    #[case(
        EnrichmentError::ServerStatus { status: 500, message: "boom".into() },
        "Flight search failed: the service responded with an error status (500): boom."
    )]
    #[case(
        EnrichmentError::NoResponse("connection refused".into()),
        "Flight search failed: the request was sent but no response was received (connection refused)."
    )]
    #[case(
        EnrichmentError::RequestSetup("invalid url".into()),
        "Flight search failed: the request could not be constructed or sent (invalid url)."
    )]
    #[tokio::test]
    async fn test_flight_failures_become_one_line(#[case] error: EnrichmentError, #[case] expected: &str) {
        let gateway = EnrichmentGateway::new(Vec::new()).with_flights(Box::new(FixedFlights(Err(error))));
        let query = trip(true).flight.unwrap();
        let context = gateway.flight_context(&query).await;
        assert_eq!(context, expected);
        assert_eq!(context.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_flight_payload_is_serialized() {
        let payload = json!({"best_flights": [{"price": 420}]});
        let gateway =
            EnrichmentGateway::new(Vec::new()).with_flights(Box::new(FixedFlights(Ok(payload))));
        let context = gateway.flight_context(&trip(true).flight.unwrap()).await;
        assert_eq!(context, r#"{"best_flights":[{"price":420}]}"#);
    }

    #[tokio::test]
    async fn test_enrich_orders_sections() {
        let gateway = EnrichmentGateway::new(vec![PromptTemplate::new("events in {{destination}}")])
            .with_search(Box::new(ScriptedSearch::new(vec![Ok(vec!["Fête".to_string()])])))
            .with_flights(Box::new(FixedFlights(Ok(json!({"price": 1})))));

        let bundle = gateway.enrich(&trip(true)).await;
        let titles: Vec<_> = bundle.sections().iter().map(|s| s.title).collect();
        assert_eq!(titles, vec![REALTIME_SECTION, FLIGHT_SECTION]);

        let prompt = bundle.append_to("BASE".to_string());
        assert_eq!(
            prompt,
            "BASE\n\n## Real-time Information:\nevents in Paris:\nFête\n\n## Flight Information:\n{\"price\":1}"
        );
    }

    #[tokio::test]
    async fn test_enrich_skips_search_when_no_query_renders() {
        let search = ScriptedSearch::new(vec![Ok(vec!["unused".to_string()])]);
        let gateway = EnrichmentGateway::new(vec![PromptTemplate::new("hotels near {{hotel}}")])
            .with_search(Box::new(search))
            .with_flights(Box::new(FixedFlights(Ok(json!({"best_flights": []})))));

        let bundle = gateway.enrich(&trip(true)).await;
        let titles: Vec<&str> = bundle.sections().iter().map(|section| section.title).collect();
        assert_eq!(titles, vec![FLIGHT_SECTION]);
        assert!(!bundle.append_to(String::new()).contains(REALTIME_SECTION));
    }

    #[tokio::test]
    async fn test_enrich_skips_flights_without_details() {
        let gateway = EnrichmentGateway::new(Vec::new())
            .with_flights(Box::new(FixedFlights(Ok(json!({})))));
        let without = trip(false);
        assert!(!gateway.is_active_for(&without));
        assert!(gateway.enrich(&without).await.is_empty());
        assert!(gateway.is_active_for(&trip(true)));
    }

    #[tokio::test]
    async fn test_enrich_against_failing_flight_service() {
        let (base_url, _) = serve_once(
            "500 Internal Server Error",
            "application/json",
            r#"{"error": "Internal error"}"#,
        )
        .await;
        let mut config = TravelPlanConfig::default();
        config.flights.base_url = base_url;
        config.flights.api_key = Some("serp-key".to_string());

        let gateway = EnrichmentGateway::from_config(&config).unwrap();
        assert!(gateway.has_flights());
        assert!(!gateway.has_search());

        let bundle = gateway.enrich(&trip(true)).await;
        assert_eq!(bundle.sections().len(), 1);
        assert_eq!(
            bundle.sections()[0].body,
            "Flight search failed: the service responded with an error status (500): Internal error."
        );
    }

    #[test]
    fn test_from_config_respects_flights_switch() {
        let mut config = TravelPlanConfig::default();
        config.flights.api_key = Some("serp-key".to_string());
        config.flights.enabled = false;
        config.search.api_key = Some("brave-key".to_string());

        let gateway = EnrichmentGateway::from_config(&config).unwrap();
        assert!(!gateway.has_flights());
        assert!(gateway.has_search());
    }
}
