//! SerpApi Google Flights client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::error::ensure_success;
use crate::TravelPlanError;
use super::{EnrichmentError, FlightSearch, USER_AGENT};
use crate::config::FlightsConfig;
use crate::models::FlightQuery;

/// Flight search through SerpApi's `google_flights` engine
pub struct SerpApiFlightsClient {
    client: Client,
    base_url: String,
    api_key: String,
    adults: u32,
    travel_class: u8,
    currency: String,
}

impl SerpApiFlightsClient {
    pub fn new(config: &FlightsConfig, api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(TravelPlanError::client("SerpApi flights"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            adults: config.adults,
            travel_class: config.travel_class,
            currency: config.currency.clone(),
        })
    }

    fn params(&self, query: &FlightQuery) -> Vec<(&'static str, String)> {
        // type: 1 round trip, 2 one way
        let trip_type = if query.is_round_trip() { "1" } else { "2" };
        let mut params = vec![
            ("engine", "google_flights".to_string()),
            ("departure_id", query.origin.clone()),
            ("arrival_id", query.destination.clone()),
            ("outbound_date", query.departure_date.clone()),
            ("type", trip_type.to_string()),
            ("adults", self.adults.to_string()),
            ("travel_class", self.travel_class.to_string()),
            ("currency", self.currency.clone()),
            ("hl", "en".to_string()),
        ];
        if let Some(return_date) = &query.return_date {
            params.push(("return_date", return_date.clone()));
        }
        params
    }
}

#[async_trait]
impl FlightSearch for SerpApiFlightsClient {
    #[instrument(skip(self), fields(origin = %query.origin, destination = %query.destination))]
    async fn search_flights(&self, query: &FlightQuery) -> Result<Value, EnrichmentError> {
        let url = format!("{}/search.json", self.base_url);
        let mut params = self.params(query);
        params.push(("api_key", self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(EnrichmentError::classify)?;

        let response = ensure_success(response).await?;
        let payload: Value = response.json().await.map_err(EnrichmentError::classify)?;

        // SerpApi reports an empty search as a 200 with an `error` field
        if payload.get("error").is_some() {
            debug!(error = %payload["error"], "Flight search returned no results");
            return Err(EnrichmentError::NoResults);
        }

        Ok(payload)
    }
}
