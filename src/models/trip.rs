//! Trip request model collected once per run

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format the prompts ask for
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything the user told us about the trip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub trip_type: String,
    pub interests: String,
    pub budget: String,
    pub pace: String,
    pub extra_notes: String,
    /// Present only when flight details were collected
    pub flight: Option<FlightQuery>,
}

/// Parameters for a single flight search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightQuery {
    /// Origin airport code (e.g. JFK)
    pub origin: String,
    /// Destination airport code (e.g. CDG)
    pub destination: String,
    pub departure_date: String,
    /// `None` for a one-way search
    pub return_date: Option<String>,
}

impl TripRequest {
    /// Template keys that always resolve
    pub const KEYS: [&'static str; 8] = [
        "destination",
        "start_date",
        "end_date",
        "trip_type",
        "interests",
        "budget",
        "pace",
        "extra_notes",
    ];

    /// Template keys that resolve only when flight details are present
    pub const FLIGHT_KEYS: [&'static str; 4] = [
        "origin_airport",
        "destination_airport",
        "departure_date",
        "return_date",
    ];

    /// Look up the text value bound to a template key
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "destination" => &self.destination,
            "start_date" => &self.start_date,
            "end_date" => &self.end_date,
            "trip_type" => &self.trip_type,
            "interests" => &self.interests,
            "budget" => &self.budget,
            "pace" => &self.pace,
            "extra_notes" => &self.extra_notes,
            _ => return self.flight.as_ref().and_then(|flight| flight.field(key)),
        };
        Some(value.as_str())
    }

    /// Every resolvable key with its value, flight keys included when
    /// flight details are present
    #[must_use]
    pub fn template_context(&self) -> BTreeMap<&'static str, &str> {
        Self::KEYS
            .into_iter()
            .chain(Self::FLIGHT_KEYS)
            .filter_map(|key| self.field(key).map(|value| (key, value)))
            .collect()
    }
}

impl FlightQuery {
    fn field(&self, key: &str) -> Option<&str> {
        match key {
            "origin_airport" => Some(self.origin.as_str()),
            "destination_airport" => Some(self.destination.as_str()),
            "departure_date" => Some(self.departure_date.as_str()),
            "return_date" => Some(self.return_date.as_deref().unwrap_or("")),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_round_trip(&self) -> bool {
        self.return_date.is_some()
    }
}

/// Whether `value` is a `YYYY-MM-DD` calendar date
#[must_use]
pub fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}
