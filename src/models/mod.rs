//! Data models for the travelplan application
//!
//! - Trip: the request collected from the user for one run
//! - Itinerary: the text produced by the generation backend

pub mod itinerary;
pub mod trip;

pub use itinerary::GeneratedItinerary;
pub use trip::{FlightQuery, TripRequest};
