//! Interactive trip parameter collection
//!
//! Prompts are written to the output stream and answers are read one line
//! at a time from the input stream, in a fixed order. Only the destination
//! (minimum length) and the flight fields (non-empty) are checked.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::models::trip::is_iso_date;
use crate::models::{FlightQuery, TripRequest};
use crate::{Result, TravelPlanError};

/// Minimum destination length in characters
pub const MIN_DESTINATION_LEN: usize = 4;

/// Reads a [`TripRequest`] from a line-based input stream
pub struct InputCollector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InputCollector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Collect the eight trip fields, plus the flight block when
    /// `with_flights` is set.
    pub fn collect(&mut self, with_flights: bool) -> Result<TripRequest> {
        let destination = self.destination()?;
        let start_date = self.date("Enter the start date (YYYY-MM-DD): ", "start_date")?;
        let end_date = self.date("Enter the end date (YYYY-MM-DD): ", "end_date")?;

        let flight = if with_flights {
            Some(self.flight()?)
        } else {
            None
        };

        let trip = TripRequest {
            destination,
            start_date,
            end_date,
            trip_type: self
                .ask("Enter the type of trip (e.g., business, leisure, adventure): ")?,
            interests: self.ask("Enter your interests (e.g., art, food, hiking): ")?,
            budget: self.ask("Enter your budget (e.g., budget, mid-range, luxury): ")?,
            pace: self.ask("Enter your travel pace (e.g., relaxed, medium, packed): ")?,
            extra_notes: self.ask("Enter any extra notes: ")?,
            flight,
        };

        debug!(destination = %trip.destination, flights = trip.flight.is_some(), "Collected trip request");
        Ok(trip)
    }

    /// Consume the collector and hand back the output stream
    pub fn into_output(self) -> W {
        self.output
    }

    fn destination(&mut self) -> Result<String> {
        loop {
            let answer = self.ask("Enter your destination: ")?;
            if answer.chars().count() >= MIN_DESTINATION_LEN {
                return Ok(answer);
            }
            debug!(length = answer.chars().count(), "Destination too short, asking again");
            writeln!(
                self.output,
                "Destination must be at least {MIN_DESTINATION_LEN} characters long."
            )?;
        }
    }

    fn flight(&mut self) -> Result<FlightQuery> {
        let origin = self.required("Enter the origin airport code (e.g., JFK): ")?;
        let destination = self.required("Enter the destination airport code (e.g., CDG): ")?;
        let departure_date = loop {
            let date = self.date("Enter the departure date (YYYY-MM-DD): ", "departure_date")?;
            if !date.is_empty() {
                break date;
            }
            writeln!(self.output, "This field is required.")?;
        };
        let return_date = self.date(
            "Enter the return date (YYYY-MM-DD, leave empty for one-way): ",
            "return_date",
        )?;

        Ok(FlightQuery {
            origin: origin.to_uppercase(),
            destination: destination.to_uppercase(),
            departure_date,
            return_date: (!return_date.is_empty()).then_some(return_date),
        })
    }

    /// Dates are accepted as typed; an unexpected format is only logged.
    fn date(&mut self, prompt: &str, field: &str) -> Result<String> {
        let answer = self.ask(prompt)?;
        if !answer.is_empty() && !is_iso_date(&answer) {
            warn!(field, value = %answer, "Date is not in YYYY-MM-DD format");
        }
        Ok(answer)
    }

    fn required(&mut self, prompt: &str) -> Result<String> {
        loop {
            let answer = self.ask(prompt)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "This field is required.")?;
        }
    }

    /// Print `prompt` and read one trimmed line.
    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(TravelPlanError::validation(
                "input closed before all trip details were entered",
            ));
        }
        Ok(line.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn collect(script: &str, with_flights: bool) -> (Result<TripRequest>, String) {
        let mut collector = InputCollector::new(Cursor::new(script.to_string()), Vec::new());
        let result = collector.collect(with_flights);
        let output = String::from_utf8(collector.into_output()).unwrap();
        (result, output)
    }

    #[test]
    fn test_collects_fields_in_order() {
        let script = "Paris\n2025-09-01\n2025-09-03\nleisure\nart\nmid-range\nrelaxed\n\n";
        let (trip, output) = collect(script, false);
        let trip = trip.unwrap();

        assert_eq!(trip.destination, "Paris");
        assert_eq!(trip.start_date, "2025-09-01");
        assert_eq!(trip.end_date, "2025-09-03");
        assert_eq!(trip.trip_type, "leisure");
        assert_eq!(trip.interests, "art");
        assert_eq!(trip.budget, "mid-range");
        assert_eq!(trip.pace, "relaxed");
        assert_eq!(trip.extra_notes, "");
        assert!(trip.flight.is_none());

        let destination_prompt = output.find("destination").unwrap();
        let notes_prompt = output.find("extra notes").unwrap();
        assert!(destination_prompt < notes_prompt);
        assert!(!output.contains("at least"));
    }

    #[rstest]
    #[case("Rome", 0)]
    #[case("Oslo\r", 0)]
    #[case("Köln", 0)]
    #[case("NYC\nLima", 1)]
    #[case("\nab\n  x  \nBerlin", 3)]
    fn test_destination_reprompts_until_long_enough(#[case] answers: &str, #[case] retries: usize) {
        let script = format!("{answers}\n2025-01-01\n2025-01-02\na\nb\nc\nd\ne\n");
        let (trip, output) = collect(&script, false);
        assert!(trip.is_ok());
        assert_eq!(output.matches("at least 4 characters").count(), retries);
        assert_eq!(output.matches("Enter your destination: ").count(), retries + 1);
    }

    #[test]
    fn test_other_fields_accept_anything() {
        let script = "Lisbon\nsoon\n\n\n\n\n\n\n";
        let (trip, _) = collect(script, false);
        let trip = trip.unwrap();
        assert_eq!(trip.start_date, "soon");
        assert_eq!(trip.end_date, "");
        assert_eq!(trip.pace, "");
    }

    #[test]
    fn test_flight_block_before_trip_type() {
        let script = "Paris\n2025-09-01\n2025-09-03\njfk\n\ncdg\n2025-08-31\n\nleisure\nart\nmid-range\nrelaxed\nnone\n";
        let (trip, output) = collect(script, true);
        let trip = trip.unwrap();

        let flight = trip.flight.expect("flight details");
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.destination, "CDG");
        assert_eq!(flight.departure_date, "2025-08-31");
        assert_eq!(flight.return_date, None);
        assert_eq!(trip.trip_type, "leisure");
        assert_eq!(trip.extra_notes, "none");
        assert_eq!(output.matches("This field is required.").count(), 1);

        let airport_prompt = output.find("origin airport").unwrap();
        let trip_type_prompt = output.find("type of trip").unwrap();
        assert!(airport_prompt < trip_type_prompt);
    }

    #[test]
    fn test_round_trip_flight() {
        let script = "Paris\n2025-09-01\n2025-09-03\nJFK\nCDG\n2025-08-31\n2025-09-04\na\nb\nc\nd\ne\n";
        let (trip, _) = collect(script, true);
        let flight = trip.unwrap().flight.unwrap();
        assert_eq!(flight.return_date.as_deref(), Some("2025-09-04"));
        assert!(flight.is_round_trip());
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let (result, _) = collect("ab\n", false);
        assert!(matches!(result, Err(TravelPlanError::Validation { .. })));

        let (result, _) = collect("Paris\n2025-09-01\n", false);
        assert!(result.is_err());
    }
}
