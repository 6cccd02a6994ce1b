//! Generated itinerary model

use serde::{Deserialize, Serialize};

/// Text returned by the generation backend, kept in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedItinerary {
    fragments: Vec<String>,
}

impl GeneratedItinerary {
    /// Itinerary produced by a single-shot completion
    #[must_use]
    pub fn from_text(text: String) -> Self {
        Self {
            fragments: vec![text],
        }
    }

    /// Append a streamed fragment
    pub fn push_fragment(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Full text, fragments concatenated in arrival order
    #[must_use]
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(String::is_empty)
    }
}
