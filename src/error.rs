//! Errors raised while setting up and collecting a trip

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TravelPlanError {
    /// A config value is out of range or names something unknown
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// Trip input or the prompt template could not be used
    #[error("{message}")]
    Validation { message: String },

    /// An enrichment service's HTTP client could not be built
    #[error("could not set up the {service} client: {source}")]
    Client {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl TravelPlanError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap a `reqwest::ClientBuilder::build` failure for a named service
    pub fn client(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Client { service, source }
    }

    /// One-line message for the terminal, with a hint where one helps
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message } => {
                format!("{message} (check config.toml and the TRAVELPLAN_* variables)")
            }
            Self::Validation { message } => message.clone(),
            Self::Client { service, .. } => {
                format!("{service} is unavailable on this system (TLS setup failed)")
            }
            Self::Io(e) => format!("could not talk to the terminal: {e}"),
        }
    }
}
