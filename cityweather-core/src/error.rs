use thiserror::Error;

use crate::model::LOOKUP_FAILED_MESSAGE;

/// Failure of a city lookup.
///
/// Network errors, HTTP error statuses, malformed payloads and unknown cities
/// all collapse into this one kind. `reason` carries the detail for logs only;
/// users see [`LookupError::user_message`].
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("weather lookup failed: {0}")]
    LookupFailed(String),
}

impl LookupError {
    pub fn reason(&self) -> &str {
        match self {
            LookupError::LookupFailed(reason) => reason,
        }
    }

    pub fn user_message(&self) -> &'static str {
        LOOKUP_FAILED_MESSAGE
    }
}

impl From<anyhow::Error> for LookupError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate formatting keeps the whole context chain.
        LookupError::LookupFailed(format!("{err:#}"))
    }
}
