//! Error types for the tick-grid engine
//!
//! Every variant is a programmer or upstream-data error. Nothing here is
//! transient, so callers never retry; they decide whether to drop the
//! offending input or halt the feed.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Engine used before configure")]
    NotConfigured,

    #[error("Invalid observation: {reason}")]
    InvalidObservation { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl GridError {
    pub fn invalid_observation(reason: impl Into<String>) -> Self {
        GridError::InvalidObservation {
            reason: reason.into(),
        }
    }

    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        GridError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
