//! Error taxonomy for iotables.
//!
//! Contract violations (bad arguments, bad keys, bad merges) get their own
//! variants so callers can match on them. Anything that goes wrong while
//! actually reading a source is wrapped in [`Error::Read`] with the full
//! `anyhow` context chain.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A store was constructed with an impossible baseline/dynamic combination.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A value outside an enumerated valid set.
    #[error("Invalid {argument} '{value}'. Valid options are {valid:?}")]
    InvalidArgument {
        argument: &'static str,
        value: String,
        valid: Vec<String>,
    },

    /// A conditionally-required argument is absent.
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// A write or merge precondition was violated.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Reading or reshaping an external source failed.
    #[error("Failed to read {format} source: {source:#}")]
    Read {
        format: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Algebra error: {0}")]
    Algebra(String),

    /// Options document could not be deserialized.
    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::InvalidArgument`] from any list of valid names.
    pub fn invalid<I, S>(argument: &'static str, value: impl Into<String>, valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::InvalidArgument {
            argument,
            value: value.into(),
            valid: valid.into_iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Wrap a reader failure with the format it came from.
    pub fn read(format: &'static str, source: anyhow::Error) -> Self {
        Self::Read { format, source }
    }
}

/// Result type alias for iotables.
pub type Result<T> = std::result::Result<T, Error>;
