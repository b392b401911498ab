//! Typed failures of the rating pipeline.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Failure returned by a [`ForecastSource`](crate::fetch::ForecastSource).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: connection, timeout, non-success status, unreadable file.
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source answered, but with something that is not a valid forecast document.
    #[error("malformed forecast document: {0}")]
    MalformedDocument(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::SourceUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::MalformedDocument(e.to_string())
    }
}

/// Pipeline stage a [`RaterError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Reduce,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Reduce => write!(f, "reduce"),
            Stage::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// A failure that aborts a whole rating run.
#[derive(Debug, Error)]
pub enum RaterError {
    #[error("{city}: data source unavailable: {reason}")]
    SourceUnavailable { city: String, reason: String },

    #[error("{city}: malformed forecast document: {reason}")]
    MalformedDocument { city: String, reason: String },

    /// A city that was supposed to contribute has no complete day at all.
    #[error("{city}: no complete days to aggregate")]
    EmptyCityData { city: String },

    #[error("{city}: day {date} was reported more than once")]
    DuplicateDay { city: String, date: NaiveDate },

    /// The per-city task panicked or was cancelled before reporting.
    #[error("{city}: task failed: {reason}")]
    TaskFailed { city: String, reason: String },
}

impl RaterError {
    pub fn from_fetch(city: &str, err: FetchError) -> Self {
        match err {
            FetchError::SourceUnavailable(reason) => RaterError::SourceUnavailable {
                city: city.to_string(),
                reason,
            },
            FetchError::MalformedDocument(reason) => RaterError::MalformedDocument {
                city: city.to_string(),
                reason,
            },
        }
    }

    /// City the failure is attributed to.
    pub fn city(&self) -> &str {
        match self {
            RaterError::SourceUnavailable { city, .. }
            | RaterError::MalformedDocument { city, .. }
            | RaterError::EmptyCityData { city }
            | RaterError::DuplicateDay { city, .. }
            | RaterError::TaskFailed { city, .. } => city,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            RaterError::SourceUnavailable { .. } | RaterError::MalformedDocument { .. } => {
                Stage::Fetch
            }
            RaterError::TaskFailed { .. } => Stage::Reduce,
            RaterError::EmptyCityData { .. } | RaterError::DuplicateDay { .. } => {
                Stage::Aggregate
            }
        }
    }
}
