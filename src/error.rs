use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRangeError {
    #[error("invalid date range: start {start} is after end {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    /// The range touches the edge of the representable calendar, so the
    /// exclusive query bound cannot be formed.
    #[error("invalid date range: {date} is outside the supported calendar")]
    OutOfBounds { date: NaiveDate },
}

/// The data source returned no bars for the requested symbol and range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("no price data available for the selected range")]
pub struct EmptySeriesError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {symbol} failed: {source}")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("data source returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },
    #[error("malformed response for {symbol}: {reason}")]
    Decode { symbol: String, reason: String },
    #[error("no data found for {symbol}: {reason}")]
    NoData { symbol: String, reason: String },
}

/// Everything that can halt a single dashboard pass. None of these are fatal.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
    #[error(transparent)]
    EmptySeries(#[from] EmptySeriesError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl PassError {
    /// Range errors are shown next to the date widgets rather than in the main area.
    pub fn is_range_error(&self) -> bool {
        matches!(self, PassError::InvalidRange(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("instrument catalog is malformed: {0}")]
    Catalog(String),
    #[error("invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },
}
