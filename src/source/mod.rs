//! Remote providers of raw per-day records.

pub mod openweather;
pub mod socrata;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub use openweather::OpenWeatherClient;
pub use socrata::SocrataClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// One external feed for one city. Every source owns one aggregate table.
pub enum Source {
    NycCrashes,
    ChicagoCrashes,
    NycWeather,
    ChicagoWeather,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Crashes,
    Weather,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::NycCrashes,
        Source::ChicagoCrashes,
        Source::NycWeather,
        Source::ChicagoWeather,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::NycCrashes => "nyc_crashes",
            Source::ChicagoCrashes => "chicago_crashes",
            Source::NycWeather => "nyc_weather",
            Source::ChicagoWeather => "chicago_weather",
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::NycCrashes | Source::ChicagoCrashes => SourceKind::Crashes,
            Source::NycWeather | Source::ChicagoWeather => SourceKind::Weather,
        }
    }

    /// Aggregate table name. Matches the source name so SQL built from it is fixed text.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source `{0}`")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One provider row, exactly as decoded from the response body.
pub struct RawRecord(pub Value);

impl RawRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Result of asking a provider for one date.
///
/// `Records(vec![])` is a day the provider reports as empty. `Failed` means nothing
/// is known about the day and it must stay unprocessed.
pub enum FetchOutcome {
    Records(Vec<RawRecord>),
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        FetchOutcome::Failed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("pagination cutoff of {pages} pages reached with a full final page")]
    Truncated { pages: usize },
}

impl From<FetchError> for FetchOutcome {
    fn from(err: FetchError) -> Self {
        FetchOutcome::failed(err.to_string())
    }
}

#[async_trait]
pub trait SourceClient: Send + Sync {
    fn source(&self) -> Source;

    /// Fetches every raw record for `date`. Never errors: failures come back as
    /// [`FetchOutcome::Failed`] after being logged.
    async fn fetch_raw_for_date(&self, date: NaiveDate) -> FetchOutcome;
}

/// Reads a response body, logging and converting non-2xx statuses.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, FetchError> {
    let url = response.url().to_string();
    let status = response.status();
    let body = response.text().await.map_err(|source| FetchError::Transport {
        url: url.clone(),
        source,
    })?;

    check_status(url, status, body)
}

fn check_status(url: String, status: StatusCode, body: String) -> Result<String, FetchError> {
    if !status.is_success() {
        log::error!("Final URL: {}", url);
        log::error!("Status code: {}", status);
        log::error!("Response body: {}", body);
        return Err(FetchError::Status { url, status, body });
    }

    Ok(body)
}

// -- Tests -------------------------------------------------------------------
