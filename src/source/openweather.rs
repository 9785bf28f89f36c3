//! OpenWeather History API client (hourly observations).
//!
//! A day is requested as the UTC unix range `[00:00, 24:00)`; each entry of the
//! response's `list` array is one hourly observation.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime};
use serde_json::Value;

use crate::config::{City, WeatherSettings};

use super::{read_body, FetchError, FetchOutcome, RawRecord, Source, SourceClient};

pub struct OpenWeatherClient {
    http: reqwest::Client,
    source: Source,
    city: City,
    endpoint: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(
        http: reqwest::Client,
        source: Source,
        city: City,
        settings: &WeatherSettings,
        api_key: String,
    ) -> Self {
        OpenWeatherClient {
            http,
            source,
            city,
            endpoint: settings.endpoint.clone(),
            api_key,
        }
    }

    fn params(&self, date: NaiveDate) -> Vec<(&'static str, String)> {
        let (start, end) = day_unix_range(date);

        vec![
            ("lat", self.city.lat.to_string()),
            ("lon", self.city.lon.to_string()),
            ("type", "hour".to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ]
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawRecord>, FetchError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&self.params(date))
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;
        let body = read_body(response).await?;

        parse_history(&body)
    }
}

#[async_trait]
impl SourceClient for OpenWeatherClient {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_raw_for_date(&self, date: NaiveDate) -> FetchOutcome {
        match self.fetch(date).await {
            Ok(records) => {
                log::debug!("{}: {} hourly entries for {}", self.source, records.len(), date);
                FetchOutcome::Records(records)
            }
            Err(err) => {
                log::error!("OpenWeather History error for {}: {}", date, err);
                err.into()
            }
        }
    }
}

/// Unix seconds for midnight UTC at the start of `date` and of the following day.
pub fn day_unix_range(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end = match date.checked_add_days(Days::new(1)) {
        Some(next) => next.and_time(NaiveTime::MIN).and_utc().timestamp(),
        None => start + 86_400,
    };

    (start, end)
}

/// Extracts the hourly entries from a history response.
pub fn parse_history(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Payload(e.to_string()))?;

    match value.get("list") {
        Some(Value::Array(entries)) => Ok(entries.iter().cloned().map(RawRecord).collect()),
        _ => Err(FetchError::Payload(
            "history response has no `list` array".to_string(),
        )),
    }
}

// -- Tests -------------------------------------------------------------------
