//! Provider configuration loaded from environment variables.
//!
//! Environment variables:
//! - `NYC_APP_TOKEN`, `CHICAGO_APP_TOKEN` - Socrata app tokens (optional)
//! - `OPENWEATHER_API_KEY` - OpenWeather key; weather sources are skipped without it
//! - `NYC_CRASHES_URL`, `CHICAGO_CRASHES_URL`, `OPENWEATHER_HISTORY_URL` - endpoint overrides
//! - `CRASHWEATHER_PAGE_SIZE` (default: 1000)
//! - `CRASHWEATHER_MAX_PAGES` (default: 50)
//! - `CRASHWEATHER_HTTP_TIMEOUT_SECS` (default: 30)

use std::{env, time::Duration};

pub const NYC_CRASHES_URL: &str = "https://data.cityofnewyork.us/resource/h9gi-nx95.json";
pub const CHICAGO_CRASHES_URL: &str = "https://data.cityofchicago.org/resource/85ca-t3if.json";
pub const OPENWEATHER_HISTORY_URL: &str = "https://history.openweathermap.org/data/2.5/history/city";

#[derive(Debug, Clone, Copy, PartialEq)]
/// Representative point used for a city's weather requests.
pub struct City {
    pub lat: f64,
    pub lon: f64,
}

/// Central Park.
pub const NYC: City = City {
    lat: 40.7812,
    lon: -73.9665,
};

/// Downtown Chicago.
pub const CHICAGO: City = City {
    lat: 41.8781,
    lon: -87.6298,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SocrataSettings {
    pub endpoint: String,
    pub app_token: Option<String>,
    /// Rows per request (`$limit`).
    pub page_size: usize,
    /// Requests per day before the day is treated as truncated.
    pub max_pages: usize,
    pub order: Option<String>,
    pub select: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub nyc_crashes: SocrataSettings,
    pub chicago_crashes: SocrataSettings,
    pub weather: WeatherSettings,
    pub http_timeout: Duration,
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let page_size = get("CRASHWEATHER_PAGE_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);
        let max_pages = get("CRASHWEATHER_MAX_PAGES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);
        let timeout_secs = get("CRASHWEATHER_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let socrata = |url_key: &str, default_url: &str, token_key: &str| SocrataSettings {
            endpoint: get(url_key).unwrap_or_else(|| default_url.to_string()),
            app_token: get(token_key),
            page_size,
            max_pages,
            order: Some(":id".to_string()),
            select: None,
        };

        ProviderConfig {
            nyc_crashes: socrata("NYC_CRASHES_URL", NYC_CRASHES_URL, "NYC_APP_TOKEN"),
            chicago_crashes: socrata("CHICAGO_CRASHES_URL", CHICAGO_CRASHES_URL, "CHICAGO_APP_TOKEN"),
            weather: WeatherSettings {
                endpoint: get("OPENWEATHER_HISTORY_URL")
                    .unwrap_or_else(|| OPENWEATHER_HISTORY_URL.to_string()),
                api_key: get("OPENWEATHER_API_KEY"),
            },
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()?;

        Ok(client)
    }
}

// -- Tests -------------------------------------------------------------------
