//! Validation and normalisation of raw provider records.

pub mod crash;
pub mod weather;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

use crate::source::{RawRecord, Source};

pub use crash::{CrashFilter, DaytimeWindow, StartHour};
pub use weather::WeatherFilter;

#[derive(Debug, Clone, PartialEq)]
/// A record that passed its source's filter, reduced to what aggregation needs.
pub struct CleanRecord {
    pub observed_at: NaiveDateTime,
    pub key: Option<String>,
    pub location: Option<String>,
    pub injuries: i64,
    pub fatalities: i64,
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` has unparseable value {value}")]
    Unparseable { field: &'static str, value: String },
    #[error("timestamp {0} is not on the requested date")]
    OtherDate(NaiveDateTime),
    #[error("hour {0} is outside the daytime window")]
    OutsideWindow(u32),
}

pub trait RecordFilter: Send + Sync {
    /// Accepts `raw` as one of `date`'s records, or says why not.
    fn accept(&self, date: NaiveDate, raw: &RawRecord) -> Result<CleanRecord, Rejection>;
}

/// The filter each source's historical aggregates were computed with.
pub fn for_source(source: Source) -> Box<dyn RecordFilter> {
    match source {
        Source::NycCrashes => Box::new(CrashFilter::nyc()),
        Source::ChicagoCrashes => Box::new(CrashFilter::chicago()),
        Source::NycWeather | Source::ChicagoWeather => Box::new(WeatherFilter),
    }
}

#[derive(Debug, Default)]
pub struct Filtered {
    pub records: Vec<CleanRecord>,
    pub rejected: usize,
}

/// Runs every raw record through `filter`. A rejected record never affects the others.
pub fn filter_records(
    filter: &dyn RecordFilter,
    source: Source,
    date: NaiveDate,
    raws: &[RawRecord],
) -> Filtered {
    let mut filtered = Filtered::default();

    for raw in raws {
        match filter.accept(date, raw) {
            Ok(record) => filtered.records.push(record),
            Err(rejection) => {
                log::debug!("{}: dropped record for {}: {}", source, date, rejection);
                filtered.rejected += 1;
            }
        }
    }

    filtered
}

/// Largest per-record count taken at face value.
pub const MAX_RECORD_COUNT: i64 = 1_000_000;

/// Reads an integer count. Non-numeric, missing, negative or implausibly large values
/// count as zero.
pub fn coerce_count(value: Option<&Value>) -> i64 {
    let count = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_count)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_count))
        }
        _ => None,
    };

    count
        .filter(|c| (0..=MAX_RECORD_COUNT).contains(c))
        .unwrap_or(0)
}

fn whole_count(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() <= MAX_RECORD_COUNT as f64).then(|| f.trunc() as i64)
}

/// Reads a measured amount. Non-numeric or missing values count as zero.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    amount.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// Reads an identifier that may come as a string or a number.
pub(crate) fn text_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

// -- Tests -------------------------------------------------------------------
