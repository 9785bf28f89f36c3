//! Hourly weather observation filter.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::source::RawRecord;

use super::{coerce_amount, CleanRecord, RecordFilter, Rejection};

#[derive(Debug, Clone, Copy, Default)]
/// Keeps observations inside the date's UTC day; precipitation is `rain.1h + snow.1h`.
pub struct WeatherFilter;

impl RecordFilter for WeatherFilter {
    fn accept(&self, date: NaiveDate, raw: &RawRecord) -> Result<CleanRecord, Rejection> {
        let dt = match raw.get("dt") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
            None => return Err(Rejection::MissingField("dt")),
        };
        let observed_at = dt
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|utc| utc.naive_utc())
            .ok_or_else(|| Rejection::Unparseable {
                field: "dt",
                value: raw.get("dt").map(|v| v.to_string()).unwrap_or_default(),
            })?;

        if observed_at.date() != date {
            return Err(Rejection::OtherDate(observed_at));
        }

        let rain = coerce_amount(raw.get("rain").and_then(|r| r.get("1h")));
        let snow = coerce_amount(raw.get("snow").and_then(|s| s.get("1h")));

        Ok(CleanRecord {
            observed_at,
            key: None,
            location: None,
            injuries: 0,
            fatalities: 0,
            precipitation_mm: rain + snow,
        })
    }
}

// -- Tests -------------------------------------------------------------------
