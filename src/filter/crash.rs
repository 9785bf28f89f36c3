//! Crash record filters for the NYC and Chicago feeds.
//!
//! Both feeds keep only daytime crashes, but with different start-hour conventions:
//! NYC counts `6 <= hour < 18`, Chicago counts `6 < hour < 18`. Historical aggregates
//! were computed against these exact windows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;

use crate::source::RawRecord;

use super::{coerce_count, text_field, CleanRecord, RecordFilter, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartHour {
    Inclusive,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Hours of the day a crash must fall in. The end hour is always exclusive.
pub struct DaytimeWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub start: StartHour,
}

impl DaytimeWindow {
    pub fn contains(&self, hour: u32) -> bool {
        let after_start = match self.start {
            StartHour::Inclusive => hour >= self.start_hour,
            StartHour::Exclusive => hour > self.start_hour,
        };

        after_start && hour < self.end_hour
    }
}

pub const NYC_WINDOW: DaytimeWindow = DaytimeWindow {
    start_hour: 6,
    end_hour: 18,
    start: StartHour::Inclusive,
};

pub const CHICAGO_WINDOW: DaytimeWindow = DaytimeWindow {
    start_hour: 6,
    end_hour: 18,
    start: StartHour::Exclusive,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFields {
    /// One floating timestamp column, `YYYY-MM-DDTHH:MM:SS[.fff]`.
    Single(&'static str),
    /// A date column (time part ignored) plus an `H:MM` time column.
    DateAndTime {
        date: &'static str,
        time: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrashFields {
    pub timestamp: TimestampFields,
    pub identifier: &'static str,
    pub location: &'static str,
    pub injuries: &'static str,
    pub fatalities: &'static str,
}

pub const NYC_FIELDS: CrashFields = CrashFields {
    timestamp: TimestampFields::DateAndTime {
        date: "crash_date",
        time: "crash_time",
    },
    identifier: "collision_id",
    location: "location",
    injuries: "number_of_persons_injured",
    fatalities: "number_of_persons_killed",
};

pub const CHICAGO_FIELDS: CrashFields = CrashFields {
    timestamp: TimestampFields::Single("crash_date"),
    identifier: "crash_record_id",
    location: "location",
    injuries: "injuries_total",
    fatalities: "injuries_fatal",
};

#[derive(Debug, Clone)]
pub struct CrashFilter {
    fields: CrashFields,
    window: DaytimeWindow,
}

impl CrashFilter {
    pub fn new(fields: CrashFields, window: DaytimeWindow) -> Self {
        CrashFilter { fields, window }
    }

    pub fn nyc() -> Self {
        Self::new(NYC_FIELDS, NYC_WINDOW)
    }

    pub fn chicago() -> Self {
        Self::new(CHICAGO_FIELDS, CHICAGO_WINDOW)
    }

    fn timestamp(&self, raw: &RawRecord) -> Result<NaiveDateTime, Rejection> {
        match self.fields.timestamp {
            TimestampFields::Single(field) => {
                let value = required_str(raw, field)?;
                parse_floating_timestamp(value).ok_or_else(|| unparseable(field, value))
            }
            TimestampFields::DateAndTime { date, time } => {
                let date_value = required_str(raw, date)?;
                let time_value = required_str(raw, time)?;
                let day = parse_floating_date(date_value).ok_or_else(|| unparseable(date, date_value))?;
                let clock = parse_clock(time_value).ok_or_else(|| unparseable(time, time_value))?;

                Ok(day.and_time(clock))
            }
        }
    }
}

impl RecordFilter for CrashFilter {
    fn accept(&self, date: NaiveDate, raw: &RawRecord) -> Result<CleanRecord, Rejection> {
        let observed_at = self.timestamp(raw)?;
        if observed_at.date() != date {
            return Err(Rejection::OtherDate(observed_at));
        }
        if !self.window.contains(observed_at.hour()) {
            return Err(Rejection::OutsideWindow(observed_at.hour()));
        }

        let key = text_field(raw.get(self.fields.identifier))
            .ok_or(Rejection::MissingField(self.fields.identifier))?;
        let location = raw
            .get(self.fields.location)
            .and_then(normalise_location)
            .or_else(|| coordinates(raw.get("latitude"), raw.get("longitude")));

        Ok(CleanRecord {
            observed_at,
            key: Some(key),
            location,
            injuries: coerce_count(raw.get(self.fields.injuries)),
            fatalities: coerce_count(raw.get(self.fields.fatalities)),
            precipitation_mm: 0.0,
        })
    }
}

fn required_str<'a>(raw: &'a RawRecord, field: &'static str) -> Result<&'a str, Rejection> {
    match raw.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(other) => Err(unparseable(field, &other.to_string())),
        None => Err(Rejection::MissingField(field)),
    }
}

fn unparseable(field: &'static str, value: &str) -> Rejection {
    Rejection::Unparseable {
        field,
        value: value.to_string(),
    }
}

/// Parses `YYYY-MM-DDTHH:MM:SS`, dropping any fractional seconds.
pub fn parse_floating_timestamp(value: &str) -> Option<NaiveDateTime> {
    let whole_seconds = value.split('.').next()?;
    NaiveDateTime::parse_from_str(whole_seconds, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Parses the date part of a floating timestamp or a bare `YYYY-MM-DD`.
pub fn parse_floating_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Parses `H:MM` or `HH:MM[:SS]`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let mut parts = value.split(':');
    let hour = parts.next()?.trim().parse::<u32>().ok()?;
    let minute = parts.next()?.trim().parse::<u32>().ok()?;
    let second = match parts.next() {
        Some(s) => s.trim().parse::<u32>().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Canonical `(lat, lon)` text for the location shapes the feeds use.
///
/// Accepts plain strings, `{latitude, longitude}` objects, GeoJSON points and bare
/// `[lon, lat]` pairs. A `(0, 0)` position is the feeds' placeholder for "unknown".
pub fn normalise_location(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(map) => {
            if let Some(pair) = map.get("coordinates") {
                return normalise_location(pair);
            }
            coordinates(map.get("latitude"), map.get("longitude"))
        }
        Value::Array(pair) if pair.len() == 2 => coordinates(pair.get(1), pair.first()),
        _ => None,
    }
}

fn coordinates(lat: Option<&Value>, lon: Option<&Value>) -> Option<String> {
    let lat = number(lat?)?;
    let lon = number(lon?)?;
    if lat == 0.0 && lon == 0.0 {
        return None;
    }

    Some(format!("({:.6}, {:.6})", lat, lon))
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|f| f.is_finite())
}

// -- Tests -------------------------------------------------------------------
