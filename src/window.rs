//! Candidate dates for a collection run.

use chrono::{Days, NaiveDate};

/// Returns every date in `[reference - lag - lookback, reference - lag]`, ascending.
///
/// The range is empty if either end falls outside chrono's representable dates.
pub fn candidate_dates(reference: NaiveDate, lookback_days: u32, lag_days: u32) -> Vec<NaiveDate> {
    let end = match reference.checked_sub_days(Days::new(lag_days as u64)) {
        Some(end) => end,
        None => return Vec::new(),
    };
    let start = match end.checked_sub_days(Days::new(lookback_days as u64)) {
        Some(start) => start,
        None => return Vec::new(),
    };

    start.iter_days().take_while(|d| *d <= end).collect()
}

// -- Tests -------------------------------------------------------------------
