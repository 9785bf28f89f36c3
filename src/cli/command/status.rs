//! Inspect and wipe the collected data.

use std::{fmt::Write, path::Path};

use anyhow::{bail, Result};

use crate::{
    source::Source,
    store::{DateLedger, Store},
};

pub fn status(db_path: &Path) -> Result<String> {
    let store = Store::open(db_path)?;
    build_status(&store)
}

fn build_status(store: &Store) -> Result<String> {
    let mut output = String::new();

    for source in Source::ALL {
        let dates = store.processed_dates(source)?;
        match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => {
                let _ = writeln!(
                    output,
                    "{}: {} dates processed ({} to {})",
                    source,
                    dates.len(),
                    first,
                    last
                );
            }
            _ => {
                let _ = writeln!(output, "{}: nothing processed yet", source);
            }
        }
    }

    Ok(output.trim_end().to_string())
}

pub fn reset(db_path: &Path, yes: bool) -> Result<String> {
    if !yes {
        bail!("reset deletes every collected aggregate, pass --yes to confirm");
    }

    let mut store = Store::open(db_path)?;
    store.reset()?;
    log::warn!("Reset {}", db_path.display());

    Ok(format!("Reset {}", db_path.display()))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::aggregate::DailyAggregate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn should_list_processed_range_per_source() {
        let mut store = Store::open_in_memory().unwrap();
        for d in [3, 1, 2] {
            store
                .commit(date(d), Source::NycWeather, &DailyAggregate::default())
                .unwrap();
        }

        let text = build_status(&store).unwrap();

        assert!(text.contains("nyc_weather: 3 dates processed (2025-10-01 to 2025-10-03)"));
        assert!(text.contains("nyc_crashes: nothing processed yet"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn should_refuse_reset_without_confirmation() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("test.sqlite");
        {
            let mut store = Store::open(&db).unwrap();
            store
                .commit(date(1), Source::ChicagoCrashes, &DailyAggregate::default())
                .unwrap();
        }

        assert!(reset(&db, false).is_err());
        assert_eq!(
            Store::open(&db).unwrap().processed_dates(Source::ChicagoCrashes).unwrap().len(),
            1
        );

        reset(&db, true).unwrap();
        assert!(Store::open(&db)
            .unwrap()
            .processed_dates(Source::ChicagoCrashes)
            .unwrap()
            .is_empty());
    }
}
