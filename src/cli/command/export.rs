//! Write the joined daily table as CSV.

use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};

use crate::{
    cli::create_spinner,
    store::{JoinMode, JoinedDay, Store},
};

pub fn export(db_path: &Path, out: &Path, complete_only: bool) -> Result<String> {
    let store = Store::open(db_path)?;
    let mode = if complete_only {
        JoinMode::Inner
    } else {
        JoinMode::Left
    };
    let rows = store.all_joined_days(mode)?;

    let bar = create_spinner(format!("Writing {}", out.display()));
    let file =
        File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
    write_csv(file, &rows)?;
    bar.finish_and_clear();

    Ok(format!("Exported {} days to {}", rows.len(), out.display()))
}

pub fn write_csv<W: Write>(writer: W, rows: &[JoinedDay]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(JoinedDay::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::{aggregate::DailyAggregate, source::Source, store::DateLedger};

    fn crashes(count: i64) -> DailyAggregate {
        DailyAggregate {
            count,
            injuries: 1,
            fatalities: 0,
            precipitation_mm: 0.0,
        }
    }

    #[test]
    fn should_write_header_and_empty_cells_for_missing_sides() {
        let mut store = Store::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        store.commit(date, Source::NycCrashes, &crashes(12)).unwrap();
        let rows = store.all_joined_days(JoinMode::Left).unwrap();

        let mut buffer = Vec::new();
        write_csv(&mut buffer, &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "date,nyc_precip_mm,chicago_precip_mm,nyc_crashes,nyc_injuries,nyc_fatalities,\
             chicago_crashes,chicago_injuries,chicago_fatalities"
        );
        assert_eq!(lines[1], "2025-10-01,,,12,1,0,,,");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn should_write_header_without_rows() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[]).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "date,nyc_precip_mm,chicago_precip_mm,nyc_crashes,nyc_injuries,nyc_fatalities,\
             chicago_crashes,chicago_injuries,chicago_fatalities\n"
        );
    }

    #[test]
    fn should_export_only_complete_days() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("test.sqlite");
        let out = dir.path().join("days.csv");
        {
            let mut store = Store::open(&db).unwrap();
            let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
            store.commit(date, Source::NycCrashes, &crashes(12)).unwrap();
        }

        let message = export(&db, &out, true).unwrap();

        assert_eq!(message, format!("Exported 0 days to {}", out.display()));
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, format!("{}\n", JoinedDay::COLUMNS.join(",")));
    }
}
