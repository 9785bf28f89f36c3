//! Date identity and processed-pair bookkeeping.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    aggregate::DailyAggregate,
    source::{Source, SourceKind},
};

use super::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Surrogate key of a calendar date, shared by every source's aggregate row.
pub struct DateId(pub i64);

pub trait DateLedger {
    /// Returns the date's identifier, creating it on first use.
    fn identifier_for(&self, date: NaiveDate) -> Result<DateId>;

    fn lookup(&self, date: NaiveDate) -> Result<Option<DateId>>;

    fn is_processed(&self, id: DateId, source: Source) -> Result<bool>;

    fn processed_dates(&self, source: Source) -> Result<BTreeSet<NaiveDate>>;

    /// Writes the aggregate and marks the pair processed as one unit. On error
    /// nothing is left behind: no identifier, no aggregate row, no marker.
    fn commit(&mut self, date: NaiveDate, source: Source, aggregate: &DailyAggregate) -> Result<DateId>;
}

impl DateLedger for Store {
    fn identifier_for(&self, date: NaiveDate) -> Result<DateId> {
        get_or_create(self.conn(), date)
    }

    fn lookup(&self, date: NaiveDate) -> Result<Option<DateId>> {
        lookup(self.conn(), date)
    }

    fn is_processed(&self, id: DateId, source: Source) -> Result<bool> {
        let processed = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM processed_markers WHERE date_index_id = ?1 AND source = ?2)",
            params![id.0, source.as_str()],
            |row| row.get(0),
        )?;

        Ok(processed)
    }

    fn processed_dates(&self, source: Source) -> Result<BTreeSet<NaiveDate>> {
        let mut stmt = self.conn().prepare(
            "SELECT d.date FROM processed_markers p
             JOIN date_index d ON d.id = p.date_index_id
             WHERE p.source = ?1",
        )?;
        let dates = stmt
            .query_map(params![source.as_str()], |row| row.get::<_, NaiveDate>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;

        Ok(dates)
    }

    fn commit(&mut self, date: NaiveDate, source: Source, aggregate: &DailyAggregate) -> Result<DateId> {
        let tx = self.conn.transaction()?;

        let id = get_or_create(&tx, date)?;
        write_aggregate(&tx, id, source, aggregate)
            .with_context(|| format!("failed to write {} aggregate for {}", source, date))?;
        mark_processed(&tx, id, source)?;

        tx.commit()
            .with_context(|| format!("failed to commit {} for {}", source, date))?;

        Ok(id)
    }
}

fn lookup(conn: &Connection, date: NaiveDate) -> Result<Option<DateId>> {
    let id = conn
        .query_row(
            "SELECT id FROM date_index WHERE date = ?1",
            params![date],
            |row| row.get(0),
        )
        .optional()?;

    Ok(id.map(DateId))
}

fn get_or_create(conn: &Connection, date: NaiveDate) -> Result<DateId> {
    conn.execute(
        "INSERT OR IGNORE INTO date_index (date) VALUES (?1)",
        params![date],
    )?;

    lookup(conn, date)?.with_context(|| format!("date index row for {} vanished", date))
}

fn write_aggregate(
    conn: &Connection,
    id: DateId,
    source: Source,
    aggregate: &DailyAggregate,
) -> rusqlite::Result<usize> {
    let table = source.table();

    match source.kind() {
        SourceKind::Crashes => conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {table}
                 (date_index_id, total_crashes, total_injuries, total_fatalities)
                 VALUES (?1, ?2, ?3, ?4)"
            ),
            params![id.0, aggregate.count, aggregate.injuries, aggregate.fatalities],
        ),
        SourceKind::Weather => conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {table}
                 (date_index_id, observations, precip_mm)
                 VALUES (?1, ?2, ?3)"
            ),
            params![id.0, aggregate.count, aggregate.precipitation_mm],
        ),
    }
}

/// Only called inside [`DateLedger::commit`]'s transaction, after the aggregate write.
fn mark_processed(conn: &Connection, id: DateId, source: Source) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO processed_markers (date_index_id, source, committed_at)
         VALUES (?1, ?2, ?3)",
        params![id.0, source.as_str(), Utc::now().to_rfc3339()],
    )
}

#[cfg(test)]
impl Store {
    pub(crate) fn row_count(&self, table: &str) -> i64 {
        self.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    pub(crate) fn crash_totals(&self, source: Source, id: DateId) -> Option<(i64, i64, i64)> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT total_crashes, total_injuries, total_fatalities FROM {} WHERE date_index_id = ?1",
                    source.table()
                ),
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .unwrap()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn crashes(count: i64, injuries: i64, fatalities: i64) -> DailyAggregate {
        DailyAggregate {
            count,
            injuries,
            fatalities,
            precipitation_mm: 0.0,
        }
    }

    #[test]
    fn should_get_or_create_one_identifier_per_date() {
        let store = Store::open_in_memory().unwrap();

        let first = store.identifier_for(date(1)).unwrap();
        let again = store.identifier_for(date(1)).unwrap();
        let other = store.identifier_for(date(2)).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(store.row_count("date_index"), 2);
        assert_eq!(store.lookup(date(3)).unwrap(), None);
    }

    #[test]
    fn should_share_identifier_across_sources() {
        let mut store = Store::open_in_memory().unwrap();

        let nyc = store.commit(date(1), Source::NycCrashes, &crashes(3, 1, 0)).unwrap();
        let chicago = store.commit(date(1), Source::ChicagoCrashes, &crashes(5, 2, 1)).unwrap();
        let weather = store
            .commit(date(1), Source::NycWeather, &DailyAggregate::default())
            .unwrap();

        assert_eq!(nyc, chicago);
        assert_eq!(nyc, weather);
        assert_eq!(store.row_count("date_index"), 1);
    }

    #[test]
    fn should_mark_only_the_committed_source() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.commit(date(1), Source::NycCrashes, &crashes(3, 1, 0)).unwrap();

        assert!(store.is_processed(id, Source::NycCrashes).unwrap());
        assert!(!store.is_processed(id, Source::ChicagoCrashes).unwrap());
        assert_eq!(
            store.processed_dates(Source::NycCrashes).unwrap(),
            BTreeSet::from([date(1)])
        );
    }

    #[test]
    fn should_not_duplicate_on_recommit() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.commit(date(1), Source::NycCrashes, &crashes(3, 1, 0)).unwrap();
        store.commit(date(1), Source::NycCrashes, &crashes(4, 1, 0)).unwrap();

        assert_eq!(store.row_count("nyc_crashes"), 1);
        assert_eq!(store.row_count("processed_markers"), 1);
        assert_eq!(store.crash_totals(Source::NycCrashes, id), Some((4, 1, 0)));
    }

    #[test]
    fn should_roll_back_everything_when_aggregate_write_fails() {
        let mut store = Store::open_in_memory().unwrap();
        store.conn().execute("DROP TABLE chicago_crashes", []).unwrap();

        let result = store.commit(date(1), Source::ChicagoCrashes, &crashes(2, 1, 1));

        assert!(result.is_err());
        assert_eq!(store.lookup(date(1)).unwrap(), None);
        assert_eq!(store.row_count("processed_markers"), 0);
    }

    #[test]
    fn should_roll_back_aggregate_when_marker_write_fails() {
        let mut store = Store::open_in_memory().unwrap();
        store.conn().execute("DROP TABLE processed_markers", []).unwrap();

        let result = store.commit(date(1), Source::NycCrashes, &crashes(2, 1, 1));

        assert!(result.is_err());
        assert_eq!(store.lookup(date(1)).unwrap(), None);
        assert_eq!(store.row_count("nyc_crashes"), 0);
    }
}
