//! Read path used by exports and reports: one row per date across every source.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params_from_iter, Row};
use serde::Serialize;

use super::{DateId, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Only dates every source has committed.
    Inner,
    /// Every date any source has committed; missing sides are `None`.
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedDay {
    pub date: NaiveDate,
    #[serde(skip)]
    pub date_id: DateId,
    pub nyc_precip_mm: Option<f64>,
    pub chicago_precip_mm: Option<f64>,
    pub nyc_crashes: Option<i64>,
    pub nyc_injuries: Option<i64>,
    pub nyc_fatalities: Option<i64>,
    pub chicago_crashes: Option<i64>,
    pub chicago_injuries: Option<i64>,
    pub chicago_fatalities: Option<i64>,
}

impl JoinedDay {
    /// Serialized column names, in field order.
    pub const COLUMNS: [&'static str; 9] = [
        "date",
        "nyc_precip_mm",
        "chicago_precip_mm",
        "nyc_crashes",
        "nyc_injuries",
        "nyc_fatalities",
        "chicago_crashes",
        "chicago_injuries",
        "chicago_fatalities",
    ];

    pub fn is_complete(&self) -> bool {
        self.nyc_precip_mm.is_some()
            && self.chicago_precip_mm.is_some()
            && self.nyc_crashes.is_some()
            && self.chicago_crashes.is_some()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(JoinedDay {
            date_id: DateId(row.get(0)?),
            date: row.get(1)?,
            nyc_precip_mm: row.get(2)?,
            chicago_precip_mm: row.get(3)?,
            nyc_crashes: row.get(4)?,
            nyc_injuries: row.get(5)?,
            nyc_fatalities: row.get(6)?,
            chicago_crashes: row.get(7)?,
            chicago_injuries: row.get(8)?,
            chicago_fatalities: row.get(9)?,
        })
    }
}

impl Store {
    /// Joined rows for the given identifiers, ordered by date.
    pub fn joined_days(&self, ids: &[DateId], mode: JoinMode) -> Result<Vec<JoinedDay>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.query_joined(Some(ids), mode)
    }

    /// Joined rows for every indexed date, ordered by date.
    pub fn all_joined_days(&self, mode: JoinMode) -> Result<Vec<JoinedDay>> {
        self.query_joined(None, mode)
    }

    fn query_joined(&self, ids: Option<&[DateId]>, mode: JoinMode) -> Result<Vec<JoinedDay>> {
        let sql = joined_sql(ids.map_or(0, |ids| ids.len()), mode);
        let values: Vec<i64> = ids.unwrap_or_default().iter().map(|id| id.0).collect();

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), JoinedDay::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

fn joined_sql(id_count: usize, mode: JoinMode) -> String {
    let join = match mode {
        JoinMode::Inner => "JOIN",
        JoinMode::Left => "LEFT JOIN",
    };

    let mut conditions = Vec::new();
    if mode == JoinMode::Left {
        conditions.push(
            "(nw.date_index_id IS NOT NULL OR cw.date_index_id IS NOT NULL \
             OR nc.date_index_id IS NOT NULL OR cc.date_index_id IS NOT NULL)"
                .to_string(),
        );
    }
    if id_count > 0 {
        let placeholders = vec!["?"; id_count].join(", ");
        conditions.push(format!("d.id IN ({placeholders})"));
    }
    let filter = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    format!(
        "SELECT d.id, d.date,
                nw.precip_mm, cw.precip_mm,
                nc.total_crashes, nc.total_injuries, nc.total_fatalities,
                cc.total_crashes, cc.total_injuries, cc.total_fatalities
         FROM date_index d
         {join} nyc_weather nw ON nw.date_index_id = d.id
         {join} chicago_weather cw ON cw.date_index_id = d.id
         {join} nyc_crashes nc ON nc.date_index_id = d.id
         {join} chicago_crashes cc ON cc.date_index_id = d.id
         {filter}
         ORDER BY d.date"
    )
}

// -- Tests -------------------------------------------------------------------
