//! Reduction of a day's clean records into one aggregate.

use serde::Serialize;

use crate::filter::CleanRecord;

/// Precipitation is summed in whole micrometres so the total never depends on record order.
const MICROMETRES_PER_MM: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub count: i64,
    pub injuries: i64,
    pub fatalities: i64,
    pub precipitation_mm: f64,
}

impl DailyAggregate {
    pub fn from_records(records: &[CleanRecord]) -> Self {
        let mut count = 0i64;
        let mut injuries = 0i64;
        let mut fatalities = 0i64;
        let mut precipitation_um = 0i64;

        for record in records {
            count = count.saturating_add(1);
            injuries = injuries.saturating_add(record.injuries.max(0));
            fatalities = fatalities.saturating_add(record.fatalities.max(0));
            // Float to int casts saturate, NaN becomes 0.
            let um = (record.precipitation_mm * MICROMETRES_PER_MM).round() as i64;
            precipitation_um = precipitation_um.saturating_add(um.max(0));
        }

        DailyAggregate {
            count,
            injuries,
            fatalities,
            precipitation_mm: precipitation_um as f64 / MICROMETRES_PER_MM,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

    use super::*;

    fn record(hour: u32, injuries: i64, fatalities: i64, precipitation_mm: f64) -> CleanRecord {
        CleanRecord {
            observed_at: NaiveDate::from_ymd_opt(2025, 10, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            key: None,
            location: None,
            injuries,
            fatalities,
            precipitation_mm,
        }
    }

    #[test]
    fn should_count_and_sum() {
        let records = vec![record(8, 1, 0, 0.0), record(9, 0, 1, 0.0), record(10, 3, 0, 0.0)];
        let aggregate = DailyAggregate::from_records(&records);

        assert_eq!(
            aggregate,
            DailyAggregate {
                count: 3,
                injuries: 4,
                fatalities: 1,
                precipitation_mm: 0.0
            }
        );
    }

    #[test]
    fn should_return_zero_for_no_records() {
        let aggregate = DailyAggregate::from_records(&[]);

        assert!(aggregate.is_empty());
        assert_eq!(aggregate, DailyAggregate::default());
    }

    #[test]
    fn should_not_depend_on_record_order() {
        let records: Vec<CleanRecord> = (0..24)
            .map(|h| record(h, (h % 3) as i64, (h % 5 == 0) as i64, 0.1 * h as f64 + 0.07))
            .collect();
        let expected = DailyAggregate::from_records(&records);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut shuffled = records.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(DailyAggregate::from_records(&shuffled), expected);
        }
    }

    #[test]
    fn should_saturate_instead_of_overflowing() {
        let records = vec![
            record(8, i64::MAX, i64::MAX, f64::MAX),
            record(9, i64::MAX, 1, f64::MAX),
            record(10, -5, -5, -2.0),
        ];
        let aggregate = DailyAggregate::from_records(&records);

        assert_eq!(aggregate.count, 3);
        assert_eq!(aggregate.injuries, i64::MAX);
        assert_eq!(aggregate.fatalities, i64::MAX);
        assert_eq!(aggregate.precipitation_mm, i64::MAX as f64 / MICROMETRES_PER_MM);
    }

    #[test]
    fn should_sum_precipitation_exactly() {
        let records = vec![record(0, 0, 0, 0.1), record(1, 0, 0, 0.2), record(2, 0, 0, 0.3)];

        assert_eq!(DailyAggregate::from_records(&records).precipitation_mm, 0.6);
    }
}
