//! Incremental collection across sources and dates.
//!
//! Sources run one after another and never share failures. Within a source, dates are
//! visited in ascending order and at most `per_source_cap` new dates are committed per
//! run. Already processed dates are skipped without touching the provider.

use std::fmt;

use chrono::NaiveDate;
use indicatif::ProgressBar;

use crate::{
    aggregate::DailyAggregate,
    cli::create_progress_bar,
    filter::{self, filter_records},
    source::{FetchOutcome, Source, SourceClient},
    store::DateLedger,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
/// What to do with a successfully fetched day that has no accepted records.
pub enum ZeroCountPolicy {
    /// Commit a zero aggregate and mark the day processed.
    #[default]
    Commit,
    /// Leave the day unprocessed so a later run fetches it again.
    Defer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: Source,
    pub committed: Vec<NaiveDate>,
    pub already_processed: usize,
    pub deferred: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, String)>,
    pub rejected_records: usize,
    pub storage_error: Option<String>,
    /// Dates were left unvisited because the cap was hit.
    pub cap_reached: bool,
}

impl SourceReport {
    fn new(source: Source) -> Self {
        SourceReport {
            source,
            committed: Vec::new(),
            already_processed: 0,
            deferred: Vec::new(),
            failed: Vec::new(),
            rejected_records: 0,
            storage_error: None,
            cap_reached: false,
        }
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} committed, {} already processed, {} deferred, {} failed, {} records rejected",
            self.source,
            self.committed.len(),
            self.already_processed,
            self.deferred.len(),
            self.failed.len(),
            self.rejected_records
        )?;
        if self.cap_reached {
            write!(f, " (cap reached)")?;
        }
        if let Some(err) = &self.storage_error {
            write!(f, " (storage error: {})", err)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn committed_count(&self) -> usize {
        self.sources.iter().map(|s| s.committed.len()).sum()
    }

    pub fn source(&self, source: Source) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == source)
    }
}

pub struct IncrementalDriver<'a, L: DateLedger> {
    ledger: &'a mut L,
    clients: Vec<Box<dyn SourceClient>>,
    zero_count: ZeroCountPolicy,
    show_progress: bool,
}

impl<'a, L: DateLedger> IncrementalDriver<'a, L> {
    pub fn new(ledger: &'a mut L, clients: Vec<Box<dyn SourceClient>>) -> Self {
        IncrementalDriver {
            ledger,
            clients,
            zero_count: ZeroCountPolicy::default(),
            show_progress: false,
        }
    }

    pub fn zero_count_policy(mut self, policy: ZeroCountPolicy) -> Self {
        self.zero_count = policy;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn run(&mut self, candidates: &[NaiveDate], per_source_cap: usize) -> RunReport {
        let mut dates = candidates.to_vec();
        dates.sort_unstable();
        dates.dedup();

        let mut report = RunReport::default();
        for client in &self.clients {
            let progress = if self.show_progress {
                create_progress_bar(dates.len() as u64, format!("Collecting {}", client.source()))
            } else {
                ProgressBar::hidden()
            };

            let source_report = run_source(
                &mut *self.ledger,
                client.as_ref(),
                &dates,
                per_source_cap,
                self.zero_count,
                &progress,
            )
            .await;

            progress.finish_with_message(format!("{}", source_report.source));
            log::info!("{}", source_report);
            report.sources.push(source_report);
        }

        report
    }
}

async fn run_source<L: DateLedger>(
    ledger: &mut L,
    client: &dyn SourceClient,
    dates: &[NaiveDate],
    cap: usize,
    zero_count: ZeroCountPolicy,
    progress: &ProgressBar,
) -> SourceReport {
    let source = client.source();
    let record_filter = filter::for_source(source);
    let mut report = SourceReport::new(source);

    for &date in dates {
        if report.committed.len() >= cap {
            report.cap_reached = true;
            break;
        }
        progress.inc(1);

        let existing = match ledger.lookup(date) {
            Ok(existing) => existing,
            Err(err) => {
                log::error!("{}: ledger lookup for {} failed: {:#}", source, date, err);
                report.storage_error = Some(format!("{:#}", err));
                break;
            }
        };
        if let Some(id) = existing {
            match ledger.is_processed(id, source) {
                Ok(true) => {
                    report.already_processed += 1;
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    log::error!("{}: ledger check for {} failed: {:#}", source, date, err);
                    report.storage_error = Some(format!("{:#}", err));
                    break;
                }
            }
        }

        let raws = match client.fetch_raw_for_date(date).await {
            FetchOutcome::Records(raws) => raws,
            FetchOutcome::Failed { reason } => {
                log::warn!("{}: leaving {} unprocessed: {}", source, date, reason);
                report.failed.push((date, reason));
                continue;
            }
        };

        let filtered = filter_records(record_filter.as_ref(), source, date, &raws);
        report.rejected_records += filtered.rejected;
        let aggregate = DailyAggregate::from_records(&filtered.records);

        if aggregate.is_empty() && zero_count == ZeroCountPolicy::Defer {
            log::info!("{}: no records for {}, deferring", source, date);
            report.deferred.push(date);
            continue;
        }

        match ledger.commit(date, source, &aggregate) {
            Ok(_) => {
                log::info!(
                    "{}: committed {} ({} records, {} rejected)",
                    source,
                    date,
                    aggregate.count,
                    filtered.rejected
                );
                report.committed.push(date);
            }
            Err(err) => {
                log::error!("{}: commit for {} failed: {:#}", source, date, err);
                report.storage_error = Some(format!("{:#}", err));
                break;
            }
        }
    }

    report
}

// -- Tests -------------------------------------------------------------------
