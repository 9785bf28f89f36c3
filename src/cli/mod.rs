//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::{command, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{driver::ZeroCountPolicy, source::Source};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    /// SQLite database file (default: ~/crashweather.sqlite)
    #[arg(long, global = true, env = "CRASHWEATHER_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect daily aggregates for dates not processed yet
    Collect(CollectArgs),
    /// Export the joined daily table as CSV
    Export {
        #[arg(long)]
        out: PathBuf,
        /// Only days every source has data for
        #[arg(long)]
        complete_only: bool,
    },
    /// Summarise crashes against precipitation
    Report {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show processed dates per source
    Status {},
    /// Delete every collected aggregate and date
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Day the window is measured back from (default: today)
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,

    /// Days before the window's last day to include
    #[arg(long, default_value_t = 99)]
    pub lookback_days: u32,

    /// Days between the reference day and the window's last day
    #[arg(long, default_value_t = 1)]
    pub lag_days: u32,

    /// Most new dates committed per source in one run
    #[arg(long, default_value_t = 25)]
    pub cap: usize,

    /// Whether a fetched day with no records is marked processed
    #[arg(long, value_enum, default_value_t = ZeroCountPolicy::Commit)]
    pub zero_count: ZeroCountPolicy,

    /// Only collect these sources (repeatable)
    #[arg(long = "source", value_parser = parse_source)]
    pub sources: Vec<Source>,
}

fn parse_source(s: &str) -> Result<Source, String> {
    s.parse::<Source>().map_err(|err| {
        let names: Vec<&str> = Source::ALL.iter().map(|s| s.as_str()).collect();
        format!("{} (expected one of {})", err, names.join(", "))
    })
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_collect_defaults() {
        let cli = Cli::try_parse_from(["crashweather", "collect"]).unwrap();

        match cli.command {
            Commands::Collect(args) => {
                assert_eq!(args.lookback_days, 99);
                assert_eq!(args.lag_days, 1);
                assert_eq!(args.cap, 25);
                assert_eq!(args.zero_count, ZeroCountPolicy::Commit);
                assert!(args.sources.is_empty());
                assert!(args.reference_date.is_none());
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn should_parse_collect_options() {
        let cli = Cli::try_parse_from([
            "crashweather",
            "--db",
            "/tmp/test.sqlite",
            "collect",
            "--reference-date",
            "2025-11-20",
            "--cap",
            "6",
            "--zero-count",
            "defer",
            "--source",
            "nyc_crashes",
            "--source",
            "chicago_weather",
        ])
        .unwrap();

        assert_eq!(cli.db, Some(PathBuf::from("/tmp/test.sqlite")));
        match cli.command {
            Commands::Collect(args) => {
                assert_eq!(args.reference_date, NaiveDate::from_ymd_opt(2025, 11, 20));
                assert_eq!(args.cap, 6);
                assert_eq!(args.zero_count, ZeroCountPolicy::Defer);
                assert_eq!(args.sources, vec![Source::NycCrashes, Source::ChicagoWeather]);
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn should_reject_unknown_source() {
        assert!(Cli::try_parse_from(["crashweather", "collect", "--source", "la_crashes"]).is_err());
    }
}
