//! Run the incremental pipeline over the configured date window.

use std::{fmt::Write, path::Path};

use anyhow::{anyhow, Result};
use chrono::Local;

use crate::{
    cli::{create_spinner, CollectArgs},
    config::{ProviderConfig, CHICAGO, NYC},
    driver::{IncrementalDriver, RunReport},
    source::{OpenWeatherClient, SocrataClient, Source, SourceClient},
    store::Store,
    window::candidate_dates,
};

pub async fn collect(db_path: &Path, args: &CollectArgs) -> Result<String> {
    let config = ProviderConfig::from_env();
    let http = config.http_client()?;

    let sources = if args.sources.is_empty() {
        Source::ALL.to_vec()
    } else {
        args.sources.clone()
    };
    let clients = build_clients(&config, &http, &sources);
    if clients.is_empty() {
        return Err(anyhow!("no source can be collected with the current configuration"));
    }

    let reference = args
        .reference_date
        .unwrap_or_else(|| Local::now().date_naive());
    let dates = candidate_dates(reference, args.lookback_days, args.lag_days);
    log::info!("Found {} candidate dates to process.", dates.len());

    let bar = create_spinner(format!("Opening {}", db_path.display()));
    let mut store = Store::open(db_path)?;
    bar.finish_and_clear();

    let report = IncrementalDriver::new(&mut store, clients)
        .zero_count_policy(args.zero_count)
        .show_progress(true)
        .run(&dates, args.cap)
        .await;

    Ok(summarise(&report))
}

fn build_clients(
    config: &ProviderConfig,
    http: &reqwest::Client,
    sources: &[Source],
) -> Vec<Box<dyn SourceClient>> {
    let mut clients: Vec<Box<dyn SourceClient>> = Vec::new();

    for &source in sources {
        match source {
            Source::NycCrashes => clients.push(Box::new(SocrataClient::new(
                http.clone(),
                source,
                config.nyc_crashes.clone(),
            ))),
            Source::ChicagoCrashes => clients.push(Box::new(SocrataClient::new(
                http.clone(),
                source,
                config.chicago_crashes.clone(),
            ))),
            Source::NycWeather | Source::ChicagoWeather => {
                let Some(api_key) = config.weather.api_key.clone() else {
                    log::warn!("{}: OPENWEATHER_API_KEY is not set, skipping", source);
                    continue;
                };
                let city = if source == Source::NycWeather { NYC } else { CHICAGO };
                clients.push(Box::new(OpenWeatherClient::new(
                    http.clone(),
                    source,
                    city,
                    &config.weather,
                    api_key,
                )));
            }
        }
    }

    clients
}

fn summarise(report: &RunReport) -> String {
    let mut output = String::new();

    for source in &report.sources {
        let _ = writeln!(output, "{}", source);
        for (date, reason) in &source.failed {
            let _ = writeln!(output, "  - {} failed: {}", date, reason);
        }
    }
    let _ = write!(output, "{} new (source, date) aggregates committed", report.committed_count());

    output
}

// -- Tests -------------------------------------------------------------------
