//! Crashes against precipitation, per city, over complete days.

use std::{fmt::Write, fs, path::Path};

use anyhow::{Context, Result};

use crate::{
    stats::{self, Strength},
    store::{JoinMode, JoinedDay, Store},
};

pub fn report(db_path: &Path, out: Option<&Path>) -> Result<String> {
    let store = Store::open(db_path)?;
    let rows = store.all_joined_days(JoinMode::Inner)?;
    let text = build_report(&rows);

    match out {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(format!("Report for {} days written to {}", rows.len(), path.display()))
        }
        None => Ok(text),
    }
}

struct CitySeries {
    name: &'static str,
    precip: Vec<f64>,
    crashes: Vec<f64>,
}

fn city_series(rows: &[JoinedDay]) -> [CitySeries; 2] {
    let mut nyc = CitySeries {
        name: "New York City",
        precip: Vec::new(),
        crashes: Vec::new(),
    };
    let mut chicago = CitySeries {
        name: "Chicago",
        precip: Vec::new(),
        crashes: Vec::new(),
    };

    for row in rows.iter().filter(|row| row.is_complete()) {
        if let (Some(p), Some(c)) = (row.nyc_precip_mm, row.nyc_crashes) {
            nyc.precip.push(p);
            nyc.crashes.push(c as f64);
        }
        if let (Some(p), Some(c)) = (row.chicago_precip_mm, row.chicago_crashes) {
            chicago.precip.push(p);
            chicago.crashes.push(c as f64);
        }
    }

    [nyc, chicago]
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

pub fn build_report(rows: &[JoinedDay]) -> String {
    let cities = city_series(rows);
    let complete: Vec<&JoinedDay> = rows.iter().filter(|row| row.is_complete()).collect();

    let mut output = String::new();
    let _ = writeln!(output, "# Crashes and Precipitation");
    match (complete.first(), complete.last()) {
        (Some(first), Some(last)) => {
            let _ = writeln!(
                output,
                "{} complete days from {} to {}",
                complete.len(),
                first.date,
                last.date
            );
        }
        _ => {
            let _ = writeln!(output, "No complete days collected yet.");
            return output;
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Correlation");
    for city in &cities {
        let r = stats::pearson(&city.precip, &city.crashes);
        let strength = r.map_or("n/a".to_string(), |r| Strength::of(r).to_string());
        let _ = writeln!(
            output,
            "- {}: r = {} ({})",
            city.name,
            number(r),
            strength
        );
        match stats::linear_fit(&city.precip, &city.crashes) {
            Some(fit) => {
                let _ = writeln!(
                    output,
                    "  crashes = {:.2} * precip_mm + {:.2}",
                    fit.slope, fit.intercept
                );
            }
            None => {
                let _ = writeln!(output, "  fit: n/a");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Rainy vs Dry Days");
    for city in &cities {
        let split = stats::split_wet_dry(&city.precip, &city.crashes);
        let wet_mean = stats::mean(&split.wet);
        let dry_mean = stats::mean(&split.dry);
        let difference = wet_mean.zip(dry_mean).map(|(w, d)| w - d);
        let _ = writeln!(
            output,
            "- {}: rainy {} days (mean {}, median {}), dry {} days (mean {}, median {}), difference {}",
            city.name,
            split.wet.len(),
            number(wet_mean),
            number(stats::median(&split.wet)),
            split.dry.len(),
            number(dry_mean),
            number(stats::median(&split.dry)),
            number(difference)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Crashes");
    for city in &cities {
        let _ = writeln!(
            output,
            "- {}: mean {}, std dev {}",
            city.name,
            number(stats::mean(&city.crashes)),
            number(stats::std_dev(&city.crashes))
        );
    }

    output
}

// -- Tests -------------------------------------------------------------------
