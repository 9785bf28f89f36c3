//! Summary statistics over the joined daily table.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn of(r: f64) -> Self {
        if r > 0.6 {
            Strength::Strong
        } else if r > 0.4 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Weak => "weak",
        };
        f.write_str(label)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;

    Some(variance.sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Pearson correlation coefficient; `None` for mismatched lengths, fewer than two
/// points or a constant series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }

    if vx == 0.0 || vy == 0.0 {
        return None;
    }

    Some(cov / (vx.sqrt() * vy.sqrt()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Least-squares line `y = slope * x + intercept`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mx = mean(xs)?;
    let my = mean(ys)?;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;

    Some(LinearFit {
        slope,
        intercept: my - slope * mx,
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Crash counts split by whether the day had any precipitation.
pub struct WetDrySplit {
    pub wet: Vec<f64>,
    pub dry: Vec<f64>,
}

pub fn split_wet_dry(precip: &[f64], crashes: &[f64]) -> WetDrySplit {
    let mut split = WetDrySplit::default();
    for (p, c) in precip.iter().zip(crashes) {
        if *p > 0.0 {
            split.wet.push(*c);
        } else {
            split.dry.push(*c);
        }
    }

    split
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn should_label_strength() {
        assert_eq!(Strength::of(0.75), Strength::Strong);
        assert_eq!(Strength::of(0.6), Strength::Moderate);
        assert_eq!(Strength::of(0.41), Strength::Moderate);
        assert_eq!(Strength::of(0.4), Strength::Weak);
        assert_eq!(Strength::of(-0.9), Strength::Weak);
        assert_eq!(Strength::Moderate.to_string(), "moderate");
    }

    #[test]
    fn should_compute_moments() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_eq!(mean(&values), Some(5.0));
        assert_eq!(std_dev(&values), Some(2.0));
        assert_eq!(median(&values), Some(4.5));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn should_correlate_perfectly_linear_series() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [10.0, 12.0, 14.0, 16.0];

        assert!(close(pearson(&xs, &ys).unwrap(), 1.0));
        let down: Vec<f64> = ys.iter().rev().copied().collect();
        assert!(close(pearson(&xs, &down).unwrap(), -1.0));

        let fit = linear_fit(&xs, &ys).unwrap();
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 10.0));
    }

    #[test]
    fn should_refuse_undefined_correlation() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[3.0]), None);
        assert_eq!(pearson(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(linear_fit(&[2.0, 2.0], &[1.0, 5.0]), None);
    }

    #[test]
    fn should_split_wet_and_dry_days() {
        let split = split_wet_dry(&[0.0, 1.2, 0.0, 0.1], &[100.0, 130.0, 90.0, 120.0]);

        assert_eq!(split.wet, vec![130.0, 120.0]);
        assert_eq!(split.dry, vec![100.0, 90.0]);
    }
}
