//! Agreement between estimated and experimental lives.
//!
//! Lives are compared on a log scale. An experiment with several measured
//! lives contributes one pair per measurement.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::config::ValidationError;
use crate::critical_plane::DamageMetric;
use crate::error::{Error, Result};
use crate::report::AggregateRow;

/// Measured lives of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentalLife {
    pub exp_id: String,
    pub lives: Vec<f64>,
}

/// Reads `exp_id,life_1[,life_2...]` lines. Lines starting with `#` and a
/// first line whose lives are not numeric are skipped.
pub fn read_experimental_lives(path: &Path) -> Result<Vec<ExperimentalLife>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut out = Vec::new();
    for (number, record) in reader.records().enumerate() {
        let record = record?;
        let Some(id) = record.get(0) else { continue };
        let lives: std::result::Result<Vec<f64>, _> =
            record.iter().skip(1).filter(|f| !f.is_empty()).map(str::parse::<f64>).collect();
        match lives {
            Ok(lives) if !lives.is_empty() => out.push(ExperimentalLife { exp_id: id.to_owned(), lives }),
            Ok(_) => warn!(exp_id = id, "experiment without measured lives skipped"),
            Err(_) if number == 0 => continue,
            Err(e) => return Err(Error::FieldFormat(format!("{}:{}: {}", path.display(), number + 1, e))),
        }
    }
    Ok(out)
}

/// Summary of estimated against experimental lives.
#[derive(Debug, Clone, Serialize)]
pub struct LifeStatistics {
    pub metric: DamageMetric,
    pub pairs: usize,
    /// `10^mean(log10(N_est / N_exp))`
    pub mean_ratio: f64,
    /// `10^std(log10(N_est / N_exp))`, sample standard deviation.
    pub scatter: f64,
    /// Slope of `log N_est` against `log N_exp` with an intercept.
    pub slope: f64,
    pub intercept: f64,
    /// Slope of `log N_exp` against `log N_est` through the origin.
    pub origin_slope: f64,
    pub origin_r2: f64,
    pub excluded: Vec<String>,
    /// Experiments with measured lives but no estimate.
    pub missing: Vec<String>,
}

/// Compares the aggregate rows of `metric` with the measured lives.
pub fn life_statistics(
    metric: DamageMetric,
    estimates: &[AggregateRow],
    experimental: &[ExperimentalLife],
    exclude: &[String],
) -> Result<LifeStatistics> {
    let estimated: HashMap<&str, f64> = estimates
        .iter()
        .filter(|row| row.param == metric.tag())
        .map(|row| (row.exp_id.as_str(), row.n_t_min))
        .collect();

    let mut log_est = Vec::new();
    let mut log_exp = Vec::new();
    let mut excluded = Vec::new();
    let mut missing = Vec::new();
    for exp in experimental {
        if exclude.contains(&exp.exp_id) {
            excluded.push(exp.exp_id.clone());
            continue;
        }
        let Some(&n_est) = estimated.get(exp.exp_id.as_str()) else {
            missing.push(exp.exp_id.clone());
            continue;
        };
        for &n_exp in &exp.lives {
            log_est.push(n_est.log10());
            log_exp.push(n_exp.log10());
        }
    }
    if !missing.is_empty() {
        warn!(?missing, "experiments without an estimate");
    }
    if log_est.len() < 2 {
        return Err(Error::Validation(ValidationError::new(&format!(
            "at least 2 estimated/experimental pairs are needed for {}, got {}",
            metric,
            log_est.len()
        ))));
    }

    let n = log_est.len() as f64;
    let log_ratio: Vec<f64> = log_est.iter().zip(&log_exp).map(|(e, x)| e - x).collect();
    let mean_log = mean(&log_ratio);
    let var_log = log_ratio.iter().map(|r| (r - mean_log).powi(2)).sum::<f64>() / (n - 1.0);

    let (slope, intercept) = least_squares(&log_exp, &log_est);
    let (origin_slope, origin_r2) = origin_fit(&log_est, &log_exp);

    let stats = LifeStatistics {
        metric,
        pairs: log_est.len(),
        mean_ratio: 10f64.powf(mean_log),
        scatter: 10f64.powf(var_log.sqrt()),
        slope,
        intercept,
        origin_slope,
        origin_r2,
        excluded,
        missing,
    };
    info!(metric = %metric, pairs = stats.pairs, x = stats.mean_ratio, sigma_x = stats.scatter, m = stats.slope, "statistics");
    Ok(stats)
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// `(slope, intercept)` of `y` on `x`.
fn least_squares(x: &[f64], y: &[f64]) -> (f64, f64) {
    let (mx, my) = (mean(x), mean(y));
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx == 0.0 {
        return (f64::NAN, my);
    }
    let slope = sxy / sxx;
    (slope, my - slope * mx)
}

/// `(slope, r^2)` of `y = slope x`, with r^2 measured around the mean of `y`.
fn origin_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sxx: f64 = x.iter().map(|a| a * a).sum();
    let slope = sxy / sxx;
    let my = mean(y);
    let ss_res: f64 = x.iter().zip(y).map(|(a, b)| (b - slope * a).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
    (slope, 1.0 - ss_res / ss_tot)
}
