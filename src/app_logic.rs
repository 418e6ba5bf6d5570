//! Application logic behind the command-line subcommands.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use tracing::{error, info};

use crate::config::{load_config, Config};
use crate::estimator::{LifeEstimate, LifeEstimator};
use crate::initiation::build_initiation_table_with_progress;
use crate::report::{update_aggregate, write_curve, AggregateRow};
use crate::statistics::{life_statistics, read_experimental_lives, LifeStatistics};

fn load(config_path: &str) -> Result<Config> {
    info!("Running with configuration: {}", config_path);
    load_config(config_path).with_context(|| format!("failed to load configuration {}", config_path))
}

/// Builds the initiation table of the configured metric and shape.
pub fn run_table(config_path: &str) -> Result<()> {
    let conf = load(config_path)?;
    let material = conf.material_properties().context("invalid material")?;
    let progress = AtomicUsize::new(0);
    let table = build_initiation_table_with_progress(
        &material,
        conf.solution.metric,
        conf.solution.shape,
        conf.table.step,
        &conf.table.grid,
        &progress,
    );
    let path = conf.table_file();
    table.save(&path).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "initiation table written");
    Ok(())
}

/// Estimates every selected experiment, then writes the curves and the
/// aggregate file. Nothing is written unless every experiment succeeds.
pub fn run_estimate(config_path: &str, experiments: &[String], json: bool) -> Result<Vec<LifeEstimate>> {
    let conf = load(config_path)?;
    let estimator = LifeEstimator::from_config(&conf).context("failed to prepare the estimator")?;
    let ids = if experiments.is_empty() {
        conf.experiments.experiment_ids().context("failed to list experiments")?
    } else {
        experiments.to_vec()
    };
    if ids.is_empty() {
        anyhow::bail!("no experiments found in {}", conf.experiments.path);
    }
    info!(count = ids.len(), metric = %estimator.metric(), "estimating lives");

    let results: Vec<(String, crate::error::Result<LifeEstimate>)> = ids
        .par_iter()
        .map(|id| (id.clone(), estimator.estimate_experiment(&conf.experiments, id)))
        .collect();

    // any failure aborts the batch before a result file is touched
    let mut estimates = Vec::with_capacity(results.len());
    for (id, result) in results {
        match result {
            Ok(estimate) => estimates.push(estimate),
            Err(e) => {
                error!(experiment = %id, "estimation failed: {}", e);
                return Err(e).with_context(|| format!("failed to estimate experiment {}", id));
            }
        }
    }

    for estimate in &estimates {
        let path = conf.output.result_file(estimate.metric, &estimate.experiment);
        write_curve(&path, estimate).with_context(|| format!("failed to write {}", path.display()))?;
    }
    let rows: Vec<AggregateRow> = estimates.iter().map(AggregateRow::from).collect();
    let aggregate = conf.output.aggregate_file();
    update_aggregate(&aggregate, &rows).with_context(|| format!("failed to update {}", aggregate.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&estimates)?);
    } else {
        for row in &rows {
            println!(
                "{}\t{}\tN_t = {:.4e}\tN_i = {:.4e}\tN_p = {:.4e}\t{:.1}% / {:.1}%\ta = {:.3} mm",
                row.exp_id,
                row.param,
                row.n_t_min,
                row.n_i_min,
                row.n_p_min,
                row.pct_initiation,
                row.pct_propagation,
                row.a_initiation_mm
            );
        }
    }
    Ok(estimates)
}

/// Compares the aggregate estimates with measured lives.
pub fn run_stats(config_path: &str, lives_path: &str, json: bool) -> Result<LifeStatistics> {
    let conf = load(config_path)?;
    let experimental = read_experimental_lives(Path::new(lives_path))
        .with_context(|| format!("failed to read experimental lives {}", lives_path))?;
    let aggregate = conf.output.aggregate_file();
    let estimates = crate::report::read_aggregate(&aggregate)
        .with_context(|| format!("failed to read {}", aggregate.display()))?;
    let stats = life_statistics(conf.solution.metric, &estimates, &experimental, &conf.statistics.exclude)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}:\tx = {}", stats.metric, stats.mean_ratio);
        println!("\tsigma_x = {}", stats.scatter);
        println!("\tm = {}", stats.slope);
        println!("\ta = {:.3}\tr^2 = {:.3}", stats.origin_slope, stats.origin_r2);
    }
    Ok(stats)
}
