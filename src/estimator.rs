//! Fatigue life of a notched specimen from its stress/strain field.
//!
//! For every trial crack length the initiation life is read from the
//! initiation table at the mean damage parameter ahead of the notch, and the
//! propagation life is integrated through the tension field. The trial length
//! minimizing the total is the governing initiation length.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{Config, Solution};
use crate::critical_plane::{CriticalPlaneSolver, DamageMetric, DamageProfile};
use crate::error::{Error, Result};
use crate::field::{ExperimentSource, FieldSample, LoadingPair};
use crate::initiation::InitiationTable;
use crate::interpolate::{Grid, InterpolationMethod, InterpolationStrategy};
use crate::material::{MaterialInput, MaterialProperties};
use crate::propagation::{PropagationLife, Propagator, StressInput};
use crate::shape::CrackShape;

/// Positions within this distance of a trial length match it (m).
pub const INDEX_TOLERANCE: f64 = 5e-9;

fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

/// Trial crack lengths `step, 2 step, ...` below the last field position,
/// with `step` the first field spacing rounded to 1e-8 m.
pub fn trial_lengths(positions: &[f64]) -> Vec<f64> {
    if positions.len() < 2 {
        return Vec::new();
    }
    let step = round8(positions[1]);
    let end = round8(positions[positions.len() - 1]);
    if !(step > 0.0) || end <= step {
        return Vec::new();
    }
    let count = ((end - step) / step - 1e-9).ceil() as usize;
    (0..count).map(|k| step * (k + 1) as f64).collect()
}

/// First position not below `a` up to [`INDEX_TOLERANCE`].
pub fn nearest_index(positions: &[f64], a: f64) -> Option<usize> {
    positions.iter().position(|&x| x >= a - INDEX_TOLERANCE)
}

/// Lives at one trial crack length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LifePoint {
    /// (m) trial initiation length.
    pub a: f64,
    pub total: f64,
    pub initiation: f64,
    pub propagation: PropagationLife,
    /// Cycles to reach `a` along the governing crack-growth curve.
    pub growth: f64,
}

impl LifePoint {
    pub fn propagation_cycles(&self) -> f64 {
        self.propagation.cycles()
    }
}

/// Estimate for one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct LifeEstimate {
    pub experiment: String,
    pub metric: DamageMetric,
    pub shape: CrackShape,
    /// Index into `curve` of the governing crack length.
    pub governing: usize,
    pub curve: Vec<LifePoint>,
    pub damage: DamageProfile,
}

impl LifeEstimate {
    pub fn governing_point(&self) -> &LifePoint {
        &self.curve[self.governing]
    }

    /// Percentages of the minimum total life spent in initiation and
    /// propagation.
    pub fn fractions(&self) -> (f64, f64) {
        let p = self.governing_point();
        if p.total > 0.0 {
            (100.0 * p.initiation / p.total, 100.0 * p.propagation_cycles() / p.total)
        } else {
            (0.0, 0.0)
        }
    }
}

/// Crack-growth curve: initiation lives up to the governing length, then
/// the cycles added by growing the crack from one trial length to the next.
pub fn growth_curve(initiation: &[f64], propagation: &[f64], governing: usize) -> Vec<f64> {
    let mut growth: Vec<f64> = Vec::with_capacity(initiation.len());
    for i in 0..initiation.len() {
        let n = if i <= governing {
            initiation[i]
        } else {
            growth[i - 1] + propagation[i - 1] - propagation[i]
        };
        growth.push(n);
    }
    growth
}

/// Estimates lives for one material, metric, crack shape and table.
pub struct LifeEstimator {
    material: MaterialProperties,
    metric: DamageMetric,
    shape: CrackShape,
    width: f64,
    table: InitiationTable,
    grid: Grid,
    interpolator: Box<dyn InterpolationStrategy + Send + Sync>,
}

impl LifeEstimator {
    pub fn new(
        material: MaterialProperties,
        metric: DamageMetric,
        shape: CrackShape,
        width: f64,
        table: InitiationTable,
        method: InterpolationMethod,
    ) -> Result<Self> {
        material.validate()?;
        let grid = table.as_grid();
        let interpolator = method.build(&grid);
        Ok(LifeEstimator { material, metric, shape, width, table, grid, interpolator })
    }

    /// Estimator with the material from the configuration and the table
    /// loaded from `table_path`.
    pub fn from_files<P: AsRef<Path>>(material: &MaterialInput, solution: &Solution, table_path: P) -> Result<Self> {
        let material = MaterialProperties::try_from(material)?;
        let table_path = table_path.as_ref();
        if !table_path.exists() {
            return Err(Error::TableFormat(format!(
                "{} not found, build it with the table command first",
                table_path.display()
            )));
        }
        let table = InitiationTable::load(table_path)?;
        info!(table = %table_path.display(), "initiation table loaded");
        LifeEstimator::new(material, solution.metric, solution.shape, solution.width, table, solution.interpolation)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        LifeEstimator::from_files(&config.material, &config.solution, config.table_file())
    }

    pub fn metric(&self) -> DamageMetric {
        self.metric
    }

    pub fn table(&self) -> &InitiationTable {
        &self.table
    }

    /// Interpolation grid of the loaded table.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Loads experiment `id` from `source` and estimates its life.
    pub fn estimate_experiment(&self, source: &ExperimentSource, id: &str) -> Result<LifeEstimate> {
        let pair = source.load(id)?;
        self.estimate(id, &pair)
    }

    pub fn estimate(&self, experiment: &str, pair: &LoadingPair) -> Result<LifeEstimate> {
        let positions = pair.positions();
        let lengths = trial_lengths(positions);
        if lengths.is_empty() {
            return Err(Error::FieldFormat(format!(
                "{}: field too short for any trial crack length",
                experiment
            )));
        }
        let step = round8(positions[1]);
        let damage = CriticalPlaneSolver::new(self.metric, &self.material).solve(pair);
        let profile = pair.tension.sxx();
        let propagator = Propagator::new(&self.material, self.shape, self.width);

        let mut initiation = Vec::with_capacity(lengths.len());
        let mut propagation = Vec::with_capacity(lengths.len());
        let mut outside = 0usize;
        for &a in &lengths {
            let index = nearest_index(positions, a).ok_or_else(|| {
                Error::FieldFormat(format!("{}: no field position at {:.3e} m", experiment, a))
            })?;
            let mean = damage.mean_up_to(index);
            if !self.grid.contains(a, mean) {
                outside += 1;
            }
            let n_i = self.interpolator.interpolate(a, mean).max(0.0);
            let n_p = propagator.life(StressInput::Field { profile: &profile, index }, a, step);
            debug!(a, index, mean, n_i, n_p = n_p.cycles(), "trial crack length");
            initiation.push(n_i);
            propagation.push(n_p);
        }
        if outside > 0 {
            warn!(experiment, outside, "table queries outside the tabulated range were extrapolated");
        }

        let propagation_cycles: Vec<f64> = propagation.iter().map(PropagationLife::cycles).collect();
        let totals: Vec<f64> = initiation.iter().zip(&propagation_cycles).map(|(i, p)| i + p).collect();
        let governing = totals
            .iter()
            .enumerate()
            .fold(0, |best, (i, &n)| if n < totals[best] { i } else { best });
        let growth = growth_curve(&initiation, &propagation_cycles, governing);

        let curve = lengths
            .iter()
            .enumerate()
            .map(|(i, &a)| LifePoint {
                a,
                total: totals[i],
                initiation: initiation[i],
                propagation: propagation[i],
                growth: growth[i],
            })
            .collect();
        let estimate = LifeEstimate { experiment: experiment.to_owned(), metric: self.metric, shape: self.shape, governing, curve, damage };
        let p = estimate.governing_point();
        info!(
            experiment,
            metric = %self.metric,
            a_mm = p.a * 1e3,
            n_t = p.total,
            n_i = p.initiation,
            n_p = p.propagation_cycles(),
            "life estimated"
        );
        Ok(estimate)
    }
}

/// Estimates the life of one experiment from its two loading extremes.
#[allow(clippy::too_many_arguments)]
pub fn estimate_life(
    material: &MaterialProperties,
    metric: DamageMetric,
    shape: CrackShape,
    width: f64,
    field_tension: FieldSample,
    field_compression: FieldSample,
    table: &InitiationTable,
    method: InterpolationMethod,
) -> Result<LifeEstimate> {
    let pair = LoadingPair::new(field_tension, field_compression)?;
    LifeEstimator::new(material.clone(), metric, shape, width, table.clone(), method)?.estimate("", &pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::SymTensor;
    use approx::assert_relative_eq;

    const A_STAR: f64 = 1e-3;

    fn uniform_field(sigma: f64, material: &MaterialProperties) -> (FieldSample, FieldSample) {
        let eps = sigma / material.e;
        let lateral = -material.nu * eps;
        let positions: Vec<f64> = (0..81).map(|i| i as f64 * 5e-5).collect();
        let n = positions.len();
        let tension = FieldSample::new(
            positions.clone(),
            vec![SymTensor::from_components([sigma, 0.0, 0.0, 0.0, 0.0, 0.0]); n],
            vec![SymTensor::from_components([eps, lateral, lateral, 0.0, 0.0, 0.0]); n],
        )
        .unwrap();
        let compression = FieldSample::new(
            positions,
            vec![SymTensor::from_components([-sigma, 0.0, 0.0, 0.0, 0.0, 0.0]); n],
            vec![SymTensor::from_components([-eps, -lateral, -lateral, 0.0, 0.0, 0.0]); n],
        )
        .unwrap();
        (tension, compression)
    }

    /// Initiation life `1e12 ((a - a*) / 1 mm)^2`, independent of the parameter.
    fn parabolic_table() -> InitiationTable {
        let crack_lengths: Vec<f64> = (0..=80).map(|i| i as f64 * 5e-5).collect();
        let row: Vec<f64> = crack_lengths.iter().map(|a| 1e12 * ((a - A_STAR) / 1e-3).powi(2)).collect();
        InitiationTable { crack_lengths, params: vec![0.5, 2.0], lives: vec![row.clone(), row] }
    }

    #[test]
    fn test_trial_lengths() {
        let positions: Vec<f64> = (0..81).map(|i| i as f64 * 5e-5).collect();
        let lengths = trial_lengths(&positions);
        assert_eq!(lengths.len(), 79);
        assert_relative_eq!(lengths[0], 5e-5);
        assert!(*lengths.last().unwrap() < 4e-3);
        assert!(trial_lengths(&[0.0]).is_empty());
    }

    #[test]
    fn test_nearest_index_tolerance() {
        let positions = [0.0, 5e-5, 1.0000000001e-4, 1.5e-4];
        assert_eq!(nearest_index(&positions, 1e-4), Some(2));
        assert_eq!(nearest_index(&positions, 1.2e-4), Some(3));
        assert_eq!(nearest_index(&positions, 1e-3), None);
    }

    #[test]
    fn test_growth_curve() {
        let initiation = [9.0, 4.0, 1.0, 0.0, 1.0];
        let propagation = [50.0, 40.0, 30.0, 25.0, 22.0];
        let growth = growth_curve(&initiation, &propagation, 2);
        assert_eq!(growth, vec![9.0, 4.0, 1.0, 6.0, 9.0]);
    }

    #[test]
    fn test_governing_length_follows_table_minimum() {
        let material = MaterialProperties::aluminium_7075_t651();
        let (tension, compression) = uniform_field(300.0, &material);
        let estimate = estimate_life(
            &material,
            DamageMetric::SmithWatsonTopper,
            CrackShape::Planar,
            10e-3,
            tension,
            compression,
            &parabolic_table(),
            InterpolationMethod::Linear,
        )
        .unwrap();
        let gov = estimate.governing_point();
        assert!((gov.a - A_STAR).abs() <= 5e-5 + 1e-12, "governing length {}", gov.a);
        assert_relative_eq!(gov.growth, gov.initiation);
        assert_relative_eq!(gov.total, gov.initiation + gov.propagation_cycles());
        for p in &estimate.curve {
            assert!(p.initiation >= 0.0);
            assert!(gov.total <= p.total);
        }
        let (fi, fp) = estimate.fractions();
        assert_relative_eq!(fi + fp, 100.0, epsilon = 1e-9);
        // uniform uniaxial loading gives the uniaxial SWT value everywhere
        assert_relative_eq!(estimate.damage.mean_up_to(10), 300.0 * 300.0 / material.e, max_relative = 1e-5);
    }

    #[test]
    fn test_minimal_field() {
        let material = MaterialProperties::aluminium_7075_t651();
        let positions = vec![0.0, 5e-5, 1e-4];
        let t = vec![SymTensor::from_components([100.0, 0.0, 0.0, 0.0, 0.0, 0.0]); 3];
        let tension = FieldSample::new(positions.clone(), t.clone(), t.clone()).unwrap();
        let compression = FieldSample::new(positions, t.clone(), t).unwrap();
        let result = estimate_life(
            &material,
            DamageMetric::SmithWatsonTopper,
            CrackShape::Planar,
            10e-3,
            tension,
            compression,
            &parabolic_table(),
            InterpolationMethod::Linear,
        );
        // one trial length fits (5e-5 < 1e-4)
        assert_eq!(result.unwrap().curve.len(), 1);
    }

    #[test]
    fn test_grid_built_once_from_table() {
        let material = MaterialProperties::aluminium_7075_t651();
        let table = parabolic_table();
        let estimator = LifeEstimator::new(
            material.clone(),
            DamageMetric::SmithWatsonTopper,
            CrackShape::Planar,
            10e-3,
            table.clone(),
            InterpolationMethod::Linear,
        )
        .unwrap();
        let grid = estimator.grid();
        assert_eq!(grid.x, table.crack_lengths);
        assert_eq!(grid.y, table.params);
        assert_eq!(grid.values, table.lives);

        let (tension, compression) = uniform_field(300.0, &material);
        let pair = LoadingPair::new(tension, compression).unwrap();
        let first = estimator.estimate("first", &pair).unwrap();
        let second = estimator.estimate("second", &pair).unwrap();
        assert_eq!(first.governing_point().a, second.governing_point().a);
    }

    #[test]
    fn test_missing_experiment_files() {
        let material = MaterialProperties::aluminium_7075_t651();
        let estimator = LifeEstimator::new(
            material,
            DamageMetric::SmithWatsonTopper,
            CrackShape::Planar,
            10e-3,
            parabolic_table(),
            InterpolationMethod::Cubic,
        )
        .unwrap();
        let source = ExperimentSource {
            path: "tests/data".into(),
            tension_prefix: "TENSOR_TRACCION_".into(),
            compression_prefix: "TENSOR_COMPRESION_".into(),
            extension: "dat".into(),
            ids: vec![],
            parse_config: Default::default(),
        };
        let err = estimator.estimate_experiment(&source, "absent").unwrap_err();
        assert!(matches!(err, Error::ExperimentMissing(_)));
    }
}
