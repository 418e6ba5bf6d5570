//! Initiation-life curves for a material.
//!
//! Total life comes from the strain-life form of the damage parameter and the
//! propagation life of a crack of the trial length under the same nominal
//! stress is subtracted from it. The result is tabulated over parameter
//! magnitude and trial crack length.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::config::ValidationError;
use crate::critical_plane::DamageMetric;
use crate::error::{Error, Result};
use crate::interpolate::Grid;
use crate::material::MaterialProperties;
use crate::optimize::newton;
use crate::propagation::{Propagator, StressInput};
use crate::report::write_atomically;
use crate::shape::CrackShape;

/// Above this total life the propagation phase is neglected.
pub const HIGH_CYCLE_LIMIT: f64 = 1.5e7;

const ROOT_TOLERANCE: f64 = 1e-10;
const ROOT_MAX_ITERATIONS: usize = 200;

/// Total cycles to failure for damage parameter `param`.
///
/// The strain-life equation is solved for `y = ln(2N)` so that the iterate
/// stays in the physical range. A non-positive parameter never fails and
/// yields infinity.
pub fn total_life(param: f64, metric: DamageMetric, material: &MaterialProperties) -> f64 {
    if !(param > 0.0) {
        return f64::INFINITY;
    }
    let m = material;
    let b = m.b;
    // strain-life coefficients of (2N)^b and (2N)^2b
    let (elastic, quadratic, initial): (f64, f64, f64) = match metric {
        DamageMetric::FatemiSocie => {
            let k = m.fs_normal_weight();
            let elastic = (1.0 + m.nu) * m.sigma_f / m.e;
            let normal = k / 2.0 * (1.0 + m.nu) * m.sigma_f.powi(2) / (m.e * m.sigma_y);
            (elastic, normal, 10.0)
        }
        DamageMetric::SmithWatsonTopper => (0.0, m.sigma_f.powi(2) / m.e, 100.0),
    };
    let equation = |y: f64| param - (elastic * (b * y).exp() + quadratic * (2.0 * b * y).exp());
    let root = newton(equation, (2.0 * initial).ln(), ROOT_TOLERANCE, ROOT_MAX_ITERATIONS);
    if !root.converged {
        debug!(param, residual = root.residual, "total life root did not converge");
    }
    root.x.exp() / 2.0
}

/// Grid over which the initiation table is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableGrid {
    /// (MPa) first nominal stress.
    #[serde(default = "default_sigma_min")]
    pub sigma_min: f64,
    /// (MPa) nominal stresses stay below this value.
    #[serde(default = "default_sigma_max")]
    pub sigma_max: f64,
    #[serde(default = "default_sigma_step")]
    pub sigma_step: f64,
    /// (m) smallest trial crack length.
    #[serde(default = "default_a_min")]
    pub a_min: f64,
    /// Growth exponent of the crack-length spacing.
    #[serde(default = "default_exponent")]
    pub exponent: f64,
    #[serde(default = "default_count")]
    pub count: usize,
    /// (m) specimen width.
    #[serde(default = "default_width")]
    pub width: f64,
}

fn default_sigma_min() -> f64 {
    50.0
}
fn default_sigma_max() -> f64 {
    500.0
}
fn default_sigma_step() -> f64 {
    10.0
}
fn default_a_min() -> f64 {
    5e-5
}
fn default_exponent() -> f64 {
    1.2
}
fn default_count() -> usize {
    100
}
fn default_width() -> f64 {
    10e-3
}

impl Default for TableGrid {
    fn default() -> Self {
        TableGrid {
            sigma_min: default_sigma_min(),
            sigma_max: default_sigma_max(),
            sigma_step: default_sigma_step(),
            a_min: default_a_min(),
            exponent: default_exponent(),
            count: default_count(),
            width: default_width(),
        }
    }
}

impl TableGrid {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if !(self.sigma_min > 0.0) || self.sigma_max <= self.sigma_min {
            return Err(ValidationError::new(&format!(
                "stress range must satisfy 0 < sigma_min < sigma_max, got [{}, {}]",
                self.sigma_min, self.sigma_max
            )));
        }
        if !(self.sigma_step > 0.0) {
            return Err(ValidationError::new(&format!("sigma_step must be greater than 0.0, got {}", self.sigma_step)));
        }
        if !(self.a_min > 0.0) || !(self.exponent > 0.0) {
            return Err(ValidationError::new("a_min and exponent must be greater than 0.0"));
        }
        if self.count < 2 {
            return Err(ValidationError::new(&format!("count must be at least 2, got {}", self.count)));
        }
        if !(self.width > 0.0) {
            return Err(ValidationError::new(&format!("width must be greater than 0.0, got {}", self.width)));
        }
        Ok(())
    }

    /// Nominal stresses `sigma_min, sigma_min + step, ...` below `sigma_max`.
    pub fn stresses(&self) -> Vec<f64> {
        let n = ((self.sigma_max - self.sigma_min) / self.sigma_step - 1e-9).ceil().max(0.0) as usize;
        (0..n).map(|i| self.sigma_min + i as f64 * self.sigma_step).collect()
    }

    /// Trial crack lengths `a_min (i + 1)^exponent`.
    pub fn crack_lengths(&self) -> Vec<f64> {
        (0..self.count).map(|i| self.a_min * ((i + 1) as f64).powf(self.exponent)).collect()
    }
}

/// Initiation life over (damage parameter, crack length).
#[derive(Debug, Clone, PartialEq)]
pub struct InitiationTable {
    pub crack_lengths: Vec<f64>,
    pub params: Vec<f64>,
    /// `lives[i][j]` for `params[i]` and `crack_lengths[j]`.
    pub lives: Vec<Vec<f64>>,
}

impl InitiationTable {
    /// Initiation life for one cell.
    pub fn cell_life(
        propagator: &Propagator<'_>,
        metric: DamageMetric,
        material: &MaterialProperties,
        param: f64,
        sigma: f64,
        a: f64,
        step: f64,
    ) -> f64 {
        let n_t = total_life(param, metric, material);
        if n_t > HIGH_CYCLE_LIMIT {
            return n_t;
        }
        let n_p = propagator.life(StressInput::Constant(sigma), a, step).cycles();
        (n_t - n_p).max(0.0)
    }

    pub fn as_grid(&self) -> Grid {
        Grid { x: self.crack_lengths.clone(), y: self.params.clone(), values: self.lives.clone() }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "{:.3e} ", 0.0)?;
        for a in &self.crack_lengths {
            write!(out, "{:.3e} ", a)?;
        }
        for (param, row) in self.params.iter().zip(&self.lives) {
            write!(out, "\n{:.3e} ", param)?;
            for life in row {
                write!(out, "{:.3e} ", life)?;
            }
        }
        writeln!(out)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_atomically(path.as_ref(), |out| self.write_to(out))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::TableFormat(format!("{}:{}: {}", path.display(), number + 1, e)))?;
            rows.push(row);
        }
        let mut rows = rows.into_iter();
        let header = rows.next().ok_or_else(|| Error::TableFormat(format!("{} is empty", path.display())))?;
        let crack_lengths = header[1..].to_vec();
        let mut params = Vec::new();
        let mut lives = Vec::new();
        for row in rows {
            if row.len() != header.len() {
                return Err(Error::TableFormat(format!(
                    "{}: row has {} columns, header has {}",
                    path.display(),
                    row.len(),
                    header.len()
                )));
            }
            params.push(row[0]);
            lives.push(row[1..].to_vec());
        }
        if crack_lengths.len() < 2 || params.len() < 2 {
            return Err(Error::TableFormat(format!("{}: table needs at least 2x2 cells", path.display())));
        }
        Ok(InitiationTable { crack_lengths, params, lives })
    }
}

/// Builds the initiation table for one metric and crack shape.
///
/// `step` is the crack-length increment of the propagation integration.
pub fn build_initiation_table(
    material: &MaterialProperties,
    metric: DamageMetric,
    shape: CrackShape,
    step: f64,
    grid: &TableGrid,
) -> InitiationTable {
    build_initiation_table_with_progress(material, metric, shape, step, grid, &AtomicUsize::new(0))
}

/// As [`build_initiation_table`], incrementing `progress` after each row.
pub fn build_initiation_table_with_progress(
    material: &MaterialProperties,
    metric: DamageMetric,
    shape: CrackShape,
    step: f64,
    grid: &TableGrid,
    progress: &AtomicUsize,
) -> InitiationTable {
    let stresses = grid.stresses();
    let crack_lengths = grid.crack_lengths();
    let propagator = Propagator::new(material, shape, grid.width);
    info!(%metric, %shape, rows = stresses.len(), columns = crack_lengths.len(), "building initiation table");

    let mut params = Vec::with_capacity(stresses.len());
    let mut lives = Vec::with_capacity(stresses.len());
    for (i, &sigma) in stresses.iter().enumerate() {
        let param = metric.uniaxial(sigma, material);
        let row = crack_lengths
            .iter()
            .map(|&a| InitiationTable::cell_life(&propagator, metric, material, param, sigma, a, step))
            .collect();
        params.push(param);
        lives.push(row);
        let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
        info!("{:.2}% completed", 100.0 * (i + 1) as f64 / stresses.len() as f64);
        debug!(done, sigma, param, "initiation row done");
    }
    InitiationTable { crack_lengths, params, lives }
}
