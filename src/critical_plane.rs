//! Critical-plane search for the Fatemi-Socie and Smith-Watson-Topper
//! damage parameters.
//!
//! At every field point the tensors are rotated by three Euler angles and the
//! orientation maximizing the parameter's driving term is taken as the
//! critical plane. The search is a bounded minimization of the negated term,
//! started from the unrotated frame; a local optimum is accepted as is.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::field::LoadingPair;
use crate::material::MaterialProperties;
use crate::optimize::{nelder_mead, NelderMeadOptions};
use crate::stress::{euler_rotation, SymTensor};

/// Multiaxial fatigue damage parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DamageMetric {
    #[serde(rename = "FS")]
    FatemiSocie,
    #[serde(rename = "SWT")]
    SmithWatsonTopper,
}

impl DamageMetric {
    pub fn tag(&self) -> &'static str {
        match self {
            DamageMetric::FatemiSocie => "FS",
            DamageMetric::SmithWatsonTopper => "SWT",
        }
    }

    /// Parameter value for a uniaxial stress `sigma`, with `eps = sigma / E`
    /// and `gamma = sigma / 2G`.
    pub fn uniaxial(&self, sigma: f64, material: &MaterialProperties) -> f64 {
        match self {
            DamageMetric::FatemiSocie => {
                let gamma = sigma / 2.0 / material.shear_modulus();
                gamma * (1.0 + material.fs_normal_weight() * sigma / 2.0 / material.sigma_y)
            }
            DamageMetric::SmithWatsonTopper => sigma * sigma / material.e,
        }
    }

    /// Negated driving term on the plane given by `angles`.
    pub fn objective(&self, angles: &Vector3<f64>, point: &PointState) -> f64 {
        let rotation = euler_rotation(angles);
        let strain_range = (point.strain_max - point.strain_min).rotated(&rotation);
        match self {
            DamageMetric::FatemiSocie => -strain_range.matrix()[(0, 1)],
            DamageMetric::SmithWatsonTopper => {
                let stress = point.stress_max.rotated(&rotation);
                -(stress.xx() * strain_range.xx() / 2.0)
            }
        }
    }
}

impl fmt::Display for DamageMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DamageMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FS" => Ok(DamageMetric::FatemiSocie),
            "SWT" => Ok(DamageMetric::SmithWatsonTopper),
            _ => Err(format!("metric must be FS or SWT, got {}", s)),
        }
    }
}

/// Tensors at one field point.
#[derive(Debug, Clone, Copy)]
pub struct PointState {
    pub stress_max: SymTensor,
    pub strain_max: SymTensor,
    pub strain_min: SymTensor,
}

/// Damage parameter along the field positions.
#[derive(Debug, Clone, Serialize)]
pub struct DamageProfile {
    pub metric: DamageMetric,
    pub values: Vec<f64>,
    /// Rotated normal stress entering the FS formula.
    pub normal_stress: Option<Vec<f64>>,
    pub angles: Vec<[f64; 3]>,
}

impl DamageProfile {
    /// Mean of the parameter over positions `0..=index`.
    pub fn mean_up_to(&self, index: usize) -> f64 {
        let end = (index + 1).min(self.values.len());
        self.values[..end].iter().sum::<f64>() / end as f64
    }
}

/// Solves the critical-plane problem at each field position.
#[derive(Debug, Clone)]
pub struct CriticalPlaneSolver<'m> {
    metric: DamageMetric,
    material: &'m MaterialProperties,
    options: NelderMeadOptions,
}

impl<'m> CriticalPlaneSolver<'m> {
    pub fn new(metric: DamageMetric, material: &'m MaterialProperties) -> Self {
        CriticalPlaneSolver { metric, material, options: NelderMeadOptions::default() }
    }

    pub fn with_options(mut self, options: NelderMeadOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns `(value, normal stress, angles)` at one point.
    pub fn solve_point(&self, point: &PointState) -> (f64, Option<f64>, Vector3<f64>) {
        let minimum = nelder_mead(
            |angles| self.metric.objective(angles, point),
            Vector3::zeros(),
            Vector3::repeat(-PI),
            Vector3::repeat(PI),
            &self.options,
        );
        if !minimum.converged {
            debug!(iterations = minimum.iterations, fun = minimum.fun, "critical plane search did not converge");
        }
        match self.metric {
            DamageMetric::SmithWatsonTopper => (-minimum.fun, None, minimum.x),
            DamageMetric::FatemiSocie => {
                let delta_gamma_max = -2.0 * minimum.fun;
                let stress = point.stress_max.rotated(&euler_rotation(&minimum.x));
                let sigma_n = stress.matrix()[(2, 2)];
                let k = self.material.fs_normal_weight();
                let fs = delta_gamma_max / 2.0 * (1.0 + k * sigma_n / self.material.sigma_y);
                (fs, Some(sigma_n), minimum.x)
            }
        }
    }

    pub fn solve(&self, pair: &LoadingPair) -> DamageProfile {
        let mut values = Vec::with_capacity(pair.len());
        let mut normal = Vec::new();
        let mut angles = Vec::with_capacity(pair.len());
        for j in 0..pair.len() {
            let (value, sigma_n, x) = self.solve_point(&pair.point(j));
            values.push(value);
            if let Some(s) = sigma_n {
                normal.push(s);
            }
            angles.push([x[0], x[1], x[2]]);
        }
        debug!(metric = %self.metric, points = values.len(), "damage profile computed");
        DamageProfile {
            metric: self.metric,
            values,
            normal_stress: (self.metric == DamageMetric::FatemiSocie).then_some(normal),
            angles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniaxial_point(sigma: f64, material: &MaterialProperties) -> PointState {
        let eps = sigma / material.e;
        let lateral = -material.nu * eps;
        PointState {
            stress_max: SymTensor::from_components([sigma, 0.0, 0.0, 0.0, 0.0, 0.0]),
            strain_max: SymTensor::from_components([eps, lateral, lateral, 0.0, 0.0, 0.0]),
            strain_min: SymTensor::from_components([-eps, -lateral, -lateral, 0.0, 0.0, 0.0]),
        }
    }

    #[test]
    fn test_swt_uniaxial() {
        let mat = MaterialProperties::aluminium_7075_t651();
        let sigma = 200.0;
        let point = uniaxial_point(sigma, &mat);
        let (swt, normal, _) = CriticalPlaneSolver::new(DamageMetric::SmithWatsonTopper, &mat).solve_point(&point);
        assert!(normal.is_none());
        // sigma_max * delta_eps / 2 with delta_eps = 2 sigma / E
        assert_relative_eq!(swt, sigma * sigma / mat.e, max_relative = 1e-6);
    }

    #[test]
    fn test_fs_shear_range() {
        let mat = MaterialProperties::aluminium_7075_t651();
        let point = uniaxial_point(200.0, &mat);
        let solver = CriticalPlaneSolver::new(DamageMetric::FatemiSocie, &mat);
        let (fs, normal, angles) = solver.solve_point(&point);
        let range = (point.strain_max - point.strain_min).principal_values();
        let max_shear = (range[0] - range[2]) / 2.0;
        let delta_gamma = -2.0 * DamageMetric::FatemiSocie.objective(&angles, &point);
        assert_relative_eq!(delta_gamma / 2.0, max_shear, max_relative = 1e-5);
        let sigma_n = normal.unwrap();
        let expected = max_shear * (1.0 + mat.fs_normal_weight() * sigma_n / mat.sigma_y);
        assert_relative_eq!(fs, expected, max_relative = 1e-9);
    }

    #[test]
    fn test_fs_normal_stress_on_critical_plane() {
        let mat = MaterialProperties::aluminium_7075_t651();
        let mut point = uniaxial_point(200.0, &mat);
        // a transverse stress that no 45 degree shear plane sees unchanged
        point.stress_max = SymTensor::from_components([200.0, 0.0, 150.0, 0.0, 0.0, 0.0]);
        let solver = CriticalPlaneSolver::new(DamageMetric::FatemiSocie, &mat);
        let (_, normal, angles) = solver.solve_point(&point);
        let sigma_n = normal.unwrap();
        let rotated = point.stress_max.rotated(&euler_rotation(&angles)).matrix()[(2, 2)];
        assert_relative_eq!(sigma_n, rotated, max_relative = 1e-12);
        assert!((sigma_n - point.stress_max.matrix()[(2, 2)]).abs() > 1.0);
    }

    #[test]
    fn test_profile_mean() {
        let profile = DamageProfile {
            metric: DamageMetric::SmithWatsonTopper,
            values: vec![4.0, 2.0, 0.0, 10.0],
            normal_stress: None,
            angles: vec![[0.0; 3]; 4],
        };
        assert_eq!(profile.mean_up_to(0), 4.0);
        assert_eq!(profile.mean_up_to(2), 2.0);
        assert_eq!(profile.mean_up_to(10), 4.0);
    }

    #[test]
    fn test_metric_tags() {
        assert_eq!("FS".parse::<DamageMetric>(), Ok(DamageMetric::FatemiSocie));
        assert_eq!(DamageMetric::SmithWatsonTopper.to_string(), "SWT");
        assert!("XX".parse::<DamageMetric>().is_err());
    }

    #[test]
    fn test_uniaxial_forms() {
        let mat = MaterialProperties::aluminium_7075_t651();
        let sigma = 300.0;
        assert_relative_eq!(DamageMetric::SmithWatsonTopper.uniaxial(sigma, &mat), sigma * sigma / mat.e);
        let gamma = sigma / (2.0 * mat.shear_modulus());
        let fs = gamma * (1.0 + mat.sigma_y / mat.sigma_f * sigma / (2.0 * mat.sigma_y));
        assert_relative_eq!(DamageMetric::FatemiSocie.uniaxial(sigma, &mat), fs, max_relative = 1e-12);
    }
}
