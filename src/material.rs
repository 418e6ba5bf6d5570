//! Material constants for crack initiation and propagation.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::ValidationError;
use crate::error::{Error, Result};

/// Material constants as they come from a configuration file.
///
/// Every field is optional so that an incomplete material can be reported
/// field by field instead of failing deserialization as a whole.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct MaterialInput {
    /// Name of the material, for reporting only.
    pub name: Option<String>,
    /// Growth-law coefficient.
    #[serde(rename = "C")]
    pub c: Option<f64>,
    /// Growth-law exponent.
    pub n: Option<f64>,
    /// Kitagawa-Takahashi fitting exponent.
    pub f: Option<f64>,
    /// (m) distance from the surface to the first microstructural barrier.
    pub l_0: Option<f64>,
    /// (MPa m^0.5) long-crack growth threshold.
    #[serde(rename = "K_th")]
    pub k_th: Option<f64>,
    /// (MPa) fatigue limit.
    pub sigma_fl: Option<f64>,
    /// (MPa m^0.5) fracture toughness.
    #[serde(rename = "K_IC")]
    pub k_ic: Option<f64>,
    /// (MPa) yield stress.
    pub sigma_y: Option<f64>,
    /// (MPa) fatigue strength coefficient.
    pub sigma_f: Option<f64>,
    /// (MPa) Young's modulus.
    #[serde(rename = "E")]
    pub e: Option<f64>,
    /// Poisson's ratio.
    pub nu: Option<f64>,
    /// Fatigue strength exponent.
    pub b: Option<f64>,
}

/// Fully populated material constants.
///
/// The shear modulus and the El Haddad parameter are derived on every call
/// and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialProperties {
    pub name: String,
    pub c: f64,
    pub n: f64,
    pub f: f64,
    pub l_0: f64,
    pub k_th: f64,
    pub sigma_fl: f64,
    pub k_ic: f64,
    pub sigma_y: f64,
    pub sigma_f: f64,
    pub e: f64,
    pub nu: f64,
    pub b: f64,
}

fn required(value: Option<f64>, name: &str) -> Result<f64> {
    value.ok_or_else(|| Error::MaterialMissing(name.to_owned()))
}

impl TryFrom<&MaterialInput> for MaterialProperties {
    type Error = Error;

    fn try_from(input: &MaterialInput) -> Result<Self> {
        let material = MaterialProperties {
            name: input.name.clone().unwrap_or_else(|| "unnamed".to_owned()),
            c: required(input.c, "C")?,
            n: required(input.n, "n")?,
            f: required(input.f, "f")?,
            l_0: required(input.l_0, "l_0")?,
            k_th: required(input.k_th, "K_th")?,
            sigma_fl: required(input.sigma_fl, "sigma_fl")?,
            k_ic: required(input.k_ic, "K_IC")?,
            sigma_y: required(input.sigma_y, "sigma_y")?,
            sigma_f: required(input.sigma_f, "sigma_f")?,
            e: required(input.e, "E")?,
            nu: required(input.nu, "nu")?,
            b: required(input.b, "b")?,
        };
        material.validate()?;
        Ok(material)
    }
}

impl MaterialProperties {
    /// Aluminium 7075-T651.
    pub fn aluminium_7075_t651() -> Self {
        MaterialProperties {
            name: "Al 7075-T651".to_owned(),
            c: 8.83e-11,
            n: 3.322,
            f: 2.5,
            l_0: 25e-6,
            k_th: 2.2,
            sigma_fl: 169.0,
            k_ic: 29.0,
            sigma_y: 503.0,
            sigma_f: 1610.0,
            e: 71000.0,
            nu: 0.33,
            b: -0.1553,
        }
    }

    /// (MPa) shear modulus, `E / (2 (1 + nu))`.
    pub fn shear_modulus(&self) -> f64 {
        self.e / (2.0 * (1.0 + self.nu))
    }

    /// (m) El Haddad short-crack parameter, `(K_th / sigma_fl)^2 / pi`.
    pub fn el_haddad_length(&self) -> f64 {
        (self.k_th / self.sigma_fl).powi(2) / PI
    }

    /// Ratio `sigma_y / sigma_f` weighting the normal stress in Fatemi-Socie.
    pub fn fs_normal_weight(&self) -> f64 {
        self.sigma_y / self.sigma_f
    }

    /// Validates that the constants are physically meaningful.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let positive = [
            ("C", self.c),
            ("n", self.n),
            ("f", self.f),
            ("l_0", self.l_0),
            ("K_th", self.k_th),
            ("sigma_fl", self.sigma_fl),
            ("K_IC", self.k_ic),
            ("sigma_y", self.sigma_y),
            ("sigma_f", self.sigma_f),
            ("E", self.e),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ValidationError::new(&format!("{} must be greater than 0.0, got {}", name, value)));
            }
        }
        if !(0.0..0.5).contains(&self.nu) {
            return Err(ValidationError::new(&format!("nu must be in [0.0, 0.5), got {}", self.nu)));
        }
        if self.b >= 0.0 {
            return Err(ValidationError::new(&format!("b must be negative, got {}", self.b)));
        }
        if self.k_ic <= self.k_th {
            return Err(ValidationError::new(&format!(
                "K_IC must exceed K_th, got K_IC = {} and K_th = {}",
                self.k_ic, self.k_th
            )));
        }
        Ok(())
    }
}
