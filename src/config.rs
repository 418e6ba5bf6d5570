//! Configuration of a life-estimation run.
//!
//! A configuration is read from YAML or TOML, chosen by file extension, and
//! validated section by section before anything is computed.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::critical_plane::DamageMetric;
use crate::error::Result;
use crate::field::ExperimentSource;
use crate::initiation::TableGrid;
use crate::interpolate::InterpolationMethod;
use crate::material::{MaterialInput, MaterialProperties};
use crate::shape::CrackShape;

/// Represents an error that can occur during validation of configuration data.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a given message.
    pub fn new(message: &str) -> ValidationError {
        ValidationError { message: message.to_owned() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Represents the configuration for a life-estimation session.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub material: MaterialInput,
    pub solution: Solution,
    pub table: TableConfig,
    pub experiments: ExperimentSource,
    pub output: OutputConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

impl Config {
    /// Validates every section except the material, which is checked when
    /// converted by [`Config::material_properties`].
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.solution.validate()?;
        self.table.validate()?;
        self.experiments.validate()?;
        self.output.validate()?;
        Ok(())
    }

    /// Material constants with all fields present and valid.
    pub fn material_properties(&self) -> Result<MaterialProperties> {
        MaterialProperties::try_from(&self.material)
    }

    /// Initiation table file for the configured metric and shape.
    pub fn table_file(&self) -> PathBuf {
        self.table.file(self.solution.metric, self.solution.shape)
    }
}

/// Damage model and crack geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct Solution {
    /// `FS` or `SWT`.
    pub metric: DamageMetric,
    /// `PLANAR` or `ELLIPTICAL`.
    pub shape: CrackShape,
    /// (m) specimen width used by the weight function.
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default)]
    pub interpolation: InterpolationMethod,
}

fn default_width() -> f64 {
    10e-3
}

impl Solution {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if !(self.width > 0.0) {
            return Err(ValidationError::new(&format!("width must be greater than 0.0, got {}", self.width)));
        }
        Ok(())
    }
}

/// Where initiation tables are stored and how they are built.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Directory holding one sub-directory per crack shape.
    pub path: String,
    /// (m) crack-length increment of the propagation integration.
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default)]
    pub grid: TableGrid,
}

fn default_step() -> f64 {
    1e-5
}

impl TableConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::new("table path must not be empty"));
        }
        if !(self.step > 0.0) {
            return Err(ValidationError::new(&format!("step must be greater than 0.0, got {}", self.step)));
        }
        self.grid.validate()
    }

    /// `<path>/<shape>/MAT_<metric>.dat`
    pub fn file(&self, metric: DamageMetric, shape: CrackShape) -> PathBuf {
        Path::new(&self.path).join(shape.dir_name()).join(format!("MAT_{}.dat", metric.tag()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `<metric>/<exp_id>.dat` curves.
    pub path: String,
    /// Aggregate file name inside `path`.
    #[serde(default = "default_aggregate")]
    pub aggregate: String,
}

fn default_aggregate() -> String {
    "results.dat".to_owned()
}

impl OutputConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.path.trim().is_empty() || self.aggregate.trim().is_empty() {
            return Err(ValidationError::new("output path and aggregate file must not be empty"));
        }
        Ok(())
    }

    pub fn result_file(&self, metric: DamageMetric, experiment: &str) -> PathBuf {
        Path::new(&self.path).join(metric.tag()).join(format!("{}.dat", experiment))
    }

    pub fn aggregate_file(&self) -> PathBuf {
        Path::new(&self.path).join(&self.aggregate)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsConfig {
    /// Experiments left out of the statistics.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Loads a configuration from a YAML (`.yaml`, `.yml`) or TOML (`.toml`)
/// file and validates it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: Config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&contents)?,
        _ => serde_yaml::from_str(&contents)?,
    };
    config.validate()?;
    Ok(config)
}
