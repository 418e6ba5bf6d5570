//! Stress/strain fields along the prospective crack path.
//!
//! A field file has one header line followed by rows whose last twelve
//! columns are `sxx syy szz sxy sxz syz exx eyy ezz exy exz eyz`. The position
//! column and its scale come from [`FieldParseConfig`].

use regex::Regex;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ValidationError;
use crate::critical_plane::PointState;
use crate::error::{Error, Result};
use crate::stress::SymTensor;

/// Positions closer than this are the same grid point (m).
pub const POSITION_TOLERANCE: f64 = 1e-9;

const TENSOR_COLUMNS: usize = 12;

#[derive(Debug, Clone, Deserialize)]
pub struct FieldParseConfig {
    #[serde(default = "default_header")]
    pub header: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Position column; defaults to the column just before the tensors.
    #[serde(default)]
    pub position_column: Option<usize>,
    /// Factor turning the position column into meters from the surface.
    #[serde(default = "default_scale")]
    pub position_scale: f64,
}

fn default_header() -> usize {
    1
}

fn default_delimiter() -> String {
    " ".to_owned()
}

fn default_scale() -> f64 {
    1.0
}

impl Default for FieldParseConfig {
    fn default() -> Self {
        FieldParseConfig {
            header: default_header(),
            delimiter: default_delimiter(),
            position_column: None,
            position_scale: default_scale(),
        }
    }
}

impl FieldParseConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.delimiter.is_empty() {
            return Err(ValidationError::new("delimiter must not be empty"));
        }
        if self.position_scale == 0.0 || !self.position_scale.is_finite() {
            return Err(ValidationError::new(&format!("position_scale must be finite and non-zero, got {}", self.position_scale)));
        }
        Ok(())
    }

    fn split<'l>(&self, line: &'l str) -> Vec<&'l str> {
        if self.delimiter.trim().is_empty() {
            line.split_whitespace().collect()
        } else {
            line.split(self.delimiter.as_str()).map(str::trim).filter(|s| !s.is_empty()).collect()
        }
    }
}

/// Field under one loading extreme, ordered by distance from the surface.
#[derive(Debug, Clone)]
pub struct FieldSample {
    pub positions: Vec<f64>,
    pub stress: Vec<SymTensor>,
    pub strain: Vec<SymTensor>,
}

impl FieldSample {
    /// Builds a sample, shifting positions to start at zero.
    pub fn new(positions: Vec<f64>, stress: Vec<SymTensor>, strain: Vec<SymTensor>) -> Result<Self> {
        if positions.len() < 3 {
            return Err(Error::FieldFormat(format!("at least 3 positions are required, got {}", positions.len())));
        }
        if positions.len() != stress.len() || positions.len() != strain.len() {
            return Err(Error::FieldFormat("positions, stresses and strains differ in length".into()));
        }
        let origin = positions[0];
        let positions: Vec<f64> = positions.into_iter().map(|x| x - origin).collect();
        if let Some(w) = positions.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::FieldFormat(format!("positions must increase, got {} after {}", w[1], w[0])));
        }
        Ok(FieldSample { positions, stress, strain })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Normal stress `s_xx` along the path.
    pub fn sxx(&self) -> Vec<f64> {
        self.stress.iter().map(SymTensor::xx).collect()
    }

    pub fn read<P: AsRef<Path>>(path: P, config: &FieldParseConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut positions = Vec::new();
        let mut stress = Vec::new();
        let mut strain = Vec::new();

        for (number, line) in reader.lines().enumerate().skip(config.header) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let values: Vec<f64> = config
                .split(&line)
                .iter()
                .map(|s| s.parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::FieldFormat(format!("{}:{}: {}", path.display(), number + 1, e)))?;
            if values.len() < TENSOR_COLUMNS + 1 {
                return Err(Error::FieldFormat(format!(
                    "{}:{}: expected at least {} columns, got {}",
                    path.display(),
                    number + 1,
                    TENSOR_COLUMNS + 1,
                    values.len()
                )));
            }
            let first_tensor = values.len() - TENSOR_COLUMNS;
            let column = config.position_column.unwrap_or(first_tensor - 1);
            let x = values.get(column).ok_or_else(|| {
                Error::FieldFormat(format!("{}:{}: no position column {}", path.display(), number + 1, column))
            })?;
            let mut s = [0.0; 6];
            let mut e = [0.0; 6];
            s.copy_from_slice(&values[first_tensor..first_tensor + 6]);
            e.copy_from_slice(&values[first_tensor + 6..]);
            positions.push(x * config.position_scale);
            stress.push(SymTensor::from_components(s));
            strain.push(SymTensor::from_components(e));
        }
        debug!(path = %path.display(), rows = positions.len(), "field file read");
        FieldSample::new(positions, stress, strain)
    }
}

/// Tension and compression fields of one experiment on a shared grid.
#[derive(Debug, Clone)]
pub struct LoadingPair {
    pub tension: FieldSample,
    pub compression: FieldSample,
}

impl LoadingPair {
    pub fn new(tension: FieldSample, compression: FieldSample) -> Result<Self> {
        if tension.len() != compression.len() {
            return Err(Error::FieldMismatch(format!(
                "tension has {} positions, compression has {}",
                tension.len(),
                compression.len()
            )));
        }
        let mismatch = tension
            .positions
            .iter()
            .zip(&compression.positions)
            .position(|(a, b)| (a - b).abs() > POSITION_TOLERANCE);
        if let Some(i) = mismatch {
            return Err(Error::FieldMismatch(format!(
                "position {} differs: {} vs {}",
                i, tension.positions[i], compression.positions[i]
            )));
        }
        Ok(LoadingPair { tension, compression })
    }

    pub fn len(&self) -> usize {
        self.tension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tension.is_empty()
    }

    pub fn positions(&self) -> &[f64] {
        &self.tension.positions
    }

    pub fn point(&self, j: usize) -> PointState {
        PointState {
            stress_max: self.tension.stress[j],
            strain_max: self.tension.strain[j],
            strain_min: self.compression.strain[j],
        }
    }
}

/// Where the field files of the experiments live and how they are named.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentSource {
    pub path: String,
    pub tension_prefix: String,
    pub compression_prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Experiments to run; discovered from the tension files when empty.
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub parse_config: FieldParseConfig,
}

fn default_extension() -> String {
    "dat".to_owned()
}

impl ExperimentSource {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::new("experiments path must not be empty"));
        }
        if self.tension_prefix.is_empty() || self.compression_prefix.is_empty() {
            return Err(ValidationError::new("tension_prefix and compression_prefix must not be empty"));
        }
        if self.tension_prefix == self.compression_prefix {
            return Err(ValidationError::new("tension_prefix and compression_prefix must differ"));
        }
        self.parse_config.validate()
    }

    pub fn tension_file(&self, id: &str) -> PathBuf {
        Path::new(&self.path).join(format!("{}{}.{}", self.tension_prefix, id, self.extension))
    }

    pub fn compression_file(&self, id: &str) -> PathBuf {
        Path::new(&self.path).join(format!("{}{}.{}", self.compression_prefix, id, self.extension))
    }

    /// Experiment ids with both a tension and a compression file, sorted.
    pub fn discover(&self) -> Result<Vec<String>> {
        let pattern = format!("^{}(.+)\\.{}$", regex::escape(&self.tension_prefix), regex::escape(&self.extension));
        let re = Regex::new(&pattern).map_err(|e| Error::Validation(ValidationError::new(&e.to_string())))?;
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(caps) = re.captures(&name) {
                let id = caps[1].to_owned();
                if self.compression_file(&id).exists() {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Configured ids, or the discovered ones when none are configured.
    pub fn experiment_ids(&self) -> Result<Vec<String>> {
        if self.ids.is_empty() {
            self.discover()
        } else {
            Ok(self.ids.clone())
        }
    }

    pub fn load(&self, id: &str) -> Result<LoadingPair> {
        let tension = self.tension_file(id);
        let compression = self.compression_file(id);
        for file in [&tension, &compression] {
            if !file.exists() {
                return Err(Error::ExperimentMissing(format!("{}: {} not found", id, file.display())));
            }
        }
        LoadingPair::new(
            FieldSample::read(&tension, &self.parse_config)?,
            FieldSample::read(&compression, &self.parse_config)?,
        )
    }
}
