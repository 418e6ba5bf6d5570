//! Result files.
//!
//! Every file is written into a temporary file next to its destination and
//! renamed over it once complete, so an interrupted run never leaves a
//! truncated result behind.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::estimator::LifeEstimate;

/// Writes `path` through a temporary file in the same directory.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let file = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(file.as_file());
        write(&mut out)?;
        out.flush()?;
    }
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    debug!(path = %path.display(), "file written");
    Ok(())
}

/// Crack-growth curve of one experiment, `a_i` in mm.
pub fn write_curve(path: &Path, estimate: &LifeEstimate) -> Result<()> {
    write_atomically(path, |out| {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
        writer.write_record(["a_i", "N_t", "N_i", "N_p", "N_a"])?;
        for p in &estimate.curve {
            writer.write_record([
                format!("{:.3}", p.a * 1e3),
                format!("{:.6e}", p.total),
                format!("{:.6e}", p.initiation),
                format!("{:.6e}", p.propagation_cycles()),
                format!("{:.6e}", p.growth),
            ])?;
        }
        writer.flush()
    })
}

/// One line of the aggregate results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub exp_id: String,
    pub param: String,
    #[serde(rename = "N_t_min")]
    pub n_t_min: f64,
    #[serde(rename = "N_i_min")]
    pub n_i_min: f64,
    #[serde(rename = "N_p_min")]
    pub n_p_min: f64,
    #[serde(rename = "%N_i")]
    pub pct_initiation: f64,
    #[serde(rename = "%N_p")]
    pub pct_propagation: f64,
    #[serde(rename = "a_inic(mm)")]
    pub a_initiation_mm: f64,
}

impl From<&LifeEstimate> for AggregateRow {
    fn from(estimate: &LifeEstimate) -> Self {
        let p = estimate.governing_point();
        let (pct_initiation, pct_propagation) = estimate.fractions();
        AggregateRow {
            exp_id: estimate.experiment.clone(),
            param: estimate.metric.tag().to_owned(),
            n_t_min: p.total,
            n_i_min: p.initiation,
            n_p_min: p.propagation_cycles(),
            pct_initiation,
            pct_propagation,
            a_initiation_mm: p.a * 1e3,
        }
    }
}

/// Reads the aggregate file; a missing file has no rows.
pub fn read_aggregate(path: &Path) -> Result<Vec<AggregateRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<AggregateRow>, _>>()?;
    Ok(rows)
}

/// Replaces the rows keyed like `rows` and appends them at the end.
pub fn update_aggregate(path: &Path, rows: &[AggregateRow]) -> Result<()> {
    let mut existing = read_aggregate(path)?;
    existing.retain(|old| !rows.iter().any(|new| new.exp_id == old.exp_id && new.param == old.param));
    existing.extend(rows.iter().cloned());
    write_atomically(path, |out| {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
        for row in &existing {
            writer.serialize(row)?;
        }
        writer.flush()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, param: &str, n_t: f64) -> AggregateRow {
        AggregateRow {
            exp_id: id.into(),
            param: param.into(),
            n_t_min: n_t,
            n_i_min: 0.75 * n_t,
            n_p_min: 0.25 * n_t,
            pct_initiation: 75.0,
            pct_propagation: 25.0,
            a_initiation_mm: 0.15,
        }
    }

    #[test]
    fn test_aggregate_replaces_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.dat");
        update_aggregate(&path, &[row("e1", "SWT", 1e5), row("e2", "SWT", 2e5)]).unwrap();
        update_aggregate(&path, &[row("e1", "FS", 3e5)]).unwrap();
        update_aggregate(&path, &[row("e1", "SWT", 4e5)]).unwrap();

        let rows = read_aggregate(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], row("e2", "SWT", 2e5));
        assert_eq!(rows[1], row("e1", "FS", 3e5));
        assert_eq!(rows[2], row("e1", "SWT", 4e5));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("exp_id\tparam\tN_t_min\tN_i_min\tN_p_min\t%N_i\t%N_p\ta_inic(mm)\n"));
    }

    #[test]
    fn test_missing_aggregate_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_aggregate(&dir.path().join("none.dat")).unwrap().is_empty());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.dat");
        write_atomically(&path, |out| writeln!(out, "first")).unwrap();
        write_atomically(&path, |out| writeln!(out, "second")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let failed = write_atomically(&path, |_| Err(std::io::Error::new(std::io::ErrorKind::Other, "boom")));
        assert!(failed.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    }
}
