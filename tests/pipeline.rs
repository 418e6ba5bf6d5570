use std::fs;
use std::path::Path;

use notchlife::app_logic::{run_estimate, run_stats, run_table};
use notchlife::report::read_aggregate;

fn write_config(dir: &Path) -> String {
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data");
    let text = format!(
        r#"
material:
  C: 8.83e-11
  n: 3.322
  f: 2.5
  l_0: 25.0e-6
  K_th: 2.2
  sigma_fl: 169.0
  K_IC: 29.0
  sigma_y: 503.0
  sigma_f: 1610.0
  E: 71000.0
  nu: 0.33
  b: -0.1553
solution:
  metric: SWT
  shape: PLANAR
table:
  path: {tables}
  step: 2.0e-5
  grid:
    sigma_min: 150.0
    sigma_max: 460.0
    sigma_step: 50.0
    count: 12
experiments:
  path: {data}
  tension_prefix: TENSOR_TRACCION_
  compression_prefix: TENSOR_COMPRESION_
  parse_config:
    position_scale: -1.0e-3
output:
  path: {results}
"#,
        tables = dir.join("tables").display(),
        data = data.display(),
        results = dir.join("results").display(),
    );
    let path = dir.join("config.yaml");
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_table_estimate_and_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    run_table(&config).unwrap();
    let table = dir.path().join("tables").join("planar").join("MAT_SWT.dat");
    assert!(table.exists());

    let estimates = run_estimate(&config, &[], false).unwrap();
    assert_eq!(estimates.len(), 1);
    let estimate = &estimates[0];
    assert_eq!(estimate.experiment, "demo");
    let gov = estimate.governing_point();
    assert!(estimate.curve.iter().all(|p| gov.total <= p.total));

    let curve = fs::read_to_string(dir.path().join("results").join("SWT").join("demo.dat")).unwrap();
    assert!(curve.starts_with("a_i\tN_t\tN_i\tN_p\tN_a\n"));
    assert_eq!(curve.lines().count(), estimate.curve.len() + 1);

    // a second run replaces the aggregate row instead of duplicating it
    run_estimate(&config, &["demo".to_owned()], false).unwrap();
    let rows = read_aggregate(&dir.path().join("results").join("results.dat")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].param, "SWT");

    let lives = dir.path().join("lives.csv");
    fs::write(&lives, "demo,48200,52600\n").unwrap();
    let stats = run_stats(&config, &lives.to_string_lossy(), false).unwrap();
    assert_eq!(stats.pairs, 2);
    assert!(stats.mean_ratio > 0.0);
}

#[test]
fn test_estimate_without_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert!(run_estimate(&config, &[], false).is_err());
}

#[test]
fn test_missing_requested_experiment_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    run_table(&config).unwrap();

    let ids = ["demo".to_owned(), "absent".to_owned()];
    assert!(run_estimate(&config, &ids, false).is_err());
    let results = dir.path().join("results");
    assert!(!results.join("SWT").join("demo.dat").exists());
    assert!(!results.join("results.dat").exists());
}
