//! Interpolation over a rectilinear grid of initiation lives.
//!
//! Queries outside the grid are extrapolated from the boundary cells rather
//! than rejected; callers that care should check [`Grid::contains`].

use serde::Deserialize;

/// Values on a rectilinear grid, `values[row][col]` at `(x[col], y[row])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl Grid {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let inside = |axis: &[f64], v: f64| match (axis.first(), axis.last()) {
            (Some(lo), Some(hi)) => (*lo..=*hi).contains(&v),
            _ => false,
        };
        inside(&self.x, x) && inside(&self.y, y)
    }
}

/// Interpolation method selectable from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterpolationMethod {
    Linear,
    #[default]
    Cubic,
}

impl InterpolationMethod {
    pub fn build(&self, grid: &Grid) -> Box<dyn InterpolationStrategy + Send + Sync> {
        match self {
            InterpolationMethod::Linear => Box::new(Bilinear::new(grid)),
            InterpolationMethod::Cubic => Box::new(BicubicSpline::new(grid)),
        }
    }
}

pub trait InterpolationStrategy {
    fn interpolate(&self, x: f64, y: f64) -> f64;
}

/// Index `i` of the cell `[axis[i], axis[i + 1]]` used for `v`, clamped to
/// the first or last cell outside the axis.
fn cell(axis: &[f64], v: f64) -> usize {
    let last = axis.len().saturating_sub(2);
    match axis.iter().position(|&a| a > v) {
        Some(0) => 0,
        Some(i) => (i - 1).min(last),
        None => last,
    }
}

fn linear_1d(axis: &[f64], values: &[f64], v: f64) -> f64 {
    if axis.len() == 1 {
        return values[0];
    }
    let i = cell(axis, v);
    let t = (v - axis[i]) / (axis[i + 1] - axis[i]);
    values[i] + t * (values[i + 1] - values[i])
}

pub struct Bilinear {
    grid: Grid,
}

impl Bilinear {
    pub fn new(grid: &Grid) -> Self {
        Bilinear { grid: grid.clone() }
    }
}

impl InterpolationStrategy for Bilinear {
    fn interpolate(&self, x: f64, y: f64) -> f64 {
        let column: Vec<f64> = self.grid.values.iter().map(|row| linear_1d(&self.grid.x, row, x)).collect();
        linear_1d(&self.grid.y, &column, y)
    }
}

/// Natural cubic spline through `(axis, values)`.
#[derive(Debug, Clone)]
struct Spline {
    axis: Vec<f64>,
    values: Vec<f64>,
    second: Vec<f64>,
}

impl Spline {
    fn new(axis: &[f64], values: &[f64]) -> Self {
        let n = axis.len();
        let mut second = vec![0.0; n];
        if n > 2 {
            // tridiagonal system for the interior second derivatives
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            let mut upper = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = axis[i] - axis[i - 1];
                let h1 = axis[i + 1] - axis[i];
                let lower = h0 / 6.0;
                diag[i] = (h0 + h1) / 3.0;
                upper[i] = h1 / 6.0;
                rhs[i] = (values[i + 1] - values[i]) / h1 - (values[i] - values[i - 1]) / h0;
                if i > 1 {
                    let factor = lower / diag[i - 1];
                    diag[i] -= factor * upper[i - 1];
                    rhs[i] -= factor * rhs[i - 1];
                }
            }
            for i in (1..n - 1).rev() {
                second[i] = (rhs[i] - upper[i] * second[i + 1]) / diag[i];
            }
        }
        Spline { axis: axis.to_vec(), values: values.to_vec(), second }
    }

    fn eval(&self, v: f64) -> f64 {
        if self.axis.len() < 2 {
            return self.values.first().copied().unwrap_or(0.0);
        }
        let i = cell(&self.axis, v);
        let h = self.axis[i + 1] - self.axis[i];
        let a = (self.axis[i + 1] - v) / h;
        let b = (v - self.axis[i]) / h;
        a * self.values[i]
            + b * self.values[i + 1]
            + ((a * a * a - a) * self.second[i] + (b * b * b - b) * self.second[i + 1]) * h * h / 6.0
    }
}

/// Tensor-product natural cubic spline: along `x` within each row, then
/// along `y` through the row results.
pub struct BicubicSpline {
    y: Vec<f64>,
    rows: Vec<Spline>,
}

impl BicubicSpline {
    pub fn new(grid: &Grid) -> Self {
        let rows = grid.values.iter().map(|row| Spline::new(&grid.x, row)).collect();
        BicubicSpline { y: grid.y.clone(), rows }
    }
}

impl InterpolationStrategy for BicubicSpline {
    fn interpolate(&self, x: f64, y: f64) -> f64 {
        let column: Vec<f64> = self.rows.iter().map(|row| row.eval(x)).collect();
        Spline::new(&self.y, &column).eval(y)
    }
}
