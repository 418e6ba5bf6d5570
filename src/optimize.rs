//! Small numerical solvers: a box-bounded Nelder-Mead minimizer and a damped
//! Newton root finder.
//!
//! Neither solver reports failure as an error. The result carries a
//! `converged` flag and callers decide whether to look at it.

use nalgebra::SVector;

/// Settings for [`nelder_mead`].
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    /// Edge length of the initial simplex.
    pub initial_step: f64,
    /// Convergence on simplex size.
    pub xatol: f64,
    /// Convergence on the spread of function values.
    pub fatol: f64,
    pub max_iterations: usize,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        NelderMeadOptions { initial_step: 0.25, xatol: 1e-9, fatol: 1e-16, max_iterations: 2000 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Minimum<const N: usize> {
    pub x: SVector<f64, N>,
    pub fun: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn clamp<const N: usize>(x: SVector<f64, N>, lower: &SVector<f64, N>, upper: &SVector<f64, N>) -> SVector<f64, N> {
    SVector::<f64, N>::from_fn(|i, _| x[i].clamp(lower[i], upper[i]))
}

/// Minimizes `f` inside the box `[lower, upper]` starting from `x0`.
///
/// Trial points are projected onto the box, so the returned point is always
/// feasible.
pub fn nelder_mead<const N: usize, F>(
    f: F,
    x0: SVector<f64, N>,
    lower: SVector<f64, N>,
    upper: SVector<f64, N>,
    options: &NelderMeadOptions,
) -> Minimum<N>
where
    F: Fn(&SVector<f64, N>) -> f64,
{
    let x0 = clamp(x0, &lower, &upper);
    let mut simplex: Vec<(SVector<f64, N>, f64)> = Vec::with_capacity(N + 1);
    simplex.push((x0, f(&x0)));
    for i in 0..N {
        let mut x = x0;
        // step away from the bound that is closer
        if x[i] + options.initial_step <= upper[i] {
            x[i] += options.initial_step;
        } else {
            x[i] -= options.initial_step;
        }
        let x = clamp(x, &lower, &upper);
        simplex.push((x, f(&x)));
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < options.max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0];
        let spread_f = simplex.iter().map(|(_, v)| (v - best.1).abs()).fold(0.0, f64::max);
        let spread_x = simplex.iter().map(|(x, _)| (x - best.0).amax()).fold(0.0, f64::max);
        if spread_f <= options.fatol || spread_x <= options.xatol {
            converged = true;
            break;
        }
        iterations += 1;

        let worst = simplex[N];
        let centroid = simplex[..N].iter().fold(SVector::<f64, N>::zeros(), |acc, (x, _)| acc + x) / N as f64;

        let reflected = clamp(centroid + (centroid - worst.0), &lower, &upper);
        let f_reflected = f(&reflected);
        if f_reflected < best.1 {
            let expanded = clamp(centroid + 2.0 * (centroid - worst.0), &lower, &upper);
            let f_expanded = f(&expanded);
            simplex[N] = if f_expanded < f_reflected { (expanded, f_expanded) } else { (reflected, f_reflected) };
            continue;
        }
        if f_reflected < simplex[N - 1].1 {
            simplex[N] = (reflected, f_reflected);
            continue;
        }
        let contracted = if f_reflected < worst.1 {
            clamp(centroid + 0.5 * (reflected - centroid), &lower, &upper)
        } else {
            clamp(centroid + 0.5 * (worst.0 - centroid), &lower, &upper)
        };
        let f_contracted = f(&contracted);
        if f_contracted < worst.1.min(f_reflected) {
            simplex[N] = (contracted, f_contracted);
            continue;
        }
        // shrink towards the best vertex
        for vertex in simplex.iter_mut().skip(1) {
            let x = best.0 + 0.5 * (vertex.0 - best.0);
            *vertex = (x, f(&x));
        }
    }
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    Minimum { x: simplex[0].0, fun: simplex[0].1, iterations, converged }
}

#[derive(Debug, Clone, Copy)]
pub struct Root {
    pub x: f64,
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Damped Newton iteration for `f(x) = 0` with a central-difference
/// derivative. Steps are halved until `|f|` decreases.
pub fn newton<F>(f: F, x0: f64, xtol: f64, max_iterations: usize) -> Root
where
    F: Fn(f64) -> f64,
{
    let mut x = x0;
    let mut fx = f(x);
    for iteration in 0..max_iterations {
        if fx == 0.0 {
            return Root { x, residual: fx, iterations: iteration, converged: true };
        }
        let h = 1e-7 * x.abs().max(1.0);
        let derivative = (f(x + h) - f(x - h)) / (2.0 * h);
        if derivative == 0.0 || !derivative.is_finite() {
            return Root { x, residual: fx, iterations: iteration, converged: false };
        }
        let mut step = fx / derivative;
        let mut trial = x - step;
        let mut f_trial = f(trial);
        let mut halvings = 0;
        while !(f_trial.abs() < fx.abs()) && halvings < 50 {
            step *= 0.5;
            trial = x - step;
            f_trial = f(trial);
            halvings += 1;
        }
        x = trial;
        fx = f_trial;
        if step.abs() <= xtol * x.abs().max(1.0) {
            return Root { x, residual: fx, iterations: iteration + 1, converged: true };
        }
    }
    Root { x, residual: fx, iterations: max_iterations, converged: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector2, Vector3};

    #[test]
    fn test_nelder_mead_quadratic() {
        let f = |x: &Vector2<f64>| (x[0] - 1.0).powi(2) + 3.0 * (x[1] + 0.5).powi(2);
        let min = nelder_mead(f, Vector2::zeros(), Vector2::repeat(-5.0), Vector2::repeat(5.0), &NelderMeadOptions::default());
        assert!(min.converged);
        assert_relative_eq!(min.x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(min.x[1], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_nelder_mead_active_bound() {
        let f = |x: &Vector3<f64>| (x[0] - 4.0).powi(2) + x[1].powi(2) + x[2].powi(2);
        let min = nelder_mead(f, Vector3::zeros(), Vector3::repeat(-1.0), Vector3::repeat(1.0), &NelderMeadOptions::default());
        assert_relative_eq!(min.x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(min.fun, 9.0, epsilon = 1e-6);
    }

    #[test]
    fn test_newton_root() {
        let root = newton(|x| x * x - 2.0, 10.0, 1e-12, 100);
        assert!(root.converged);
        assert_relative_eq!(root.x, 2f64.sqrt(), epsilon = 1e-10);
    }
}
