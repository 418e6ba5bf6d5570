//! Crack-shape correction factor for planar and elliptical cracks.
//!
//! The factor divides the stress-intensity factor of a through crack to give
//! the one at the deepest point of a semi-elliptical surface crack:
//!
//! ```text
//! Phi(ac) = int_0^{pi/2} sqrt(1 - (1 - ac^2) sin^2(phi)) dphi
//! ```
//!
//! For a through crack the integrand degenerates to `cos(phi)` and the
//! factor is exactly one.
//!
//! ```
//! use notchlife::shape::CrackShape;
//!
//! assert_eq!(CrackShape::Planar.phi(), 1.0);
//! assert!(CrackShape::Elliptical.phi() > CrackShape::Planar.phi());
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt;

/// Number of Gauss-Legendre points used for the shape integral.
const QUADRATURE_POINTS: usize = 32;

/// Crack-shape mode used by the propagation integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrackShape {
    /// Through crack, `a/c = 0`.
    Planar,
    /// Semi-elliptical surface crack, `a/c = 0.5`.
    Elliptical,
}

impl CrackShape {
    pub fn aspect_ratio(&self) -> f64 {
        match self {
            CrackShape::Planar => 0.0,
            CrackShape::Elliptical => 0.5,
        }
    }

    pub fn phi(&self) -> f64 {
        phi(self.aspect_ratio())
    }

    /// Directory name used for the tables of this shape.
    pub fn dir_name(&self) -> &'static str {
        match self {
            CrackShape::Planar => "planar",
            CrackShape::Elliptical => "elliptical",
        }
    }
}

impl fmt::Display for CrackShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Shape factor for aspect ratio `ac` in `[0, 0.5]`.
pub fn phi(ac: f64) -> f64 {
    if ac == 0.0 {
        return 1.0;
    }
    let m = 1.0 - ac * ac;
    // map [-1, 1] onto [0, pi/2]
    gauss_legendre(QUADRATURE_POINTS)
        .iter()
        .map(|&(xi, w)| {
            let angle = FRAC_PI_4 * (xi + 1.0);
            w * (1.0 - m * angle.sin().powi(2)).sqrt()
        })
        .sum::<f64>()
        * FRAC_PI_4
}

/// Gauss-Legendre points and weights on `[-1, 1]`.
///
/// Nodes are found by Newton iteration on `P_n` from the Chebyshev
/// approximation of each root.
pub fn gauss_legendre(n: usize) -> Vec<(f64, f64)> {
    let mut rule = vec![(0.0, 0.0); n];
    let nf = n as f64;
    for i in 0..(n + 1) / 2 {
        let mut x = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        let mut dp = 0.0;
        for _ in 0..100 {
            let (p, d) = legendre(n, x);
            dp = d;
            let dx = p / d;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        rule[i] = (x, w);
        rule[n - 1 - i] = (-x, w);
    }
    rule
}

/// Value and derivative of the Legendre polynomial `P_n` at `x`.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut p0, mut p1) = (1.0, x);
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    if n == 0 {
        return (1.0, 0.0);
    }
    let d = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, d)
}
