//! Spherical Bessel and Hankel functions of complex argument.
//!
//! The regular functions $j_n$ are computed by Miller's downward recurrence,
//! which stays accurate for $n \gg |z|$ where upward recurrence loses all
//! significance. The outgoing Hankel functions $h^{(1)}_n$ grow with $n$, so
//! the upward recurrence is stable for them.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Magnitude above which the downward recurrence is rescaled.
const RESCALE_THRESHOLD: f64 = 1e200;

/// Radial basis function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadialKind {
    /// Spherical Bessel $j_n$, finite at the origin.
    Regular,
    /// Outgoing spherical Hankel $h^{(1)}_n$, radiating.
    Singular,
}

impl RadialKind {
    /// Evaluate orders `0..=n_max` at `z`.
    pub fn evaluate(self, n_max: usize, z: Complex64) -> Vec<Complex64> {
        match self {
            RadialKind::Regular => spherical_jn(n_max, z),
            RadialKind::Singular => spherical_h1n(n_max, z),
        }
    }
}

/// Spherical Bessel functions $j_0(z), \ldots, j_{n_{\max}}(z)$.
pub fn spherical_jn(n_max: usize, z: Complex64) -> Vec<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let mut out = vec![zero; n_max.max(1) + 1];
    if z.norm() == 0.0 {
        out[0] = Complex64::new(1.0, 0.0);
        out.truncate(n_max + 1);
        return out;
    }

    let top = out.len() - 1;
    let start = top + z.norm().ceil() as usize + 30;
    let mut above = zero;
    let mut current = Complex64::new(1e-30, 0.0);
    for k in (1..=start).rev() {
        let below = current * ((2 * k + 1) as f64) / z - above;
        above = current;
        current = below;
        if k - 1 <= top {
            out[k - 1] = current;
        }
        if current.norm() > RESCALE_THRESHOLD {
            let scale = 1.0 / RESCALE_THRESHOLD;
            current *= scale;
            above *= scale;
            for value in out.iter_mut().skip(k - 1) {
                *value *= scale;
            }
        }
    }

    // Normalise against whichever closed form is further from a zero.
    let j0 = z.sin() / z;
    let j1 = z.sin() / (z * z) - z.cos() / z;
    let scale = if j0.norm() >= j1.norm() {
        j0 / out[0]
    } else {
        j1 / out[1]
    };
    for value in out.iter_mut() {
        *value *= scale;
    }
    out.truncate(n_max + 1);
    out
}

/// Outgoing spherical Hankel functions $h^{(1)}_0(z), \ldots, h^{(1)}_{n_{\max}}(z)$.
///
/// Singular at $z = 0$; callers must not evaluate there.
pub fn spherical_h1n(n_max: usize, z: Complex64) -> Vec<Complex64> {
    let i = Complex64::i();
    let phase = (i * z).exp();
    let mut out = Vec::with_capacity(n_max + 1);
    out.push(-i * phase / z);
    if n_max == 0 {
        return out;
    }
    out.push(-phase * (z + i) / (z * z));
    for k in 1..n_max {
        let next = out[k] * ((2 * k + 1) as f64) / z - out[k - 1];
        out.push(next);
    }
    out
}

/// Riccati derivative $[z f_n(z)]' = z f_{n-1}(z) - n f_n(z)$ for $n \geq 1$.
///
/// `values` holds $f_0, \ldots, f_{n_{\max}}$ at the same `z`.
pub fn riccati_derivative(values: &[Complex64], n: usize, z: Complex64) -> Complex64 {
    z * values[n - 1] - values[n] * n as f64
}
