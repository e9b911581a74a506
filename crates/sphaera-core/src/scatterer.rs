//! Spherical scatterers and their Mie transfer operators.
//!
//! Expansion coefficients of the field scattered by a homogeneous sphere are
//! proportional to those of the field incident on it, harmonic by harmonic:
//! $p_n = T_{M,n}\,a_n$, $q_n = T_{N,n}\,b_n$. The local T-operator is the
//! diagonal $2F \times 2F$ matrix of these ratios.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::harmonics::flat_max;
use crate::special::{riccati_derivative, spherical_h1n, spherical_jn};
use crate::types::{ElectroMagnetic, Spherical};

/// A homogeneous sphere in a background medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatterer {
    /// Centre relative to the global origin.
    pub center: Spherical,
    /// Material of the sphere.
    pub properties: ElectroMagnetic,
    /// Radius (m).
    pub radius: f64,
    /// Truncation order of the expansions about this sphere.
    pub n_max: usize,
}

/// Mie ratios per degree $n = 1..=n_{\max}$.
struct MieRatios {
    magnetic: Vec<Complex64>,
    electric: Vec<Complex64>,
    internal_magnetic: Vec<Complex64>,
    internal_electric: Vec<Complex64>,
}

impl Scatterer {
    pub fn new(center: Spherical, properties: ElectroMagnetic, radius: f64, n_max: usize) -> Self {
        Self {
            center,
            properties,
            radius,
            n_max,
        }
    }

    fn mie_ratios(&self, omega: f64, background: &ElectroMagnetic, n_max: usize) -> MieRatios {
        let k_b = background.wavenumber(omega);
        let k_s = self.properties.wavenumber(omega);
        let x = k_b * self.radius;
        let mx = k_s * self.radius;
        let m = k_s / k_b;
        let mu = self.properties.mu_r / background.mu_r;

        let j_x = spherical_jn(n_max, x);
        let j_mx = spherical_jn(n_max, mx);
        let h_x = spherical_h1n(n_max, x);

        let mut ratios = MieRatios {
            magnetic: Vec::with_capacity(n_max),
            electric: Vec::with_capacity(n_max),
            internal_magnetic: Vec::with_capacity(n_max),
            internal_electric: Vec::with_capacity(n_max),
        };
        let i_m_mu = Complex64::i() * m * mu;
        for n in 1..=n_max {
            let psi_x = x * j_x[n];
            let psi_mx = mx * j_mx[n];
            let xi_x = x * h_x[n];
            let dpsi_x = riccati_derivative(&j_x, n, x);
            let dpsi_mx = riccati_derivative(&j_mx, n, mx);
            let dxi_x = riccati_derivative(&h_x, n, x);

            let num_m = m * psi_x * dpsi_mx - mu * psi_mx * dpsi_x;
            let den_m = mu * psi_mx * dxi_x - m * xi_x * dpsi_mx;
            let num_n = mu * psi_x * dpsi_mx - m * psi_mx * dpsi_x;
            let den_n = m * psi_mx * dxi_x - mu * xi_x * dpsi_mx;

            ratios.magnetic.push(num_m / den_m);
            ratios.electric.push(num_n / den_n);
            ratios.internal_magnetic.push(i_m_mu / num_m);
            ratios.internal_electric.push(i_m_mu / num_n);
        }
        ratios
    }

    /// Diagonal of the local T-operator, `[M harmonics; N harmonics]`.
    pub fn transfer_diagonal(
        &self,
        omega: f64,
        background: &ElectroMagnetic,
        n_max: usize,
    ) -> Array1<Complex64> {
        let ratios = self.mie_ratios(omega, background, n_max);
        spread(&ratios.magnetic, &ratios.electric, n_max)
    }

    /// Local T-operator mapping incident to scattered coefficients.
    pub fn local_transfer_operator(
        &self,
        omega: f64,
        background: &ElectroMagnetic,
        n_max: usize,
    ) -> Array2<Complex64> {
        Array2::from_diag(&self.transfer_diagonal(omega, background, n_max))
    }

    /// Element-wise ratios of internal to scattered coefficients.
    pub fn internal_recovery_operator(
        &self,
        omega: f64,
        background: &ElectroMagnetic,
        n_max: usize,
    ) -> Array1<Complex64> {
        let ratios = self.mie_ratios(omega, background, n_max);
        spread(&ratios.internal_magnetic, &ratios.internal_electric, n_max)
    }
}

/// Repeat per-degree values over the $2n+1$ orders of each degree.
fn spread(magnetic: &[Complex64], electric: &[Complex64], n_max: usize) -> Array1<Complex64> {
    let f = flat_max(n_max);
    let mut out = Array1::zeros(2 * f);
    let mut index = 0;
    for n in 1..=n_max {
        for _ in 0..(2 * n + 1) {
            out[index] = magnetic[n - 1];
            out[f + index] = electric[n - 1];
            index += 1;
        }
    }
    out
}
