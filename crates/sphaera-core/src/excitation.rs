//! Incident plane waves and their local expansions.
//!
//! A plane wave $\mathbf{E}_0 e^{ik\hat{\mathbf{k}}\cdot\mathbf{x}}$ expands about a
//! centre $\mathbf{c}$ in regular vector waves with coefficients
//!
//! $$a_{nm} = 4\pi i^n\,\mathbf{X}_n^{m*}(\hat{\mathbf{k}})\cdot\mathbf{E}_0\,e^{ik\hat{\mathbf{k}}\cdot\mathbf{c}},\qquad
//!   b_{nm} = 4\pi i^{n+1}\,\mathbf{X}_n^{m*}(\hat{\mathbf{k}})\cdot(\hat{\mathbf{k}}\times\mathbf{E}_0)\,e^{ik\hat{\mathbf{k}}\cdot\mathbf{c}}.$$

use std::f64::consts::PI;

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::harmonics::{flat_max, vector_harmonic, HarmonicsIterator, SphericalHarmonics};
use crate::types::{ElectroMagnetic, Spherical, SPEED_OF_LIGHT};
use crate::vsh::{cross, Vector3};

/// A monochromatic plane wave in the background medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excitation {
    /// Angular frequency (rad/s).
    omega: f64,
    /// Propagation direction angles $(\theta_k, \phi_k)$ (radians).
    theta: f64,
    phi: f64,
    /// Amplitude along $\hat{\boldsymbol\theta}_k$ and $\hat{\boldsymbol\phi}_k$.
    e_theta: Complex64,
    e_phi: Complex64,
    background: ElectroMagnetic,
}

impl Excitation {
    /// Plane wave of vacuum wavelength `wavelength` (m) travelling along $(\theta, \phi)$.
    pub fn plane_wave(
        wavelength: f64,
        theta: f64,
        phi: f64,
        e_theta: Complex64,
        e_phi: Complex64,
        background: ElectroMagnetic,
    ) -> Self {
        Self {
            omega: 2.0 * PI * SPEED_OF_LIGHT / wavelength,
            theta,
            phi,
            e_theta,
            e_phi,
            background,
        }
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Vacuum wavelength (m).
    pub fn wavelength(&self) -> f64 {
        2.0 * PI * SPEED_OF_LIGHT / self.omega
    }

    /// Wavenumber in the background; complex in absorbing media.
    pub fn wavenumber(&self) -> Complex64 {
        self.background.wavenumber(self.omega)
    }

    pub fn background(&self) -> &ElectroMagnetic {
        &self.background
    }

    /// The same wave at `order` times the frequency.
    pub fn at_harmonic(&self, order: u32) -> Self {
        Self {
            omega: self.omega * f64::from(order),
            ..self.clone()
        }
    }

    /// Unit propagation vector $\hat{\mathbf{k}}$.
    pub fn direction(&self) -> [f64; 3] {
        Spherical::new(1.0, self.theta, self.phi).to_cartesian()
    }

    /// Cartesian amplitude $\mathbf{E}_0 = E_\theta\hat{\boldsymbol\theta} + E_\phi\hat{\boldsymbol\phi}$.
    pub fn amplitude(&self) -> Vector3 {
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        let theta_hat = [ct * cp, ct * sp, -st];
        let phi_hat = [-sp, cp, 0.0];
        [0, 1, 2].map(|i| self.e_theta * theta_hat[i] + self.e_phi * phi_hat[i])
    }

    /// Incident field at a Cartesian point.
    pub fn field_at(&self, point: [f64; 3]) -> Vector3 {
        let khat = self.direction();
        let projection: f64 = (0..3).map(|i| khat[i] * point[i]).sum();
        let phase = (Complex64::i() * self.wavenumber() * projection).exp();
        self.amplitude().map(|c| c * phase)
    }

    /// Regular-wave coefficients of the incident field about `center`, `[a; b]`.
    pub fn local_incident(&self, center: &Spherical, n_max: usize) -> Array1<Complex64> {
        let f = flat_max(n_max);
        let khat = self.direction();
        let amplitude = self.amplitude();
        let magnetic = cross(khat.map(Complex64::from), amplitude);
        let c = center.to_cartesian();
        let projection: f64 = (0..3).map(|i| khat[i] * c[i]).sum();
        let phase = (Complex64::i() * self.wavenumber() * projection).exp() * (4.0 * PI);

        let harmonics = SphericalHarmonics::new(n_max, self.theta, self.phi);
        let mut out = Array1::zeros(2 * f);
        for (index, (n, m)) in HarmonicsIterator::new(n_max).enumerate() {
            let x = vector_harmonic(&harmonics, n, m);
            let project = |v: &Vector3| -> Complex64 { (0..3).map(|i| x[i].conj() * v[i]).sum() };
            let i_n = Complex64::i().powi(n);
            out[index] = i_n * project(&amplitude) * phase;
            out[f + index] = i_n * Complex64::i() * project(&magnetic) * phase;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::RadialKind;
    use crate::vsh::vector_waves;
    use approx::assert_abs_diff_eq;

    fn wave() -> Excitation {
        Excitation::plane_wave(
            1.0,
            1.1,
            0.4,
            Complex64::new(1.0, 0.0),
            Complex64::new(0.3, -0.2),
            ElectroMagnetic::vacuum(),
        )
    }

    #[test]
    fn test_amplitude_is_transverse() {
        let w = wave();
        let k = w.direction();
        let dot: Complex64 = (0..3).map(|i| w.amplitude()[i] * k[i]).sum();
        assert_abs_diff_eq!(dot.norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_expansion_reproduces_plane_wave() {
        let w = wave();
        let n_max = 12;
        let center = Spherical::from_cartesian([0.1, -0.05, 0.2]);
        let coefficients = w.local_incident(&center, n_max);
        let f = flat_max(n_max);
        let local = [0.04, 0.03, -0.05];
        let waves = vector_waves(local, w.wavenumber(), n_max, RadialKind::Regular);
        let mut field = [Complex64::new(0.0, 0.0); 3];
        for p in 0..f {
            for i in 0..3 {
                field[i] += coefficients[p] * waves.m[p][i] + coefficients[f + p] * waves.n[p][i];
            }
        }
        let c = center.to_cartesian();
        let expected = w.field_at([c[0] + local[0], c[1] + local[1], c[2] + local[2]]);
        for i in 0..3 {
            assert_abs_diff_eq!((field[i] - expected[i]).norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_second_harmonic_doubles_frequency() {
        let w = wave();
        let sh = w.at_harmonic(2);
        assert_abs_diff_eq!(sh.omega(), 2.0 * w.omega(), epsilon = 1e-6);
        assert_abs_diff_eq!(sh.wavelength(), 0.5, epsilon = 1e-15);
        assert_eq!(sh.amplitude(), w.amplitude());
    }
}
