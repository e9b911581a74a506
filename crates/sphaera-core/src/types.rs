//! Core types shared across the sphaera crates.
//!
//! Positions are stored in spherical coordinates relative to the global
//! origin (as scatterer centres are usually specified), with conversions to
//! and from Cartesian form for displacement arithmetic.

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// A point in spherical coordinates $(r, \theta, \phi)$.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spherical {
    /// Radial distance.
    pub r: f64,
    /// Polar angle $\theta \in [0, \pi]$ (radians).
    pub theta: f64,
    /// Azimuthal angle $\phi$ (radians).
    pub phi: f64,
}

impl Spherical {
    pub fn new(r: f64, theta: f64, phi: f64) -> Self {
        Self { r, theta, phi }
    }

    /// Convert a Cartesian point. The origin maps to $(0, 0, 0)$.
    pub fn from_cartesian(point: [f64; 3]) -> Self {
        let [x, y, z] = point;
        let r = (x * x + y * y + z * z).sqrt();
        if r == 0.0 {
            return Self::default();
        }
        Self {
            r,
            theta: (z / r).clamp(-1.0, 1.0).acos(),
            phi: y.atan2(x),
        }
    }

    pub fn to_cartesian(&self) -> [f64; 3] {
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        [self.r * st * cp, self.r * st * sp, self.r * ct]
    }

    /// Cartesian displacement `self − other`.
    pub fn displacement_from(&self, other: &Spherical) -> [f64; 3] {
        let a = self.to_cartesian();
        let b = other.to_cartesian();
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Euclidean distance between two points.
    pub fn distance_to(&self, other: &Spherical) -> f64 {
        let d = self.displacement_from(other);
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }
}

/// Electromagnetic properties of a homogeneous medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectroMagnetic {
    /// Relative permittivity $\varepsilon_r$.
    pub epsilon_r: Complex64,
    /// Relative permeability $\mu_r$.
    pub mu_r: Complex64,
    /// Effective second-order susceptibility driving second-harmonic sources.
    #[serde(default)]
    pub chi2: Complex64,
}

impl ElectroMagnetic {
    pub fn new(epsilon_r: Complex64, mu_r: Complex64) -> Self {
        Self {
            epsilon_r,
            mu_r,
            chi2: Complex64::new(0.0, 0.0),
        }
    }

    /// Free space.
    pub fn vacuum() -> Self {
        Self::new(Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0))
    }

    pub fn with_chi2(mut self, chi2: Complex64) -> Self {
        self.chi2 = chi2;
        self
    }

    /// Complex refractive index $\sqrt{\varepsilon_r \mu_r}$ (principal branch).
    pub fn refractive_index(&self) -> Complex64 {
        (self.epsilon_r * self.mu_r).sqrt()
    }

    /// Wavenumber $k = (\omega / c) \sqrt{\varepsilon_r \mu_r}$ at angular frequency `omega`.
    pub fn wavenumber(&self, omega: f64) -> Complex64 {
        self.refractive_index() * (omega / SPEED_OF_LIGHT)
    }
}

impl Default for ElectroMagnetic {
    fn default() -> Self {
        Self::vacuum()
    }
}

/// Scattered and internal expansion coefficients for a whole geometry.
///
/// Each vector holds one segment of length $2F$ per scatterer, with the
/// $F$ magnetic ($\mathbf{M}$) coefficients followed by the $F$ electric
/// ($\mathbf{N}$) coefficients, $F = n_{\max}(n_{\max}+2)$.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatteringResult {
    /// Truncation order the coefficients were computed with.
    pub n_max: usize,
    /// Scattered-field coefficients $\mathbf{X}_{\text{sca}}$.
    pub scattered: Array1<Complex64>,
    /// Internal-field coefficients $\mathbf{X}_{\text{int}}$.
    pub internal: Array1<Complex64>,
}
