//! Vector spherical wave functions.
//!
//! $\mathbf{M}_n^m(k\mathbf{r}) = z_n(kr)\,\mathbf{X}_n^m(\hat{\mathbf{r}})$ and
//! $\mathbf{N}_n^m = k^{-1}\nabla\times\mathbf{M}_n^m$, i.e.
//!
//! $$\mathbf{N}_n^m = i\sqrt{n(n+1)}\,\frac{z_n(u)}{u}\,Y_n^m\,\hat{\mathbf{r}}
//!   + \frac{[u\,z_n(u)]'}{u}\,\hat{\mathbf{r}}\times\mathbf{X}_n^m,\qquad u = kr.$$
//!
//! Used to check translations and incident-field expansions numerically.

use num_complex::Complex64;

use crate::harmonics::{flat_max, vector_harmonic, HarmonicsIterator, SphericalHarmonics};
use crate::special::{riccati_derivative, RadialKind};
use crate::types::Spherical;

/// Cartesian complex 3-vector.
pub type Vector3 = [Complex64; 3];

/// $\mathbf{M}$ and $\mathbf{N}$ for every harmonic up to `n_max`, in flat order.
#[derive(Debug, Clone)]
pub struct VectorWaves {
    pub m: Vec<Vector3>,
    pub n: Vec<Vector3>,
}

/// Evaluate all vector wave functions at a Cartesian `point` (not the origin).
pub fn vector_waves(point: [f64; 3], k: Complex64, n_max: usize, kind: RadialKind) -> VectorWaves {
    let position = Spherical::from_cartesian(point);
    let u = k * position.r;
    let radial = kind.evaluate(n_max, u);
    let harmonics = SphericalHarmonics::new(n_max, position.theta, position.phi);
    let (st, ct) = position.theta.sin_cos();
    let (sp, cp) = position.phi.sin_cos();
    let rhat = [st * cp, st * sp, ct];

    let size = flat_max(n_max);
    let mut m_waves = Vec::with_capacity(size);
    let mut n_waves = Vec::with_capacity(size);
    for (n, m) in HarmonicsIterator::new(n_max) {
        let x = vector_harmonic(&harmonics, n, m);
        let z = radial[n as usize];
        m_waves.push(x.map(|c| c * z));

        let s = ((n * (n + 1)) as f64).sqrt();
        let radial_part = Complex64::i() * s * z / u * harmonics.get(n, m);
        let tangential = riccati_derivative(&radial, n as usize, u) / u;
        let rx = cross_real(rhat, x);
        n_waves.push([
            radial_part * rhat[0] + tangential * rx[0],
            radial_part * rhat[1] + tangential * rx[1],
            radial_part * rhat[2] + tangential * rx[2],
        ]);
    }
    VectorWaves {
        m: m_waves,
        n: n_waves,
    }
}

/// $\mathbf{a} \times \mathbf{b}$ for real `a`.
fn cross_real(a: [f64; 3], b: Vector3) -> Vector3 {
    [
        b[2] * a[1] - b[1] * a[2],
        b[0] * a[2] - b[2] * a[0],
        b[1] * a[0] - b[0] * a[1],
    ]
}

/// $\mathbf{a} \times \mathbf{b}$ for complex vectors.
pub fn cross(a: Vector3, b: Vector3) -> Vector3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
