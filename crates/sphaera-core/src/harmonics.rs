//! Harmonic indexing, spherical harmonics and Wigner rotation matrices.
//!
//! Non-trivial harmonics $(n, m)$ with $1 \le n \le n_{\max}$,
//! $-n \le m \le n$ are laid out in a flat index
//! $n^2 + n + m - 1$, giving $F = n_{\max}(n_{\max} + 2)$ entries. Every
//! per-scatterer coefficient vector in the crate uses this layout.

use std::f64::consts::PI;

use num_complex::Complex64;

/// Flat position of harmonic $(n, m)$, $n \ge 1$, $|m| \le n$.
#[inline]
pub fn flat(n: i32, m: i32) -> usize {
    (n * n + n + m - 1) as usize
}

/// Number of non-trivial harmonics up to order `n_max`.
#[inline]
pub fn flat_max(n_max: usize) -> usize {
    n_max * (n_max + 2)
}

/// Iterator over $(n, m)$ in flat order.
#[derive(Debug, Clone)]
pub struct HarmonicsIterator {
    n_max: i32,
    n: i32,
    m: i32,
}

impl HarmonicsIterator {
    pub fn new(n_max: usize) -> Self {
        Self {
            n_max: n_max as i32,
            n: 1,
            m: -1,
        }
    }
}

impl Iterator for HarmonicsIterator {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.n > self.n_max {
            return None;
        }
        let item = (self.n, self.m);
        if self.m == self.n {
            self.n += 1;
            self.m = -self.n;
        } else {
            self.m += 1;
        }
        Some(item)
    }
}

/// Orthonormal spherical harmonics $Y_n^m(\theta, \phi)$, $0 \le n \le n_{\max}$,
/// with the Condon–Shortley phase.
#[derive(Debug, Clone)]
pub struct SphericalHarmonics {
    n_max: i32,
    values: Vec<Complex64>,
}

impl SphericalHarmonics {
    pub fn new(n_max: usize, theta: f64, phi: f64) -> Self {
        let size = n_max + 1;
        let legendre = normalised_legendre(n_max, theta);
        let mut values = vec![Complex64::new(0.0, 0.0); size * size];
        for n in 0..size {
            for m in 0..=n {
                let positive = Complex64::from_polar(legendre[n * size + m], m as f64 * phi);
                let n_i = n as i32;
                let m_i = m as i32;
                values[(n_i * n_i + n_i + m_i) as usize] = positive;
                if m > 0 {
                    let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
                    values[(n_i * n_i + n_i - m_i) as usize] = positive.conj() * sign;
                }
            }
        }
        Self {
            n_max: n_max as i32,
            values,
        }
    }

    pub fn n_max(&self) -> usize {
        self.n_max as usize
    }

    /// $Y_n^m$, or zero when $(n, m)$ is outside the computed range.
    pub fn get(&self, n: i32, m: i32) -> Complex64 {
        if n < 0 || n > self.n_max || m.abs() > n {
            return Complex64::new(0.0, 0.0);
        }
        self.values[(n * n + n + m) as usize]
    }
}

/// Normalised associated Legendre functions $\bar P_n^m(\cos\theta)$, $m \ge 0$,
/// stored row-major as `[n * (n_max + 1) + m]`.
fn normalised_legendre(n_max: usize, theta: f64) -> Vec<f64> {
    let size = n_max + 1;
    let (sin_t, cos_t) = theta.sin_cos();
    let mut p = vec![0.0; size * size];
    p[0] = (1.0 / (4.0 * PI)).sqrt();
    for m in 0..size {
        if m > 0 {
            let mf = m as f64;
            p[m * size + m] =
                -((2.0 * mf + 1.0) / (2.0 * mf)).sqrt() * sin_t * p[(m - 1) * size + m - 1];
        }
        if m + 1 < size {
            p[(m + 1) * size + m] = (2.0 * m as f64 + 3.0).sqrt() * cos_t * p[m * size + m];
        }
        for n in (m + 2)..size {
            let nf = n as f64;
            let mf = m as f64;
            let n1 = nf - 1.0;
            let a = ((4.0 * nf * nf - 1.0) / (nf * nf - mf * mf)).sqrt();
            let b = ((n1 * n1 - mf * mf) / (4.0 * n1 * n1 - 1.0)).sqrt();
            p[n * size + m] = a * (cos_t * p[(n - 1) * size + m] - b * p[(n - 2) * size + m]);
        }
    }
    p
}

/// Vector spherical harmonic $\mathbf{X}_n^m = \mathbf{L} Y_n^m / \sqrt{n(n+1)}$
/// in Cartesian components, for $n \ge 1$.
pub fn vector_harmonic(harmonics: &SphericalHarmonics, n: i32, m: i32) -> [Complex64; 3] {
    let nn = (n * (n + 1)) as f64;
    let c_plus = (nn - (m * (m + 1)) as f64).max(0.0).sqrt();
    let c_minus = (nn - (m * (m - 1)) as f64).max(0.0).sqrt();
    let up = harmonics.get(n, m + 1) * c_plus;
    let down = harmonics.get(n, m - 1) * c_minus;
    let scale = 1.0 / nn.sqrt();
    [
        (up + down) * (0.5 * scale),
        (up - down) / Complex64::new(0.0, 2.0) * scale,
        harmonics.get(n, m) * (m as f64 * scale),
    ]
}

fn binomial(n: i32, k: i32) -> f64 {
    if k < 0 || k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Jacobi polynomial $P_k^{(a,b)}(x)$ by three-term recurrence.
fn jacobi(k: i32, a: f64, b: f64, x: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    let mut previous = 1.0;
    let mut current = (a + 1.0) + (a + b + 2.0) * (x - 1.0) / 2.0;
    for n in 2..=k {
        let nf = n as f64;
        let c = 2.0 * nf + a + b;
        let a1 = 2.0 * nf * (nf + a + b) * (c - 2.0);
        let a2 = (c - 1.0) * (a * a - b * b);
        let a3 = (c - 2.0) * (c - 1.0) * c;
        let a4 = 2.0 * (nf + a - 1.0) * (nf + b - 1.0) * c;
        let next = ((a2 + a3 * x) * current - a4 * previous) / a1;
        previous = current;
        current = next;
    }
    current
}

/// Wigner small-d matrix element $d^j_{m'm}(\beta)$.
///
/// Uses the Jacobi-polynomial representation, which avoids the alternating
/// factorial sum and stays accurate at the orders used here.
pub fn wigner_d(j: i32, m_prime: i32, m: i32, beta: f64) -> f64 {
    if j < 0 || m.abs() > j || m_prime.abs() > j {
        return 0.0;
    }
    let candidates = [
        (j + m, m_prime - m, m_prime - m),
        (j - m, m - m_prime, 0),
        (j + m_prime, m - m_prime, 0),
        (j - m_prime, m_prime - m, m_prime - m),
    ];
    let (k, a, lambda) = candidates
        .iter()
        .copied()
        .fold(candidates[0], |best, c| if c.0 < best.0 { c } else { best });
    let b = 2 * j - 2 * k - a;
    let sign = if lambda.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
    let norm = (binomial(2 * j - k, k + a) / binomial(k + b, b)).sqrt();
    let (s, c) = (beta / 2.0).sin_cos();
    sign * norm
        * s.powi(a)
        * c.powi(b)
        * jacobi(k, a as f64, b as f64, beta.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_flat_index_layout() {
        let pairs: Vec<_> = HarmonicsIterator::new(3).collect();
        assert_eq!(pairs.len(), flat_max(3));
        for (index, &(n, m)) in pairs.iter().enumerate() {
            assert_eq!(flat(n, m), index);
        }
        assert_eq!(pairs[0], (1, -1));
        assert_eq!(pairs[3], (2, -2));
        assert_eq!(*pairs.last().unwrap(), (3, 3));
    }

    #[test]
    fn test_low_order_harmonics() {
        let (theta, phi): (f64, f64) = (0.7, -1.3);
        let y = SphericalHarmonics::new(2, theta, phi);
        let y10 = (3.0 / (4.0 * PI)).sqrt() * theta.cos();
        assert_abs_diff_eq!(y.get(1, 0).re, y10, epsilon = 1e-14);
        let y11 = Complex64::from_polar(-(3.0 / (8.0 * PI)).sqrt() * theta.sin(), phi);
        assert_abs_diff_eq!((y.get(1, 1) - y11).norm(), 0.0, epsilon = 1e-14);
        // Y_n^{-m} = (-1)^m conj(Y_n^m)
        assert_abs_diff_eq!((y.get(2, -1) + y.get(2, 1).conj()).norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!((y.get(2, -2) - y.get(2, 2).conj()).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_addition_theorem() {
        // sum_m |Y_n^m|^2 = (2n+1) / 4 pi
        let y = SphericalHarmonics::new(12, 1.1, 0.4);
        for n in 0..=12 {
            let sum: f64 = (-n..=n).map(|m| y.get(n, m).norm_sqr()).sum();
            assert_abs_diff_eq!(sum, (2 * n + 1) as f64 / (4.0 * PI), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_vector_harmonic_is_tangential() {
        let (theta, phi): (f64, f64) = (0.9, 2.1);
        let rhat = [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()];
        let y = SphericalHarmonics::new(5, theta, phi);
        for (n, m) in HarmonicsIterator::new(4) {
            let x = vector_harmonic(&y, n, m);
            let radial: Complex64 = (0..3).map(|i| x[i] * rhat[i]).sum();
            assert_abs_diff_eq!(radial.norm(), 0.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_wigner_d_closed_forms() {
        let beta: f64 = 0.83;
        assert_abs_diff_eq!(wigner_d(1, 0, 0, beta), beta.cos(), epsilon = 1e-14);
        assert_abs_diff_eq!(wigner_d(1, 1, 1, beta), (1.0 + beta.cos()) / 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(wigner_d(1, 1, 0, beta), -beta.sin() / 2f64.sqrt(), epsilon = 1e-14);
        assert_abs_diff_eq!(wigner_d(1, 0, 1, beta), beta.sin() / 2f64.sqrt(), epsilon = 1e-14);
        assert_abs_diff_eq!(wigner_d(1, 1, -1, beta), (1.0 - beta.cos()) / 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(
            wigner_d(2, 0, 0, beta),
            (3.0 * beta.cos().powi(2) - 1.0) / 2.0,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_wigner_d_is_orthogonal() {
        let beta = 2.4;
        for j in 0..10 {
            for a in -j..=j {
                for b in -j..=j {
                    let dot: f64 = (-j..=j)
                        .map(|k| wigner_d(j, a, k, beta) * wigner_d(j, b, k, beta))
                        .sum();
                    let expected = if a == b { 1.0 } else { 0.0 };
                    assert_abs_diff_eq!(dot, expected, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_wigner_rotates_harmonics() {
        // Y_n^m(theta_x, phi_x) = e^{i m phi} sum_nu d^n_{m nu}(theta) Y_n^nu(x') with
        // x' the point in the frame rotated by (phi, theta).
        let (theta, phi): (f64, f64) = (0.6, 1.9);
        let x = [0.3, -0.5, 0.8];
        let rotated = {
            let (st, ct) = theta.sin_cos();
            let (sp, cp) = phi.sin_cos();
            let u = [cp * x[0] + sp * x[1], -sp * x[0] + cp * x[1], x[2]];
            [ct * u[0] - st * u[2], u[1], st * u[0] + ct * u[2]]
        };
        let angles = |p: [f64; 3]| {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            ((p[2] / r).acos(), p[1].atan2(p[0]))
        };
        let (t0, p0) = angles(x);
        let (t1, p1) = angles(rotated);
        let original = SphericalHarmonics::new(4, t0, p0);
        let frame = SphericalHarmonics::new(4, t1, p1);
        for n in 0..=4 {
            for m in -n..=n {
                let sum: Complex64 = (-n..=n)
                    .map(|nu| frame.get(n, nu) * wigner_d(n, m, nu, theta))
                    .sum();
                let value = Complex64::from_polar(1.0, m as f64 * phi) * sum;
                assert_abs_diff_eq!((value - original.get(n, m)).norm(), 0.0, epsilon = 1e-12);
            }
        }
    }
}
