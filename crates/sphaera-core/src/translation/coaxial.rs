//! Coaxial translation coefficients by three-term recurrence.
//!
//! For a displacement $t\,\hat{\mathbf{z}}$ the scalar wave
//! $\varphi_n^m = z_n(kr) Y_n^m$ re-expands as
//! $\varphi_n^m(\mathbf{r} + t\hat{\mathbf{z}}) = \sum_l T(n, m, l)\,\varphi_l^m(\mathbf{r})$,
//! with no coupling between different $m$. The coefficients are seeded at
//! $n = m = 0$ from the radial functions and grown by
//!
//! - the sectoral step $(m-1, m-1, l\pm1) \to (m, m, l)$ with coefficients $b(n, m)$,
//! - the degree step $(n-2, m, l), (n-1, m, l\pm1) \to (n, m, l)$ with coefficients $a(n, m)$.
//!
//! Values depend on $|m|$ only, which is what the memo is keyed on.

use std::collections::HashMap;

use num_complex::Complex64;

use crate::special::RadialKind;

/// Degree recursion coefficient $a(n, m)$; zero for $n < |m|$.
pub fn a_coefficient(n: i32, m: i32) -> f64 {
    let m = m.abs();
    if n < m {
        return 0.0;
    }
    let (nf, mf) = (n as f64, m as f64);
    ((nf + 1.0 + mf) * (nf + 1.0 - mf) / ((2.0 * nf + 1.0) * (2.0 * nf + 3.0))).sqrt()
}

/// Sectoral recursion coefficient $b(n, m)$; odd in $m$, zero for $|m| > n$.
pub fn b_coefficient(n: i32, m: i32) -> f64 {
    if n < 0 || m.abs() > n {
        return 0.0;
    }
    let (nf, mf) = (n as f64, m as f64);
    let magnitude = ((nf - mf - 1.0) * (nf - mf) / ((2.0 * nf - 1.0) * (2.0 * nf + 1.0))).sqrt();
    if m >= 0 {
        magnitude
    } else {
        -magnitude
    }
}

fn pack(n: i32, m: i32, l: i32) -> u64 {
    ((n as u64) << 42) | ((m as u64) << 21) | (l as u64)
}

/// Memoising evaluator of coaxial coefficients $T(n, m, l)$.
#[derive(Debug, Clone)]
pub struct CachedCoAxialRecurrence {
    distance: f64,
    wavenumber: Complex64,
    kind: RadialKind,
    radial: Vec<Complex64>,
    cache: HashMap<u64, Complex64>,
}

impl CachedCoAxialRecurrence {
    /// `distance` is the signed axial offset; `regular` selects $j_n$ over $h^{(1)}_n$.
    pub fn new(distance: f64, wavenumber: Complex64, regular: bool) -> Self {
        let kind = if regular {
            RadialKind::Regular
        } else {
            RadialKind::Singular
        };
        Self {
            distance,
            wavenumber,
            kind,
            radial: Vec::new(),
            cache: HashMap::new(),
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn wavenumber(&self) -> Complex64 {
        self.wavenumber
    }

    pub fn is_regular(&self) -> bool {
        self.kind == RadialKind::Regular
    }

    /// Coefficient $T(n, m, l)$; zero outside $n, l \ge |m|$.
    pub fn value(&mut self, n: i32, m: i32, l: i32) -> Complex64 {
        let zero = Complex64::new(0.0, 0.0);
        let m = m.abs();
        if n < 0 || l < 0 || n < m || l < m {
            return zero;
        }
        // A null translation is the identity and the recurrence divides by zero there.
        if self.distance == 0.0 {
            return if n == l { Complex64::new(1.0, 0.0) } else { zero };
        }
        let key = pack(n, m, l);
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }

        let value = if n == 0 {
            self.seed(l)
        } else if n == m {
            (self.value(m - 1, m - 1, l - 1) * b_coefficient(l, -m)
                - self.value(m - 1, m - 1, l + 1) * b_coefficient(l + 1, m - 1))
                / b_coefficient(m, -m)
        } else {
            (self.value(n - 2, m, l) * a_coefficient(n - 2, m)
                - self.value(n - 1, m, l + 1) * a_coefficient(l, m)
                + self.value(n - 1, m, l - 1) * a_coefficient(l - 1, m))
                / a_coefficient(n - 1, m)
        };
        self.cache.insert(key, value);
        value
    }

    /// Vector coaxial coefficients $(A_c, B_c)$ for $n, l \ge 1$, $|\nu| \le \min(n, l)$.
    pub fn vector(&mut self, n: i32, nu: i32, l: i32) -> (Complex64, Complex64) {
        let zero = Complex64::new(0.0, 0.0);
        if n < 1 || l < 1 || nu.abs() > n.min(l) {
            return (zero, zero);
        }
        let kt = self.wavenumber * self.distance;
        let sn2 = (n * (n + 1)) as f64;
        let norm = (sn2 * (l * (l + 1)) as f64).sqrt();
        let centre = self.value(n, nu, l);
        let below = self.value(n - 1, nu, l) * ((n + 1) as f64 * a_coefficient(n - 1, nu));
        let above = self.value(n + 1, nu, l) * (n as f64 * a_coefficient(n, nu));
        let a = (centre * sn2 - kt * (below + above)) / norm;
        let b = Complex64::i() * kt * nu as f64 * centre / norm;
        (a, b)
    }

    fn seed(&mut self, l: i32) -> Complex64 {
        let l_index = l as usize;
        if l_index >= self.radial.len() {
            let order = (l_index + 16).max(2 * self.radial.len());
            let argument = self.wavenumber * self.distance.abs();
            self.radial = self.kind.evaluate(order, argument);
        }
        let parity = if l % 2 == 0 { 1.0 } else { -1.0 };
        let sign = if self.distance < 0.0 { 1.0 } else { parity };
        self.radial[l_index] * ((2 * l + 1) as f64).sqrt() * sign
    }
}
