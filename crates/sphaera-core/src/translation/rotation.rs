//! Rotation of harmonic bases onto the translation axis.

use crate::harmonics::wigner_d;

/// Precomputed $d^n_{m\nu}(\beta)$ for $0 \le n \le n_{\max}$.
#[derive(Debug, Clone)]
pub struct WignerTable {
    n_max: i32,
    beta: f64,
    values: Vec<Vec<f64>>,
}

impl WignerTable {
    pub fn new(n_max: usize, beta: f64) -> Self {
        let n_max = n_max as i32;
        let values = (0..=n_max)
            .map(|n| {
                let width = 2 * n + 1;
                let mut block = Vec::with_capacity((width * width) as usize);
                for m in -n..=n {
                    for nu in -n..=n {
                        block.push(wigner_d(n, m, nu, beta));
                    }
                }
                block
            })
            .collect();
        Self {
            n_max,
            beta,
            values,
        }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// $d^n_{m\nu}(\beta)$, zero outside the table.
    #[inline]
    pub fn get(&self, n: i32, m: i32, nu: i32) -> f64 {
        if n < 0 || n > self.n_max || m.abs() > n || nu.abs() > n {
            return 0.0;
        }
        let width = 2 * n + 1;
        self.values[n as usize][((m + n) * width + nu + n) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_table_matches_direct_evaluation() {
        let table = WignerTable::new(6, 1.3);
        assert_abs_diff_eq!(table.get(5, -2, 3), wigner_d(5, -2, 3, 1.3), epsilon = 1e-15);
        assert_eq!(table.get(7, 0, 0), 0.0);
    }

    #[test]
    fn test_zero_angle_is_identity() {
        let table = WignerTable::new(4, 0.0);
        for n in 0..=4 {
            for m in -n..=n {
                for nu in -n..=n {
                    let expected = if m == nu { 1.0 } else { 0.0 };
                    assert_abs_diff_eq!(table.get(n, m, nu), expected, epsilon = 1e-15);
                }
            }
        }
    }

    #[test]
    fn test_half_turn_flips_order() {
        // d^n_{m nu}(pi) = (-1)^(n+m) delta_{m,-nu}
        let table = WignerTable::new(3, std::f64::consts::PI);
        for n in 0..=3 {
            for m in -n..=n {
                let sign = if (n + m) % 2 == 0 { 1.0 } else { -1.0 };
                assert_abs_diff_eq!(table.get(n, m, -m), sign, epsilon = 1e-14);
            }
        }
    }
}
