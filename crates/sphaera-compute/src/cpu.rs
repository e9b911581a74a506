//! CPU compute backend using Rayon for shared-memory parallelism.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::backend::{check_system, BackendType, ComputeBackend, ComputeError, DeviceInfo, LinearOperator};

/// CPU backend that parallelises work across threads via Rayon.
pub struct CpuBackend {
    num_threads: usize,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Row-major dense operator; each output entry is an independent row dot product.
struct DenseOperator<'a> {
    matrix: &'a Array2<Complex64>,
}

impl LinearOperator for DenseOperator<'_> {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, x: &Array1<Complex64>) -> Array1<Complex64> {
        let data: Vec<Complex64> = (0..self.matrix.nrows())
            .into_par_iter()
            .map(|i| self.matrix.row(i).dot(x))
            .collect();
        Array1::from_vec(data)
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: 1,
        }
    }

    fn operator<'a>(
        &self,
        matrix: &'a Array2<Complex64>,
    ) -> Result<Box<dyn LinearOperator + 'a>, ComputeError> {
        check_system(matrix, matrix.nrows())?;
        Ok(Box::new(DenseOperator { matrix }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_operator_matches_dot() {
        let n = 7;
        let matrix = Array2::from_shape_fn((n, n), |(i, j)| {
            Complex64::new((i * n + j) as f64 * 0.1, (i as f64) - (j as f64))
        });
        let x = Array1::from_shape_fn(n, |i| Complex64::new(1.0, 0.5 * i as f64));

        let backend = CpuBackend::new();
        let op = backend.operator(&matrix).unwrap();
        let y = op.apply(&x);
        let expected = matrix.dot(&x);

        assert_eq!(op.dim(), n);
        for i in 0..n {
            assert_abs_diff_eq!(y[i].re, expected[i].re, epsilon = 1e-12);
            assert_abs_diff_eq!(y[i].im, expected[i].im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_operator_rejects_rectangular() {
        let matrix = Array2::<Complex64>::zeros((3, 4));
        assert!(CpuBackend::new().operator(&matrix).is_err());
    }

    #[test]
    fn test_cpu_has_no_dense_solve() {
        let matrix = Array2::<Complex64>::eye(2);
        let rhs = Array1::<Complex64>::zeros(2);
        let err = CpuBackend::new().dense_solve(&matrix, &rhs).unwrap_err();
        assert!(matches!(err, ComputeError::Unavailable(_)));
    }
}
