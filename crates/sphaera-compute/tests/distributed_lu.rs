//! Block-cyclic distribution and distributed LU against dense references.

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use sphaera_compute::distributed::lu_solve;
use sphaera_compute::{
    ComputeBackend, ComputeError, CpuBackend, DistributedBackend, DistributedMatrix, ProcessGrid,
};

fn test_matrix(n: usize) -> Array2<Complex64> {
    // Off-diagonal entries dominate the first rows so that pivoting is exercised.
    Array2::from_shape_fn((n, n), |(i, j)| {
        let x = ((i * 7 + j * 13) % 17) as f64 / 17.0;
        let y = ((i * 3 + j * 5) % 11) as f64 / 11.0 - 0.5;
        let mut value = Complex64::new(x, y);
        if i == j {
            value += Complex64::new(if i % 3 == 0 { 0.0 } else { 2.0 }, 0.5);
        }
        value
    })
}

fn test_rhs(n: usize) -> Array1<Complex64> {
    Array1::from_shape_fn(n, |i| Complex64::new(1.0 + i as f64, -0.25 * i as f64))
}

fn residual(matrix: &Array2<Complex64>, x: &Array1<Complex64>, b: &Array1<Complex64>) -> f64 {
    let r = matrix.dot(x) - b;
    let rn: f64 = r.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    let bn: f64 = b.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    rn / bn
}

#[test]
fn test_scatter_gather_round_trip() {
    let matrix = test_matrix(23);
    for (rows, cols, block) in [(1, 1, 4), (2, 2, 3), (2, 3, 5), (3, 1, 64)] {
        let grid = ProcessGrid::new(rows, cols).unwrap();
        let distributed = DistributedMatrix::scatter(&matrix, grid, block).unwrap();
        assert_eq!(distributed.gather(), matrix);

        let stored: usize = (0..grid.size())
            .map(|rank| distributed.local(rank).unwrap().len())
            .sum();
        assert_eq!(stored, 23 * 23);
    }
}

#[test]
fn test_distributed_matvec_matches_dense() {
    let n = 31;
    let matrix = test_matrix(n);
    let x = test_rhs(n);
    let expected = matrix.dot(&x);
    let grid = ProcessGrid::new(2, 3).unwrap();
    let distributed = DistributedMatrix::scatter(&matrix, grid, 4).unwrap();
    let y = distributed.matvec(&x);
    for i in 0..n {
        assert_abs_diff_eq!(y[i].re, expected[i].re, epsilon = 1e-12);
        assert_abs_diff_eq!(y[i].im, expected[i].im, epsilon = 1e-12);
    }
}

#[test]
fn test_lu_solve_on_various_grids() {
    let n = 40;
    let matrix = test_matrix(n);
    let rhs = test_rhs(n);
    let reference = lu_solve(&matrix, &rhs, ProcessGrid::single(), 64).unwrap();
    assert!(residual(&matrix, &reference, &rhs) < 1e-12);

    for (rows, cols, block) in [(2, 2, 4), (2, 3, 3), (3, 2, 7), (1, 4, 2)] {
        let grid = ProcessGrid::new(rows, cols).unwrap();
        let x = lu_solve(&matrix, &rhs, grid, block).unwrap();
        eprintln!("grid {rows}x{cols} block {block}: residual {:.3e}", residual(&matrix, &x, &rhs));
        for i in 0..n {
            assert_abs_diff_eq!(x[i].re, reference[i].re, epsilon = 1e-10);
            assert_abs_diff_eq!(x[i].im, reference[i].im, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_lu_requires_pivoting() {
    // Anti-diagonal permutation: every diagonal entry is zero.
    let n = 6;
    let matrix = Array2::from_shape_fn((n, n), |(i, j)| {
        if i + j == n - 1 {
            Complex64::new(1.0 + i as f64, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    });
    let rhs = test_rhs(n);
    let grid = ProcessGrid::new(2, 2).unwrap();
    let x = lu_solve(&matrix, &rhs, grid, 2).unwrap();
    assert!(residual(&matrix, &x, &rhs) < 1e-14);
}

#[test]
fn test_singular_matrix_reported() {
    let n = 5;
    let mut matrix = test_matrix(n);
    for j in 0..n {
        matrix[[3, j]] = matrix[[1, j]] * 2.0;
    }
    let rhs = test_rhs(n);
    let grid = ProcessGrid::new(2, 2).unwrap();
    // Exact cancellation is not guaranteed in floating point; either a zero
    // pivot is detected or the result is non-finite/huge.
    match lu_solve(&matrix, &rhs, grid, 2) {
        Err(ComputeError::Singular { .. }) => {}
        Ok(x) => assert!(x.iter().any(|c| !c.is_finite() || c.norm() > 1e10)),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn test_zero_matrix_is_singular() {
    let matrix = Array2::<Complex64>::zeros((4, 4));
    let rhs = test_rhs(4);
    let err = lu_solve(&matrix, &rhs, ProcessGrid::new(2, 1).unwrap(), 2).unwrap_err();
    assert!(matches!(err, ComputeError::Singular { column: 0 }));
}

#[test]
fn test_backends_agree_on_operator() {
    let n = 17;
    let matrix = test_matrix(n);
    let x = test_rhs(n);
    let cpu = CpuBackend::new();
    let distributed = DistributedBackend::new(ProcessGrid::new(2, 2).unwrap(), 3).unwrap();
    assert_eq!(distributed.device_info().compute_units, 4);
    let a = cpu.operator(&matrix).unwrap().apply(&x);
    let b = distributed.operator(&matrix).unwrap().apply(&x);
    for i in 0..n {
        assert_abs_diff_eq!(a[i].re, b[i].re, epsilon = 1e-12);
        assert_abs_diff_eq!(a[i].im, b[i].im, epsilon = 1e-12);
    }
}

#[test]
fn test_dimension_mismatch_rejected() {
    let matrix = test_matrix(4);
    let rhs = test_rhs(5);
    let err = lu_solve(&matrix, &rhs, ProcessGrid::single(), 2).unwrap_err();
    assert!(matches!(err, ComputeError::DimensionMismatch { .. }));
}
