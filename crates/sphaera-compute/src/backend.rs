//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over the environments a solve can
//! run in (a single shared-memory node or a 2-D process grid) so that the
//! scattering code in `sphaera-core` remains backend-agnostic.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Invalid process grid: {0}")]
    InvalidGrid(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Matrix is singular: zero pivot in column {column}")]
    Singular { column: usize },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: usize,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Cpu,
    Distributed,
}

/// A square linear map $\mathbf{x} \mapsto \mathbf{A}\mathbf{x}$ prepared by a
/// backend.
///
/// Krylov solvers only ever touch the system matrix through this trait, so
/// the matrix can live in whatever layout the backend prefers (row-major on
/// one node, block-cyclic on a process grid).
pub trait LinearOperator: Send + Sync {
    /// Number of rows (and columns) of the operator.
    fn dim(&self) -> usize;

    /// Compute $\mathbf{A}\mathbf{x}$.
    fn apply(&self, x: &Array1<Complex64>) -> Array1<Complex64>;
}

/// Abstraction over compute backends.
///
/// Solver code in `sphaera-core` operates against this trait. Implementations
/// provide backend-specific execution for the two hot paths: repeated
/// matrix-vector products and dense factorisations.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the backend.
    fn device_info(&self) -> DeviceInfo;

    /// Prepare `matrix` for repeated matrix-vector products.
    ///
    /// Distribution (if any) happens once here, not on every product.
    fn operator<'a>(
        &self,
        matrix: &'a Array2<Complex64>,
    ) -> Result<Box<dyn LinearOperator + 'a>, ComputeError>;

    /// Solve a dense linear system $\mathbf{A}\mathbf{x} = \mathbf{b}$.
    fn dense_solve(
        &self,
        matrix: &Array2<Complex64>,
        rhs: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>, ComputeError> {
        let _ = (matrix, rhs);
        Err(ComputeError::Unavailable(
            "Dense solve not implemented for this backend".into(),
        ))
    }
}

/// Check that `matrix` is square and conforms to a right-hand side of length `rhs_len`.
pub(crate) fn check_system(matrix: &Array2<Complex64>, rhs_len: usize) -> Result<(), ComputeError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(ComputeError::DimensionMismatch {
            expected: matrix.nrows(),
            found: matrix.ncols(),
        });
    }
    if matrix.nrows() != rhs_len {
        return Err(ComputeError::DimensionMismatch {
            expected: matrix.nrows(),
            found: rhs_len,
        });
    }
    Ok(())
}
