//! Direct dense solve on a single compute unit.
//!
//! Uses a column-pivoted QR factorisation via `faer`, which stays usable on
//! the badly scaled systems strongly coupled clusters produce. There is no
//! retry: a factorisation that yields a non-finite solution fails the solve.

use faer::linalg::solvers::Solve;
use faer::{c64, Col, Mat};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::SolverError;

/// Solve $S x = Q$ by column-pivoted QR.
pub fn solve_direct(
    matrix: &Array2<Complex64>,
    rhs: &Array1<Complex64>,
) -> Result<Array1<Complex64>, SolverError> {
    let dim = matrix.nrows();
    if matrix.ncols() != dim || rhs.len() != dim {
        return Err(SolverError::LinAlgError(format!(
            "system is {}x{} with right-hand side of length {}",
            dim,
            matrix.ncols(),
            rhs.len()
        )));
    }

    let faer_mat = Mat::<c64>::from_fn(dim, dim, |i, j| matrix[[i, j]]);
    let faer_rhs = Col::<c64>::from_fn(dim, |i| rhs[i]);
    let qr = faer_mat.col_piv_qr();
    let faer_sol = qr.solve(&faer_rhs);

    let solution = Array1::from_iter(faer_sol.iter().copied());
    if solution.iter().any(|c| !c.is_finite()) {
        return Err(SolverError::LinAlgError(
            "QR factorisation produced a non-finite solution; the system is singular".into(),
        ));
    }
    Ok(solution)
}
