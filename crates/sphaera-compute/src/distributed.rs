//! Distributed dense linear algebra over an in-process 2-D process grid.
//!
//! Each rank of the [`ProcessGrid`] owns one local array holding its share
//! of a block-cyclically distributed matrix. Collective steps follow the
//! usual two-phase pattern: distribute, compute on every rank (here in
//! parallel with Rayon), then gather or broadcast the result so that every
//! participant ends up with the same answer.
//!
//! The dense solve is a right-looking LU factorisation with partial
//! pivoting applied to the augmented matrix $[\mathbf{A} \mid \mathbf{b}]$,
//! followed by a distributed back substitution:
//!
//! ```text
//! for k = 0 .. n-1:
//!   p      = argmax_{i >= k} |a_ik|        (reduce over process column of k)
//!   swap rows k and p                       (every process column)
//!   row_k  = broadcast pivot row            (along the process column)
//!   l_ik   = a_ik / a_kk                    (broadcast along process rows)
//!   a_ij  -= l_ik * a_kj   for i, j > k     (all ranks in parallel)
//! ```

use log::debug;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::backend::{check_system, BackendType, ComputeBackend, ComputeError, DeviceInfo, LinearOperator};
use crate::grid::{BlockCyclic, ProcessGrid, DEFAULT_BLOCK_SIZE};

/// A dense matrix distributed block-cyclically over a process grid.
#[derive(Debug, Clone)]
pub struct DistributedMatrix {
    layout: BlockCyclic,
    /// Global row indices of each process row's local storage.
    row_maps: Vec<Vec<usize>>,
    /// Global column indices of each process column's local storage.
    col_maps: Vec<Vec<usize>>,
    /// One local array per rank, indexed by rank.
    locals: Vec<Array2<Complex64>>,
}

impl DistributedMatrix {
    /// Deal `matrix` out to the ranks of `grid` in `block × block` tiles.
    pub fn scatter(matrix: &Array2<Complex64>, grid: ProcessGrid, block: usize) -> Result<Self, ComputeError> {
        let layout = BlockCyclic::new(grid, block, matrix.nrows(), matrix.ncols())?;
        let row_maps: Vec<Vec<usize>> = (0..grid.rows()).map(|pr| layout.rows_of(pr)).collect();
        let col_maps: Vec<Vec<usize>> = (0..grid.cols()).map(|pc| layout.cols_of(pc)).collect();

        let locals = (0..grid.size())
            .into_par_iter()
            .map(|rank| {
                let (pr, pc) = (rank / grid.cols(), rank % grid.cols());
                let (rows, cols) = (&row_maps[pr], &col_maps[pc]);
                Array2::from_shape_fn((rows.len(), cols.len()), |(li, lj)| matrix[[rows[li], cols[lj]]])
            })
            .collect();

        Ok(Self {
            layout,
            row_maps,
            col_maps,
            locals,
        })
    }

    pub fn layout(&self) -> &BlockCyclic {
        &self.layout
    }

    /// Local storage of `rank`.
    pub fn local(&self, rank: usize) -> Option<&Array2<Complex64>> {
        self.locals.get(rank)
    }

    /// Reassemble the global matrix.
    pub fn gather(&self) -> Array2<Complex64> {
        let mut global = Array2::zeros(self.layout.shape());
        let grid = self.layout.grid();
        for (rank, local) in self.locals.iter().enumerate() {
            let (pr, pc) = (rank / grid.cols(), rank % grid.cols());
            for (li, &i) in self.row_maps[pr].iter().enumerate() {
                for (lj, &j) in self.col_maps[pc].iter().enumerate() {
                    global[[i, j]] = local[[li, lj]];
                }
            }
        }
        global
    }

    /// Distributed product $\mathbf{y} = \mathbf{A}\mathbf{x}$; partial row sums are reduced over process columns.
    pub fn matvec(&self, x: &Array1<Complex64>) -> Array1<Complex64> {
        let grid = *self.layout.grid();
        let n = self.layout.shape().0;
        self.locals
            .par_iter()
            .enumerate()
            .map(|(rank, local)| {
                let (pr, pc) = (rank / grid.cols(), rank % grid.cols());
                let x_local: Array1<Complex64> = self.col_maps[pc].iter().map(|&j| x[j]).collect();
                let y_local = local.dot(&x_local);
                let mut partial = Array1::<Complex64>::zeros(n);
                for (li, &i) in self.row_maps[pr].iter().enumerate() {
                    partial[i] = y_local[li];
                }
                partial
            })
            .reduce(|| Array1::zeros(n), |a, b| a + b)
    }

    /// Swap global rows `a` and `b` across every process column.
    fn swap_rows(&mut self, a: usize, b: usize) {
        let grid = *self.layout.grid();
        let (pa, pb) = (self.layout.owner_row(a), self.layout.owner_row(b));
        let (la, lb) = (self.layout.local_row(a), self.layout.local_row(b));
        for pc in 0..grid.cols() {
            let (ra, rb) = (grid.rank(pa, pc), grid.rank(pb, pc));
            if ra == rb {
                let local = &mut self.locals[ra];
                for c in 0..local.ncols() {
                    local.swap([la, c], [lb, c]);
                }
            } else {
                let (first, second) = pair_mut(&mut self.locals, ra, rb);
                for c in 0..first.ncols() {
                    std::mem::swap(&mut first[[la, c]], &mut second[[lb, c]]);
                }
            }
        }
    }

    /// Values of global row `i` restricted to columns owned by each process column.
    fn broadcast_row(&self, i: usize) -> Vec<Complex64> {
        let grid = self.layout.grid();
        let pr = self.layout.owner_row(i);
        let li = self.layout.local_row(i);
        let mut row = vec![Complex64::new(0.0, 0.0); self.layout.shape().1];
        for pc in 0..grid.cols() {
            let local = &self.locals[grid.rank(pr, pc)];
            for (lj, &j) in self.col_maps[pc].iter().enumerate() {
                row[j] = local[[li, lj]];
            }
        }
        row
    }

    /// Eliminate column `k` below the diagonal. Returns the pivot row chosen.
    fn eliminate(&mut self, k: usize) -> Result<usize, ComputeError> {
        let grid = *self.layout.grid();
        let pc = self.layout.owner_col(k);
        let lk = self.layout.local_col(k);

        // Pivot search: reduce (|a_ik|, i) over the process column that owns column k.
        let mut pivot = (0.0_f64, k);
        for pr in 0..grid.rows() {
            let local = &self.locals[grid.rank(pr, pc)];
            let rows = &self.row_maps[pr];
            let start = rows.partition_point(|&i| i < k);
            for (li, &i) in rows.iter().enumerate().skip(start) {
                let magnitude = local[[li, lk]].norm();
                if magnitude > pivot.0 || (magnitude == pivot.0 && i < pivot.1) {
                    pivot = (magnitude, i);
                }
            }
        }
        if pivot.0 == 0.0 || !pivot.0.is_finite() {
            return Err(ComputeError::Singular { column: k });
        }
        if pivot.1 != k {
            self.swap_rows(k, pivot.1);
        }

        let pivot_row = self.broadcast_row(k);
        let diagonal = pivot_row[k];

        let n = self.layout.shape().0;
        let mut multipliers = vec![Complex64::new(0.0, 0.0); n];
        for pr in 0..grid.rows() {
            let local = &self.locals[grid.rank(pr, pc)];
            let rows = &self.row_maps[pr];
            let start = rows.partition_point(|&i| i <= k);
            for (li, &i) in rows.iter().enumerate().skip(start) {
                multipliers[i] = local[[li, lk]] / diagonal;
            }
        }

        let row_maps = &self.row_maps;
        let col_maps = &self.col_maps;
        let cols = grid.cols();
        self.locals.par_iter_mut().enumerate().for_each(|(rank, local)| {
            let (pr, pc) = (rank / cols, rank % cols);
            let rows = &row_maps[pr];
            let columns = &col_maps[pc];
            let row_start = rows.partition_point(|&i| i <= k);
            let col_start = columns.partition_point(|&j| j <= k);
            for li in row_start..rows.len() {
                let m = multipliers[rows[li]];
                if m == Complex64::new(0.0, 0.0) {
                    continue;
                }
                for lj in col_start..columns.len() {
                    local[[li, lj]] -= m * pivot_row[columns[lj]];
                }
            }
        });

        Ok(pivot.1)
    }

    /// Back substitution on an eliminated `n × (n+1)` augmented matrix.
    fn back_substitute(&self) -> Array1<Complex64> {
        let grid = *self.layout.grid();
        let n = self.layout.shape().0;
        let mut x = Array1::<Complex64>::zeros(n);
        let zero = Complex64::new(0.0, 0.0);
        for k in (0..n).rev() {
            let pr = self.layout.owner_row(k);
            let lk = self.layout.local_row(k);
            // Partial (diagonal, rhs, Σ u_kj x_j) from each rank of process row pr.
            let (diagonal, rhs, sum) = (0..grid.cols())
                .into_par_iter()
                .map(|pc| {
                    let local = &self.locals[grid.rank(pr, pc)];
                    let mut part = (zero, zero, zero);
                    for (lj, &j) in self.col_maps[pc].iter().enumerate() {
                        let u = local[[lk, lj]];
                        if j == n {
                            part.1 = u;
                        } else if j == k {
                            part.0 = u;
                        } else if j > k {
                            part.2 += u * x[j];
                        }
                    }
                    part
                })
                .reduce(|| (zero, zero, zero), |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2));
            x[k] = (rhs - sum) / diagonal;
        }
        x
    }
}

impl LinearOperator for DistributedMatrix {
    fn dim(&self) -> usize {
        self.layout.shape().0
    }

    fn apply(&self, x: &Array1<Complex64>) -> Array1<Complex64> {
        self.matvec(x)
    }
}

/// Mutable references to two distinct entries of a slice.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (head, tail) = items.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}

/// Solve $\mathbf{A}\mathbf{x} = \mathbf{b}$ by LU with partial pivoting on a process grid.
///
/// The solution is gathered back to every participant.
pub fn lu_solve(
    matrix: &Array2<Complex64>,
    rhs: &Array1<Complex64>,
    grid: ProcessGrid,
    block: usize,
) -> Result<Array1<Complex64>, ComputeError> {
    check_system(matrix, rhs.len())?;
    let n = matrix.nrows();
    let augmented = Array2::from_shape_fn((n, n + 1), |(i, j)| if j < n { matrix[[i, j]] } else { rhs[i] });

    let mut distributed = DistributedMatrix::scatter(&augmented, grid, block)?;
    let mut swaps = 0usize;
    for k in 0..n {
        if distributed.eliminate(k)? != k {
            swaps += 1;
        }
    }
    debug!(
        "distributed LU: n={} grid={}x{} block={} row swaps={}",
        n,
        grid.rows(),
        grid.cols(),
        block,
        swaps
    );
    Ok(distributed.back_substitute())
}

/// Backend executing on an in-process 2-D process grid.
pub struct DistributedBackend {
    grid: ProcessGrid,
    block_size: usize,
}

impl DistributedBackend {
    pub fn new(grid: ProcessGrid, block_size: usize) -> Result<Self, ComputeError> {
        if block_size == 0 {
            return Err(ComputeError::InvalidGrid("block size must be positive".into()));
        }
        Ok(Self { grid, block_size })
    }

    pub fn grid(&self) -> &ProcessGrid {
        &self.grid
    }
}

impl Default for DistributedBackend {
    fn default() -> Self {
        Self {
            grid: ProcessGrid::single(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl ComputeBackend for DistributedBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!(
                "Process grid {}x{} (block {})",
                self.grid.rows(),
                self.grid.cols(),
                self.block_size
            ),
            backend_type: BackendType::Distributed,
            compute_units: self.grid.size(),
        }
    }

    fn operator<'a>(
        &self,
        matrix: &'a Array2<Complex64>,
    ) -> Result<Box<dyn LinearOperator + 'a>, ComputeError> {
        check_system(matrix, matrix.nrows())?;
        Ok(Box::new(DistributedMatrix::scatter(matrix, self.grid, self.block_size)?))
    }

    fn dense_solve(
        &self,
        matrix: &Array2<Complex64>,
        rhs: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>, ComputeError> {
        lu_solve(matrix, rhs, self.grid, self.block_size)
    }
}
