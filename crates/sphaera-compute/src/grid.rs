//! Process grids, communication groups and the block-cyclic layout.
//!
//! A [`ProcessGrid`] arranges `rows × cols` ranks in row-major order. A
//! dense matrix is dealt out to the grid in square blocks of size
//! [`BlockCyclic::block`]: block $(I, J)$ lives on rank
//! $(I \bmod P_r, J \bmod P_c)$. The grid is fixed for the lifetime of a
//! solver; a [`ProcessGroup`] may be larger than the grid, in which case the
//! surplus ranks hold no data and only receive results by broadcast.

use serde::Serialize;

use crate::backend::ComputeError;

/// Block size used by the distributed dense solve unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// A 2-D arrangement of compute ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessGrid {
    rows: usize,
    cols: usize,
}

impl ProcessGrid {
    /// Create a `rows × cols` grid. Both extents must be non-zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self, ComputeError> {
        if rows == 0 || cols == 0 {
            return Err(ComputeError::InvalidGrid(format!(
                "grid extents must be positive, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols })
    }

    /// The trivial grid with a single rank.
    pub fn single() -> Self {
        Self { rows: 1, cols: 1 }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of ranks in the grid.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether `rank` participates in the grid.
    pub fn is_active(&self, rank: usize) -> bool {
        rank < self.size()
    }

    /// Grid coordinates `(row, col)` of `rank`, or `None` outside the grid.
    pub fn coords(&self, rank: usize) -> Option<(usize, usize)> {
        self.is_active(rank).then(|| (rank / self.cols, rank % self.cols))
    }

    /// Rank at grid coordinates `(row, col)`.
    pub fn rank(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }
}

impl Default for ProcessGrid {
    fn default() -> Self {
        Self::single()
    }
}

/// A communication group of ranks that may extend beyond the active grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGroup {
    size: usize,
}

impl ProcessGroup {
    pub fn new(size: usize) -> Result<Self, ComputeError> {
        if size == 0 {
            return Err(ComputeError::InvalidGrid(
                "a communication group needs at least one rank".into(),
            ));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Fail unless every rank of `grid` is also a member of this group.
    pub fn check_covers(&self, grid: &ProcessGrid) -> Result<(), ComputeError> {
        if self.size < grid.size() {
            return Err(ComputeError::InvalidGrid(format!(
                "communication group of {} ranks cannot host a {}x{} grid",
                self.size,
                grid.rows(),
                grid.cols()
            )));
        }
        Ok(())
    }

    /// Broadcast the root's value to every member; entry `r` is what rank `r` holds afterwards.
    pub fn broadcast<T: Clone>(&self, root: &T) -> Vec<T> {
        vec![root.clone(); self.size]
    }
}

/// Block-cyclic distribution of a `rows × cols` matrix over a [`ProcessGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCyclic {
    grid: ProcessGrid,
    block: usize,
    rows: usize,
    cols: usize,
}

impl BlockCyclic {
    pub fn new(grid: ProcessGrid, block: usize, rows: usize, cols: usize) -> Result<Self, ComputeError> {
        if block == 0 {
            return Err(ComputeError::InvalidGrid("block size must be positive".into()));
        }
        Ok(Self {
            grid,
            block,
            rows,
            cols,
        })
    }

    pub fn grid(&self) -> &ProcessGrid {
        &self.grid
    }

    pub fn block(&self) -> usize {
        self.block
    }

    /// Global shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Process row owning global row `i`.
    pub fn owner_row(&self, i: usize) -> usize {
        (i / self.block) % self.grid.rows
    }

    /// Process column owning global column `j`.
    pub fn owner_col(&self, j: usize) -> usize {
        (j / self.block) % self.grid.cols
    }

    /// Index of global row `i` inside its owner's local storage.
    pub fn local_row(&self, i: usize) -> usize {
        local_index(i, self.block, self.grid.rows)
    }

    /// Index of global column `j` inside its owner's local storage.
    pub fn local_col(&self, j: usize) -> usize {
        local_index(j, self.block, self.grid.cols)
    }

    /// Global rows held by process row `pr`, in local order.
    pub fn rows_of(&self, pr: usize) -> Vec<usize> {
        owned_indices(self.rows, self.block, self.grid.rows, pr)
    }

    /// Global columns held by process column `pc`, in local order.
    pub fn cols_of(&self, pc: usize) -> Vec<usize> {
        owned_indices(self.cols, self.block, self.grid.cols, pc)
    }
}

fn local_index(global: usize, block: usize, nprocs: usize) -> usize {
    (global / (block * nprocs)) * block + global % block
}

fn owned_indices(extent: usize, block: usize, nprocs: usize, proc: usize) -> Vec<usize> {
    (0..extent)
        .step_by(block)
        .enumerate()
        .filter(|(b, _)| b % nprocs == proc)
        .flat_map(|(_, start)| start..(start + block).min(extent))
        .collect()
}
