//! Run-time choice of how an assembled system is solved.

use std::fmt;

use log::{debug, info};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use sphaera_compute::{ComputeBackend, CpuBackend, DistributedBackend, ProcessGrid};

use super::direct::solve_direct;
use super::iterative::solve_iterative;
use super::parameters::IterativeSettings;
use super::{SolverConfig, SolverError};

/// Strategy for one solve call.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStrategy {
    /// Column-pivoted QR on a single compute unit.
    Direct,
    /// Block-cyclic LU over a process grid.
    DistributedDense { grid: ProcessGrid, block_size: usize },
    /// Krylov iteration; products run on the grid when it has several ranks.
    Krylov {
        settings: IterativeSettings,
        grid: ProcessGrid,
        block_size: usize,
    },
}

impl SolveStrategy {
    /// Iterative parameters take precedence, then the grid size.
    pub fn select(config: &SolverConfig) -> Result<Self, SolverError> {
        let strategy = match &config.iterative {
            Some(parameters) => SolveStrategy::Krylov {
                settings: parameters.settings()?,
                grid: config.grid,
                block_size: config.block_size,
            },
            None if config.grid.size() > 1 => SolveStrategy::DistributedDense {
                grid: config.grid,
                block_size: config.block_size,
            },
            None => SolveStrategy::Direct,
        };
        debug!("Selected solve strategy: {strategy}");
        Ok(strategy)
    }

    pub fn solve(
        &self,
        matrix: &Array2<Complex64>,
        rhs: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>, SolverError> {
        match self {
            SolveStrategy::Direct => solve_direct(matrix, rhs),
            SolveStrategy::DistributedDense { grid, block_size } => {
                let backend = DistributedBackend::new(*grid, *block_size)?;
                Ok(backend.dense_solve(matrix, rhs)?)
            }
            SolveStrategy::Krylov {
                settings,
                grid,
                block_size,
            } => {
                let backend: Box<dyn ComputeBackend> = if grid.size() > 1 {
                    Box::new(DistributedBackend::new(*grid, *block_size)?)
                } else {
                    Box::new(CpuBackend::new())
                };
                let operator = backend.operator(matrix)?;
                let outcome = solve_iterative(operator.as_ref(), rhs, settings)?;
                info!(
                    "{} converged on {}: {} products, residual {:.2e}",
                    settings.method,
                    backend.device_info().name,
                    outcome.iterations,
                    outcome.residual
                );
                Ok(outcome.solution)
            }
        }
    }
}

impl fmt::Display for SolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStrategy::Direct => write!(f, "direct QR"),
            SolveStrategy::DistributedDense { grid, block_size } => write!(
                f,
                "distributed LU on {}x{} grid (block {block_size})",
                grid.rows(),
                grid.cols()
            ),
            SolveStrategy::Krylov { settings, grid, .. } => write!(
                f,
                "{} over {} rank(s)",
                settings.method,
                grid.size()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::parameters::{KrylovMethod, SolverParameters};

    #[test]
    fn test_single_unit_defaults_to_direct() {
        let strategy = SolveStrategy::select(&SolverConfig::default()).unwrap();
        assert_eq!(strategy, SolveStrategy::Direct);
    }

    #[test]
    fn test_grid_selects_distributed_dense() {
        let config = SolverConfig {
            grid: ProcessGrid::new(2, 2).unwrap(),
            ..SolverConfig::default()
        };
        assert!(matches!(
            SolveStrategy::select(&config).unwrap(),
            SolveStrategy::DistributedDense { .. }
        ));
    }

    #[test]
    fn test_iterative_parameters_take_precedence() {
        let config = SolverConfig {
            grid: ProcessGrid::new(2, 1).unwrap(),
            iterative: Some(SolverParameters::new().with("solver", "bicgstab")),
            ..SolverConfig::default()
        };
        match SolveStrategy::select(&config).unwrap() {
            SolveStrategy::Krylov { settings, grid, .. } => {
                assert_eq!(settings.method, KrylovMethod::BiCgStab);
                assert_eq!(grid.size(), 2);
            }
            other => panic!("expected Krylov, got {other}"),
        }
    }

    #[test]
    fn test_bad_parameters_fail_selection() {
        let config = SolverConfig {
            iterative: Some(SolverParameters::new().with("solver", "jacobi")),
            ..SolverConfig::default()
        };
        assert!(SolveStrategy::select(&config).is_err());
    }

    #[test]
    fn test_strategies_agree_on_small_system() {
        let n = 12;
        let matrix = Array2::from_shape_fn((n, n), |(i, j)| {
            let off = Complex64::new(((i * 5 + j * 3) % 7) as f64 / 28.0, ((i + 2 * j) % 5) as f64 / 40.0);
            if i == j {
                off + Complex64::new(3.0, 0.0)
            } else {
                off
            }
        });
        let rhs = Array1::from_shape_fn(n, |i| Complex64::new(1.0, i as f64 * 0.2));
        let reference = SolveStrategy::Direct.solve(&matrix, &rhs).unwrap();
        let grid = ProcessGrid::new(2, 2).unwrap();
        let settings = SolverParameters::new().settings().unwrap();
        for strategy in [
            SolveStrategy::DistributedDense { grid, block_size: 3 },
            SolveStrategy::Krylov {
                settings,
                grid,
                block_size: 3,
            },
            SolveStrategy::Krylov {
                settings,
                grid: ProcessGrid::single(),
                block_size: 3,
            },
        ] {
            let x = strategy.solve(&matrix, &rhs).unwrap();
            let err: f64 = (&x - &reference).iter().map(|c| c.norm()).fold(0.0, f64::max);
            assert!(err < 1e-9, "{strategy}: {err}");
        }
    }
}
