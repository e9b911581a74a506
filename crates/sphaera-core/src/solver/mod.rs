//! Multiple-scattering solver.
//!
//! [`Solver`] owns a geometry, an excitation and the system assembled from
//! them, and turns it into scattered and internal coefficients.
//!
//! # Method selection
//!
//! Chosen per [`Solver::solve`] call from the [`SolverConfig`]:
//!
//! - **Krylov** (GMRES, BiCGSTAB, TFQMR): when iterative parameters are
//!   supplied. Matrix-vector products run on the CPU backend, or on the
//!   process grid when it has more than one rank.
//! - **Distributed dense**: block-cyclic LU when the grid has more than one
//!   rank and no iterative parameters are given.
//! - **Direct**: column-pivoted QR on a single compute unit otherwise.
//!
//! None of the paths retries or falls back to another on failure.

pub mod assembly;
pub mod direct;
pub mod dispatch;
pub mod iterative;
pub mod parameters;

use log::info;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sphaera_compute::{ProcessGrid, ProcessGroup, DEFAULT_BLOCK_SIZE};
use thiserror::Error;

use crate::excitation::Excitation;
use crate::geometry::Geometry;
use crate::harmonics::flat_max;
use crate::nonlinear::SourceMode;
use crate::types::ScatteringResult;

use assembly::AssembledSystem;
pub use dispatch::SolveStrategy;
pub use parameters::{IterativeSettings, KrylovMethod, ParameterValue, SolverParameters};

/// Errors that can occur during assembly or solve.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver failed to converge after {max_iter} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { max_iter: usize, residual: f64 },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Scatterer {index} has truncation order {found}, expected {expected}")]
    TruncationMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Linear algebra error: {0}")]
    LinAlgError(String),

    #[error("Compute backend error: {0}")]
    ComputeError(#[from] sphaera_compute::ComputeError),
}

/// Where the transfer operators enter the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formulation {
    /// Solve directly for scattered coefficients.
    #[default]
    Direct,
    /// Solve for the field exciting each sphere, then apply $T_i$.
    Indirect,
}

/// Compute resources and solver options.
#[derive(Debug, Clone, Serialize)]
pub struct SolverConfig {
    pub grid: ProcessGrid,
    /// Block size of the block-cyclic distribution.
    pub block_size: usize,
    /// Krylov parameters; `None` selects a dense factorisation.
    pub iterative: Option<SolverParameters>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            grid: ProcessGrid::single(),
            block_size: DEFAULT_BLOCK_SIZE,
            iterative: None,
        }
    }
}

/// A multiple-scattering problem with its assembled system.
#[derive(Debug, Clone)]
pub struct Solver {
    geometry: Geometry,
    excitation: Excitation,
    formulation: Formulation,
    n_max: usize,
    config: SolverConfig,
    system: AssembledSystem,
    prior: Option<ScatteringResult>,
}

impl Solver {
    /// Validate the geometry and assemble the system.
    pub fn new(
        geometry: Geometry,
        excitation: Excitation,
        formulation: Formulation,
        n_max: usize,
        config: SolverConfig,
    ) -> Result<Self, SolverError> {
        Self::build(geometry, excitation, formulation, n_max, config, None)
    }

    fn build(
        geometry: Geometry,
        excitation: Excitation,
        formulation: Formulation,
        n_max: usize,
        config: SolverConfig,
        prior: Option<ScatteringResult>,
    ) -> Result<Self, SolverError> {
        let source = match &prior {
            Some(result) => SourceMode::PriorResult(result),
            None => SourceMode::Incident,
        };
        let system = assembly::populate(&geometry, &excitation, formulation, n_max, source)?;
        Ok(Self {
            geometry,
            excitation,
            formulation,
            n_max,
            config,
            system,
            prior,
        })
    }

    /// Solve the assembled system and recover internal coefficients.
    pub fn solve(&self) -> Result<ScatteringResult, SolverError> {
        let strategy = SolveStrategy::select(&self.config)?;
        info!(
            "Solving {} unknowns ({} spheres, n_max {}) with {strategy}",
            self.scattering_size(),
            self.geometry.len(),
            self.n_max
        );
        let raw = strategy.solve(&self.system.matrix, &self.system.rhs)?;
        let omega = self.excitation.omega();
        let scattered = match self.formulation {
            Formulation::Direct => raw,
            Formulation::Indirect => assembly::to_scattered(&self.geometry, omega, &raw, self.n_max)?,
        };
        let internal = assembly::recover_internal(&self.geometry, omega, &scattered, self.n_max)?;
        Ok(ScatteringResult {
            n_max: self.n_max,
            scattered,
            internal,
        })
    }

    /// Solve on the grid and hand the result to every member of `group`.
    ///
    /// Members outside the grid take no part in the solve; they receive the
    /// result by broadcast. Entry `r` of the returned vector is what rank `r`
    /// holds afterwards.
    pub fn solve_in_group(&self, group: &ProcessGroup) -> Result<Vec<ScatteringResult>, SolverError> {
        group.check_covers(&self.config.grid)?;
        let result = self.solve()?;
        info!(
            "Broadcasting result from {}-rank grid to {}-member group",
            self.config.grid.size(),
            group.size()
        );
        Ok(group.broadcast(&result))
    }

    /// Replace the problem and reassemble. A prior second-harmonic source is dropped.
    ///
    /// On failure the solver keeps its previous state.
    pub fn update(
        &mut self,
        geometry: Geometry,
        excitation: Excitation,
        n_max: usize,
    ) -> Result<(), SolverError> {
        *self = Self::build(
            geometry,
            excitation,
            self.formulation,
            n_max,
            self.config.clone(),
            None,
        )?;
        Ok(())
    }

    /// Solver for the second-harmonic problem driven by `result`.
    pub fn second_harmonic(&self, result: &ScatteringResult) -> Result<Solver, SolverError> {
        Self::build(
            self.geometry.clone(),
            self.excitation.at_harmonic(2),
            self.formulation,
            self.n_max,
            self.config.clone(),
            Some(result.clone()),
        )
    }

    /// Use a Krylov method for subsequent solves.
    pub fn set_iterative(&mut self, parameters: SolverParameters) {
        self.config.iterative = Some(parameters);
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The assembled matrix $S$ and right-hand side $Q$.
    pub fn system(&self) -> (&Array2<Complex64>, &Array1<Complex64>) {
        (&self.system.matrix, &self.system.rhs)
    }

    /// Total number of unknowns, $N \cdot 2F$.
    pub fn scattering_size(&self) -> usize {
        self.geometry.len() * 2 * flat_max(self.n_max)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn excitation(&self) -> &Excitation {
        &self.excitation
    }

    pub fn formulation(&self) -> Formulation {
        self.formulation
    }

    pub fn n_max(&self) -> usize {
        self.n_max
    }

    /// The prior solution driving this system, for second-harmonic solvers.
    pub fn prior(&self) -> Option<&ScatteringResult> {
        self.prior.as_ref()
    }
}
