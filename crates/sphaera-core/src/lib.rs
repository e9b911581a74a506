//! # Sphaera Core
//!
//! The numerical backbone of sphaera: electromagnetic multiple scattering
//! by ensembles of spheres in the T-matrix formalism. Fields around every
//! sphere are expanded in vector spherical wave functions truncated at
//! order $n_{\max}$; the interaction between spheres is captured by
//! translation (coupling) coefficients, and the boundary conditions on all
//! spheres together form one dense block linear system.
//!
//! ## Architecture
//!
//! ```text
//! Geometry + Excitation ──► assembly ──► (S, Q) ──► solver dispatch ──► X_sca ──► X_int
//!                              ▲
//!                 translation::Coupling (coaxial recurrence + rotation)
//! ```
//!
//! The entry point is [`solver::Solver`].
//!
//! ## Modules
//!
//! - [`types`]: Positions, electromagnetic properties, result containers.
//! - [`special`]: Spherical Bessel and Hankel functions of complex argument.
//! - [`harmonics`]: Harmonic indexing, spherical harmonics, Wigner d.
//! - [`vsh`]: Vector spherical wave functions $\mathbf{M}$ and $\mathbf{N}$.
//! - [`translation`]: Coaxial recurrence, rotation, coupling blocks.
//! - [`scatterer`]: Spheres and their Mie T-operators.
//! - [`geometry`]: Collections of scatterers in a background medium.
//! - [`excitation`]: Plane-wave incident fields.
//! - [`nonlinear`]: Second-harmonic source terms from a prior solution.
//! - [`solver`]: System assembly, direct/distributed/iterative solves.

pub mod excitation;
pub mod geometry;
pub mod harmonics;
pub mod nonlinear;
pub mod scatterer;
pub mod solver;
pub mod special;
pub mod translation;
pub mod types;
pub mod vsh;
