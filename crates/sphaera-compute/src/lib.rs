//! # Sphaera Compute
//!
//! Execution backends for the sphaera multiple-scattering engine. The
//! [`ComputeBackend`](backend::ComputeBackend) trait isolates the physics
//! code in `sphaera-core` from where the linear algebra actually runs.
//!
//! ## Available backends
//!
//! | Backend | Type | Provides |
//! |---------|------|----------|
//! | [`CpuBackend`] | shared memory (Rayon) | parallel matrix-vector products |
//! | [`DistributedBackend`] | 2-D process grid, block-cyclic | dense LU solve, distributed matrix-vector products |
//!
//! Both backends are always compiled in; which one a solve uses is decided
//! at run time from the configured [`ProcessGrid`].

pub mod backend;
pub mod cpu;
pub mod distributed;
pub mod grid;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, LinearOperator};
pub use cpu::CpuBackend;
pub use distributed::{DistributedBackend, DistributedMatrix};
pub use grid::{BlockCyclic, ProcessGrid, ProcessGroup, DEFAULT_BLOCK_SIZE};
