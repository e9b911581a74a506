//! Second-harmonic sources built from a prior solution.
//!
//! The fundamental-frequency internal field of each sphere drives a
//! nonlinear polarisation, modelled through the sphere's effective
//! second-order susceptibility as outgoing source coefficients
//! $\mathbf{s}_j = \chi_j\,\mathbf{X}_{\text{int},j}$. The source seen by
//! sphere $i$ is its own plus the translated sources of every other sphere:
//! $\mathbf{s}_i + \sum_{j \ne i} \mathcal{T}(i \leftarrow j)\,\mathbf{s}_j$.
//!
//! The prior result travels as an explicit [`SourceMode`] into assembly;
//! the geometry is never modified to carry it.

use ndarray::{s, Array1};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::geometry::Geometry;
use crate::harmonics::flat_max;
use crate::solver::SolverError;
use crate::translation::{Coupling, TranslationKind};
use crate::types::ScatteringResult;

/// What drives the right-hand side of an assembled system.
#[derive(Debug, Clone, Copy)]
pub enum SourceMode<'a> {
    /// The external incident wave.
    Incident,
    /// A previously computed fundamental-frequency solution.
    PriorResult(&'a ScatteringResult),
}

/// Per-sphere nonlinear source coefficients $\chi_j \mathbf{X}_{\text{int},j}$.
pub fn nonlinear_sources(
    geometry: &Geometry,
    prior: &ScatteringResult,
    n_max: usize,
) -> Result<Vec<Array1<Complex64>>, SolverError> {
    if prior.n_max != n_max {
        return Err(SolverError::InvalidConfiguration(format!(
            "prior solution has truncation order {}, system uses {n_max}",
            prior.n_max
        )));
    }
    let segment = 2 * flat_max(n_max);
    if prior.internal.len() != geometry.len() * segment {
        return Err(SolverError::InvalidConfiguration(format!(
            "prior solution holds {} coefficients, geometry needs {}",
            prior.internal.len(),
            geometry.len() * segment
        )));
    }
    Ok(geometry
        .objects()
        .iter()
        .enumerate()
        .map(|(j, object)| {
            let chi = object.properties.chi2;
            prior
                .internal
                .slice(s![j * segment..(j + 1) * segment])
                .mapv(|c| c * chi)
        })
        .collect())
}

/// Total source about sphere `index`.
pub fn local_source(
    geometry: &Geometry,
    wavenumber: Complex64,
    sources: &[Array1<Complex64>],
    index: usize,
    n_max: usize,
) -> Array1<Complex64> {
    let objects = geometry.objects();
    let target = &objects[index].center;
    let mut total = sources[index].clone();
    for (j, object) in objects.iter().enumerate() {
        if j == index || sources[j].iter().all(|c| c.norm() == 0.0) {
            continue;
        }
        let displacement = target.displacement_from(&object.center);
        let coupling =
            Coupling::new(displacement, wavenumber, n_max, TranslationKind::SingularToRegular);
        total += &coupling.block().dot(&sources[j]);
    }
    total
}

/// Sources about every sphere, computed in parallel.
pub fn local_sources(
    geometry: &Geometry,
    wavenumber: Complex64,
    prior: &ScatteringResult,
    n_max: usize,
) -> Result<Vec<Array1<Complex64>>, SolverError> {
    let sources = nonlinear_sources(geometry, prior, n_max)?;
    Ok((0..geometry.len())
        .into_par_iter()
        .map(|i| local_source(geometry, wavenumber, &sources, i, n_max))
        .collect())
}
