//! Assembly of the multiple-scattering system $S X = Q$.
//!
//! Block row $i$ (size $2F$) encodes the boundary conditions on sphere $i$.
//! With $T_i$ the local T-operator and $\mathcal{T}_{ij}$ the translation
//! of outgoing waves about $j$ into regular waves about $i$:
//!
//! | Formulation | $S_{ii}$ | $S_{ij}$ | $Q_i$ | Unknown |
//! |-------------|----------|----------|-------|---------|
//! | Direct | $I$ | $-T_i\,\mathcal{T}_{ij}$ | $T_i\,\mathbf{a}_i$ | $X_{\text{sca}}$ |
//! | Indirect | $I$ | $-\mathcal{T}_{ij}\,T_j$ | $\mathbf{a}_i$ | $y$, with $X_{\text{sca},i} = T_i y_i$ |
//!
//! Block rows are independent and computed in parallel; the layout of $S$
//! does not depend on the order they finish in.

use log::debug;
use ndarray::{s, Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;

use super::{Formulation, SolverError};
use crate::excitation::Excitation;
use crate::geometry::Geometry;
use crate::harmonics::flat_max;
use crate::nonlinear::{self, SourceMode};
use crate::translation::{Coupling, TranslationKind};

/// Dense system matrix and right-hand side.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    pub matrix: Array2<Complex64>,
    pub rhs: Array1<Complex64>,
}

/// Build $S$ and $Q$ for `geometry` under `excitation`.
pub fn populate(
    geometry: &Geometry,
    excitation: &Excitation,
    formulation: Formulation,
    n_max: usize,
    source: SourceMode<'_>,
) -> Result<AssembledSystem, SolverError> {
    if geometry.is_empty() {
        return Err(SolverError::InvalidGeometry("geometry has no scatterers".into()));
    }
    geometry.validate_truncation(n_max)?;
    let (medium, illuminating) = (geometry.background(), excitation.background());
    if medium.epsilon_r != illuminating.epsilon_r || medium.mu_r != illuminating.mu_r {
        return Err(SolverError::InvalidConfiguration(format!(
            "excitation propagates in (eps {}, mu {}) but the scatterers sit in (eps {}, mu {})",
            illuminating.epsilon_r, illuminating.mu_r, medium.epsilon_r, medium.mu_r
        )));
    }

    let count = geometry.len();
    let segment = 2 * flat_max(n_max);
    let dim = count * segment;
    let omega = excitation.omega();
    let wavenumber = excitation.wavenumber();

    let transfers = (0..count)
        .map(|i| geometry.local_transfer_operator(omega, i, n_max))
        .collect::<Result<Vec<_>, _>>()?;
    let incident = match source {
        SourceMode::Incident => (0..count)
            .map(|i| geometry.local_incident_from_excitation(excitation, i, n_max))
            .collect::<Result<Vec<_>, _>>()?,
        SourceMode::PriorResult(prior) => nonlinear::local_sources(geometry, wavenumber, prior, n_max)?,
    };
    debug!(
        "Assembling {formulation:?} system: {count} spheres, n_max {n_max}, {dim} unknowns"
    );

    let rows: Vec<(Array2<Complex64>, Array1<Complex64>)> = (0..count)
        .into_par_iter()
        .map(|i| {
            let target = &geometry.objects()[i].center;
            let mut row = Array2::<Complex64>::zeros((segment, dim));
            for j in 0..count {
                let mut block = row.slice_mut(s![.., j * segment..(j + 1) * segment]);
                if i == j {
                    block.diag_mut().fill(Complex64::new(1.0, 0.0));
                    continue;
                }
                let displacement = target.displacement_from(&geometry.objects()[j].center);
                let translation = Coupling::new(
                    displacement,
                    wavenumber,
                    n_max,
                    TranslationKind::SingularToRegular,
                )
                .block();
                let coupled = match formulation {
                    Formulation::Direct => transfers[i].dot(&translation),
                    Formulation::Indirect => translation.dot(&transfers[j]),
                };
                block.assign(&coupled.mapv(|c| -c));
            }
            let rhs = match formulation {
                Formulation::Direct => transfers[i].dot(&incident[i]),
                Formulation::Indirect => incident[i].clone(),
            };
            (row, rhs)
        })
        .collect();

    let mut matrix = Array2::<Complex64>::zeros((dim, dim));
    let mut rhs = Array1::<Complex64>::zeros(dim);
    for (i, (row, segment_rhs)) in rows.into_iter().enumerate() {
        matrix.slice_mut(s![i * segment..(i + 1) * segment, ..]).assign(&row);
        rhs.slice_mut(s![i * segment..(i + 1) * segment]).assign(&segment_rhs);
    }
    Ok(AssembledSystem { matrix, rhs })
}

/// Convert an indirect-formulation solution into scattered coefficients.
pub fn to_scattered(
    geometry: &Geometry,
    omega: f64,
    solution: &Array1<Complex64>,
    n_max: usize,
) -> Result<Array1<Complex64>, SolverError> {
    let segment = 2 * flat_max(n_max);
    let mut out = Array1::zeros(solution.len());
    for i in 0..geometry.len() {
        let range = s![i * segment..(i + 1) * segment];
        let transfer = geometry.local_transfer_operator(omega, i, n_max)?;
        out.slice_mut(range).assign(&transfer.dot(&solution.slice(range)));
    }
    Ok(out)
}

/// Internal-field coefficients from scattered ones, segment by segment.
pub fn recover_internal(
    geometry: &Geometry,
    omega: f64,
    scattered: &Array1<Complex64>,
    n_max: usize,
) -> Result<Array1<Complex64>, SolverError> {
    let segment = 2 * flat_max(n_max);
    let mut out = Array1::zeros(scattered.len());
    for i in 0..geometry.len() {
        let range = s![i * segment..(i + 1) * segment];
        let ratios = geometry.internal_recovery_operator(omega, i, n_max)?;
        out.slice_mut(range).assign(&(&scattered.slice(range) * &ratios));
    }
    Ok(out)
}
