//! Collections of spherical scatterers in a shared background medium.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::excitation::Excitation;
use crate::nonlinear;
use crate::scatterer::Scatterer;
use crate::solver::SolverError;
use crate::types::{ElectroMagnetic, ScatteringResult};

/// Ordered scatterers plus the background medium they sit in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    objects: Vec<Scatterer>,
    background: ElectroMagnetic,
}

impl Geometry {
    pub fn new(background: ElectroMagnetic) -> Self {
        Self {
            objects: Vec::new(),
            background,
        }
    }

    /// Add a sphere, rejecting non-positive radii and overlaps with existing spheres.
    pub fn push_object(&mut self, object: Scatterer) -> Result<(), SolverError> {
        if object.radius.is_nan() || object.radius <= 0.0 {
            return Err(SolverError::InvalidGeometry(format!(
                "sphere radius must be positive, got {}",
                object.radius
            )));
        }
        if let Some(index) = self.objects.iter().position(|other| {
            other.center.distance_to(&object.center) < other.radius + object.radius
        }) {
            return Err(SolverError::InvalidGeometry(format!(
                "sphere {} overlaps sphere {index}",
                self.objects.len()
            )));
        }
        self.objects.push(object);
        Ok(())
    }

    pub fn objects(&self) -> &[Scatterer] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn background(&self) -> &ElectroMagnetic {
        &self.background
    }

    /// Check every scatterer is truncated at `n_max`.
    pub fn validate_truncation(&self, n_max: usize) -> Result<(), SolverError> {
        match self.objects.iter().position(|o| o.n_max != n_max) {
            Some(index) => Err(SolverError::TruncationMismatch {
                index,
                expected: n_max,
                found: self.objects[index].n_max,
            }),
            None => Ok(()),
        }
    }

    /// Set the truncation order of every scatterer.
    pub fn set_truncation(&mut self, n_max: usize) {
        for object in &mut self.objects {
            object.n_max = n_max;
        }
    }

    pub fn object(&self, index: usize) -> Result<&Scatterer, SolverError> {
        self.objects.get(index).ok_or_else(|| {
            SolverError::InvalidGeometry(format!(
                "scatterer index {index} out of range for {} objects",
                self.objects.len()
            ))
        })
    }

    pub fn local_transfer_operator(
        &self,
        omega: f64,
        index: usize,
        n_max: usize,
    ) -> Result<Array2<Complex64>, SolverError> {
        Ok(self
            .object(index)?
            .local_transfer_operator(omega, &self.background, n_max))
    }

    /// Incident-field coefficients about scatterer `index`.
    pub fn local_incident_from_excitation(
        &self,
        excitation: &Excitation,
        index: usize,
        n_max: usize,
    ) -> Result<Array1<Complex64>, SolverError> {
        Ok(excitation.local_incident(&self.object(index)?.center, n_max))
    }

    pub fn internal_recovery_operator(
        &self,
        omega: f64,
        index: usize,
        n_max: usize,
    ) -> Result<Array1<Complex64>, SolverError> {
        Ok(self
            .object(index)?
            .internal_recovery_operator(omega, &self.background, n_max))
    }

    /// Second-harmonic source about scatterer `index` generated by a prior solution.
    pub fn local_source_from_solution(
        &self,
        excitation: &Excitation,
        prior: &ScatteringResult,
        index: usize,
        n_max: usize,
    ) -> Result<Array1<Complex64>, SolverError> {
        self.object(index)?;
        let sources = nonlinear::nonlinear_sources(self, prior, n_max)?;
        Ok(nonlinear::local_source(self, excitation.wavenumber(), &sources, index, n_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Spherical;

    fn sphere(x: f64, radius: f64, n_max: usize) -> Scatterer {
        Scatterer::new(
            Spherical::from_cartesian([x, 0.0, 0.0]),
            ElectroMagnetic::new(Complex64::new(2.0, 0.0), Complex64::new(1.0, 0.0)),
            radius,
            n_max,
        )
    }

    #[test]
    fn test_rejects_overlap() {
        let mut g = Geometry::new(ElectroMagnetic::vacuum());
        g.push_object(sphere(0.0, 1.0, 3)).unwrap();
        assert!(matches!(
            g.push_object(sphere(1.5, 1.0, 3)),
            Err(SolverError::InvalidGeometry(_))
        ));
        g.push_object(sphere(2.5, 1.0, 3)).unwrap();
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_rejects_bad_radius() {
        let mut g = Geometry::new(ElectroMagnetic::vacuum());
        assert!(g.push_object(sphere(0.0, 0.0, 3)).is_err());
        assert!(g.push_object(sphere(0.0, f64::NAN, 3)).is_err());
        assert!(g.is_empty());
    }

    #[test]
    fn test_truncation_checks() {
        let mut g = Geometry::new(ElectroMagnetic::vacuum());
        g.push_object(sphere(0.0, 1.0, 3)).unwrap();
        g.push_object(sphere(3.0, 1.0, 4)).unwrap();
        match g.validate_truncation(3) {
            Err(SolverError::TruncationMismatch {
                index,
                expected,
                found,
            }) => {
                assert_eq!((index, expected, found), (1, 3, 4));
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
        g.set_truncation(5);
        assert!(g.validate_truncation(5).is_ok());
    }

    #[test]
    fn test_index_out_of_range() {
        let g = Geometry::new(ElectroMagnetic::vacuum());
        assert!(g.local_transfer_operator(1e15, 0, 2).is_err());
    }
}
