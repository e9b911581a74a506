//! Translation of vector spherical wave expansions between centres.
//!
//! A general displacement is handled by rotating the translation axis onto
//! $\hat{\mathbf{z}}$ ([`rotation`]), applying the coaxial recurrence
//! ([`coaxial`]) and rotating back ([`coupling`]).

pub mod coaxial;
pub mod coupling;
pub mod rotation;

use serde::{Deserialize, Serialize};

use crate::solver::SolverError;

pub use coaxial::CachedCoAxialRecurrence;
pub use coupling::Coupling;
pub use rotation::WignerTable;

/// Basis pair of a translation: the expanded field and its re-expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationKind {
    /// Outgoing waves about one centre re-expanded as regular waves about another.
    SingularToRegular,
    RegularToRegular,
    SingularToSingular,
}

impl TranslationKind {
    /// Classify a translation by the regularity of its source and target bases.
    ///
    /// A regular field cannot be re-expanded in outgoing waves, so
    /// regular→singular is rejected.
    pub fn from_bases(expansion_regular: bool, reexpansion_regular: bool) -> Result<Self, SolverError> {
        match (expansion_regular, reexpansion_regular) {
            (false, true) => Ok(TranslationKind::SingularToRegular),
            (true, true) => Ok(TranslationKind::RegularToRegular),
            (false, false) => Ok(TranslationKind::SingularToSingular),
            (true, false) => Err(SolverError::InvalidConfiguration(
                "regular-to-singular translation is undefined".into(),
            )),
        }
    }

    /// Whether the coaxial recurrence uses regular radial functions.
    pub fn coaxial_is_regular(self) -> bool {
        !matches!(self, TranslationKind::SingularToRegular)
    }
}
