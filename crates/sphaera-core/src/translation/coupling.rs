//! Diagonal/off-diagonal translation blocks for an arbitrary displacement.
//!
//! With $\mathbf{x} = \mathbf{r} + \mathbf{t}$,
//!
//! $$\mathbf{M}_n^m(\mathbf{x}) = \sum_{l\mu} A_{nm,l\mu}\,\mathbf{M}_l^\mu(\mathbf{r})
//!   + B_{nm,l\mu}\,\mathbf{N}_l^\mu(\mathbf{r}),\qquad
//!   \mathbf{N}_n^m(\mathbf{x}) = \sum_{l\mu} B_{nm,l\mu}\,\mathbf{M}_l^\mu(\mathbf{r})
//!   + A_{nm,l\mu}\,\mathbf{N}_l^\mu(\mathbf{r}),$$
//!
//! where, for $\mathbf{t} = (|t|, \theta, \phi)$,
//! $A_{nm,l\mu} = \sum_\nu e^{i(m-\mu)\phi}\, d^n_{m\nu}(\theta)\, d^l_{\mu\nu}(\theta)\, A_c(n,\nu,l)$
//! and likewise for $B$.

use ndarray::{s, Array2};
use num_complex::Complex64;

use super::coaxial::CachedCoAxialRecurrence;
use super::rotation::WignerTable;
use super::TranslationKind;
use crate::harmonics::{flat, flat_max, HarmonicsIterator};
use crate::types::Spherical;

/// Translation coefficients between two one-sphere bases, indexed
/// `[flat(n, m), flat(l, mu)]`.
#[derive(Debug, Clone)]
pub struct Coupling {
    /// $A$: M→M and N→N.
    pub diagonal: Array2<Complex64>,
    /// $B$: M→N and N→M.
    pub offdiagonal: Array2<Complex64>,
}

impl Coupling {
    pub fn new(
        displacement: [f64; 3],
        wavenumber: Complex64,
        n_max: usize,
        kind: TranslationKind,
    ) -> Self {
        let t = Spherical::from_cartesian(displacement);
        let n_top = n_max as i32;
        let mut coaxial = CachedCoAxialRecurrence::new(t.r, wavenumber, kind.coaxial_is_regular());
        let rotation = WignerTable::new(n_max, t.theta);

        // Vector coaxial coefficients, [n][l][nu + n_max].
        let width = (2 * n_max + 1) as usize;
        let zero = Complex64::new(0.0, 0.0);
        let mut axial = vec![(zero, zero); (n_max + 1) * (n_max + 1) * width];
        let axial_index =
            |n: i32, l: i32, nu: i32| ((n * (n_top + 1) + l) as usize) * width + (nu + n_top) as usize;
        for n in 1..=n_top {
            for l in 1..=n_top {
                let top = n.min(l);
                for nu in -top..=top {
                    axial[axial_index(n, l, nu)] = coaxial.vector(n, nu, l);
                }
            }
        }

        // e^{i j phi} for j in [-2 n_max, 2 n_max]
        let phases: Vec<Complex64> = (-2 * n_top..=2 * n_top)
            .map(|j| Complex64::from_polar(1.0, j as f64 * t.phi))
            .collect();

        let size = flat_max(n_max);
        let mut diagonal = Array2::zeros((size, size));
        let mut offdiagonal = Array2::zeros((size, size));
        for (n, m) in HarmonicsIterator::new(n_max) {
            let row = flat(n, m);
            for (l, mu) in HarmonicsIterator::new(n_max) {
                let top = n.min(l);
                let mut a = Complex64::new(0.0, 0.0);
                let mut b = Complex64::new(0.0, 0.0);
                for nu in -top..=top {
                    let weight = rotation.get(n, m, nu) * rotation.get(l, mu, nu);
                    let (ac, bc) = axial[axial_index(n, l, nu)];
                    a += ac * weight;
                    b += bc * weight;
                }
                let phase = phases[(m - mu + 2 * n_top) as usize];
                diagonal[[row, flat(l, mu)]] = a * phase;
                offdiagonal[[row, flat(l, mu)]] = b * phase;
            }
        }
        Self {
            diagonal,
            offdiagonal,
        }
    }

    /// Harmonics per block side.
    pub fn size(&self) -> usize {
        self.diagonal.nrows()
    }

    /// Coefficient-space operator $\begin{pmatrix} A^\top & B^\top \\ B^\top & A^\top \end{pmatrix}$.
    ///
    /// Maps `[M; N]` coefficients of a field about the source centre to the
    /// coefficients of the same field about the target centre.
    pub fn block(&self) -> Array2<Complex64> {
        let f = self.size();
        let mut out = Array2::zeros((2 * f, 2 * f));
        let a = self.diagonal.t();
        let b = self.offdiagonal.t();
        out.slice_mut(s![..f, ..f]).assign(&a);
        out.slice_mut(s![f.., f..]).assign(&a);
        out.slice_mut(s![..f, f..]).assign(&b);
        out.slice_mut(s![f.., ..f]).assign(&b);
        out
    }
}
