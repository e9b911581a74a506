//! Krylov subspace solvers over a [`LinearOperator`].
//!
//! The system matrix is only touched through matrix-vector products, so the
//! same code runs against a row-parallel operator on one node or a
//! block-cyclic operator on a process grid.
//!
//! - **GMRES(m)**: Arnoldi with modified Gram–Schmidt, complex Givens
//!   rotations on the Hessenberg matrix, restart after `m` steps.
//! - **BiCGSTAB**: two products per step, short recurrences.
//! - **TFQMR**: transpose-free QMR, two products per step with a cheap
//!   residual bound that is confirmed against the true residual.
//!
//! The iteration cap bounds the matrix-vector products that drive the
//! recurrences in every method; products spent confirming a residual are not
//! counted. Every method reports failure instead of a partial solution when
//! the cap is reached.

use log::{debug, warn};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use sphaera_compute::LinearOperator;

use super::parameters::{IterativeSettings, KrylovMethod};
use super::SolverError;

/// Outcome of a converged Krylov solve.
#[derive(Debug, Clone)]
pub struct KrylovOutcome {
    pub solution: Array1<Complex64>,
    /// Matrix-vector products performed.
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
}

/// Solve $A x = b$ with the configured method.
pub fn solve_iterative(
    operator: &dyn LinearOperator,
    rhs: &Array1<Complex64>,
    settings: &IterativeSettings,
) -> Result<KrylovOutcome, SolverError> {
    if operator.dim() != rhs.len() {
        return Err(SolverError::LinAlgError(format!(
            "operator of dimension {} applied to vector of length {}",
            operator.dim(),
            rhs.len()
        )));
    }
    if norm(rhs) == 0.0 {
        return Ok(KrylovOutcome {
            solution: Array1::zeros(rhs.len()),
            iterations: 0,
            residual: 0.0,
        });
    }
    debug!(
        "{} on {} unknowns (tolerance {:.1e}, cap {})",
        settings.method,
        rhs.len(),
        settings.tolerance,
        settings.max_iterations
    );
    match settings.method {
        KrylovMethod::Gmres => gmres(operator, rhs, settings),
        KrylovMethod::BiCgStab => bicgstab(operator, rhs, settings),
        KrylovMethod::Tfqmr => tfqmr(operator, rhs, settings),
    }
}

/// Conjugated inner product $\langle a, b \rangle = \sum \bar a_i b_i$.
fn dot(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Complex64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
}

fn norm(a: &Array1<Complex64>) -> f64 {
    a.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt()
}

fn residual_norm(operator: &dyn LinearOperator, x: &Array1<Complex64>, b: &Array1<Complex64>) -> f64 {
    norm(&(b - &operator.apply(x)))
}

/// Complex Givens rotation $(c, s)$ zeroing `b` against `a`.
fn givens(a: Complex64, b: Complex64) -> (f64, Complex64) {
    if b.norm() == 0.0 {
        (1.0, Complex64::new(0.0, 0.0))
    } else if a.norm() == 0.0 {
        (0.0, Complex64::new(1.0, 0.0))
    } else {
        let r = a.norm().hypot(b.norm());
        (a.norm() / r, a / a.norm() * b.conj() / r)
    }
}

/// Apply a rotation to the pair `(x, y)`.
fn rotate(c: f64, s: Complex64, x: Complex64, y: Complex64) -> (Complex64, Complex64) {
    (x * c + s * y, -s.conj() * x + y * c)
}

fn gmres(
    operator: &dyn LinearOperator,
    b: &Array1<Complex64>,
    settings: &IterativeSettings,
) -> Result<KrylovOutcome, SolverError> {
    let n = b.len();
    let restart = settings.restart.min(n).max(1);
    if settings.restart > n {
        warn!(
            "GMRES restart length {} exceeds system size {n}; using {restart}",
            settings.restart
        );
    }
    let b_norm = norm(b);
    let mut x = Array1::<Complex64>::zeros(n);
    let mut total = 0;

    loop {
        let r = b - &operator.apply(&x);
        let beta = norm(&r);
        let relative = beta / b_norm;
        if relative <= settings.tolerance {
            debug!("GMRES converged after {total} products (residual {relative:.2e})");
            return Ok(KrylovOutcome {
                solution: x,
                iterations: total,
                residual: relative,
            });
        }
        if total >= settings.max_iterations {
            return Err(SolverError::ConvergenceFailure {
                max_iter: settings.max_iterations,
                residual: relative,
            });
        }

        let mut basis: Vec<Array1<Complex64>> = Vec::with_capacity(restart + 1);
        basis.push(r.mapv(|c| c / beta));
        let mut h = Array2::<Complex64>::zeros((restart + 1, restart));
        let mut g = vec![Complex64::new(0.0, 0.0); restart + 1];
        g[0] = Complex64::new(beta, 0.0);
        let mut rotations: Vec<(f64, Complex64)> = Vec::with_capacity(restart);
        let mut steps = 0;

        for j in 0..restart {
            total += 1;
            let mut w = operator.apply(&basis[j]);
            for (i, v) in basis.iter().enumerate() {
                let hij = dot(v, &w);
                h[[i, j]] = hij;
                w.scaled_add(-hij, v);
            }
            let w_norm = norm(&w);
            h[[j + 1, j]] = Complex64::new(w_norm, 0.0);
            let breakdown = w_norm <= f64::MIN_POSITIVE;
            if !breakdown {
                basis.push(w.mapv(|c| c / w_norm));
            }

            for (i, &(c, s)) in rotations.iter().enumerate() {
                let (upper, lower) = rotate(c, s, h[[i, j]], h[[i + 1, j]]);
                h[[i, j]] = upper;
                h[[i + 1, j]] = lower;
            }
            let (c, s) = givens(h[[j, j]], h[[j + 1, j]]);
            rotations.push((c, s));
            h[[j, j]] = h[[j, j]] * c + s * h[[j + 1, j]];
            h[[j + 1, j]] = Complex64::new(0.0, 0.0);
            let (gj, gj1) = rotate(c, s, g[j], g[j + 1]);
            g[j] = gj;
            g[j + 1] = gj1;
            steps = j + 1;

            if g[j + 1].norm() / b_norm <= settings.tolerance
                || total >= settings.max_iterations
                || breakdown
            {
                break;
            }
        }

        // Back substitution on the triangularised Hessenberg system.
        let mut y = vec![Complex64::new(0.0, 0.0); steps];
        for i in (0..steps).rev() {
            let mut acc = g[i];
            for (t, yt) in y.iter().enumerate().skip(i + 1) {
                acc -= h[[i, t]] * yt;
            }
            y[i] = acc / h[[i, i]];
        }
        for (yi, v) in y.iter().zip(basis.iter()) {
            x.scaled_add(*yi, v);
        }
    }
}

fn bicgstab(
    operator: &dyn LinearOperator,
    b: &Array1<Complex64>,
    settings: &IterativeSettings,
) -> Result<KrylovOutcome, SolverError> {
    let n = b.len();
    let b_norm = norm(b);
    let mut x = Array1::<Complex64>::zeros(n);
    let mut r = b.clone();
    let shadow = r.clone();
    let one = Complex64::new(1.0, 0.0);
    let (mut rho_old, mut alpha, mut omega) = (one, one, one);
    let mut v = Array1::<Complex64>::zeros(n);
    let mut p = Array1::<Complex64>::zeros(n);
    let mut products = 0;
    let mut it = 0;

    while products < settings.max_iterations {
        it += 1;
        let rho = dot(&shadow, &r);
        if rho.norm() == 0.0 {
            warn!("BiCGSTAB breakdown (rho = 0) at step {it}");
            break;
        }
        if it == 1 {
            p.assign(&r);
        } else {
            let beta = (rho / rho_old) * (alpha / omega);
            p = &r + &((&p - &v.mapv(|c| c * omega)).mapv(|c| c * beta));
        }
        v = operator.apply(&p);
        products += 1;
        let sigma = dot(&shadow, &v);
        if sigma.norm() == 0.0 {
            warn!("BiCGSTAB breakdown (sigma = 0) at step {it}");
            break;
        }
        alpha = rho / sigma;
        let s = &r - &v.mapv(|c| c * alpha);
        let s_norm = norm(&s) / b_norm;
        if s_norm <= settings.tolerance {
            x.scaled_add(alpha, &p);
            debug!("BiCGSTAB converged after {products} products (residual {s_norm:.2e})");
            return Ok(KrylovOutcome {
                solution: x,
                iterations: products,
                residual: s_norm,
            });
        }
        if products >= settings.max_iterations {
            x.scaled_add(alpha, &p);
            break;
        }
        let t = operator.apply(&s);
        products += 1;
        let tt = dot(&t, &t);
        if tt.norm() == 0.0 {
            warn!("BiCGSTAB breakdown (t = 0) at step {it}");
            break;
        }
        omega = dot(&t, &s) / tt;
        x.scaled_add(alpha, &p);
        x.scaled_add(omega, &s);
        r = &s - &t.mapv(|c| c * omega);
        let relative = norm(&r) / b_norm;
        if relative <= settings.tolerance {
            debug!("BiCGSTAB converged after {products} products (residual {relative:.2e})");
            return Ok(KrylovOutcome {
                solution: x,
                iterations: products,
                residual: relative,
            });
        }
        rho_old = rho;
    }
    Err(SolverError::ConvergenceFailure {
        max_iter: settings.max_iterations,
        residual: residual_norm(operator, &x, b) / b_norm,
    })
}

fn tfqmr(
    operator: &dyn LinearOperator,
    b: &Array1<Complex64>,
    settings: &IterativeSettings,
) -> Result<KrylovOutcome, SolverError> {
    let n = b.len();
    let b_norm = norm(b);
    let mut x = Array1::<Complex64>::zeros(n);
    let shadow = b.clone();
    let mut w = b.clone();
    let mut y1 = b.clone();
    let mut v = operator.apply(&y1);
    let mut u1 = v.clone();
    let mut d = Array1::<Complex64>::zeros(n);
    let mut tau = b_norm;
    let mut theta = 0.0;
    let mut eta = Complex64::new(0.0, 0.0);
    let mut rho = dot(&shadow, b);
    let mut products = 1;
    let mut it = 0;

    while products < settings.max_iterations {
        let sigma = dot(&shadow, &v);
        if sigma.norm() == 0.0 || rho.norm() == 0.0 {
            warn!("TFQMR breakdown at step {it}");
            break;
        }
        let alpha = rho / sigma;
        let y2 = &y1 - &v.mapv(|c| c * alpha);
        let u2 = operator.apply(&y2);
        products += 1;

        for (j, (y, u)) in [(&y1, &u1), (&y2, &u2)].into_iter().enumerate() {
            w.scaled_add(-alpha, u);
            let coefficient = eta * (theta * theta) / alpha;
            d = y + &d.mapv(|c| c * coefficient);
            theta = norm(&w) / tau;
            let c = 1.0 / (1.0 + theta * theta).sqrt();
            tau *= theta * c;
            eta = alpha * (c * c);
            x.scaled_add(eta, &d);
            if tau * ((2 * it + j + 2) as f64).sqrt() <= settings.tolerance * b_norm {
                let relative = residual_norm(operator, &x, b) / b_norm;
                if relative <= settings.tolerance {
                    debug!("TFQMR converged after {products} products (residual {relative:.2e})");
                    return Ok(KrylovOutcome {
                        solution: x,
                        iterations: products,
                        residual: relative,
                    });
                }
            }
        }

        it += 1;
        if products >= settings.max_iterations {
            break;
        }
        let rho_new = dot(&shadow, &w);
        let beta = rho_new / rho;
        rho = rho_new;
        y1 = &w + &y2.mapv(|c| c * beta);
        u1 = operator.apply(&y1);
        products += 1;
        v = &u1 + &(&u2 + &v.mapv(|c| c * beta)).mapv(|c| c * beta);
    }
    Err(SolverError::ConvergenceFailure {
        max_iter: settings.max_iterations,
        residual: residual_norm(operator, &x, b) / b_norm,
    })
}
