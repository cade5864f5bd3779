//! Spectral decomposition of row-stochastic matrices.
//!
//! Reversible matrices are decomposed through the symmetrization
//! `S = D^{1/2} P D^{-1/2}` (D = diag of the stationary distribution), which
//! guarantees a real spectrum and orthogonal modes. Non-reversible matrices
//! go through the general (Schur) eigenproblem; their eigenvectors are
//! recovered by shifted inverse iteration and are only available when the
//! spectrum is real.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::error::MsmError;

/// Acceptable residual `max |mu P - mu|` for a stationary vector.
const STATIONARY_RESIDUAL_TOL: f64 = 1e-8;

/// Imaginary parts below this magnitude are treated as zero.
const REAL_SPECTRUM_TOL: f64 = 1e-9;

/// Shift retries for inverse iteration when the shifted matrix is singular.
const INVERSE_ITERATION_SHIFTS: [f64; 3] = [1e-10, 1e-8, 1e-6];

/// The cached spectral decomposition of one transition matrix.
#[derive(Debug, Clone)]
pub(crate) struct Spectral {
    /// Eigenvalues ordered by descending real part.
    pub(crate) eigenvalues: Array1<f64>,
    /// Stationary probability vector.
    pub(crate) stationary: Array1<f64>,
    /// Implied relaxation timescales for the n-1 sub-leading eigenvalues,
    /// in lag-time units.
    pub(crate) timescales: Array1<f64>,
    /// Left/right eigenvector rows; `None` when the spectrum has a complex
    /// pair (possible only for non-reversible matrices).
    pub(crate) modes: Option<Modes>,
}

/// Left and right eigenvectors, one mode per row, ordered like the
/// eigenvalues.
#[derive(Debug, Clone)]
pub(crate) struct Modes {
    pub(crate) left: Array2<f64>,
    pub(crate) right: Array2<f64>,
}

/// Computes the full decomposition of `p`.
pub(crate) fn decompose(
    p: &Array2<f64>,
    reversible: bool,
    lag: usize,
) -> Result<Spectral, MsmError> {
    let stationary = stationary_distribution(p)?;
    if reversible {
        let (eigenvalues, modes) = reversible_modes(p, &stationary);
        let moduli: Vec<f64> = eigenvalues.iter().map(|&ev| ev.abs()).collect();
        let timescales = timescales_from(&moduli, lag);
        return Ok(Spectral {
            eigenvalues,
            stationary,
            timescales,
            modes: Some(modes),
        });
    }

    let a = to_dmatrix(p);
    let complex = a.complex_eigenvalues();
    let mut pairs: Vec<(f64, f64)> = complex.iter().map(|c| (c.re, c.im)).collect();
    pairs.sort_by(|x, y| {
        y.0.partial_cmp(&x.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| y.1.partial_cmp(&x.1).unwrap_or(std::cmp::Ordering::Equal))
    });
    let eigenvalues = Array1::from_iter(pairs.iter().map(|&(re, _)| re));
    let moduli: Vec<f64> = pairs.iter().map(|&(re, im)| re.hypot(im)).collect();
    let timescales = timescales_from(&moduli, lag);

    let has_complex = pairs.iter().any(|&(_, im)| im.abs() > REAL_SPECTRUM_TOL);
    let modes = if has_complex {
        debug!("complex eigenvalue pair present; eigenvector queries will fail");
        None
    } else {
        Some(general_modes(&a, &eigenvalues, &stationary)?)
    };
    Ok(Spectral {
        eigenvalues,
        stationary,
        timescales,
        modes,
    })
}

/// Solves for the stationary distribution of `p`.
///
/// The stationarity equations `mu P = mu` have rank n-1 for an irreducible
/// chain; the last equation is replaced by the normalization `sum(mu) = 1`
/// and the system solved by LU decomposition. A singular system, a
/// non-positive solution, or a large residual all indicate a chain without a
/// unique stationary distribution.
pub(crate) fn stationary_distribution(p: &Array2<f64>) -> Result<Array1<f64>, MsmError> {
    let n = p.nrows();
    let mut a = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            a[(i, j)] = p[(j, i)];
        }
        a[(i, i)] -= 1.0;
    }
    for j in 0..n {
        a[(n - 1, j)] = 1.0;
    }
    let mut b = DVector::<f64>::zeros(n);
    b[n - 1] = 1.0;

    let solution = a.lu().solve(&b).ok_or(MsmError::NotIrreducible)?;
    if solution.iter().any(|&x| !x.is_finite() || x <= 1e-14) {
        return Err(MsmError::NotIrreducible);
    }
    let mut mu = Array1::from_iter(solution.iter().copied());
    mu /= mu.sum();

    let drift = mu.dot(p) - &mu;
    let residual = drift.iter().fold(0.0_f64, |acc, &d| acc.max(d.abs()));
    if residual > STATIONARY_RESIDUAL_TOL {
        return Err(MsmError::NotIrreducible);
    }
    Ok(mu)
}

/// Decomposes a reversible matrix through its symmetrization.
fn reversible_modes(p: &Array2<f64>, mu: &Array1<f64>) -> (Array1<f64>, Modes) {
    let n = p.nrows();
    let sqrt_mu = mu.mapv(f64::sqrt);
    let mut s = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            s[(i, j)] = sqrt_mu[i] * p[(i, j)] / sqrt_mu[j];
        }
    }
    // Detailed balance holds to tolerance only; make S exactly symmetric.
    let s = (&s + &s.transpose()) * 0.5;
    let eig = SymmetricEigen::new(s);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut eigenvalues = Array1::zeros(n);
    let mut left = Array2::zeros((n, n));
    let mut right = Array2::zeros((n, n));
    for (k, &idx) in order.iter().enumerate() {
        eigenvalues[k] = eig.eigenvalues[idx];
        for i in 0..n {
            let v = eig.eigenvectors[(i, idx)];
            left[(k, i)] = v * sqrt_mu[i];
            right[(k, i)] = v / sqrt_mu[i];
        }
    }
    // Exact conventions for the stationary mode: right mode 0 is all ones,
    // left mode 0 is the stationary distribution. The orthonormal modes
    // already satisfy l_k . r_k = 1 for k >= 1.
    for i in 0..n {
        right[(0, i)] = 1.0;
        left[(0, i)] = mu[i];
    }
    let mut modes = Modes { left, right };
    normalize_signs(&mut modes);
    (eigenvalues, modes)
}

/// Recovers left/right eigenvectors of a general matrix with a real
/// spectrum by shifted inverse iteration.
fn general_modes(
    a: &DMatrix<f64>,
    eigenvalues: &Array1<f64>,
    mu: &Array1<f64>,
) -> Result<Modes, MsmError> {
    let n = a.nrows();
    let a_t = a.transpose();
    let mut left = Array2::zeros((n, n));
    let mut right = Array2::zeros((n, n));

    for i in 0..n {
        right[(0, i)] = 1.0;
        left[(0, i)] = mu[i];
    }
    for k in 1..n {
        let r = inverse_iteration(a, eigenvalues[k])?;
        let l = inverse_iteration(&a_t, eigenvalues[k])?;
        // Scale the left vector so that l_k . r_k = 1.
        let pairing: f64 = (0..n).map(|i| l[i] * r[i]).sum();
        if pairing.abs() < 1e-12 {
            return Err(MsmError::SpectralFailure(format!(
                "degenerate left/right pairing for eigenvalue {}",
                eigenvalues[k]
            )));
        }
        for i in 0..n {
            right[(k, i)] = r[i];
            left[(k, i)] = l[i] / pairing;
        }
    }
    let mut modes = Modes { left, right };
    normalize_signs(&mut modes);
    Ok(modes)
}

/// One eigenvector of `a` for the (approximately known) eigenvalue `lambda`.
///
/// The shift keeps the factored matrix non-singular; if LU still fails the
/// shift is widened, a bounded number of times.
fn inverse_iteration(a: &DMatrix<f64>, lambda: f64) -> Result<DVector<f64>, MsmError> {
    let n = a.nrows();
    for &shift in &INVERSE_ITERATION_SHIFTS {
        let m = a - DMatrix::identity(n, n) * (lambda + shift);
        let lu = m.lu();
        let mut v = DVector::from_fn(n, |i, _| 1.0 + 1e-3 * (i as f64 + 1.0));
        v /= v.norm();
        for _ in 0..100 {
            let Some(mut w) = lu.solve(&v) else { break };
            let norm = w.norm();
            if !norm.is_finite() || norm < 1e-300 {
                break;
            }
            w /= norm;
            // Converged when the direction stops changing (up to sign).
            let delta = (&w - &v).norm().min((&w + &v).norm());
            v = w;
            if delta < 1e-13 {
                return Ok(v);
            }
        }
    }
    Err(MsmError::SpectralFailure(format!(
        "inverse iteration did not converge for eigenvalue {lambda}"
    )))
}

/// Fixes the sign of every mode deterministically.
///
/// The anchor is the first component of the right eigenvector whose
/// magnitude reaches 10% of the row maximum; that component is forced
/// positive, and the matching left eigenvector receives the same flip so
/// the pairing `l_k . r_k` is preserved. Anchoring on the first significant
/// index (rather than the largest-magnitude one) keeps the orientation
/// stable across posterior samples even when two components are nearly
/// tied, which is what makes per-sample eigenvectors averageable.
fn normalize_signs(modes: &mut Modes) {
    let n = modes.right.nrows();
    for k in 0..n {
        let mut max_mag = 0.0_f64;
        for i in 0..n {
            max_mag = max_mag.max(modes.right[(k, i)].abs());
        }
        if max_mag == 0.0 {
            continue;
        }
        let anchor = (0..n)
            .find(|&i| modes.right[(k, i)].abs() >= 0.1 * max_mag)
            .unwrap_or(0);
        if modes.right[(k, anchor)] < 0.0 {
            for i in 0..n {
                modes.right[(k, i)] = -modes.right[(k, i)];
                modes.left[(k, i)] = -modes.left[(k, i)];
            }
        }
    }
}

/// Relaxation timescales `-lag / ln|lambda|` for the sub-leading moduli.
///
/// The modulus is used so oscillatory (negative or complex) modes still
/// report a finite decay time; `|lambda| >= 1` reports infinity.
fn timescales_from(moduli: &[f64], lag: usize) -> Array1<f64> {
    if moduli.len() <= 1 {
        return Array1::zeros(0);
    }
    Array1::from_iter(moduli.iter().skip(1).map(|&m| {
        if m >= 1.0 {
            f64::INFINITY
        } else if m <= 0.0 {
            0.0
        } else {
            -(lag as f64) / m.ln()
        }
    }))
}

fn to_dmatrix(p: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(p.nrows(), p.ncols(), |i, j| p[(i, j)])
}
