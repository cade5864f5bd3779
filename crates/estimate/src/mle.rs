//! Maximum-likelihood transition matrix estimators.
//!
//! These produce the point estimate (the "prior" model) that the posterior
//! ensemble is centred on: plain row normalization for the unconstrained
//! case, and the detailed-balance fixed-point iterations for the reversible
//! and fixed-stationary cases.

use ndarray::{Array1, Array2};
use tracing::debug;

use crate::error::EstimateError;

/// Iteration cap for the fixed-point solvers.
const MAX_FIXED_POINT_ITER: usize = 10_000;

/// Convergence tolerance (max absolute change per iteration).
const FIXED_POINT_TOL: f64 = 1e-12;

/// Row-normalized counts: the unconstrained maximum-likelihood estimate.
///
/// # Errors
///
/// Returns [`EstimateError::InsufficientData`] if a row has no count mass.
pub fn mle_unconstrained(counts: &Array2<f64>) -> Result<Array2<f64>, EstimateError> {
    let n = counts.nrows();
    let mut probs = counts.clone();
    for (i, mut row) in probs.rows_mut().into_iter().enumerate() {
        let sum: f64 = row.sum();
        if sum <= 0.0 {
            return Err(EstimateError::InsufficientData { state: i });
        }
        row /= sum;
    }
    debug_assert_eq!(probs.dim(), (n, n));
    Ok(probs)
}

/// Reversible maximum-likelihood estimate by the detailed-balance
/// fixed-point iteration.
///
/// The estimate is parameterized by a symmetric matrix X with
/// `P_ij = x_ij / r_i` (`r_i` the row sum); the likelihood-stationarity
/// condition gives the update
/// `x_ij <- (c_ij + c_ji) / (c_i / r_i + c_j / r_j)`,
/// iterated from the symmetrized counts until the normalized X stops
/// changing. Entries with no symmetrized count mass stay exactly zero.
///
/// # Errors
///
/// Returns [`EstimateError::InsufficientData`] if a row has no count mass.
pub fn mle_reversible(counts: &Array2<f64>) -> Result<Array2<f64>, EstimateError> {
    let n = counts.nrows();
    let row_counts: Vec<f64> = (0..n).map(|i| counts.row(i).sum()).collect();
    if let Some(state) = row_counts.iter().position(|&c| c <= 0.0) {
        return Err(EstimateError::InsufficientData { state });
    }

    // Initialize at the symmetrized counts, normalized to total 1.
    let mut x = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            x[(i, j)] = (counts[(i, j)] + counts[(j, i)]) / 2.0;
        }
    }
    let total = x.sum();
    x /= total;

    let mut iterations = 0;
    for iter in 0..MAX_FIXED_POINT_ITER {
        iterations = iter + 1;
        let row_sums: Vec<f64> = (0..n).map(|i| x.row(i).sum()).collect();
        let mut next = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                let sym = counts[(i, j)] + counts[(j, i)];
                if sym > 0.0 {
                    next[(i, j)] =
                        sym / (row_counts[i] / row_sums[i] + row_counts[j] / row_sums[j]);
                }
            }
        }
        let next_total = next.sum();
        next /= next_total;

        let delta = x
            .iter()
            .zip(next.iter())
            .fold(0.0_f64, |acc, (&a, &b)| acc.max((a - b).abs()));
        x = next;
        if delta < FIXED_POINT_TOL {
            break;
        }
    }
    debug!(iterations, "reversible MLE fixed point finished");

    let mut probs = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let r: f64 = x.row(i).sum();
        for j in 0..n {
            probs[(i, j)] = x[(i, j)] / r;
        }
    }
    Ok(probs)
}

/// Reversible maximum-likelihood estimate with a prescribed stationary
/// distribution, by the Lagrange-dual fixed point.
///
/// With the marginals of the symmetric X pinned to `pi`, the stationarity
/// conditions read `x_ij = (c_ij + c_ji) / (lambda_i + lambda_j)` off the
/// diagonal and `x_ii = c_ii / lambda_i`, with one multiplier per state
/// solving the row-sum constraint. The multiplier update is
/// `lambda_i <- (c_ii + sum_j (c_ij + c_ji) lambda_i / (lambda_i + lambda_j)) / pi_i`.
///
/// `pi` must already be normalized, positive, and length-matched (the
/// estimator validates before calling).
///
/// # Errors
///
/// Returns [`EstimateError::InsufficientData`] if a row has no count mass.
pub fn mle_fixed_pi(counts: &Array2<f64>, pi: &Array1<f64>) -> Result<Array2<f64>, EstimateError> {
    let n = counts.nrows();
    let row_counts: Vec<f64> = (0..n).map(|i| counts.row(i).sum()).collect();
    if let Some(state) = row_counts.iter().position(|&c| c <= 0.0) {
        return Err(EstimateError::InsufficientData { state });
    }

    let mut lambda: Vec<f64> = (0..n).map(|i| row_counts[i] / pi[i]).collect();
    let mut iterations = 0;
    for iter in 0..MAX_FIXED_POINT_ITER {
        iterations = iter + 1;
        let mut next = vec![0.0_f64; n];
        for i in 0..n {
            let mut acc = counts[(i, i)];
            for j in 0..n {
                if j != i {
                    let sym = counts[(i, j)] + counts[(j, i)];
                    if sym > 0.0 {
                        acc += sym * lambda[i] / (lambda[i] + lambda[j]);
                    }
                }
            }
            next[i] = acc / pi[i];
        }
        let delta = lambda
            .iter()
            .zip(next.iter())
            .fold(0.0_f64, |acc, (&a, &b)| acc.max((a - b).abs() / b.max(1e-300)));
        lambda = next;
        if delta < FIXED_POINT_TOL {
            break;
        }
    }
    debug!(iterations, "fixed-pi MLE fixed point finished");

    let mut probs = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                probs[(i, i)] = counts[(i, i)] / lambda[i] / pi[i];
            } else {
                let sym = counts[(i, j)] + counts[(j, i)];
                if sym > 0.0 {
                    probs[(i, j)] = sym / (lambda[i] + lambda[j]) / pi[i];
                }
            }
        }
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn unconstrained_row_normalizes() {
        let counts = array![[9.0, 1.0], [2.0, 8.0]];
        let p = mle_unconstrained(&counts).unwrap();
        assert_relative_eq!(p[(0, 0)], 0.9, epsilon = 1e-12);
        assert_relative_eq!(p[(1, 0)], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn unconstrained_zero_row_errors() {
        let counts = array![[0.0, 0.0], [2.0, 8.0]];
        assert!(matches!(
            mle_unconstrained(&counts),
            Err(EstimateError::InsufficientData { state: 0 })
        ));
    }

    #[test]
    fn reversible_matches_direct_estimate_for_symmetric_counts() {
        // For exactly symmetric counts the reversible MLE coincides with
        // plain row normalization.
        let counts = array![[90.0, 10.0], [10.0, 90.0]];
        let p = mle_reversible(&counts).unwrap();
        assert_relative_eq!(p[(0, 1)], 0.1, epsilon = 1e-9);
        assert_relative_eq!(p[(1, 0)], 0.1, epsilon = 1e-9);
    }

    #[test]
    fn reversible_estimate_satisfies_detailed_balance() {
        let counts = array![[50.0, 4.0, 1.0], [6.0, 60.0, 5.0], [2.0, 7.0, 70.0]];
        let p = mle_reversible(&counts).unwrap();
        // Stationary weights are the row sums of the converged X; recover
        // them from the detailed-balance structure: mu_i P_ij = mu_j P_ji.
        // Solve for mu from the first row's balance conditions.
        let mu0 = 1.0;
        let mu1 = mu0 * p[(0, 1)] / p[(1, 0)];
        let mu2 = mu0 * p[(0, 2)] / p[(2, 0)];
        // Check the remaining pair.
        assert_relative_eq!(mu1 * p[(1, 2)], mu2 * p[(2, 1)], epsilon = 1e-9);
        // Rows sum to one.
        for i in 0..3 {
            assert_relative_eq!(p.row(i).sum(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn reversible_keeps_unobserved_support_zero() {
        let counts = array![[50.0, 5.0, 0.0], [4.0, 60.0, 6.0], [0.0, 5.0, 70.0]];
        let p = mle_reversible(&counts).unwrap();
        assert_eq!(p[(0, 2)], 0.0);
        assert_eq!(p[(2, 0)], 0.0);
    }

    #[test]
    fn fixed_pi_reproduces_target() {
        let counts = array![[90.0, 10.0], [10.0, 90.0]];
        let pi = array![0.3, 0.7];
        let p = mle_fixed_pi(&counts, &pi).unwrap();
        // Rows sum to one and detailed balance holds with respect to pi.
        for i in 0..2 {
            assert_relative_eq!(p.row(i).sum(), 1.0, epsilon = 1e-9);
        }
        assert_relative_eq!(pi[0] * p[(0, 1)], pi[1] * p[(1, 0)], epsilon = 1e-10);
    }

    #[test]
    fn fixed_pi_with_balanced_target_matches_reversible() {
        // When the target equals the reversible MLE's own stationary
        // distribution, both estimators agree.
        let counts = array![[90.0, 10.0], [10.0, 90.0]];
        let p_rev = mle_reversible(&counts).unwrap();
        let pi = array![0.5, 0.5];
        let p_pin = mle_fixed_pi(&counts, &pi).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(p_rev[(i, j)], p_pin[(i, j)], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn fixed_pi_three_state() {
        let counts = array![[50.0, 4.0, 1.0], [6.0, 60.0, 5.0], [2.0, 7.0, 70.0]];
        let pi = array![0.2, 0.3, 0.5];
        let p = mle_fixed_pi(&counts, &pi).unwrap();
        for i in 0..3 {
            assert_relative_eq!(p.row(i).sum(), 1.0, epsilon = 1e-8);
            for j in 0..3 {
                assert!(p[(i, j)] >= 0.0);
                assert_relative_eq!(
                    pi[i] * p[(i, j)],
                    pi[j] * p[(j, i)],
                    epsilon = 1e-10
                );
            }
        }
    }
}
