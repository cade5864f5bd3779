//! Row-stochastic transition matrices.

use ndarray::{Array2, ArrayView1};

use crate::error::MsmError;

/// Tolerance for row sums before exact renormalization.
const ROW_SUM_TOL: f64 = 1e-8;

/// An n x n row-stochastic transition matrix.
///
/// Each row `i` holds the probabilities of transitioning from state `i` to
/// every state. Construction validates the matrix and renormalizes each row
/// to sum to exactly 1, so downstream spectral code can rely on the
/// invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    probs: Array2<f64>,
}

impl TransitionMatrix {
    /// Validates and wraps a probability matrix.
    ///
    /// Checks that the matrix is square and non-empty, that all entries are
    /// finite and within `[-1e-12, 1 + 1e-12]` (tiny negative excursions
    /// from floating-point arithmetic are clamped to zero), and that each
    /// row sums to 1 within `1e-8`. Rows are then divided by their exact sum.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::InvalidMatrix`] describing the first violation.
    pub fn new(mut probs: Array2<f64>) -> Result<Self, MsmError> {
        let (rows, cols) = probs.dim();
        if rows != cols {
            return Err(MsmError::InvalidMatrix {
                reason: format!("matrix is {rows}x{cols}, expected square"),
            });
        }
        if rows == 0 {
            return Err(MsmError::InvalidMatrix {
                reason: "matrix is empty".into(),
            });
        }
        for ((i, j), p) in probs.indexed_iter_mut() {
            if !p.is_finite() {
                return Err(MsmError::InvalidMatrix {
                    reason: format!("probs[{i}][{j}] is not finite: {p}"),
                });
            }
            if *p < -1e-12 || *p > 1.0 + 1e-12 {
                return Err(MsmError::InvalidMatrix {
                    reason: format!("probs[{i}][{j}] = {p} is outside [0, 1]"),
                });
            }
            if *p < 0.0 {
                *p = 0.0;
            }
        }
        for (i, mut row) in probs.rows_mut().into_iter().enumerate() {
            let sum: f64 = row.sum();
            if (sum - 1.0).abs() > ROW_SUM_TOL {
                return Err(MsmError::InvalidMatrix {
                    reason: format!("row {i} sums to {sum}, expected ~1.0"),
                });
            }
            row /= sum;
        }
        Ok(Self { probs })
    }

    /// Returns the number of states.
    pub fn n_states(&self) -> usize {
        self.probs.nrows()
    }

    /// Returns the probability of transitioning from `i` to `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.probs[(i, j)]
    }

    /// Returns the transition probabilities out of state `i`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.probs.row(i)
    }

    /// Returns the full probability matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.probs
    }

    /// Largest violation of detailed balance under a probability vector `mu`,
    /// `max_ij |mu_i P_ij - mu_j P_ji|`.
    pub fn detailed_balance_violation(&self, mu: ArrayView1<'_, f64>) -> f64 {
        let n = self.n_states();
        let mut worst = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                let flow = mu[i] * self.probs[(i, j)] - mu[j] * self.probs[(j, i)];
                worst = worst.max(flow.abs());
            }
        }
        worst
    }
}
