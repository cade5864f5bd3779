//! Metropolis-Hastings sampling of reversible transition matrices with a
//! prescribed stationary distribution.
//!
//! The chain again lives on symmetric virtual count matrices X, but with
//! every row sum pinned to the target weight: `sum_k x_ik = pi_i`. The free
//! parameters are the off-diagonal pairs on the observed symmetric support;
//! a pair move transfers mass against the two complementary diagonal
//! entries, so the marginals never change and the emitted matrix
//! `P_ij = x_ij / pi_i` has stationary distribution `pi` by construction.
//!
//! Any strictly positive, length-matched target over a symmetrically
//! connected count graph is feasible (the diagonal entries absorb whatever
//! mass the off-diagonals do not carry), so infeasibility reduces to shape
//! and positivity violations of the target itself.

use moira_counts::CountMatrix;
use moira_msm::TransitionMatrix;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::config::SamplerConfig;
use crate::error::SamplerError;
use crate::support;

/// Share of each target weight reserved for the diagonal at
/// initialization, keeping the starting point strictly feasible.
const INIT_DIAGONAL_MARGIN: f64 = 0.5;

/// A proposed perturbation of one off-diagonal pair, with the complementary
/// diagonal adjustment implied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PairMove {
    i: usize,
    j: usize,
    new_value: f64,
}

/// Posterior sampler constrained to detailed balance and a fixed stationary
/// distribution.
///
/// Like [`ReversibleSampler`](crate::ReversibleSampler), the sampler owns
/// its Markov-chain state; consecutive draws are thinned continuations of
/// one chain after an initial burn-in.
#[derive(Debug, Clone)]
pub struct FixedPiSampler {
    /// Effective (smoothed) observed counts.
    counts: Array2<f64>,
    /// Normalized target stationary distribution.
    pi: Array1<f64>,
    /// Symmetric virtual counts with row sums pinned to `pi`.
    x: Array2<f64>,
    /// Pairs `i < j` with positive symmetrized count.
    pair_support: Vec<(usize, usize)>,
    burn_in_sweeps: usize,
    sweeps_per_sample: usize,
    burned_in: bool,
}

impl FixedPiSampler {
    /// Builds the sampler and initializes the chain at the symmetrized
    /// count matrix scaled into the feasible region.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::ConstraintInfeasible`] if `pi` has the wrong
    /// length or a non-positive or non-finite entry,
    /// [`SamplerError::InvalidCountMatrix`] if a state has no outgoing
    /// count mass after smoothing, and
    /// [`SamplerError::DisconnectedChain`] if the symmetrized count graph is
    /// not connected.
    pub fn new(
        counts: &CountMatrix,
        pi: &Array1<f64>,
        config: &SamplerConfig,
    ) -> Result<Self, SamplerError> {
        config.validate()?;
        let effective = support::effective_counts(counts, config.prior_count());
        support::validate_rows(&effective)?;
        let n = effective.nrows();
        if pi.len() != n {
            return Err(SamplerError::ConstraintInfeasible {
                reason: format!(
                    "stationary vector has length {}, expected {n}",
                    pi.len()
                ),
            });
        }
        if pi.iter().any(|&w| !w.is_finite() || w <= 0.0) {
            return Err(SamplerError::ConstraintInfeasible {
                reason: "stationary vector entries must be finite and positive".into(),
            });
        }
        if !support::symmetrically_connected(&effective) {
            return Err(SamplerError::DisconnectedChain);
        }
        let mut pi = pi.clone();
        let pi_sum = pi.sum();
        pi /= pi_sum;

        // Initial X: off-diagonals proportional to the symmetrized counts,
        // scaled so every diagonal keeps a strictly positive margin; the
        // diagonals then absorb the remainder of each pinned row sum.
        let mut sym = Array2::<f64>::zeros((n, n));
        let mut pair_support = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let s = effective[(i, j)] + effective[(j, i)];
                if s > 0.0 {
                    pair_support.push((i, j));
                    sym[(i, j)] = s;
                    sym[(j, i)] = s;
                }
            }
        }
        let mut scale = f64::INFINITY;
        for i in 0..n {
            let s_i: f64 = sym.row(i).sum();
            if s_i > 0.0 {
                scale = scale.min(INIT_DIAGONAL_MARGIN * pi[i] / s_i);
            }
        }
        if !scale.is_finite() {
            // No off-diagonal support at all; only possible for n == 1.
            scale = 0.0;
        }
        let mut x = Array2::<f64>::zeros((n, n));
        for &(i, j) in &pair_support {
            x[(i, j)] = scale * sym[(i, j)];
            x[(j, i)] = scale * sym[(j, i)];
        }
        for i in 0..n {
            let off: f64 = x.row(i).sum();
            x[(i, i)] = pi[i] - off;
        }

        Ok(Self {
            counts: effective,
            pi,
            x,
            pair_support,
            burn_in_sweeps: config.burn_in_sweeps(),
            sweeps_per_sample: config.sweeps_per_sample(),
            burned_in: false,
        })
    }

    /// Advances the chain and emits one transition matrix with stationary
    /// distribution `pi`.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidCountMatrix`] if the emitted matrix
    /// fails row-stochastic validation (not reachable from a valid chain
    /// state).
    pub fn sample(&mut self, rng: &mut impl Rng) -> Result<TransitionMatrix, SamplerError> {
        if !self.burned_in {
            let mut accepted = 0usize;
            let mut proposed = 0usize;
            for _ in 0..self.burn_in_sweeps {
                let (a, p) = self.sweep(rng);
                accepted += a;
                proposed += p;
            }
            if proposed > 0 {
                debug!(
                    acceptance = accepted as f64 / proposed as f64,
                    sweeps = self.burn_in_sweeps,
                    "fixed-pi sampler burn-in complete"
                );
            }
            self.burned_in = true;
        }
        for _ in 0..self.sweeps_per_sample {
            self.sweep(rng);
        }
        self.emit()
    }

    /// One systematic scan over every free pair. Returns
    /// `(accepted, proposed)`. Row sums are re-pinned exactly afterwards.
    pub(crate) fn sweep(&mut self, rng: &mut impl Rng) -> (usize, usize) {
        let mut accepted = 0usize;
        let mut proposed = 0usize;
        for k in 0..self.pair_support.len() {
            let (i, j) = self.pair_support[k];
            let mv = self.propose_pair(i, j, rng);
            proposed += 1;
            if self.metropolis_step(mv, rng) {
                accepted += 1;
            }
        }
        self.repin_rows();
        (accepted, proposed)
    }

    /// Proposes a multiplicative perturbation of the pair `x_ij = x_ji`.
    pub(crate) fn propose_pair(&self, i: usize, j: usize, rng: &mut impl Rng) -> PairMove {
        let sym = self.counts[(i, j)] + self.counts[(j, i)];
        let sigma = 1.0 / (1.0 + sym).sqrt();
        let eps: f64 = rng.sample(StandardNormal);
        PairMove {
            i,
            j,
            new_value: self.x[(i, j)] * (sigma * eps).exp(),
        }
    }

    /// Log acceptance ratio of a pair move, or `None` if the move is
    /// structurally invalid (a complementary diagonal would turn
    /// non-positive).
    pub(crate) fn log_acceptance(&self, mv: &PairMove) -> Option<f64> {
        let PairMove { i, j, new_value } = *mv;
        let old = self.x[(i, j)];
        let delta = new_value - old;
        let dii_new = self.x[(i, i)] - delta;
        let djj_new = self.x[(j, j)] - delta;
        if dii_new <= 0.0 || djj_new <= 0.0 {
            return None;
        }
        let dlog = new_value.ln() - old.ln();
        let sym = self.counts[(i, j)] + self.counts[(j, i)];
        let mut log_alpha = sym * dlog + dlog;
        if self.counts[(i, i)] > 0.0 {
            log_alpha += self.counts[(i, i)] * (dii_new.ln() - self.x[(i, i)].ln());
        }
        if self.counts[(j, j)] > 0.0 {
            log_alpha += self.counts[(j, j)] * (djj_new.ln() - self.x[(j, j)].ln());
        }
        Some(log_alpha)
    }

    /// Applies an accepted pair move, transferring mass against the two
    /// complementary diagonals so the row sums stay pinned.
    pub(crate) fn apply(&mut self, mv: PairMove) {
        let PairMove { i, j, new_value } = mv;
        let delta = new_value - self.x[(i, j)];
        self.x[(i, j)] = new_value;
        self.x[(j, i)] = new_value;
        self.x[(i, i)] -= delta;
        self.x[(j, j)] -= delta;
    }

    /// One propose-evaluate-accept step. Structurally invalid proposals
    /// count as rejections.
    pub(crate) fn metropolis_step(&mut self, mv: PairMove, rng: &mut impl Rng) -> bool {
        let Some(log_alpha) = self.log_acceptance(&mv) else {
            return false;
        };
        let accept = log_alpha >= 0.0 || rng.random::<f64>().ln() < log_alpha;
        if accept {
            self.apply(mv);
        }
        accept
    }

    /// Re-derives each diagonal from its pinned row sum, resetting
    /// accumulated floating-point drift.
    fn repin_rows(&mut self) {
        let n = self.x.nrows();
        for i in 0..n {
            let off: f64 = (0..n).filter(|&j| j != i).map(|j| self.x[(i, j)]).sum();
            self.x[(i, i)] = (self.pi[i] - off).max(0.0);
        }
    }

    /// The transition matrix of the current chain state,
    /// `P_ij = x_ij / pi_i`.
    fn emit(&self) -> Result<TransitionMatrix, SamplerError> {
        let n = self.x.nrows();
        let mut probs = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                probs[(i, j)] = self.x[(i, j)] / self.pi[i];
            }
        }
        TransitionMatrix::new(probs).map_err(|e| SamplerError::InvalidCountMatrix {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use moira_counts::CountMatrix;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn counts_2x2() -> CountMatrix {
        CountMatrix::from_counts(array![[90, 10], [10, 90]], 1).unwrap()
    }

    fn sampler(counts: &CountMatrix, pi: Array1<f64>) -> FixedPiSampler {
        let config = SamplerConfig::new().with_burn_in_sweeps(50).with_sweeps_per_sample(5);
        FixedPiSampler::new(counts, &pi, &config).unwrap()
    }

    // 1. stationary_distribution_is_pinned
    #[test]
    fn stationary_distribution_is_pinned() {
        let pi = array![0.3, 0.7];
        let mut s = sampler(&counts_2x2(), pi.clone());
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..30 {
            let p = s.sample(&mut rng).unwrap();
            // Detailed balance with respect to pi plus row-stochasticity
            // makes pi the stationary vector.
            assert!(p.detailed_balance_violation(pi.view()) < 1e-12);
            for i in 0..2 {
                assert_relative_eq!(p.row(i).sum(), 1.0, epsilon = 1e-10);
            }
        }
    }

    // 2. uniform_target_on_symmetric_counts
    #[test]
    fn uniform_target_on_symmetric_counts() {
        let pi = array![0.5, 0.5];
        let mut s = sampler(&counts_2x2(), pi.clone());
        let mut rng = StdRng::seed_from_u64(1);
        let p = s.sample(&mut rng).unwrap();
        // With pinned symmetric marginals, P[0][1] = P[1][0].
        assert_relative_eq!(p.get(0, 1), p.get(1, 0), epsilon = 1e-12);
    }

    // 3. wrong_length_target_rejected
    #[test]
    fn wrong_length_target_rejected() {
        let pi = array![0.2, 0.3, 0.5];
        assert!(matches!(
            FixedPiSampler::new(&counts_2x2(), &pi, &SamplerConfig::new()),
            Err(SamplerError::ConstraintInfeasible { .. })
        ));
    }

    // 4. non_positive_target_rejected
    #[test]
    fn non_positive_target_rejected() {
        let pi = array![1.0, 0.0];
        assert!(matches!(
            FixedPiSampler::new(&counts_2x2(), &pi, &SamplerConfig::new()),
            Err(SamplerError::ConstraintInfeasible { .. })
        ));
    }

    // 5. target_normalized_internally
    #[test]
    fn target_normalized_internally() {
        // Unnormalized target weights behave the same as their normalized
        // counterpart.
        let mut s = sampler(&counts_2x2(), array![3.0, 7.0]);
        let mut rng = StdRng::seed_from_u64(6);
        let p = s.sample(&mut rng).unwrap();
        let pi = array![0.3, 0.7];
        assert!(p.detailed_balance_violation(pi.view()) < 1e-12);
    }

    // 6. disconnected_counts_rejected
    #[test]
    fn disconnected_counts_rejected() {
        let counts = CountMatrix::from_counts(array![[5, 0], [0, 5]], 1).unwrap();
        let pi = array![0.5, 0.5];
        assert!(matches!(
            FixedPiSampler::new(&counts, &pi, &SamplerConfig::new()),
            Err(SamplerError::DisconnectedChain)
        ));
    }

    // 7. structurally_invalid_moves_rejected
    #[test]
    fn structurally_invalid_moves_rejected() {
        let s = sampler(&counts_2x2(), array![0.5, 0.5]);
        // A pair value exceeding the pinned row sum would drive the
        // diagonals negative.
        let mv = PairMove {
            i: 0,
            j: 1,
            new_value: 1.0,
        };
        assert!(s.log_acceptance(&mv).is_none());
    }

    // 8. deterministic_with_seed
    #[test]
    fn deterministic_with_seed() {
        let mut s1 = sampler(&counts_2x2(), array![0.4, 0.6]);
        let mut s2 = sampler(&counts_2x2(), array![0.4, 0.6]);
        let mut rng1 = StdRng::seed_from_u64(77);
        let mut rng2 = StdRng::seed_from_u64(77);
        assert_eq!(
            s1.sample(&mut rng1).unwrap().as_array(),
            s2.sample(&mut rng2).unwrap().as_array()
        );
    }

    // 9. three_state_chain_respects_target
    #[test]
    fn three_state_chain_respects_target() {
        let counts =
            CountMatrix::from_counts(array![[50, 5, 2], [4, 60, 6], [3, 5, 70]], 1).unwrap();
        let pi = array![0.2, 0.3, 0.5];
        let config = SamplerConfig::new().with_burn_in_sweeps(100);
        let mut s = FixedPiSampler::new(&counts, &pi, &config).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..10 {
            let p = s.sample(&mut rng).unwrap();
            assert!(p.detailed_balance_violation(pi.view()) < 1e-12);
        }
    }
}
