//! Unconstrained row-wise Dirichlet sampling.

use moira_counts::CountMatrix;
use moira_msm::TransitionMatrix;
use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::config::SamplerConfig;
use crate::error::SamplerError;
use crate::support;

/// Posterior sampler without structural constraints.
///
/// Each row `i` is drawn independently from a Dirichlet distribution with
/// concentration `C[i,:] + 1` (the Bayesian posterior of a multinomial row
/// under a uniform Dirichlet prior). The Dirichlet draw is realized as
/// normalized `Gamma(alpha, 1)` variates, which supports the dynamic row
/// length; rows are renormalized exactly afterwards to guard against
/// floating-point drift.
///
/// Draws are independent across calls; the struct holds no chain state.
#[derive(Debug, Clone)]
pub struct DirichletSampler {
    /// Per-row Dirichlet concentrations, `effective_counts + 1`.
    alphas: Vec<Vec<f64>>,
    max_retries: usize,
}

impl DirichletSampler {
    /// Builds the sampler from observed counts.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidCountMatrix`] if the configuration is
    /// invalid or a state has no outgoing count mass after smoothing.
    pub fn new(counts: &CountMatrix, config: &SamplerConfig) -> Result<Self, SamplerError> {
        config.validate()?;
        let effective = support::effective_counts(counts, config.prior_count());
        support::validate_rows(&effective)?;
        let alphas = effective
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|&c| c + 1.0).collect())
            .collect();
        Ok(Self {
            alphas,
            max_retries: config.max_retries(),
        })
    }

    /// Draws one transition matrix from the posterior.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::DisconnectedChain`] if a row repeatedly
    /// degenerates to zero total mass (bounded by the configured retry
    /// count; practically unreachable for concentrations >= 1).
    pub fn sample(&self, rng: &mut impl Rng) -> Result<TransitionMatrix, SamplerError> {
        let n = self.alphas.len();
        let mut probs = Array2::<f64>::zeros((n, n));
        for (i, alphas) in self.alphas.iter().enumerate() {
            let row = self.draw_row(alphas, rng)?;
            for (j, &p) in row.iter().enumerate() {
                probs[(i, j)] = p;
            }
        }
        TransitionMatrix::new(probs).map_err(|e| SamplerError::InvalidCountMatrix {
            reason: e.to_string(),
        })
    }

    /// One Dirichlet draw via Gamma normalization, with bounded re-draws.
    fn draw_row(&self, alphas: &[f64], rng: &mut impl Rng) -> Result<Vec<f64>, SamplerError> {
        for _ in 0..self.max_retries {
            let mut row: Vec<f64> = Vec::with_capacity(alphas.len());
            for &alpha in alphas {
                let gamma = Gamma::new(alpha, 1.0).map_err(|e| {
                    SamplerError::InvalidCountMatrix {
                        reason: format!("invalid Dirichlet concentration {alpha}: {e}"),
                    }
                })?;
                row.push(gamma.sample(rng).max(0.0));
            }
            let total: f64 = row.iter().sum();
            if total > 0.0 && total.is_finite() {
                for p in row.iter_mut() {
                    *p /= total;
                }
                return Ok(row);
            }
        }
        Err(SamplerError::DisconnectedChain)
    }
}
