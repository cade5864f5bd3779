//! The Bayesian Markov state model estimator.

use moira_counts::count_transitions;
use moira_msm::{MarkovStateModel, TransitionMatrix};
use moira_sampler::{ConstraintMode, PosteriorSampler, SamplerConfig};
use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::error::EstimateError;
use crate::mle;
use crate::posterior::BayesianMsmPosterior;

/// Bayesian estimator for Markov state models.
///
/// Configured with builder methods, then run with [`fit`](Self::fit): the
/// estimator counts transitions at the configured lag, computes the
/// maximum-likelihood prior, draws a posterior ensemble of transition
/// matrices, and returns everything as a [`BayesianMsmPosterior`].
///
/// # Example
///
/// ```
/// use moira_estimate::BayesianMsm;
///
/// let estimator = BayesianMsm::new(1)
///     .with_n_samples(50)
///     .with_reversible(true)
///     .with_seed(42);
///
/// let dtrajs = vec![vec![0, 0, 1, 1, 0, 0, 0, 1, 1, 0]];
/// let posterior = estimator.fit(&dtrajs).unwrap();
/// assert_eq!(posterior.n_samples(), 50);
/// ```
#[derive(Clone, Debug)]
pub struct BayesianMsm {
    lagtime: usize,
    n_samples: usize,
    reversible: bool,
    statdist: Option<Array1<f64>>,
    prior_count: f64,
    time_unit: Option<String>,
    seed: Option<u64>,
    sampler_config: SamplerConfig,
}

impl BayesianMsm {
    /// Creates an estimator at the given lag time with defaults.
    ///
    /// Defaults: `n_samples = 100`, `reversible = true`, no stationary
    /// distribution constraint, `prior_count = 0.0`, no time unit, no seed,
    /// default [`SamplerConfig`].
    pub fn new(lagtime: usize) -> Self {
        Self {
            lagtime,
            n_samples: 100,
            reversible: true,
            statdist: None,
            prior_count: 0.0,
            time_unit: None,
            seed: None,
            sampler_config: SamplerConfig::new(),
        }
    }

    /// Sets the number of posterior samples to draw.
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Sets whether sampled matrices must satisfy detailed balance.
    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    /// Pins the stationary distribution of the prior and every sample to
    /// the given weights (normalized internally). Requires reversibility.
    pub fn with_statdist(mut self, statdist: Array1<f64>) -> Self {
        self.statdist = Some(statdist);
        self
    }

    /// Sets the smoothing pseudo-count added to every count matrix entry.
    pub fn with_prior_count(mut self, prior_count: f64) -> Self {
        self.prior_count = prior_count;
        self
    }

    /// Sets the descriptive physical time unit attached to every model.
    pub fn with_time_unit(mut self, unit: impl Into<String>) -> Self {
        self.time_unit = Some(unit.into());
        self
    }

    /// Sets the random seed for reproducible sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Overrides the sampler configuration (burn-in, thinning, retries).
    /// The estimator's `prior_count` is injected at fit time.
    pub fn with_sampler_config(mut self, config: SamplerConfig) -> Self {
        self.sampler_config = config;
        self
    }

    // --- Accessors ---

    /// Returns the configured lag time.
    pub fn lagtime(&self) -> usize {
        self.lagtime
    }

    /// Returns the configured sample count.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Returns whether reversibility is requested.
    pub fn reversible(&self) -> bool {
        self.reversible
    }

    /// Estimates the prior model and posterior ensemble from discretized
    /// trajectories.
    ///
    /// Either the full ensemble of `n_samples` models is produced or the
    /// fit fails as a whole; no partial ensemble is ever returned.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`EstimateError::Counts`] | zero lag, or no usable transitions |
    /// | [`EstimateError::InsufficientData`] | a state with no outgoing counts and `prior_count == 0` |
    /// | [`EstimateError::InvalidConfig`] | `n_samples == 0`, or a stationary constraint without reversibility |
    /// | [`EstimateError::Sampler`] | sampler construction/draw failures, unchanged |
    /// | [`EstimateError::Msm`] | prior or sample matrix failed validation |
    pub fn fit(&self, dtrajs: &[Vec<usize>]) -> Result<BayesianMsmPosterior, EstimateError> {
        if self.n_samples == 0 {
            return Err(EstimateError::InvalidConfig {
                reason: "n_samples must be positive".into(),
            });
        }
        if self.statdist.is_some() && !self.reversible {
            return Err(EstimateError::InvalidConfig {
                reason: "a stationary distribution constraint requires reversible = true".into(),
            });
        }

        let counts = count_transitions(dtrajs, self.lagtime)?;
        let empty_rows = counts.empty_rows();
        if !empty_rows.is_empty() {
            if self.prior_count == 0.0 {
                return Err(EstimateError::InsufficientData {
                    state: empty_rows[0],
                });
            }
            warn!(
                states = ?empty_rows,
                prior_count = self.prior_count,
                "states with no observed outgoing transitions resolved by smoothing"
            );
        }
        debug!(
            n_states = counts.n_states(),
            total = counts.total(),
            lag = self.lagtime,
            "counted transitions"
        );

        let effective = counts.counts().mapv(|c| c as f64 + self.prior_count);
        let mode = match &self.statdist {
            Some(pi) => {
                let mut pi = pi.clone();
                let sum = pi.sum();
                if !sum.is_finite() || sum <= 0.0 {
                    return Err(EstimateError::InvalidConfig {
                        reason: "stationary distribution weights must have positive sum".into(),
                    });
                }
                pi /= sum;
                ConstraintMode::FixedStationary(pi)
            }
            None if self.reversible => ConstraintMode::Reversible,
            None => ConstraintMode::Unconstrained,
        };

        let prior_probs = match &mode {
            ConstraintMode::Unconstrained => mle::mle_unconstrained(&effective)?,
            ConstraintMode::Reversible => mle::mle_reversible(&effective)?,
            ConstraintMode::FixedStationary(pi) => mle::mle_fixed_pi(&effective, pi)?,
        };
        let prior = self.wrap(TransitionMatrix::new(prior_probs)?);

        let sampler_config = self.sampler_config.clone().with_prior_count(self.prior_count);
        let mut sampler = PosteriorSampler::new(&counts, &mode, &sampler_config)?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut samples = Vec::with_capacity(self.n_samples);
        for _ in 0..self.n_samples {
            let matrix = sampler.sample(&mut rng)?;
            samples.push(self.wrap(matrix));
        }
        debug!(n_samples = samples.len(), "posterior ensemble complete");

        Ok(BayesianMsmPosterior::new(prior, samples))
    }

    /// Wraps a transition matrix with this estimator's shared metadata.
    fn wrap(&self, matrix: TransitionMatrix) -> MarkovStateModel {
        let model = MarkovStateModel::new(matrix, self.lagtime, self.reversible);
        match &self.time_unit {
            Some(unit) => model.with_time_unit(unit.clone()),
            None => model,
        }
    }
}
