//! Configuration for the posterior samplers.

use crate::error::SamplerError;

/// Configuration for posterior transition-matrix sampling.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use moira_sampler::SamplerConfig;
///
/// let config = SamplerConfig::new()
///     .with_burn_in_sweeps(200)
///     .with_sweeps_per_sample(20);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    burn_in_sweeps: usize,
    sweeps_per_sample: usize,
    prior_count: f64,
    max_retries: usize,
}

impl SamplerConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `burn_in_sweeps = 100`, `sweeps_per_sample = 10`,
    /// `prior_count = 0.0`, `max_retries = 8`.
    pub fn new() -> Self {
        Self {
            burn_in_sweeps: 100,
            sweeps_per_sample: 10,
            prior_count: 0.0,
            max_retries: 8,
        }
    }

    /// Sets the number of Metropolis sweeps discarded before the first
    /// sample is emitted.
    pub fn with_burn_in_sweeps(mut self, sweeps: usize) -> Self {
        self.burn_in_sweeps = sweeps;
        self
    }

    /// Sets the number of Metropolis sweeps between emitted samples
    /// (thinning).
    pub fn with_sweeps_per_sample(mut self, sweeps: usize) -> Self {
        self.sweeps_per_sample = sweeps;
        self
    }

    /// Sets the smoothing pseudo-count added to every entry of the count
    /// matrix before sampling.
    pub fn with_prior_count(mut self, prior_count: f64) -> Self {
        self.prior_count = prior_count;
        self
    }

    /// Sets the bound on internal re-draws of a degenerate random variate
    /// before the sampler gives up with `DisconnectedChain`.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    // --- Accessors ---

    /// Returns the burn-in sweep count.
    pub fn burn_in_sweeps(&self) -> usize {
        self.burn_in_sweeps
    }

    /// Returns the thinning sweep count.
    pub fn sweeps_per_sample(&self) -> usize {
        self.sweeps_per_sample
    }

    /// Returns the smoothing pseudo-count.
    pub fn prior_count(&self) -> f64 {
        self.prior_count
    }

    /// Returns the internal retry bound.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidCountMatrix`] if `prior_count` is
    /// negative or non-finite, or if `sweeps_per_sample` or `max_retries`
    /// is zero.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if !self.prior_count.is_finite() || self.prior_count < 0.0 {
            return Err(SamplerError::InvalidCountMatrix {
                reason: format!("prior_count must be finite and >= 0, got {}", self.prior_count),
            });
        }
        if self.sweeps_per_sample == 0 {
            return Err(SamplerError::InvalidCountMatrix {
                reason: "sweeps_per_sample must be positive".into(),
            });
        }
        if self.max_retries == 0 {
            return Err(SamplerError::InvalidCountMatrix {
                reason: "max_retries must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::new()
    }
}
