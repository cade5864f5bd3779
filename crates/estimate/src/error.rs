//! Error types for the moira-estimate crate.

use moira_counts::CountsError;
use moira_msm::MsmError;
use moira_sampler::SamplerError;

/// Error type for all fallible operations in the moira-estimate crate.
///
/// Covers trajectory counting errors, sampler errors (propagated
/// unchanged), spectral errors from model construction, and the
/// estimator's own validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EstimateError {
    /// Transition counting error.
    #[error(transparent)]
    Counts(#[from] CountsError),

    /// Posterior sampler error.
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    /// Markov state model error.
    #[error(transparent)]
    Msm(#[from] MsmError),

    /// Returned before sampling when a state has no observed outgoing
    /// transitions and no smoothing pseudo-count is configured.
    #[error("insufficient data: state {state} has no outgoing transitions and no smoothing is configured")]
    InsufficientData {
        /// The first state with an empty count row.
        state: usize,
    },

    /// Returned when the estimator configuration is inconsistent.
    #[error("invalid estimator configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}
