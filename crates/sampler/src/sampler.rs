//! Constraint modes and the unified sampler front-end.

use moira_counts::CountMatrix;
use moira_msm::TransitionMatrix;
use ndarray::Array1;
use rand::Rng;

use crate::config::SamplerConfig;
use crate::dirichlet::DirichletSampler;
use crate::error::SamplerError;
use crate::fixed_pi::FixedPiSampler;
use crate::reversible::ReversibleSampler;

/// Structural constraint imposed on sampled transition matrices.
#[derive(Debug, Clone)]
pub enum ConstraintMode {
    /// Row-stochastic only; rows are independent Dirichlet draws.
    Unconstrained,
    /// Detailed balance with respect to the (sampled) stationary
    /// distribution.
    Reversible,
    /// Detailed balance with respect to the given stationary distribution.
    FixedStationary(Array1<f64>),
}

impl ConstraintMode {
    /// Returns whether matrices sampled under this mode satisfy detailed
    /// balance.
    pub fn is_reversible(&self) -> bool {
        !matches!(self, ConstraintMode::Unconstrained)
    }
}

/// A posterior sampler over transition matrices, dispatching on the
/// constraint mode.
///
/// The constrained variants own Metropolis-chain state, so the sampler must
/// be held mutably; one instance per estimation run keeps runs independent.
#[derive(Debug, Clone)]
pub enum PosteriorSampler {
    /// Unconstrained row-wise Dirichlet sampling.
    Dirichlet(DirichletSampler),
    /// Reversible Metropolis-Hastings sampling.
    Reversible(ReversibleSampler),
    /// Reversible sampling with a pinned stationary distribution.
    FixedPi(FixedPiSampler),
}

impl PosteriorSampler {
    /// Builds the sampler for the requested constraint mode.
    ///
    /// # Errors
    ///
    /// Propagates the constructor errors of the underlying sampler:
    /// [`SamplerError::InvalidCountMatrix`],
    /// [`SamplerError::DisconnectedChain`], and
    /// [`SamplerError::ConstraintInfeasible`].
    pub fn new(
        counts: &CountMatrix,
        mode: &ConstraintMode,
        config: &SamplerConfig,
    ) -> Result<Self, SamplerError> {
        match mode {
            ConstraintMode::Unconstrained => {
                Ok(Self::Dirichlet(DirichletSampler::new(counts, config)?))
            }
            ConstraintMode::Reversible => {
                Ok(Self::Reversible(ReversibleSampler::new(counts, config)?))
            }
            ConstraintMode::FixedStationary(pi) => {
                Ok(Self::FixedPi(FixedPiSampler::new(counts, pi, config)?))
            }
        }
    }

    /// Draws one transition matrix from the posterior.
    ///
    /// # Errors
    ///
    /// Propagates the sampling errors of the underlying sampler.
    pub fn sample(&mut self, rng: &mut impl Rng) -> Result<TransitionMatrix, SamplerError> {
        match self {
            Self::Dirichlet(s) => s.sample(rng),
            Self::Reversible(s) => s.sample(rng),
            Self::FixedPi(s) => s.sample(rng),
        }
    }
}
