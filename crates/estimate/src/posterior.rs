//! The composite estimation result: prior model plus posterior ensemble.

use moira_msm::MarkovStateModel;

/// The result of one Bayesian estimation run.
///
/// Owns the maximum-likelihood prior model and the ordered sequence of
/// posterior-sampled models. The sample order is the sampler's emission
/// order and carries no statistical meaning beyond indexing; downstream
/// aggregation treats the sequence as an unordered collection of draws.
/// Every sampled model shares the prior's state count, lag time, time unit,
/// and reversibility mode.
#[derive(Debug, Clone)]
pub struct BayesianMsmPosterior {
    prior: MarkovStateModel,
    samples: Vec<MarkovStateModel>,
}

impl BayesianMsmPosterior {
    /// Creates a posterior (crate-internal constructor).
    pub(crate) fn new(prior: MarkovStateModel, samples: Vec<MarkovStateModel>) -> Self {
        Self { prior, samples }
    }

    /// Returns the maximum-likelihood prior model.
    pub fn prior(&self) -> &MarkovStateModel {
        &self.prior
    }

    /// Returns the posterior-sampled models in emission order.
    pub fn samples(&self) -> &[MarkovStateModel] {
        &self.samples
    }

    /// Returns the number of posterior samples.
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Gathers one quantity per sample, in order.
    ///
    /// Convenience for feeding per-sample quantities into the ensemble
    /// statistics utilities.
    pub fn map_samples<T>(&self, f: impl FnMut(&MarkovStateModel) -> T) -> Vec<T> {
        self.samples.iter().map(f).collect()
    }

    /// Gathers one fallible quantity per sample, stopping at the first
    /// error.
    pub fn try_map_samples<T, E>(
        &self,
        f: impl FnMut(&MarkovStateModel) -> Result<T, E>,
    ) -> Result<Vec<T>, E> {
        self.samples.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moira_msm::TransitionMatrix;
    use ndarray::array;

    fn model() -> MarkovStateModel {
        let tm = TransitionMatrix::new(array![[0.9, 0.1], [0.2, 0.8]]).unwrap();
        MarkovStateModel::new(tm, 1, true)
    }

    #[test]
    fn accessors() {
        let posterior = BayesianMsmPosterior::new(model(), vec![model(), model()]);
        assert_eq!(posterior.n_samples(), 2);
        assert_eq!(posterior.samples().len(), 2);
        assert_eq!(posterior.prior().n_states(), 2);
    }

    #[test]
    fn map_samples_preserves_order() {
        let posterior = BayesianMsmPosterior::new(model(), vec![model(), model(), model()]);
        let lags = posterior.map_samples(|m| m.lagtime());
        assert_eq!(lags, vec![1, 1, 1]);
    }

    #[test]
    fn try_map_samples_collects() {
        let posterior = BayesianMsmPosterior::new(model(), vec![model(), model()]);
        let evs = posterior
            .try_map_samples(|m| m.eigenvalues().map(|ev| ev[0]))
            .unwrap();
        assert_eq!(evs.len(), 2);
        assert!((evs[0] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn posterior_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<BayesianMsmPosterior>();
    }
}
