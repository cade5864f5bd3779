//! The Markov state model: one transition matrix plus cached spectral
//! queries.

use std::sync::OnceLock;

use ndarray::{Array1, Array2};

use crate::error::MsmError;
use crate::matrix::TransitionMatrix;
use crate::spectral::{self, Spectral};

/// A Markov state model over one row-stochastic transition matrix.
///
/// The model is immutable after construction. Spectral quantities
/// (eigenvalues, eigenvectors, stationary distribution, timescales) are
/// computed on first access and cached for the lifetime of the model; the
/// cache is a [`OnceLock`], so concurrent readers may race to compute the
/// (pure, idempotent) decomposition and one result wins. Repeated accessor
/// calls return bit-identical values.
#[derive(Debug, Clone)]
pub struct MarkovStateModel {
    transition: TransitionMatrix,
    lagtime: usize,
    time_unit: Option<String>,
    reversible: bool,
    spectral: OnceLock<Result<Spectral, MsmError>>,
}

impl MarkovStateModel {
    /// Creates a model from a validated transition matrix.
    ///
    /// `reversible` records whether the matrix satisfies detailed balance;
    /// it selects the (exactly real) symmetrized spectral path and is never
    /// recomputed from the matrix.
    ///
    /// # Panics
    ///
    /// Panics if `lagtime` is zero.
    pub fn new(transition: TransitionMatrix, lagtime: usize, reversible: bool) -> Self {
        assert!(lagtime > 0, "lagtime must be positive, got {lagtime}");
        Self {
            transition,
            lagtime,
            time_unit: None,
            reversible,
            spectral: OnceLock::new(),
        }
    }

    /// Attaches a descriptive physical time unit (display only, never
    /// computed on).
    pub fn with_time_unit(mut self, unit: impl Into<String>) -> Self {
        self.time_unit = Some(unit.into());
        self
    }

    /// Returns the transition matrix.
    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transition
    }

    /// Returns the number of states.
    pub fn n_states(&self) -> usize {
        self.transition.n_states()
    }

    /// Returns the lag time in trajectory steps.
    pub fn lagtime(&self) -> usize {
        self.lagtime
    }

    /// Returns the descriptive time unit, if one was set.
    pub fn time_unit(&self) -> Option<&str> {
        self.time_unit.as_deref()
    }

    /// Returns whether this model was constructed as reversible.
    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    /// Returns the eigenvalues ordered by descending real part.
    ///
    /// The leading eigenvalue of a row-stochastic matrix is 1 (up to
    /// floating-point tolerance). Reversible models have an exactly real
    /// spectrum; for non-reversible models the real parts are reported.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::NotIrreducible`] if the chain has no unique
    /// stationary distribution (the decomposition is anchored on it).
    pub fn eigenvalues(&self) -> Result<&Array1<f64>, MsmError> {
        Ok(&self.spectral()?.eigenvalues)
    }

    /// Returns the left eigenvectors, one per row, ordered to match
    /// [`eigenvalues`](Self::eigenvalues).
    ///
    /// Row 0 is the stationary distribution. Signs follow the deterministic
    /// rule documented on the crate: the first significant component of
    /// each right eigenvector is positive, and the left partner carries the
    /// same flip, so eigenvectors from different posterior samples can be
    /// compared and averaged.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::ComplexSpectrum`] if a non-reversible model has a
    /// complex eigenvalue pair, plus the errors of
    /// [`eigenvalues`](Self::eigenvalues).
    pub fn eigenvectors_left(&self) -> Result<&Array2<f64>, MsmError> {
        self.spectral()?
            .modes
            .as_ref()
            .map(|m| &m.left)
            .ok_or(MsmError::ComplexSpectrum)
    }

    /// Returns the right eigenvectors, one per row, ordered to match
    /// [`eigenvalues`](Self::eigenvalues). Row 0 is the all-ones vector.
    ///
    /// # Errors
    ///
    /// Same as [`eigenvectors_left`](Self::eigenvectors_left).
    pub fn eigenvectors_right(&self) -> Result<&Array2<f64>, MsmError> {
        self.spectral()?
            .modes
            .as_ref()
            .map(|m| &m.right)
            .ok_or(MsmError::ComplexSpectrum)
    }

    /// Returns the stationary distribution: the probability vector invariant
    /// under the transition matrix.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::NotIrreducible`] if no such vector exists within
    /// tolerance.
    pub fn stationary_distribution(&self) -> Result<&Array1<f64>, MsmError> {
        Ok(&self.spectral()?.stationary)
    }

    /// Returns the n-1 implied relaxation timescales, in lag-time units:
    /// `t_k = -lag / ln|lambda_k|` for the sub-leading eigenvalues.
    ///
    /// An eigenvalue modulus at or above 1 reports `f64::INFINITY`. The
    /// configured [`time_unit`](Self::time_unit) is descriptive only and is
    /// not applied numerically.
    ///
    /// # Errors
    ///
    /// Same as [`eigenvalues`](Self::eigenvalues).
    pub fn timescales(&self) -> Result<&Array1<f64>, MsmError> {
        Ok(&self.spectral()?.timescales)
    }

    /// The cached decomposition, computed on first use.
    fn spectral(&self) -> Result<&Spectral, MsmError> {
        self.spectral
            .get_or_init(|| {
                spectral::decompose(self.transition.as_array(), self.reversible, self.lagtime)
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_state() -> MarkovStateModel {
        let tm = TransitionMatrix::new(array![[0.9, 0.1], [0.2, 0.8]]).unwrap();
        MarkovStateModel::new(tm, 1, true)
    }

    #[test]
    fn metadata_accessors() {
        let model = two_state().with_time_unit("4 fs");
        assert_eq!(model.n_states(), 2);
        assert_eq!(model.lagtime(), 1);
        assert_eq!(model.time_unit(), Some("4 fs"));
        assert!(model.is_reversible());
    }

    #[test]
    #[should_panic(expected = "lagtime must be positive")]
    fn zero_lagtime_panics() {
        let tm = TransitionMatrix::new(array![[1.0]]).unwrap();
        MarkovStateModel::new(tm, 0, true);
    }

    #[test]
    fn leading_eigenvalue_is_one() {
        let model = two_state();
        let ev = model.eigenvalues().unwrap();
        assert_relative_eq!(ev[0], 1.0, epsilon = 1e-10);
        assert!(ev[1] < 1.0);
    }

    #[test]
    fn stationary_distribution_is_probability_vector() {
        let model = two_state();
        let mu = model.stationary_distribution().unwrap();
        assert_relative_eq!(mu.sum(), 1.0, epsilon = 1e-12);
        assert!(mu.iter().all(|&x| x > 0.0));
    }

    #[test]
    fn repeated_accessor_calls_are_bit_identical() {
        let model = two_state();
        let first = model.eigenvalues().unwrap().clone();
        let second = model.eigenvalues().unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        let ts1 = model.timescales().unwrap().clone();
        let ts2 = model.timescales().unwrap();
        for (a, b) in ts1.iter().zip(ts2.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn timescales_in_lag_units() {
        let tm = TransitionMatrix::new(array![[0.9, 0.1], [0.2, 0.8]]).unwrap();
        let model = MarkovStateModel::new(tm, 100, true);
        let ts = model.timescales().unwrap();
        assert_eq!(ts.len(), 1);
        assert_relative_eq!(ts[0], -100.0 / 0.7_f64.ln(), epsilon = 1e-8);
    }

    #[test]
    fn reducible_model_reports_not_irreducible() {
        let tm = TransitionMatrix::new(array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
        let model = MarkovStateModel::new(tm, 1, true);
        assert!(matches!(
            model.stationary_distribution(),
            Err(MsmError::NotIrreducible)
        ));
        // The error is cached and repeatable.
        assert!(matches!(
            model.eigenvalues(),
            Err(MsmError::NotIrreducible)
        ));
    }

    #[test]
    fn complex_spectrum_blocks_eigenvectors_only() {
        let tm = TransitionMatrix::new(array![
            [0.05, 0.9, 0.05],
            [0.05, 0.05, 0.9],
            [0.9, 0.05, 0.05]
        ])
        .unwrap();
        let model = MarkovStateModel::new(tm, 1, false);
        assert!(model.eigenvalues().is_ok());
        assert!(model.stationary_distribution().is_ok());
        assert!(model.timescales().is_ok());
        assert!(matches!(
            model.eigenvectors_left(),
            Err(MsmError::ComplexSpectrum)
        ));
        assert!(matches!(
            model.eigenvectors_right(),
            Err(MsmError::ComplexSpectrum)
        ));
    }

    #[test]
    fn model_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<MarkovStateModel>();
    }
}
