//! Bayesian estimation of Markov state models.
//!
//! This crate orchestrates the full estimation pipeline: trajectories are
//! counted at a lag time, a maximum-likelihood prior transition matrix is
//! computed (unconstrained, reversible, or pinned to a given stationary
//! distribution), a posterior ensemble of transition matrices is drawn from
//! the matching sampler, and everything is returned as a
//! [`BayesianMsmPosterior`] of [`MarkovStateModel`]s sharing one lag time,
//! time unit, and reversibility mode.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────┐     ┌──────────────┐     ┌─────────────────────┐
//!  │ trajectories │────▶│ count matrix │────▶│ prior MLE + sampler │
//!  └──────────────┘     └──────────────┘     └──────────┬──────────┘
//!                                                       │ n draws
//!                                                       ▼
//!                                            ┌──────────────────────┐
//!                                            │ BayesianMsmPosterior │
//!                                            └──────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use moira_estimate::BayesianMsm;
//!
//! let dtrajs = vec![vec![0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1]];
//! let posterior = BayesianMsm::new(1)
//!     .with_n_samples(25)
//!     .with_seed(7)
//!     .fit(&dtrajs)
//!     .unwrap();
//!
//! let mu = posterior.prior().stationary_distribution().unwrap();
//! assert!((mu.sum() - 1.0).abs() < 1e-10);
//! ```
//!
//! Consumers compose ensemble statistics themselves, e.g. with
//! `moira_stats::ensemble::confidence_interval` over
//! [`BayesianMsmPosterior::map_samples`].

pub mod error;
pub mod estimator;
pub mod mle;
pub mod posterior;

pub use error::EstimateError;
pub use estimator::BayesianMsm;
pub use posterior::BayesianMsmPosterior;

pub use moira_msm::MarkovStateModel;
