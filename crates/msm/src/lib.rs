//! Markov state models with cached spectral decomposition.
//!
//! This crate represents one discrete-time Markov chain as a
//! [`MarkovStateModel`] wrapping a validated, row-stochastic
//! [`TransitionMatrix`], and answers spectral queries against it:
//! eigenvalues, sign-normalized left/right eigenvectors, the stationary
//! distribution, and implied relaxation timescales.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────────┐     ┌──────────────────┐     ┌───────────────────┐
//!  │ TransitionMatrix │────▶│ MarkovStateModel │────▶│ spectral queries  │
//!  │ (validate)       │     │ (lag, metadata)  │     │ (computed, cached)│
//!  └──────────────────┘     └──────────────────┘     └───────────────────┘
//! ```
//!
//! # Sign convention
//!
//! Eigen solvers return each eigenvector with an arbitrary sign, which makes
//! eigenvectors from different posterior samples incomparable. Every mode is
//! therefore normalized deterministically: the first component of the right
//! eigenvector whose magnitude reaches 10% of the row maximum is forced
//! positive, and the paired left eigenvector receives the same flip. The
//! anchor index is stable across samples even when two components are
//! nearly tied in magnitude, which is what makes ensemble averages of
//! eigenvectors meaningful.
//!
//! # Quick start
//!
//! ```rust
//! use moira_msm::{MarkovStateModel, TransitionMatrix};
//! use ndarray::array;
//!
//! let tm = TransitionMatrix::new(array![[0.9, 0.1], [0.2, 0.8]]).unwrap();
//! let model = MarkovStateModel::new(tm, 1, true).with_time_unit("1 ns");
//!
//! let ev = model.eigenvalues().unwrap();
//! assert!((ev[0] - 1.0).abs() < 1e-10);
//! ```

pub mod error;
pub mod matrix;
pub mod model;
mod spectral;

pub use error::MsmError;
pub use matrix::TransitionMatrix;
pub use model::MarkovStateModel;
