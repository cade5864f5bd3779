//! Posterior samplers over row-stochastic transition matrices.
//!
//! Given an observed transition [`CountMatrix`](moira_counts::CountMatrix),
//! this crate draws transition matrices distributed (approximately) as the
//! Bayesian posterior under a multinomial count likelihood, in one of three
//! constraint modes:
//!
//! - [`ConstraintMode::Unconstrained`]: each row is an independent Dirichlet
//!   draw with concentration `C[i,:] + 1`.
//! - [`ConstraintMode::Reversible`]: Metropolis-Hastings over symmetric
//!   virtual count matrices, so every draw satisfies detailed balance.
//! - [`ConstraintMode::FixedStationary`]: the reversible chain with every
//!   marginal pinned, so every draw additionally has the prescribed
//!   stationary distribution.
//!
//! The constrained samplers own their Markov-chain state; consecutive draws
//! continue one chain, separated by a configurable number of thinning
//! sweeps after an initial burn-in (see [`SamplerConfig`]).
//!
//! # Quick start
//!
//! ```rust
//! use moira_counts::count_transitions;
//! use moira_sampler::{ConstraintMode, PosteriorSampler, SamplerConfig};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let dtrajs = vec![vec![0, 0, 1, 1, 0, 0, 1, 0]];
//! let counts = count_transitions(&dtrajs, 1).unwrap();
//!
//! let mut sampler = PosteriorSampler::new(
//!     &counts,
//!     &ConstraintMode::Reversible,
//!     &SamplerConfig::new(),
//! )
//! .unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let p = sampler.sample(&mut rng).unwrap();
//! assert_eq!(p.n_states(), 2);
//! ```

pub mod config;
pub mod dirichlet;
pub mod error;
pub mod fixed_pi;
pub mod reversible;
pub mod sampler;
mod support;

pub use config::SamplerConfig;
pub use dirichlet::DirichletSampler;
pub use error::SamplerError;
pub use fixed_pi::FixedPiSampler;
pub use reversible::ReversibleSampler;
pub use sampler::{ConstraintMode, PosteriorSampler};
