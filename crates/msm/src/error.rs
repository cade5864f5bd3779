//! Error types for the moira-msm crate.

/// Error type for all fallible operations in the moira-msm crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MsmError {
    /// Returned when a matrix fails row-stochastic validation.
    #[error("invalid transition matrix: {reason}")]
    InvalidMatrix {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when no stationary distribution exists within tolerance,
    /// i.e. the chain is not irreducible (or not reversible where assumed).
    #[error("no stationary distribution: chain is not irreducible")]
    NotIrreducible,

    /// Returned by eigenvector and timescale queries when a non-reversible
    /// matrix has a complex eigenvalue pair.
    #[error("spectrum contains complex eigenvalue pairs; eigenvectors are only defined for real spectra")]
    ComplexSpectrum,

    /// Returned when the spectral decomposition fails numerically.
    #[error("spectral decomposition failed: {0}")]
    SpectralFailure(String),
}
