//! Error types for the moira-sampler crate.

/// Error type for all fallible operations in the moira-sampler crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SamplerError {
    /// Returned when the count matrix is structurally unusable, e.g. a
    /// state with no outgoing transitions and no smoothing pseudo-count.
    #[error("invalid count matrix: {reason}")]
    InvalidCountMatrix {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when the chain cannot reach irreducibility under the
    /// requested constraint, so no stationary distribution is defined.
    #[error("disconnected chain: no irreducible transition matrix under the requested constraint")]
    DisconnectedChain,

    /// Returned when a requested stationary distribution is incompatible
    /// with the observed counts.
    #[error("constraint infeasible: {reason}")]
    ConstraintInfeasible {
        /// Description of the incompatibility.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_count_matrix() {
        let err = SamplerError::InvalidCountMatrix {
            reason: "state 2 has no outgoing transitions".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid count matrix: state 2 has no outgoing transitions"
        );
    }

    #[test]
    fn error_disconnected_chain() {
        assert_eq!(
            SamplerError::DisconnectedChain.to_string(),
            "disconnected chain: no irreducible transition matrix under the requested constraint"
        );
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<SamplerError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<SamplerError>();
    }
}
