//! Error types for the moira-counts crate.

/// Error type for all fallible operations in the moira-counts crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CountsError {
    /// Returned when no trajectory contributes a single transition.
    #[error("no transitions observed: every trajectory is shorter than lag + 1")]
    EmptyData,

    /// Returned when the lag time is zero.
    #[error("lag time must be positive")]
    InvalidLag,

    /// Returned when a pre-built count matrix is not square.
    #[error("count matrix must be square, got {rows}x{cols}")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },
}
