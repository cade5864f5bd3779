//! Shared count preprocessing for the samplers.

use moira_counts::CountMatrix;
use ndarray::Array2;

use crate::error::SamplerError;

/// Observed counts plus the configured smoothing pseudo-count, as reals.
pub(crate) fn effective_counts(counts: &CountMatrix, prior_count: f64) -> Array2<f64> {
    counts.counts().mapv(|c| c as f64 + prior_count)
}

/// Requires every state to have outgoing count mass.
pub(crate) fn validate_rows(effective: &Array2<f64>) -> Result<(), SamplerError> {
    for (i, row) in effective.rows().into_iter().enumerate() {
        if row.sum() <= 0.0 {
            return Err(SamplerError::InvalidCountMatrix {
                reason: format!("state {i} has no outgoing transitions"),
            });
        }
    }
    Ok(())
}

/// Connectivity of the undirected graph with an edge wherever
/// `c_ij + c_ji > 0`.
pub(crate) fn symmetrically_connected(effective: &Array2<f64>) -> bool {
    let n = effective.nrows();
    if n == 0 {
        return false;
    }
    let mut visited = vec![false; n];
    let mut queue = std::collections::VecDeque::new();
    visited[0] = true;
    queue.push_back(0usize);
    while let Some(i) = queue.pop_front() {
        for j in 0..n {
            if !visited[j] && effective[(i, j)] + effective[(j, i)] > 0.0 {
                visited[j] = true;
                queue.push_back(j);
            }
        }
    }
    visited.iter().all(|&v| v)
}
