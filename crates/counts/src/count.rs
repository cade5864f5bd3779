//! Sliding-window transition counting.

use ndarray::Array2;

use crate::error::CountsError;
use crate::matrix::CountMatrix;

/// Counts transitions at a given lag across one or more discretized
/// trajectories.
///
/// Every window start contributes: trajectory position `t` adds one count
/// for the pair `(s[t], s[t + lag])`, for all `t` with `t + lag` in range
/// (sliding-window counting). The state count is `1 + max(label)` over all
/// trajectories, so unvisited intermediate labels still get (empty) rows.
///
/// # Arguments
///
/// * `dtrajs` - Discretized trajectories: sequences of state labels.
/// * `lag` - Lag time in trajectory steps; must be positive.
///
/// # Errors
///
/// Returns [`CountsError::InvalidLag`] if `lag` is zero and
/// [`CountsError::EmptyData`] if no trajectory is at least `lag + 1` long.
pub fn count_transitions(dtrajs: &[Vec<usize>], lag: usize) -> Result<CountMatrix, CountsError> {
    if lag == 0 {
        return Err(CountsError::InvalidLag);
    }
    let n_states = dtrajs
        .iter()
        .flat_map(|t| t.iter())
        .max()
        .map(|&m| m + 1)
        .ok_or(CountsError::EmptyData)?;

    let mut counts = Array2::<u64>::zeros((n_states, n_states));
    let mut n_transitions = 0u64;
    for traj in dtrajs {
        if traj.len() <= lag {
            continue;
        }
        for t in 0..traj.len() - lag {
            counts[(traj[t], traj[t + lag])] += 1;
            n_transitions += 1;
        }
    }
    if n_transitions == 0 {
        return Err(CountsError::EmptyData);
    }
    CountMatrix::from_counts(counts, lag)
}
