//! Cross-model consistency of the spectral layer: models built from
//! perturbed copies of one matrix must produce directly comparable
//! eigenvectors.

use moira_msm::{MarkovStateModel, TransitionMatrix};
use ndarray::{Array2, array};

fn model(probs: Array2<f64>, reversible: bool) -> MarkovStateModel {
    MarkovStateModel::new(TransitionMatrix::new(probs).unwrap(), 1, reversible)
}

// ---------------------------------------------------------------------------
// 1. perturbed_models_keep_orientation
// ---------------------------------------------------------------------------
#[test]
fn perturbed_models_keep_orientation() {
    // A family of slightly different two-state chains, as produced by a
    // posterior sampler. Averaging their eigenvectors is only meaningful if
    // every model reports the same orientation.
    let family = [
        array![[0.90, 0.10], [0.11, 0.89]],
        array![[0.92, 0.08], [0.09, 0.91]],
        array![[0.89, 0.11], [0.10, 0.90]],
        array![[0.91, 0.09], [0.12, 0.88]],
    ];
    for probs in family {
        let m = model(probs, true);
        let right = m.eigenvectors_right().unwrap();
        let left = m.eigenvectors_left().unwrap();
        // Stationary mode: all positive.
        assert!(right.row(0).iter().all(|&v| v > 0.0));
        assert!(left.row(0).iter().all(|&v| v > 0.0));
        // Relaxation mode: consistently (+, -).
        assert!(right[(1, 0)] > 0.0 && right[(1, 1)] < 0.0);
        assert!(left[(1, 0)] > 0.0 && left[(1, 1)] < 0.0);
    }
}

// ---------------------------------------------------------------------------
// 2. biorthogonality_pairing
// ---------------------------------------------------------------------------
#[test]
fn biorthogonality_pairing() {
    let m = model(array![[0.8, 0.15, 0.05], [0.1, 0.8, 0.1], [0.05, 0.15, 0.8]], true);
    let left = m.eigenvectors_left().unwrap();
    let right = m.eigenvectors_right().unwrap();
    for k in 0..3 {
        let pairing: f64 = (0..3).map(|i| left[(k, i)] * right[(k, i)]).sum();
        assert!(
            (pairing - 1.0).abs() < 1e-8,
            "mode {k} pairing = {pairing}"
        );
    }
}

// ---------------------------------------------------------------------------
// 3. left_mode_zero_is_stationary
// ---------------------------------------------------------------------------
#[test]
fn left_mode_zero_is_stationary() {
    let m = model(array![[0.9, 0.1], [0.2, 0.8]], true);
    let left = m.eigenvectors_left().unwrap();
    let mu = m.stationary_distribution().unwrap();
    for i in 0..2 {
        assert!((left[(0, i)] - mu[i]).abs() < 1e-12);
    }
    let right = m.eigenvectors_right().unwrap();
    for i in 0..2 {
        assert!((right[(0, i)] - 1.0).abs() < 1e-12);
    }
}

// ---------------------------------------------------------------------------
// 4. eigenvalue_ordering_is_descending
// ---------------------------------------------------------------------------
#[test]
fn eigenvalue_ordering_is_descending() {
    let m = model(
        array![[0.7, 0.2, 0.1], [0.15, 0.7, 0.15], [0.1, 0.2, 0.7]],
        true,
    );
    let ev = m.eigenvalues().unwrap();
    assert!((ev[0] - 1.0).abs() < 1e-10);
    for k in 1..ev.len() {
        assert!(ev[k] <= ev[k - 1] + 1e-12, "eigenvalues out of order");
    }
}

// ---------------------------------------------------------------------------
// 5. reversible_and_general_paths_agree
// ---------------------------------------------------------------------------
#[test]
fn reversible_and_general_paths_agree() {
    // The same (reversible) matrix decomposed with and without the
    // reversibility flag: eigenvalues must agree; eigenvectors agree up to
    // the shared normalization.
    let probs = array![[0.9, 0.1], [0.2, 0.8]];
    let rev = model(probs.clone(), true);
    let general = model(probs, false);
    let ev_rev = rev.eigenvalues().unwrap();
    let ev_gen = general.eigenvalues().unwrap();
    for k in 0..2 {
        assert!(
            (ev_rev[k] - ev_gen[k]).abs() < 1e-8,
            "eigenvalue {k} differs between paths"
        );
    }
    let mu_rev = rev.stationary_distribution().unwrap();
    let mu_gen = general.stationary_distribution().unwrap();
    for k in 0..2 {
        assert!((mu_rev[k] - mu_gen[k]).abs() < 1e-10);
    }
}
