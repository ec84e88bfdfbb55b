//! Confidence propagation along association paths.
//!
//! Path confidence is the harmonic mean of edge confidences,
//! `n / Σ(1/cᵢ)`. Unlike a product it does not decay with length (five 0.9
//! edges give 0.9, not 0.59), while a single weak edge still dominates (one
//! 0.01 edge pulls the whole path near 0.01).

/// Harmonic mean of confidences.
///
/// Returns 1.0 for an empty sequence and 0.0 if any confidence is zero or
/// negative.
///
/// # Example
///
/// ```rust
/// use concept_graph_graph::confidence::harmonic_mean;
///
/// let c = harmonic_mean([0.9_f32; 5]);
/// assert!((c - 0.9).abs() < 1e-6);
/// assert_eq!(harmonic_mean([0.8, 0.0]), 0.0);
/// ```
pub fn harmonic_mean(confidences: impl IntoIterator<Item = f32>) -> f32 {
    let mut count = 0usize;
    let mut inverse_sum = 0.0f64;
    for c in confidences {
        if c <= 0.0 {
            return 0.0;
        }
        count += 1;
        inverse_sum += 1.0 / f64::from(c);
    }
    if count == 0 {
        return 1.0;
    }
    (count as f64 / inverse_sum) as f32
}

/// Harmonic mean from an edge count and a running `Σ(1/c)`.
///
/// Partial paths keep the running sum so extending them is O(1). An infinite
/// sum (a zero-confidence edge) yields 0.0.
#[inline]
pub(crate) fn from_inverse_sum(count: usize, inverse_sum: f64) -> f64 {
    if count == 0 {
        1.0
    } else if inverse_sum.is_infinite() {
        0.0
    } else {
        count as f64 / inverse_sum
    }
}

/// `1/c` term for one edge; infinite for a non-positive confidence.
#[inline]
pub(crate) fn inverse(confidence: f32) -> f64 {
    if confidence <= 0.0 {
        f64::INFINITY
    } else {
        1.0 / f64::from(confidence)
    }
}
