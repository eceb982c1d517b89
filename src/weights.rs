// src/weights.rs

use crate::error::SelectionError;
use crate::story::StoryRecord;
use chrono::{DateTime, Utc};

/// A story paired with its normalised selection probability for one draw.
#[derive(Debug, Clone, Copy)]
pub struct WeightedCandidate<'a> {
    pub story: &'a StoryRecord,
    pub weight: f64,
}

/// Checks that `recency_bias` is usable as a decay rate.
///
/// # Errors
///
/// Returns [`SelectionError::InvalidRecencyBias`] for NaN, infinite or negative values.
pub fn validate_recency_bias(recency_bias: f64) -> Result<(), SelectionError> {
    if recency_bias.is_finite() && recency_bias >= 0.0 {
        Ok(())
    } else {
        Err(SelectionError::InvalidRecencyBias(recency_bias))
    }
}

/// Computes the selection distribution for `candidates` against the current wall clock.
/// See [`compute_weights_at`].
pub fn compute_weights(
    candidates: &[StoryRecord],
    recency_bias: f64,
) -> Result<Vec<f64>, SelectionError> {
    compute_weights_at(candidates, recency_bias, Utc::now())
}

/// Computes one weight per candidate, in input order, summing to 1.
///
/// Each story's raw weight is `exp(-recency_bias * age_days) / (1 + play_count * 0.1)`,
/// with every age measured against the same `now`. The raw weights are divided by
/// their sum; an empty input gives an empty output.
///
/// # Errors
///
/// Returns [`SelectionError::InvalidRecencyBias`] if `recency_bias` is not finite
/// or is negative.
pub fn compute_weights_at(
    candidates: &[StoryRecord],
    recency_bias: f64,
    now: DateTime<Utc>,
) -> Result<Vec<f64>, SelectionError> {
    validate_recency_bias(recency_bias)?;
    Ok(normalized_weights(candidates, recency_bias, now))
}

/// Normalised weights for already-validated input, in iteration order.
pub(crate) fn normalized_weights<'s>(
    stories: impl IntoIterator<Item = &'s StoryRecord>,
    recency_bias: f64,
    now: DateTime<Utc>,
) -> Vec<f64> {
    let log_weights: Vec<f64> = stories
        .into_iter()
        .map(|story| story.log_raw_weight(recency_bias, now))
        .collect();
    if log_weights.is_empty() {
        return Vec::new();
    }

    // Shifting by the max leaves the ratios intact and keeps the largest term at 1,
    // so the sum below is always >= 1.
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let scaled: Vec<f64> = log_weights.iter().map(|lw| (lw - max).exp()).collect();
    let sum: f64 = scaled.iter().sum();

    scaled.into_iter().map(|w| w / sum).collect()
}

/// Pairs each candidate with its weight. Mostly useful for diagnostics.
pub fn weigh_candidates(
    candidates: &[StoryRecord],
    recency_bias: f64,
    now: DateTime<Utc>,
) -> Result<Vec<WeightedCandidate<'_>>, SelectionError> {
    let weights = compute_weights_at(candidates, recency_bias, now)?;
    Ok(candidates
        .iter()
        .zip(weights)
        .map(|(story, weight)| WeightedCandidate { story, weight })
        .collect())
}
