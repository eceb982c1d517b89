// src/selector.rs

use crate::error::SelectionError;
use crate::story::StoryRecord;
use crate::weights::{normalized_weights, validate_recency_bias};
use chrono::{DateTime, Utc};
use log::debug;
use rand::distr::{Distribution, StandardUniform};
use rand::Rng;
use std::collections::HashSet;

/// Adapts any `rand` generator into the `[0, 1)` source the selector expects.
pub fn unit_interval<R: Rng + ?Sized>(rng: &mut R) -> impl FnMut() -> f64 + '_ {
    move || StandardUniform.sample(&mut *rng)
}

/// Picks the next story to play against the current wall clock.
/// See [`select_story_at`].
pub fn select_story<'a>(
    candidates: &'a [StoryRecord],
    exclude_ids: &HashSet<String>,
    recency_bias: f64,
    rng: impl FnMut() -> f64,
) -> Result<Option<&'a StoryRecord>, SelectionError> {
    select_story_at(candidates, exclude_ids, recency_bias, rng, Utc::now())
}

/// Picks the next story to play.
///
/// Candidates without consent or whose id is in `exclude_ids` are dropped. With
/// nothing left the result is `Ok(None)`; with exactly one story left it is
/// returned without consulting `rng`. Otherwise one value `r` is drawn and the
/// eligible stories are walked in input order, returning the first whose
/// cumulative weight is `>= r`. If rounding leaves the total just short of `r`,
/// the last eligible story is returned.
///
/// This function has no side effects; recording the play and updating the
/// caller's ledger are separate steps.
///
/// # Errors
///
/// Returns [`SelectionError::InvalidRecencyBias`] for an unusable bias and
/// [`SelectionError::RandomOutOfRange`] if `rng` yields a value outside `[0, 1)`.
pub fn select_story_at<'a>(
    candidates: &'a [StoryRecord],
    exclude_ids: &HashSet<String>,
    recency_bias: f64,
    mut rng: impl FnMut() -> f64,
    now: DateTime<Utc>,
) -> Result<Option<&'a StoryRecord>, SelectionError> {
    validate_recency_bias(recency_bias)?;

    let eligible: Vec<&StoryRecord> = candidates
        .iter()
        .filter(|story| story.consent && !exclude_ids.contains(&story.id))
        .collect();

    debug!(
        "{} of {} candidates eligible ({} excluded ids)",
        eligible.len(),
        candidates.len(),
        exclude_ids.len()
    );

    match eligible.as_slice() {
        [] => return Ok(None),
        [only] => return Ok(Some(*only)),
        _ => {}
    }

    let weights = normalized_weights(eligible.iter().copied(), recency_bias, now);

    let r = rng();
    if !(0.0..1.0).contains(&r) {
        return Err(SelectionError::RandomOutOfRange(r));
    }

    let mut cumulative = 0.0;
    for (story, weight) in eligible.iter().zip(&weights) {
        cumulative += weight;
        if cumulative >= r {
            return Ok(Some(*story));
        }
    }

    Ok(eligible.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::compute_weights_at;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn story(id: &str, age: Duration, play_count: u64, now: DateTime<Utc>) -> StoryRecord {
        let mut s = StoryRecord::new(id, now - age, format!("{id}.mp3"));
        s.play_count = play_count;
        s
    }

    fn three_stories(now: DateTime<Utc>) -> Vec<StoryRecord> {
        vec![
            story("1", Duration::days(1), 0, now),
            story("2", Duration::days(2), 5, now),
            story("3", Duration::days(3), 10, now),
        ]
    }

    fn excluding(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_selects_from_available_pool() {
        let now = Utc::now();
        let stories = three_stories(now);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let picked = select_story_at(&stories, &HashSet::new(), 0.3, unit_interval(&mut rng), now)
                .unwrap()
                .unwrap();
            assert!(stories.iter().any(|s| s.id == picked.id));
        }
    }

    #[test]
    fn test_excluded_stories_are_skipped() {
        let now = Utc::now();
        let stories = three_stories(now);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let picked = select_story_at(&stories, &excluding(&["1", "2"]), 0.3, unit_interval(&mut rng), now)
                .unwrap();
            assert_eq!(picked.map(|s| s.id.as_str()), Some("3"));
        }
    }

    #[test]
    fn test_none_when_everything_excluded_or_empty() {
        let now = Utc::now();
        let stories = three_stories(now);
        let all = select_story_at(&stories, &excluding(&["1", "2", "3"]), 0.3, || 0.5, now).unwrap();
        assert!(all.is_none());

        let empty = select_story_at(&[], &HashSet::new(), 0.3, || 0.5, now).unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_non_consented_story_is_never_returned() {
        let now = Utc::now();
        let mut stories = three_stories(now);
        let mut withheld = story("4", Duration::zero(), 0, now);
        withheld.consent = false;
        stories.insert(0, withheld);

        for r in [0.0, 0.01, 0.25, 0.5, 0.75, 0.999_999] {
            let picked = select_story_at(&stories, &HashSet::new(), 5.0, || r, now)
                .unwrap()
                .unwrap();
            assert_ne!(picked.id, "4");
        }

        let only_withheld = &stories[..1];
        assert!(select_story_at(only_withheld, &HashSet::new(), 0.3, || 0.5, now)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_single_eligible_story_skips_the_draw() {
        let now = Utc::now();
        let stories = three_stories(now);
        let mut calls = 0;
        let picked = select_story_at(
            &stories,
            &excluding(&["2", "3"]),
            0.3,
            || {
                calls += 1;
                0.5
            },
            now,
        )
        .unwrap();
        assert_eq!(picked.unwrap().id, "1");
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_draw_walks_cumulative_weights_in_input_order() {
        let now = Utc::now();
        let stories = three_stories(now);
        let w = compute_weights_at(&stories, 0.3, now).unwrap();
        let none = HashSet::new();

        let pick = |r: f64| {
            select_story_at(&stories, &none, 0.3, || r, now)
                .unwrap()
                .unwrap()
                .id
                .clone()
        };

        assert_eq!(pick(0.0), "1");
        assert_eq!(pick(w[0]), "1");
        assert_eq!(pick(w[0] + 1e-9), "2");
        assert_eq!(pick(w[0] + w[1] + 1e-9), "3");
        assert_eq!(pick(0.999_999_999), "3");
    }

    #[test]
    fn test_exact_boundary_goes_to_first_index_reaching_it() {
        let now = Utc::now();
        // Equal weights: boundaries sit at exactly 0.5.
        let stories = vec![
            story("a", Duration::days(4), 2, now),
            story("b", Duration::days(4), 2, now),
        ];
        let picked = select_story_at(&stories, &HashSet::new(), 0.3, || 0.5, now)
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn test_rounding_shortfall_falls_back_to_last_eligible() {
        let now = Utc::now();
        let stories = vec![
            story("a", Duration::hours(0), 0, now),
            story("b", Duration::hours(7), 2, now),
            story("c", Duration::hours(14), 4, now),
        ];
        let r = 1.0 - f64::EPSILON / 2.0;

        // These weights add up to just under the largest value below 1.
        let total = compute_weights_at(&stories, 0.3, now)
            .unwrap()
            .iter()
            .fold(0.0, |acc, w| acc + w);
        assert!(total < r, "total = {total:e}");

        let picked = select_story_at(&stories, &HashSet::new(), 0.3, || r, now).unwrap();
        assert_eq!(picked.map(|s| s.id.as_str()), Some("c"));
    }

    #[test]
    fn test_rejects_random_values_outside_unit_interval() {
        let now = Utc::now();
        let stories = three_stories(now);
        for r in [1.0, -0.1, f64::NAN, 3.0] {
            let err = select_story_at(&stories, &HashSet::new(), 0.3, || r, now).unwrap_err();
            assert!(matches!(err, SelectionError::RandomOutOfRange(_)));
        }
    }

    #[test]
    fn test_rejects_invalid_bias_even_when_nothing_is_eligible() {
        let err = select_story(&[], &HashSet::new(), f64::NAN, || 0.5).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidRecencyBias(_)));
    }

    #[test]
    fn test_fresh_story_is_picked_more_often_than_stale_one() {
        let now = Utc::now();
        let stories = vec![
            story("S1", Duration::zero(), 0, now),
            story("S2", Duration::days(2), 5, now),
            story("S3", Duration::days(10), 10, now),
        ];
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<String, usize> = HashMap::new();

        for _ in 0..10_000 {
            let picked = select_story_at(&stories, &HashSet::new(), 0.3, unit_interval(&mut rng), now)
                .unwrap()
                .unwrap();
            *counts.entry(picked.id.clone()).or_insert(0) += 1;
        }

        let s1 = counts.get("S1").copied().unwrap_or(0);
        let s2 = counts.get("S2").copied().unwrap_or(0);
        let s3 = counts.get("S3").copied().unwrap_or(0);
        assert_eq!(s1 + s2 + s3, 10_000);
        assert!(s1 > s2 && s2 > s3, "counts: {counts:?}");
    }
}
