// src/playback.rs

use crate::archive::StoryStore;
use crate::error::PlaybackError;
use crate::ledger::{exclusion_set, insert_most_recent};
use crate::selector::select_story;
use crate::story::StoryRecord;
use chrono::Utc;
use log::{info, warn};

/// Outcome of a successful pick: the story to play and the caller's updated ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub story: StoryRecord,
    pub ledger: Vec<String>,
}

/// Fetches the candidates, picks one that isn't in `ledger`, counts the play
/// and returns the new ledger. `Ok(None)` means nothing is eligible right now.
///
/// A failure to count the play is logged and does not undo the pick.
///
/// # Errors
///
/// Returns [`PlaybackError::Store`] if the candidates cannot be listed and
/// [`PlaybackError::Selection`] on a contract violation (bad bias or random source).
pub fn play_next(
    store: &dyn StoryStore,
    ledger: &[String],
    recency_bias: f64,
    history_size: usize,
    rng: impl FnMut() -> f64,
) -> Result<Option<Playback>, PlaybackError> {
    let candidates = store.list_candidates()?;
    let exclude = exclusion_set(ledger);

    let Some(story) = select_story(&candidates, &exclude, recency_bias, rng)? else {
        info!(
            "No eligible story among {} candidates ({} recently heard)",
            candidates.len(),
            ledger.len()
        );
        return Ok(None);
    };
    let story = story.clone();

    if let Err(e) = store.record_play(&story.id, Utc::now()) {
        warn!("Could not count play of story {}: {}", story.id, e);
    }

    let ledger = insert_most_recent(ledger, &story.id, history_size);
    info!(
        "Playing story {} (played {} times before, {} candidates)",
        story.id,
        story.play_count,
        candidates.len()
    );

    Ok(Some(Playback { story, ledger }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use chrono::{DateTime, Duration};
    use std::sync::Mutex;

    /// In-memory store that can be told to fail.
    struct MemoryStore {
        stories: Mutex<Vec<StoryRecord>>,
        fail_listing: bool,
        fail_record_play: bool,
    }

    impl MemoryStore {
        fn with(stories: Vec<StoryRecord>) -> Self {
            MemoryStore {
                stories: Mutex::new(stories),
                fail_listing: false,
                fail_record_play: false,
            }
        }

        fn play_count(&self, id: &str) -> u64 {
            let stories = self.stories.lock().unwrap();
            stories.iter().find(|s| s.id == id).unwrap().play_count
        }
    }

    impl StoryStore for MemoryStore {
        fn list_candidates(&self) -> Result<Vec<StoryRecord>, StoreError> {
            if self.fail_listing {
                return Err(StoreError::NotFound("archive".to_string()));
            }
            Ok(self.stories.lock().unwrap().clone())
        }

        fn record_play(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
            if self.fail_record_play {
                return Err(StoreError::NotFound(id.to_string()));
            }
            let mut stories = self.stories.lock().unwrap();
            let story = stories
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            story.play_count += 1;
            story.last_played_at = Some(at);
            Ok(())
        }
    }

    fn archive_of(ids: &[&str]) -> MemoryStore {
        let now = Utc::now();
        MemoryStore::with(
            ids.iter()
                .enumerate()
                .map(|(i, id)| StoryRecord::new(*id, now - Duration::days(i as i64), "x.mp3"))
                .collect(),
        )
    }

    #[test]
    fn test_play_next_counts_play_and_updates_ledger() {
        let store = archive_of(&["a", "b", "c"]);
        let ledger = vec!["a".to_string(), "b".to_string()];

        let playback = play_next(&store, &ledger, 0.3, 3, || 0.5).unwrap().unwrap();
        assert_eq!(playback.story.id, "c");
        assert_eq!(playback.ledger, ["c", "a", "b"]);
        assert_eq!(store.play_count("c"), 1);
        assert_eq!(store.play_count("a"), 0);
    }

    #[test]
    fn test_play_next_never_repeats_within_history() {
        let store = archive_of(&["a", "b", "c", "d"]);
        let mut ledger: Vec<String> = Vec::new();
        let mut rng = rand::rng();

        for _ in 0..40 {
            let playback = play_next(&store, &ledger, 0.3, 3, crate::selector::unit_interval(&mut rng))
                .unwrap()
                .unwrap();
            assert!(!ledger.contains(&playback.story.id));
            ledger = playback.ledger;
        }
    }

    #[test]
    fn test_play_next_exhausted_leaves_everything_untouched() {
        let store = archive_of(&["a", "b"]);
        let ledger = vec!["b".to_string(), "a".to_string()];
        assert!(play_next(&store, &ledger, 0.3, 3, || 0.5).unwrap().is_none());
        assert_eq!(store.play_count("a"), 0);
        assert_eq!(store.play_count("b"), 0);
    }

    #[test]
    fn test_play_next_still_plays_when_counting_fails() {
        let mut store = archive_of(&["a", "b"]);
        store.fail_record_play = true;
        let ledger = vec!["a".to_string()];

        let playback = play_next(&store, &ledger, 0.3, 3, || 0.5).unwrap().unwrap();
        assert_eq!(playback.story.id, "b");
        assert_eq!(playback.ledger, ["b", "a"]);
        assert_eq!(store.play_count("b"), 0);
    }

    #[test]
    fn test_play_next_surfaces_store_and_contract_errors() {
        let mut store = archive_of(&["a"]);
        assert!(matches!(
            play_next(&store, &[], f64::NAN, 3, || 0.5),
            Err(PlaybackError::Selection(_))
        ));

        store.fail_listing = true;
        assert!(matches!(
            play_next(&store, &[], 0.3, 3, || 0.5),
            Err(PlaybackError::Store(_))
        ));
    }
}
