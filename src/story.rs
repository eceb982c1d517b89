// src/story.rs

use crate::config::{PLAY_COUNT_PENALTY, SECONDS_PER_DAY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a recording came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorySource {
    /// Recorded on the booth handset.
    Interior,
    /// Recorded on the web recorder outside the booth.
    Exterior,
    /// Shipped with the installation.
    Preload,
    Upload,
}

/// A recorded story as stored in the archive.
/// Only `id`, `created_at`, `play_count` and `consent` take part in selection;
/// the rest is carried through to playback clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoryRecord {
    /// Opaque identifier, stable for the record's lifetime.
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Completed playbacks. Only the archive mutates this.
    #[serde(default)]
    pub play_count: u64,
    /// Stories without the teller's consent are never played.
    #[serde(default)]
    pub consent: bool,
    pub source: StorySource,
    pub audio_url: String,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
}

impl StoryRecord {
    /// Creates a consented, never-played record with no transcript yet.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, audio_url: impl Into<String>) -> Self {
        StoryRecord {
            id: id.into(),
            created_at,
            play_count: 0,
            consent: true,
            source: StorySource::Interior,
            audio_url: audio_url.into(),
            duration_s: None,
            transcript: None,
            keywords: None,
            last_played_at: None,
        }
    }

    /// Age of the story in fractional days relative to `now`.
    /// Stories stamped after `now` (clock skew between hosts) count as brand new.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let age = now.signed_duration_since(self.created_at);
        let seconds = age.num_milliseconds() as f64 / 1000.0;
        (seconds / SECONDS_PER_DAY).max(0.0)
    }

    /// Scarcity factor of the selection weight.
    ///
    /// Examples:
    /// * `play_count` = 0  => 1.0
    /// * `play_count` = 10 => 0.5
    /// * `play_count` = 30 => 0.25
    ///
    /// Never reaches zero, so even the most played story stays in rotation.
    pub fn play_weight(&self) -> f64 {
        1.0 / (1.0 + self.play_count as f64 * PLAY_COUNT_PENALTY)
    }

    /// Freshness factor of the selection weight: `exp(-recency_bias * age_days)`.
    pub fn recency_weight(&self, recency_bias: f64, now: DateTime<Utc>) -> f64 {
        (-recency_bias * self.age_days(now)).exp()
    }

    /// Natural log of `recency_weight * play_weight`, kept in log space so that
    /// very old stories don't underflow before normalisation.
    pub fn log_raw_weight(&self, recency_bias: f64, now: DateTime<Utc>) -> f64 {
        -recency_bias * self.age_days(now) + self.play_weight().ln()
    }
}
