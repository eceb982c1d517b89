// src/archive.rs

use crate::error::StoreError;
use crate::file_utils::atomic_write;
use crate::story::StoryRecord;
use chrono::{DateTime, Utc};
use log::info;
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Storage that owns the story records.
/// The selection code only reads candidates and asks for plays to be counted.
pub trait StoryStore: Send + Sync {
    /// Every stored story, newest first. Consent is not filtered here.
    fn list_candidates(&self) -> Result<Vec<StoryRecord>, StoreError>;

    /// Increments the play count of `id` and stamps `last_played_at`.
    fn record_play(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// A story archive kept in a single pretty-printed JSON file.
/// Read-modify-write cycles are serialised through an internal lock.
#[derive(Debug)]
pub struct JsonArchive {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonArchive {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `stories` to the archive in one write.
    pub fn insert_all(&self, stories: Vec<StoryRecord>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut all = self.read_all()?;
        all.extend(stories);
        self.write_all(&all)
    }

    /// Every stored story in file order, without sorting.
    pub fn load(&self) -> Result<Vec<StoryRecord>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read_all()
    }

    fn read_all(&self) -> Result<Vec<StoryRecord>, StoreError> {
        match File::open(&self.path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                StoreError::Malformed {
                    path: self.path.display().to_string(),
                    source,
                }
            }),
            // A fresh installation has nothing recorded yet.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn write_all(&self, stories: &[StoryRecord]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(stories).map_err(|source| StoreError::Malformed {
            path: self.path.display().to_string(),
            source,
        })?;
        atomic_write(&self.path, &data).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StoryStore for JsonArchive {
    fn list_candidates(&self) -> Result<Vec<StoryRecord>, StoreError> {
        let mut stories = self.load()?;
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stories)
    }

    fn record_play(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stories = self.read_all()?;

        let story = stories
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        story.play_count += 1;
        story.last_played_at = Some(at);
        info!("Story {} has now been played {} times", id, story.play_count);

        self.write_all(&stories)
    }
}
