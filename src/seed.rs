// src/seed.rs

use crate::archive::JsonArchive;
use crate::story::{StoryRecord, StorySource};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::{
    collections::HashSet,
    io::{Error as IoError, ErrorKind as IoErrorKind},
    path::{Path, PathBuf},
};
use uuid::Uuid;
use walkdir::WalkDir;

/// Scans `folder_path` for audio recordings, judged by the MIME type guessed
/// from each file's extension.
///
/// # Errors
///
/// Returns an error if `folder_path` is not a directory or if walking it fails.
pub fn find_audio_files(
    folder_path: &Path,
    recursive: bool,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if !folder_path.is_dir() {
        return Err(Box::new(IoError::new(
            IoErrorKind::InvalidInput,
            format!("Path is not a directory: {}", folder_path.display()),
        )));
    }

    let walker = WalkDir::new(folder_path).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut audio_files = Vec::new();
    for entry_result in walker.sort_by_file_name() {
        let entry = entry_result?;
        let path = entry.path();
        if path.is_file() && is_audio(path) {
            audio_files.push(path.to_path_buf());
        }
    }
    Ok(audio_files)
}

fn is_audio(path: &Path) -> bool {
    mime_guess::from_path(path)
        .iter()
        .any(|mime| mime.type_() == mime_guess::mime::AUDIO)
}

/// Duration of a recording in seconds, if `ffprobe` is installed and can read it.
fn probe_duration(path: &Path) -> Option<f64> {
    match ffprobe::ffprobe(path) {
        Ok(info) => info
            .format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|secs| *secs >= 0.0),
        Err(e) => {
            debug!("ffprobe could not read '{}': {}", path.display(), e);
            None
        }
    }
}

/// Builds an archive record for a preloaded recording.
/// The creation time is the file's modification time, falling back to `fallback_created_at`.
pub fn story_from_recording(path: &Path, fallback_created_at: DateTime<Utc>) -> StoryRecord {
    let created_at = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or(fallback_created_at);

    let mut story = StoryRecord::new(
        Uuid::new_v4().to_string(),
        created_at,
        path.to_string_lossy().into_owned(),
    );
    story.source = StorySource::Preload;
    story.duration_s = probe_duration(path);
    story
}

/// Adds every recording under `folder` that the archive doesn't already know
/// (matched by `audio_url`). Returns how many stories were added.
///
/// # Errors
///
/// Returns an error if the folder cannot be scanned or the archive cannot be
/// read or written.
pub fn seed_archive(
    archive: &JsonArchive,
    folder: &Path,
    recursive: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let known: HashSet<String> = archive
        .load()?
        .into_iter()
        .map(|story| story.audio_url)
        .collect();

    let now = Utc::now();
    let fresh: Vec<StoryRecord> = find_audio_files(folder, recursive)?
        .into_iter()
        .filter(|path| {
            let already = known.contains(path.to_string_lossy().as_ref());
            if already {
                debug!("Skipping '{}', already archived", path.display());
            }
            !already
        })
        .map(|path| story_from_recording(&path, now))
        .collect();

    if fresh.is_empty() {
        warn!("No new recordings found in '{}'", folder.display());
        return Ok(0);
    }

    let added = fresh.len();
    archive.insert_all(fresh)?;
    info!(
        "Seeded {} stories from '{}' into '{}'",
        added,
        folder.display(),
        archive.path().display()
    );
    Ok(added)
}
