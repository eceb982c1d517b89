// src/file_utils.rs

use crate::config::{APP_NAME, ARCHIVE_FILE_NAME, LEDGERS_FILE_NAME};
use std::{
    fs,
    io::{self, Error as IoError, ErrorKind as IoErrorKind, Write},
    path::{Path, PathBuf},
};

/// Returns the full path to the application's data directory.
/// This function creates the directory if it does not already exist.
///
/// # Errors
///
/// Returns an error if the system's data directory cannot be determined
/// or if creating the application data directory fails.
pub fn get_app_data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data_dir_base = dirs::data_dir().ok_or_else(|| {
        IoError::new(
            IoErrorKind::NotFound,
            "Failed to determine the system's data directory.",
        )
    })?;

    let app_data_dir = data_dir_base.join(APP_NAME);
    fs::create_dir_all(&app_data_dir)?;

    Ok(app_data_dir)
}

/// Returns the default location of the story archive.
///
/// # Errors
///
/// Returns an error if the application data directory cannot be determined.
pub fn get_archive_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(get_app_data_dir()?.join(ARCHIVE_FILE_NAME))
}

/// Returns the location of the kiosk clients' ledgers file.
///
/// # Errors
///
/// Returns an error if the application data directory cannot be determined.
pub fn get_ledgers_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(get_app_data_dir()?.join(LEDGERS_FILE_NAME))
}

/// Replaces the file at `path` with `data` by writing a sibling temp file and
/// renaming it over the target. Readers see either the old or the new contents.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_replaces_contents_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("stories.json");

        atomic_write(&target, b"[1]").unwrap();
        atomic_write(&target, b"[1, 2]").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "[1, 2]");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_atomic_write_failure_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        assert!(atomic_write(&target, b"[]").is_err());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
