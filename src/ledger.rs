// src/ledger.rs

use crate::file_utils::{atomic_write, get_ledgers_path};
use log::{debug, warn};
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, BufReader},
    path::Path,
};

/// Recently heard story ids for every kiosk client, keyed by client id.
pub type LedgerBook = HashMap<String, Vec<String>>;

/// Returns a new ledger with `new_id` in front, any earlier occurrence of it
/// removed, truncated to `max_size` entries. The input is left untouched.
///
/// A `max_size` of 0 always yields an empty ledger.
pub fn insert_most_recent(ledger: &[String], new_id: &str, max_size: usize) -> Vec<String> {
    std::iter::once(new_id)
        .chain(ledger.iter().map(String::as_str).filter(|id| *id != new_id))
        .take(max_size)
        .map(str::to_owned)
        .collect()
}

/// Encodes a ledger as a JSON array, suitable for a cookie or header value.
pub fn serialize(ids: &[String]) -> String {
    // A list of strings always encodes.
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes a ledger produced by [`serialize`].
/// Missing, empty or malformed input yields an empty ledger; the history is
/// best effort and must never block playback.
pub fn parse(value: Option<&str>) -> Vec<String> {
    value.and_then(try_parse).unwrap_or_default()
}

/// Like [`parse`], but `None` for blank or malformed input, so callers can
/// fall back to a ledger they hold elsewhere.
pub fn try_parse(raw: &str) -> Option<Vec<String>> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => Some(ids),
        Err(e) => {
            debug!("Ignoring malformed ledger value '{}': {}", raw, e);
            None
        }
    }
}

/// The ids to leave out of the next selection.
pub fn exclusion_set(ledger: &[String]) -> HashSet<String> {
    ledger.iter().cloned().collect()
}

/// Loads every client's ledger from the JSON file.
/// If `custom_path` is provided, it uses that file instead of the default ledgers file.
/// A missing file yields an empty book; an unparsable one is logged and also
/// yields an empty book.
///
/// # Errors
///
/// Returns an error if the ledgers file path cannot be determined or if an
/// I/O error (other than `NotFound`) occurs while reading the file.
pub fn load_ledgers(custom_path: Option<&Path>) -> Result<LedgerBook, Box<dyn std::error::Error>> {
    let ledgers_path_buf;
    let ledgers_path = match custom_path {
        Some(p) => p,
        None => {
            ledgers_path_buf = get_ledgers_path()?;
            &ledgers_path_buf
        }
    };

    match File::open(ledgers_path) {
        Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
            Ok(book) => Ok(book),
            Err(e) => {
                warn!(
                    "Could not parse ledgers file at '{}' ({}). Starting with empty play history.",
                    ledgers_path.display(),
                    e
                );
                Ok(LedgerBook::new())
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LedgerBook::new()),
        Err(e) => Err(Box::new(e)),
    }
}

/// Replaces `client`'s ledger and writes the whole book back to disk.
/// If `custom_path` is provided, it saves to that file instead of the default ledgers file.
///
/// # Errors
///
/// Returns an error if the ledgers file path cannot be determined, or if
/// I/O or serialization errors occur during the saving process.
pub fn save_client_ledger(
    book: &mut LedgerBook,
    client: &str,
    ledger: Vec<String>,
    custom_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    book.insert(client.to_string(), ledger);

    let ledgers_path_buf;
    let ledgers_path = match custom_path {
        Some(p) => p,
        None => {
            ledgers_path_buf = get_ledgers_path()?;
            &ledgers_path_buf
        }
    };

    let data = serde_json::to_vec_pretty(book)?;
    atomic_write(ledgers_path, &data)?;

    Ok(())
}
