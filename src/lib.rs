// src/lib.rs

//! Story rotation for a listening booth: picks which recorded story a visitor
//! hears next, favouring new and rarely played stories and never repeating
//! the last few a visitor heard.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_utils;
pub mod ledger;
pub mod playback;
pub mod seed;
pub mod selector;
pub mod server;
pub mod story;
pub mod ui;
pub mod weights;

pub use error::{PlaybackError, SelectionError, StoreError};
pub use ledger::{insert_most_recent, parse, serialize};
pub use selector::select_story;
pub use story::StoryRecord;
pub use weights::compute_weights;
