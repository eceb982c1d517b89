// src/config.rs

use crate::cli::Cli;
use crate::error::ConfigError;
use std::{env, path::PathBuf};

/// The application name, used for creating the application-specific data directory.
pub const APP_NAME: &str = "story_rotation";
/// The filename of the story archive inside the data directory.
pub const ARCHIVE_FILE_NAME: &str = "stories.json";
/// The filename holding the per-client recency ledgers of the kiosk flow.
pub const LEDGERS_FILE_NAME: &str = "ledgers.json";

/// Exponential decay rate applied to a story's age in days.
pub const DEFAULT_RECENCY_BIAS: f64 = 0.3;
/// How many recently heard stories are excluded from the next pick.
pub const DEFAULT_HISTORY_SIZE: usize = 3;
/// Per-play discount used by the play-count weight: `1 / (1 + plays * step)`.
pub const PLAY_COUNT_PENALTY: f64 = 0.1;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Cookie carrying the web visitor's ledger.
pub const LEDGER_COOKIE_NAME: &str = "story_lru";
/// 24 hours.
pub const LEDGER_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24;
/// Request/response header carrying a handset's ledger.
pub const PHONE_LEDGER_HEADER: &str = "x-phone-lru";

pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_CLIENT_ID: &str = "booth";

const ENV_ARCHIVE_PATH: &str = "STORY_ARCHIVE_PATH";
const ENV_RECENCY_BIAS: &str = "STORY_RECENCY_BIAS";
const ENV_HISTORY_SIZE: &str = "STORY_HISTORY_SIZE";
const ENV_SERVER_PORT: &str = "STORY_SERVER_PORT";

/// Tunables for one run, resolved from CLI flags, then the environment, then defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Explicit archive location; `None` means the default file in the data directory.
    pub archive_path: Option<PathBuf>,
    pub recency_bias: f64,
    pub history_size: usize,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            archive_path: None,
            recency_bias: DEFAULT_RECENCY_BIAS,
            history_size: DEFAULT_HISTORY_SIZE,
            port: DEFAULT_SERVER_PORT,
        }
    }
}

impl Settings {
    /// Builds the settings for this run.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an environment override is present but unparsable.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        Self::resolve_with(cli, |name| env::var(name).ok())
    }

    fn resolve_with(
        cli: &Cli,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let archive_path = cli
            .archive
            .clone()
            .or_else(|| lookup(ENV_ARCHIVE_PATH))
            .map(|s| PathBuf::from(shellexpand::tilde(&s).into_owned()));

        let recency_bias = match cli.recency_bias {
            Some(bias) => bias,
            None => parse_env(&lookup, ENV_RECENCY_BIAS)?.unwrap_or(defaults.recency_bias),
        };
        let history_size = match cli.history_size {
            Some(size) => size,
            None => parse_env(&lookup, ENV_HISTORY_SIZE)?.unwrap_or(defaults.history_size),
        };
        let port = match cli.port {
            Some(port) => port,
            None => parse_env(&lookup, ENV_SERVER_PORT)?.unwrap_or(defaults.port),
        };

        Ok(Settings {
            archive_path,
            recency_bias,
            history_size,
            port,
        })
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError { name, value }),
    }
}
