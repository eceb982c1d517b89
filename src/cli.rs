// src/cli.rs

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Plays back recorded stories, favouring new and rarely heard ones without repeating the last few.",
    long_about = None
)]
pub struct Cli {
    /// Path to the story archive (JSON). Defaults to the app data directory.
    #[clap(short, long)]
    pub archive: Option<String>,

    /// Decay rate per day of story age; 0 treats every story as equally fresh.
    #[clap(long)]
    pub recency_bias: Option<f64>,

    /// Number of recently heard stories to skip.
    #[clap(long)]
    pub history_size: Option<usize>,

    /// Identity whose recently heard list the kiosk uses (one per handset).
    #[clap(short, long, default_value = crate::config::DEFAULT_CLIENT_ID)]
    pub client: String,

    /// Port for the HTTP playback endpoints.
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Import every audio recording found in this folder into the archive, then exit.
    #[clap(long)]
    pub seed: Option<String>,

    /// Only look at the top level of the seed folder.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    pub non_recursive: bool,

    /// Disable the HTTP playback server entirely.
    #[clap(long, name = "no-server", action = clap::ArgAction::SetTrue)]
    pub no_server: bool,
}
